/// Share of the base points that is paid out as a speed bonus.
const TIME_BONUS_SHARE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringInput {
    pub base_points: i32,
    pub time_per_question_seconds: i32,
    pub time_used_seconds: f64,
    pub is_correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerKind {
    Correct,
    Incorrect,
    /// Nothing was submitted before time ran out.
    Blank,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredAnswer {
    pub kind: AnswerKind,
    pub points_earned: i32,
    pub time_used_seconds: f64,
}

impl ScoredAnswer {
    pub fn is_correct(&self) -> bool {
        self.kind == AnswerKind::Correct
    }

    pub fn correct_delta(&self) -> i32 {
        i32::from(self.kind == AnswerKind::Correct)
    }

    pub fn incorrect_delta(&self) -> i32 {
        i32::from(self.kind == AnswerKind::Incorrect)
    }
}

pub struct ScoringEngine;

impl ScoringEngine {
    /// Points for one answer: base points plus a bonus that decays linearly
    /// with the time used.
    pub fn points_for(input: ScoringInput) -> i32 {
        if !input.is_correct {
            return 0;
        }

        let base = input.base_points.max(0);
        let time_per_question = f64::from(input.time_per_question_seconds.max(0));
        let time_used = Self::clamp_time_used(input.time_used_seconds, input.time_per_question_seconds);

        let bonus_pool = (f64::from(base) * TIME_BONUS_SHARE).floor();
        let time_remaining = (time_per_question - time_used).max(0.0);
        let time_ratio = if time_per_question > 0.0 {
            (time_remaining / time_per_question).min(1.0)
        } else {
            0.0
        };

        base + (time_ratio * bonus_pool).floor() as i32
    }

    /// Scores a raw submission against the canonical answer.
    pub fn score_submission(
        choice: Option<&str>,
        canonical_answer: &str,
        base_points: i32,
        time_per_question_seconds: i32,
        time_used_seconds: f64,
    ) -> ScoredAnswer {
        let time_used_seconds = Self::clamp_time_used(time_used_seconds, time_per_question_seconds);
        let kind = match choice.map(str::trim).filter(|c| !c.is_empty()) {
            None => AnswerKind::Blank,
            Some(c) if Self::answers_match(c, canonical_answer) => AnswerKind::Correct,
            Some(_) => AnswerKind::Incorrect,
        };

        let points_earned = Self::points_for(ScoringInput {
            base_points,
            time_per_question_seconds,
            time_used_seconds,
            is_correct: kind == AnswerKind::Correct,
        });

        ScoredAnswer {
            kind,
            points_earned,
            time_used_seconds,
        }
    }

    /// Client-reported time is not trusted: keep it inside the question budget.
    pub fn clamp_time_used(time_used_seconds: f64, time_per_question_seconds: i32) -> f64 {
        if !time_used_seconds.is_finite() {
            return 0.0;
        }
        time_used_seconds.clamp(0.0, f64::from(time_per_question_seconds.max(0)))
    }

    /// Case and whitespace insensitive comparison.
    pub fn answers_match(submitted: &str, canonical: &str) -> bool {
        let submitted = normalize_answer(submitted);
        !submitted.is_empty() && submitted == normalize_answer(canonical)
    }
}

fn normalize_answer(answer: &str) -> String {
    answer
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn correct(time_used_seconds: f64) -> ScoringInput {
        ScoringInput {
            base_points: 100,
            time_per_question_seconds: 30,
            time_used_seconds,
            is_correct: true,
        }
    }

    #[test]
    fn test_instant_answer_gets_full_bonus() {
        assert_eq!(ScoringEngine::points_for(correct(0.0)), 150);
    }

    #[test]
    fn test_answer_at_deadline_gets_no_bonus() {
        assert_eq!(ScoringEngine::points_for(correct(30.0)), 100);
    }

    #[test]
    fn test_half_time_gets_half_bonus() {
        assert_eq!(ScoringEngine::points_for(correct(15.0)), 125);
    }

    #[test]
    fn test_incorrect_answer_scores_zero() {
        for time_used in [0.0, 7.5, 30.0, 99.0] {
            let input = ScoringInput {
                is_correct: false,
                ..correct(time_used)
            };
            assert_eq!(ScoringEngine::points_for(input), 0);
        }
    }

    #[test]
    fn test_bonus_is_floored() {
        // bonus pool floor(15 * 0.5) = 7, ratio 2/3 -> floor(4.66) = 4
        let input = ScoringInput {
            base_points: 15,
            time_per_question_seconds: 30,
            time_used_seconds: 10.0,
            is_correct: true,
        };
        assert_eq!(ScoringEngine::points_for(input), 19);
    }

    #[test]
    fn test_time_used_is_clamped() {
        assert_eq!(ScoringEngine::points_for(correct(-12.0)), 150);
        assert_eq!(ScoringEngine::points_for(correct(400.0)), 100);
        assert_eq!(ScoringEngine::points_for(correct(f64::NAN)), 150);
        assert_eq!(ScoringEngine::clamp_time_used(45.0, 30), 30.0);
    }

    #[test]
    fn test_answers_match_ignores_case_and_spacing() {
        assert!(ScoringEngine::answers_match("  Paris ", "paris"));
        assert!(ScoringEngine::answers_match("new   york\tcity", "New York City"));
        assert!(!ScoringEngine::answers_match("Lyon", "Paris"));
        assert!(!ScoringEngine::answers_match("   ", ""));
    }

    #[test]
    fn test_score_submission_kinds() {
        let blank = ScoringEngine::score_submission(None, "Paris", 100, 30, 3.0);
        assert_eq!(blank.kind, AnswerKind::Blank);
        assert_eq!(blank.points_earned, 0);
        assert_eq!((blank.correct_delta(), blank.incorrect_delta()), (0, 0));

        let empty = ScoringEngine::score_submission(Some("  "), "Paris", 100, 30, 3.0);
        assert_eq!(empty.kind, AnswerKind::Blank);

        let wrong = ScoringEngine::score_submission(Some("Lyon"), "Paris", 100, 30, 3.0);
        assert_eq!(wrong.kind, AnswerKind::Incorrect);
        assert_eq!((wrong.correct_delta(), wrong.incorrect_delta()), (0, 1));

        let right = ScoringEngine::score_submission(Some("PARIS"), "Paris", 100, 30, 15.0);
        assert!(right.is_correct());
        assert_eq!(right.points_earned, 125);
        assert_eq!((right.correct_delta(), right.incorrect_delta()), (1, 0));
    }
}
