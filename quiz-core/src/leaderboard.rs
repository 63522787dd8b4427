use quiz_types::{LeaderboardEntry, ParticipantId};

/// Score line for one active participant, as read from storage.
#[derive(Debug, Clone)]
pub struct Standing {
    pub participant_id: ParticipantId,
    pub nickname: String,
    pub avatar_color: Option<String>,
    pub score: i32,
    pub correct_answers: i32,
    pub incorrect_answers: i32,
}

/// Orders standings by score, then correct answers, then nickname. Equal
/// score and correct count share a rank ("1, 2, 2, 4").
pub fn rank_standings(mut standings: Vec<Standing>) -> Vec<LeaderboardEntry> {
    standings.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(b.correct_answers.cmp(&a.correct_answers))
            .then_with(|| a.nickname.cmp(&b.nickname))
    });

    let mut entries: Vec<LeaderboardEntry> = Vec::with_capacity(standings.len());
    for (index, standing) in standings.into_iter().enumerate() {
        let rank = match entries.last() {
            Some(prev)
                if prev.score == standing.score
                    && prev.correct_answers == standing.correct_answers =>
            {
                prev.rank
            }
            _ => (index + 1) as u32,
        };
        entries.push(LeaderboardEntry {
            rank,
            participant_id: standing.participant_id,
            nickname: standing.nickname,
            avatar_color: standing.avatar_color,
            score: standing.score,
            correct_answers: standing.correct_answers,
            incorrect_answers: standing.incorrect_answers,
        });
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standing(id: ParticipantId, nickname: &str, score: i32, correct: i32) -> Standing {
        Standing {
            participant_id: id,
            nickname: nickname.to_string(),
            avatar_color: None,
            score,
            correct_answers: correct,
            incorrect_answers: 0,
        }
    }

    #[test]
    fn test_leaderboard_order_and_ties() {
        let entries = rank_standings(vec![
            standing(1, "carol", 40, 2),
            standing(2, "alice", 90, 3),
            standing(3, "bob", 40, 2),
            standing(4, "dave", 10, 1),
        ]);

        let order: Vec<_> = entries.iter().map(|e| e.nickname.as_str()).collect();
        assert_eq!(order, vec!["alice", "bob", "carol", "dave"]);

        let ranks: Vec<_> = entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 2, 4]);
    }

    #[test]
    fn test_empty_leaderboard() {
        assert!(rank_standings(Vec::new()).is_empty());
    }
}
