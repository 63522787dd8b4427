mod common;

use common::*;
use quiz_core::{
    AdvanceDecision, JoinDecision, ScoringEngine, SessionConfig, advance_decision, join_decision,
    rank_standings, Standing,
};
use quiz_types::{RedirectTarget, SessionStatus};

#[test]
fn test_full_game_walks_every_question_then_ends() {
    let config = SessionConfig::from_request(&default_request(), 5).unwrap();
    let mut index = 0;
    let mut advances = 0;

    loop {
        match advance_decision(SessionStatus::Live, index, index, config.total_questions) {
            AdvanceDecision::Advance { next_index } => {
                assert_eq!(next_index, index + 1);
                index = next_index;
                advances += 1;
            }
            AdvanceDecision::End => break,
            AdvanceDecision::Skip(reason) => panic!("unexpected skip: {reason:?}"),
        }
    }

    assert_eq!(advances, 4);
    assert_eq!(index, 4);
}

#[test]
fn test_duplicate_trigger_after_advance_is_skipped() {
    // First firing for index 1 moved the session to 2; the duplicate sees 2.
    assert!(matches!(
        advance_decision(SessionStatus::Live, 2, 1, 5),
        AdvanceDecision::Skip(_)
    ));
}

#[test]
fn test_lobby_fills_up_to_capacity() {
    let mut ctx = empty_session(SessionStatus::Lobby, 3);
    for _ in 0..3 {
        assert_eq!(join_decision(&ctx), Ok(JoinDecision::Create));
        ctx.active_players += 1;
    }
    assert!(join_decision(&ctx).is_err());

    ctx.existing_participant = Some(1);
    assert_eq!(
        join_decision(&ctx),
        Ok(JoinDecision::Rejoin {
            participant_id: 1,
            redirect: RedirectTarget::Lobby
        })
    );
}

#[test]
fn test_scores_feed_leaderboard() {
    let fast = ScoringEngine::score_submission(Some("Mars"), "mars", 100, 20, 2.0);
    let slow = ScoringEngine::score_submission(Some("mars"), "mars", 100, 20, 18.0);
    let wrong = ScoringEngine::score_submission(Some("venus"), "mars", 100, 20, 1.0);

    let entries = rank_standings(vec![
        Standing {
            participant_id: 1,
            nickname: "slow".to_string(),
            avatar_color: None,
            score: slow.points_earned,
            correct_answers: slow.correct_delta(),
            incorrect_answers: slow.incorrect_delta(),
        },
        Standing {
            participant_id: 2,
            nickname: "fast".to_string(),
            avatar_color: None,
            score: fast.points_earned,
            correct_answers: fast.correct_delta(),
            incorrect_answers: fast.incorrect_delta(),
        },
        Standing {
            participant_id: 3,
            nickname: "wrong".to_string(),
            avatar_color: None,
            score: wrong.points_earned,
            correct_answers: wrong.correct_delta(),
            incorrect_answers: wrong.incorrect_delta(),
        },
    ]);

    assert_eq!(entries[0].nickname, "fast");
    assert_eq!(entries[0].score, 145);
    assert_eq!(entries[1].score, 105);
    assert_eq!(entries[2].score, 0);
    assert_eq!(entries[2].incorrect_answers, 1);
}
