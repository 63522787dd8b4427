mod test_helpers;

use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use quiz_core::{Caller, advancement_job_id, participant_channel, session_channel};
use quiz_persistence::SessionError;
use quiz_persistence::entities::sea_orm_active_enums::JobStatus;
use quiz_server::scheduler::AdvanceHandler;
use quiz_types::{
    BroadcastEvent, DomainReason, JoinOutcome, JoinSessionRequest, ParticipantStatus,
    RedirectTarget, SessionStatus, SubmitResponseRequest,
};
use test_helpers::*;

fn session_updates(events: &[BroadcastEvent]) -> Vec<SessionStatus> {
    events
        .iter()
        .filter_map(|event| match event {
            BroadcastEvent::SessionUpdated { session } => Some(session.status),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_start_broadcasts_and_arms_first_advance() {
    let setup = TestServerSetup::new().await;
    let session = setup.create_session(None).await;

    let live = setup
        .service
        .start_session(session.id, &setup.host())
        .await
        .unwrap();
    assert_eq!(live.status, SessionStatus::Live);
    assert_eq!(live.current_question_index, 0);

    let events = setup.broadcaster.on_channel(&session_channel(session.id));
    assert_eq!(session_updates(&events), vec![SessionStatus::Live]);

    let job = setup
        .jobs
        .find(&advancement_job_id(session.id, 0))
        .await
        .unwrap()
        .expect("first advancement should be armed");
    assert_eq!(job.status, JobStatus::Pending);
    assert!(job.run_at > Utc::now() + chrono::Duration::seconds(25));
}

#[tokio::test]
async fn test_start_by_non_host_changes_nothing() {
    let setup = TestServerSetup::new().await;
    let session = setup.create_session(None).await;

    let result = setup
        .service
        .start_session(session.id, &Caller::user(42))
        .await;
    assert!(matches!(result, Err(SessionError::Unauthorized(_))));
    assert!(setup.broadcaster.events().is_empty());
    assert!(
        setup
            .jobs
            .find(&advancement_job_id(session.id, 0))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_create_requires_signed_in_host() {
    let setup = TestServerSetup::new().await;
    let request = quiz_types::CreateSessionRequest {
        quiz_id: QUIZ_ID.to_string(),
        title: None,
        max_players: None,
        time_per_question_seconds: None,
        points_per_question: None,
        player_view_mode: None,
    };

    let result = setup
        .service
        .create_session(&Caller::guest("token"), &request)
        .await;
    assert!(matches!(result, Err(SessionError::Unauthorized(_))));
}

#[tokio::test]
async fn test_duplicate_advance_moves_once() {
    let setup = TestServerSetup::new().await;
    let session = setup.create_session(None).await;
    setup
        .service
        .start_session(session.id, &setup.host())
        .await
        .unwrap();

    setup.service.handle_advance(session.id, 0).await.unwrap();
    setup.service.handle_advance(session.id, 0).await.unwrap();

    let snapshot = setup.service.snapshot(session.id).await.unwrap();
    assert_eq!(snapshot.current_question_index, 1);
    assert_eq!(snapshot.current_question_number, Some(2));

    let updates = session_updates(&setup.broadcaster.on_channel(&session_channel(session.id)));
    assert_eq!(updates, vec![SessionStatus::Live, SessionStatus::Live]);

    assert!(
        setup
            .jobs
            .find(&advancement_job_id(session.id, 1))
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_last_question_ends_without_reschedule() {
    let setup = TestServerSetup::with_options(SetupOptions {
        questions: 5,
        ..SetupOptions::default()
    })
    .await;
    let session = setup.create_session(None).await;
    setup
        .service
        .start_session(session.id, &setup.host())
        .await
        .unwrap();

    for index in 0..4 {
        setup.service.handle_advance(session.id, index).await.unwrap();
    }
    let snapshot = setup.service.snapshot(session.id).await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::Live);
    assert_eq!(snapshot.current_question_index, 4);

    setup.broadcaster.clear();
    setup.service.handle_advance(session.id, 4).await.unwrap();

    let snapshot = setup.service.snapshot(session.id).await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::Ended);
    assert!(snapshot.completed_at.is_some());
    assert!(
        setup
            .jobs
            .find(&advancement_job_id(session.id, 5))
            .await
            .unwrap()
            .is_none()
    );

    let events = setup.broadcaster.on_channel(&session_channel(session.id));
    assert_eq!(events.len(), 2);
    assert_eq!(session_updates(&events), vec![SessionStatus::Ended]);
    assert!(matches!(
        events[1],
        BroadcastEvent::LeaderboardUpdated { .. }
    ));

    // Late firing after the end is a no-op
    setup.service.handle_advance(session.id, 4).await.unwrap();
    assert_eq!(setup.broadcaster.events().len(), 2);
}

#[tokio::test]
async fn test_cancel_turns_pending_advance_into_noop() {
    let setup = TestServerSetup::new().await;
    let session = setup.create_session(None).await;
    setup
        .service
        .start_session(session.id, &setup.host())
        .await
        .unwrap();

    let cancelled = setup
        .service
        .cancel_session(session.id, &setup.host())
        .await
        .unwrap();
    assert_eq!(cancelled.status, SessionStatus::Cancelled);

    setup.service.handle_advance(session.id, 0).await.unwrap();
    let snapshot = setup.service.snapshot(session.id).await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::Cancelled);
    assert_eq!(snapshot.current_question_index, 0);
}

#[tokio::test]
async fn test_advance_of_missing_session_is_noop() {
    let setup = TestServerSetup::new().await;
    setup.service.handle_advance(999, 0).await.unwrap();
    assert!(setup.broadcaster.events().is_empty());
}

#[tokio::test]
async fn test_failed_broadcast_keeps_committed_state() {
    let setup = TestServerSetup::with_options(SetupOptions {
        failing_broadcast: true,
        ..SetupOptions::default()
    })
    .await;
    let session = setup.create_session(None).await;

    let live = setup
        .service
        .start_session(session.id, &setup.host())
        .await
        .unwrap();
    assert_eq!(live.status, SessionStatus::Live);

    setup.service.handle_advance(session.id, 0).await.unwrap();
    let snapshot = setup.service.snapshot(session.id).await.unwrap();
    assert_eq!(snapshot.current_question_index, 1);
    assert!(
        setup
            .jobs
            .find(&advancement_job_id(session.id, 1))
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_stale_skip_rearms_lost_timer() {
    let setup = TestServerSetup::new().await;
    let session = setup.create_session(None).await;
    setup
        .service
        .start_session(session.id, &setup.host())
        .await
        .unwrap();

    // Advance behind the service's back so no follow-up job is written
    setup.sessions.advance(session.id, 0).await.unwrap();
    assert!(
        setup
            .jobs
            .find(&advancement_job_id(session.id, 1))
            .await
            .unwrap()
            .is_none()
    );

    setup.service.handle_advance(session.id, 0).await.unwrap();
    assert!(
        setup
            .jobs
            .find(&advancement_job_id(session.id, 1))
            .await
            .unwrap()
            .is_some()
    );
}

#[tokio::test]
async fn test_rearm_live_sessions_on_boot() {
    let setup = TestServerSetup::new().await;
    let session = setup.create_session(None).await;
    setup
        .service
        .start_session(session.id, &setup.host())
        .await
        .unwrap();

    // The first timer already exists
    assert_eq!(setup.service.rearm_live_sessions().await.unwrap(), 0);

    setup.sessions.advance(session.id, 0).await.unwrap();
    assert_eq!(setup.service.rearm_live_sessions().await.unwrap(), 1);
    assert_eq!(setup.service.rearm_live_sessions().await.unwrap(), 0);
}

#[tokio::test]
async fn test_rearm_revives_timer_that_ran_out_of_retries() {
    let setup = TestServerSetup::new().await;
    let session = setup.create_session(None).await;
    setup
        .service
        .start_session(session.id, &setup.host())
        .await
        .unwrap();

    let job_id = advancement_job_id(session.id, 0);
    let claimed = setup
        .jobs
        .claim_next_due(Utc::now() + chrono::Duration::seconds(60))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(claimed.job_id, job_id);
    setup
        .jobs
        .fail(&claimed, "db down", 1, Duration::from_millis(1))
        .await
        .unwrap();
    assert_eq!(
        setup.jobs.find(&job_id).await.unwrap().unwrap().status,
        JobStatus::Failed
    );

    assert_eq!(setup.service.rearm_live_sessions().await.unwrap(), 1);

    let revived = setup.jobs.find(&job_id).await.unwrap().unwrap();
    assert_eq!(revived.status, JobStatus::Pending);
    assert_eq!(revived.attempts, 0);

    // The revived timer still drives the session forward
    let claimed = setup
        .jobs
        .claim_next_due(Utc::now() + chrono::Duration::seconds(60))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(claimed.job_id, job_id);
    setup.service.handle_advance(session.id, 0).await.unwrap();
    let snapshot = setup.service.snapshot(session.id).await.unwrap();
    assert_eq!(snapshot.status, SessionStatus::Live);
    assert_eq!(snapshot.current_question_index, 1);
}

#[tokio::test]
async fn test_join_is_idempotent_and_announced() {
    let setup = TestServerSetup::new().await;
    let session = setup.create_session(None).await;
    let player = Caller::user(10);

    let first = setup.join(&session, "Player", &player).await;
    assert!(matches!(first, JoinOutcome::Joined { guest_token: None, .. }));

    let again = setup.join(&session, "Other name", &player).await;
    match again {
        JoinOutcome::Rejoin {
            participant_id,
            redirect,
            ..
        } => {
            assert_eq!(participant_id, first.participant_id());
            assert_eq!(redirect, RedirectTarget::Lobby);
        }
        other => panic!("expected rejoin, got {:?}", other),
    }

    let joined_events = setup
        .broadcaster
        .on_channel(&participant_channel(session.id));
    assert_eq!(joined_events.len(), 1);

    let snapshot = setup.service.snapshot(session.id).await.unwrap();
    assert_eq!(snapshot.player_count, 1);
}

#[tokio::test]
async fn test_nickname_conflict_until_kicked() {
    let setup = TestServerSetup::new().await;
    let session = setup.create_session(None).await;
    let first = setup.join(&session, "Player", &Caller::user(10)).await;

    let request = JoinSessionRequest {
        code: session.code.clone(),
        nickname: "  Player ".to_string(),
        avatar_color: None,
    };
    let conflict = setup
        .service
        .join_session(&request, &Caller::user(11))
        .await;
    assert!(matches!(conflict, Err(SessionError::Conflict(_))));

    let kicked = setup
        .service
        .kick_participant(session.id, first.participant_id(), &setup.host())
        .await
        .unwrap();
    assert_eq!(kicked.status, ParticipantStatus::Kicked);

    let participant_events = setup
        .broadcaster
        .on_channel(&participant_channel(session.id));
    assert!(matches!(
        participant_events.last(),
        Some(BroadcastEvent::ParticipantChanged { participant })
            if participant.status == ParticipantStatus::Kicked
    ));
    let session_events = setup.broadcaster.on_channel(&session_channel(session.id));
    match session_events.last() {
        Some(BroadcastEvent::SessionUpdated { session }) => assert_eq!(session.player_count, 0),
        other => panic!("expected snapshot after kick, got {:?}", other),
    }

    let rejoined = setup
        .service
        .join_session(&request, &Caller::user(11))
        .await
        .unwrap();
    assert!(!rejoined.is_rejoin());
}

// Runs on the single-connection SQLite pool, so submits are serialized and
// exercise the duplicate check plus unique index rather than row locks.
#[tokio::test]
async fn test_parallel_submissions_score_once() {
    let setup = TestServerSetup::new().await;
    let player = Caller::user(10);
    let (session, participant_id) = setup.live_session_with_player(&player).await;

    let request = SubmitResponseRequest {
        question_id: setup.question_ids[0],
        participant_id,
        choice: Some("A".to_string()),
        time_used_seconds: Some(0.0),
    };

    let attempts = (0..20).map(|_| {
        setup
            .service
            .submit_response(session.id, &request, &player)
    });
    let results = join_all(attempts).await;

    let successes: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(successes.len(), 1);
    assert_eq!(successes[0].points_earned, 150);
    assert_eq!(successes[0].total_score, 150);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| e.reason() == Some(DomainReason::AlreadyAnswered))
    );

    let leaderboard = setup.service.leaderboard(session.id).await.unwrap();
    assert_eq!(leaderboard.len(), 1);
    assert_eq!(leaderboard[0].score, 150);
    assert_eq!(leaderboard[0].correct_answers, 1);
}

#[tokio::test]
async fn test_leaderboard_published_on_answer() {
    let setup = TestServerSetup::with_options(SetupOptions {
        leaderboard_on_answer: true,
        ..SetupOptions::default()
    })
    .await;
    let player = Caller::user(10);
    let (session, participant_id) = setup.live_session_with_player(&player).await;
    setup.broadcaster.clear();

    setup
        .service
        .submit_response(
            session.id,
            &SubmitResponseRequest {
                question_id: setup.question_ids[0],
                participant_id,
                choice: Some("b".to_string()),
                time_used_seconds: Some(3.0),
            },
            &player,
        )
        .await
        .unwrap();

    let events = setup.broadcaster.on_channel(&session_channel(session.id));
    match events.as_slice() {
        [BroadcastEvent::LeaderboardUpdated { entries, .. }] => {
            assert_eq!(entries[0].participant_id, participant_id);
            assert_eq!(entries[0].score, 0);
            assert_eq!(entries[0].incorrect_answers, 1);
        }
        other => panic!("expected one leaderboard event, got {:?}", other),
    }
}

#[tokio::test]
async fn test_leave_announces_departure() {
    let setup = TestServerSetup::new().await;
    let session = setup.create_session(None).await;
    let player = Caller::user(10);
    let joined = setup.join(&session, "Player", &player).await;

    let left = setup
        .service
        .leave_session(session.id, joined.participant_id(), &player)
        .await
        .unwrap();
    assert_eq!(left.status, ParticipantStatus::Left);
    assert!(left.left_at.is_some());

    let again = setup
        .service
        .leave_session(session.id, joined.participant_id(), &player)
        .await;
    assert!(matches!(again, Err(SessionError::NotFound(_))));
}

#[tokio::test]
async fn test_scheduler_runs_session_to_the_end() {
    let setup = TestServerSetup::with_options(SetupOptions {
        questions: 2,
        ..SetupOptions::default()
    })
    .await;
    let session = setup.create_session(Some(1)).await;

    let workers = setup.workers(fast_scheduler_config());
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let handles = workers.spawn(shutdown_rx);

    setup
        .service
        .start_session(session.id, &setup.host())
        .await
        .unwrap();

    let mut status = SessionStatus::Live;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        status = setup.service.snapshot(session.id).await.unwrap().status;
        if status == SessionStatus::Ended {
            break;
        }
    }
    assert_eq!(status, SessionStatus::Ended);

    shutdown_tx.send(true).unwrap();
    for handle in handles {
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("worker should stop on shutdown")
            .unwrap();
    }

    for index in 0..2 {
        let job = setup
            .jobs
            .find(&advancement_job_id(session.id, index))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(job.status, JobStatus::Completed);
    }

    let updates = session_updates(&setup.broadcaster.on_channel(&session_channel(session.id)));
    assert_eq!(
        updates,
        vec![SessionStatus::Live, SessionStatus::Live, SessionStatus::Ended]
    );
}
