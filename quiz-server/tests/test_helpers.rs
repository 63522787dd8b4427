#![allow(dead_code)]

use async_trait::async_trait;
use migration::{Migrator, MigratorTrait};
use quiz_core::Caller;
use quiz_persistence::connection::connect_to_memory_database;
use quiz_persistence::repositories::{
    JobRepository, ParticipantRepository, QuestionRepository, ResponseRepository,
    SessionRepository,
};
use quiz_server::broadcast::{BroadcastError, Broadcaster};
use quiz_server::config::SchedulerConfig;
use quiz_server::scheduler::{AdvancementQueue, AdvancementWorkers};
use quiz_server::session_service::SessionService;
use quiz_types::{
    BroadcastEvent, CreateSessionRequest, JoinOutcome, JoinSessionRequest, SessionSnapshot,
};
use sea_orm::DatabaseConnection;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const QUIZ_ID: &str = "general";
pub const HOST_ID: i32 = 1;

/// Records every publish so tests can assert on what went out.
#[derive(Default)]
pub struct RecordingBroadcaster {
    events: Mutex<Vec<(String, BroadcastEvent)>>,
}

impl RecordingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(String, BroadcastEvent)> {
        self.events.lock().unwrap().clone()
    }

    pub fn on_channel(&self, channel: &str) -> Vec<BroadcastEvent> {
        self.events()
            .into_iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, event)| event)
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

#[async_trait]
impl Broadcaster for RecordingBroadcaster {
    async fn broadcast(&self, channel: &str, event: &BroadcastEvent) -> Result<(), BroadcastError> {
        self.events
            .lock()
            .unwrap()
            .push((channel.to_string(), event.clone()));
        Ok(())
    }
}

/// A gateway that is always down.
pub struct FailingBroadcaster;

#[async_trait]
impl Broadcaster for FailingBroadcaster {
    async fn broadcast(&self, _channel: &str, _event: &BroadcastEvent) -> Result<(), BroadcastError> {
        Err(BroadcastError::Unavailable("gateway offline".to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct SetupOptions {
    pub questions: i32,
    pub leaderboard_on_answer: bool,
    pub failing_broadcast: bool,
}

impl Default for SetupOptions {
    fn default() -> Self {
        Self {
            questions: 3,
            leaderboard_on_answer: false,
            failing_broadcast: false,
        }
    }
}

/// Inserts `count` questions whose answer is always "A".
pub async fn seed_quiz(db: &DatabaseConnection, quiz_id: &str, count: i32) -> Vec<i32> {
    let questions = QuestionRepository::new(db.clone());
    let choices = vec!["A".to_string(), "B".to_string(), "C".to_string()];
    let mut ids = Vec::new();
    for position in 0..count {
        let question = questions
            .insert_question(
                quiz_id,
                position,
                &format!("Question {}", position + 1),
                &choices,
                "A",
            )
            .await
            .unwrap();
        ids.push(question.id);
    }
    ids
}

/// Test setup that wires the service the way `main` does, minus the network.
pub struct TestServerSetup {
    pub db: DatabaseConnection,
    pub service: Arc<SessionService>,
    pub sessions: SessionRepository,
    pub jobs: JobRepository,
    pub queue: AdvancementQueue,
    pub broadcaster: Arc<RecordingBroadcaster>,
    pub question_ids: Vec<i32>,
}

impl TestServerSetup {
    pub async fn new() -> Self {
        Self::with_options(SetupOptions::default()).await
    }

    pub async fn with_options(options: SetupOptions) -> Self {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        let question_ids = seed_quiz(&db, QUIZ_ID, options.questions).await;

        let recorder = Arc::new(RecordingBroadcaster::new());
        let broadcaster: Arc<dyn Broadcaster> = if options.failing_broadcast {
            Arc::new(FailingBroadcaster)
        } else {
            recorder.clone()
        };

        let jobs = JobRepository::new(db.clone());
        let queue = AdvancementQueue::new(jobs.clone());
        let sessions = SessionRepository::new(db.clone());
        let service = Arc::new(
            SessionService::new(
                sessions.clone(),
                ParticipantRepository::new(db.clone()),
                ResponseRepository::new(db.clone()),
                broadcaster,
                queue.clone(),
            )
            .with_leaderboard_on_answer(options.leaderboard_on_answer),
        );

        Self {
            db,
            service,
            sessions,
            jobs,
            queue,
            broadcaster: recorder,
            question_ids,
        }
    }

    pub fn host(&self) -> Caller {
        Caller::user(HOST_ID)
    }

    pub async fn create_session(&self, time_per_question_seconds: Option<i32>) -> SessionSnapshot {
        let request = CreateSessionRequest {
            quiz_id: QUIZ_ID.to_string(),
            title: Some("Test quiz".to_string()),
            max_players: Some(25),
            time_per_question_seconds,
            points_per_question: Some(100),
            player_view_mode: None,
        };
        self.service
            .create_session(&self.host(), &request)
            .await
            .unwrap()
    }

    pub async fn join(&self, session: &SessionSnapshot, nickname: &str, caller: &Caller) -> JoinOutcome {
        self.service
            .join_session(
                &JoinSessionRequest {
                    code: session.code.clone(),
                    nickname: nickname.to_string(),
                    avatar_color: None,
                },
                caller,
            )
            .await
            .unwrap()
    }

    /// A live session with one signed-in player. Returns (session, participant id).
    pub async fn live_session_with_player(&self, player: &Caller) -> (SessionSnapshot, i32) {
        let session = self.create_session(None).await;
        let outcome = self.join(&session, "Player", player).await;
        let live = self
            .service
            .start_session(session.id, &self.host())
            .await
            .unwrap();
        (live, outcome.participant_id())
    }

    pub fn workers(&self, config: SchedulerConfig) -> Arc<AdvancementWorkers> {
        Arc::new(AdvancementWorkers::new(
            &self.queue,
            self.service.clone(),
            config,
        ))
    }
}

pub fn fast_scheduler_config() -> SchedulerConfig {
    SchedulerConfig {
        workers: 2,
        poll_interval: Duration::from_millis(50),
        max_attempts: 3,
        retry_backoff: Duration::from_millis(10),
        retention: Duration::from_secs(3600),
    }
}
