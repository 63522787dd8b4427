pub use super::game_participants::Entity as GameParticipants;
pub use super::game_responses::Entity as GameResponses;
pub use super::game_sessions::Entity as GameSessions;
pub use super::quiz_questions::Entity as QuizQuestions;
pub use super::scheduled_jobs::Entity as ScheduledJobs;
