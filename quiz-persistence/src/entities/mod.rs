pub mod prelude;

pub mod game_participants;
pub mod game_responses;
pub mod game_sessions;
pub mod quiz_questions;
pub mod scheduled_jobs;
pub mod sea_orm_active_enums;
