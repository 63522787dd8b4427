pub mod errors;
pub mod messages;
pub mod session;

// Re-export all types
pub use errors::*;
pub use messages::*;
pub use session::*;

pub type SessionId = i32;
pub type ParticipantId = i32;
pub type QuestionId = i32;
pub type ResponseId = i32;
pub type UserId = i32;
