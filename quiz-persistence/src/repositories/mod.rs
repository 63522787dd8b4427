pub mod job_repository;
pub mod participant_repository;
pub mod question_repository;
pub mod response_repository;
pub mod session_repository;

pub use job_repository::*;
pub use participant_repository::*;
pub use question_repository::*;
pub use response_repository::*;
pub use session_repository::*;
