pub mod caller;
pub mod channels;
pub mod guest_token;
pub mod leaderboard;
pub mod lifecycle;
pub mod scoring;
pub mod session_code;

// Re-export main components
pub use caller::*;
pub use channels::*;
pub use guest_token::*;
pub use leaderboard::*;
pub use lifecycle::*;
pub use scoring::*;
pub use session_code::*;
