//! One-to-one chat sessions.

pub mod manager;
pub mod session;

pub use manager::{ClosedSession, SessionManager};
pub use session::{ChatMessage, ChatSession, SessionState};
