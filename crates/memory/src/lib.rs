pub mod session_store;
pub mod sweeper;

pub use session_store::{SessionError, SessionInfo, SessionStore, DEFAULT_EXPIRATION_SECS};
pub use sweeper::spawn_sweeper;
