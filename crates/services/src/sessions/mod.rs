mod engine;
mod progress;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use engine::{DEFAULT_REMOVAL_STREAK, PracticeSettings, StudySession};
pub use progress::SessionProgress;
pub use workflow::StudyLoopService;
