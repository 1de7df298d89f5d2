#![forbid(unsafe_code)]

pub mod breaker;
pub mod error;
pub mod options;
pub mod sessions;

pub use study_core::Clock;

pub use breaker::{BreakerConfig, BreakerRegistry, BreakerState, CircuitBreaker};
pub use error::{BreakerConfigError, SessionError};
pub use options::{AnswerOption, generate_options};
pub use sessions::{
    DEFAULT_REMOVAL_STREAK, PracticeSettings, SessionProgress, StudyLoopService, StudySession,
};
