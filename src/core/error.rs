//=========================================================================
// Core Error
//=========================================================================
//
// Crate-level error wrapping each subsystem's error enum so game code can
// propagate any of them with `?`.
//
//=========================================================================

//=== Internal Dependencies ===============================================

use super::config::ConfigError;
use super::event_bus::EventError;
use super::pool::PoolError;
use super::timer::TimerError;

//=== CoreError ===========================================================

#[derive(Debug)]
pub enum CoreError {
    Pool(PoolError),
    Timer(TimerError),
    Event(EventError),
    Config(ConfigError),
}

impl std::fmt::Display for CoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pool(e) => write!(f, "{}", e),
            Self::Timer(e) => write!(f, "{}", e),
            Self::Event(e) => write!(f, "{}", e),
            Self::Config(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Pool(e) => Some(e),
            Self::Timer(e) => Some(e),
            Self::Event(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

impl From<PoolError> for CoreError {
    fn from(e: PoolError) -> Self {
        Self::Pool(e)
    }
}

impl From<TimerError> for CoreError {
    fn from(e: TimerError) -> Self {
        Self::Timer(e)
    }
}

impl From<EventError> for CoreError {
    fn from(e: EventError) -> Self {
        Self::Event(e)
    }
}

impl From<ConfigError> for CoreError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::timer::TimerVariant;

    fn spawn() -> Result<(), CoreError> {
        Err(PoolError::Exhausted { capacity: 4 })?
    }

    #[test]
    fn question_mark_wraps_subsystem_errors() {
        let err = spawn().unwrap_err();
        assert!(matches!(err, CoreError::Pool(PoolError::Exhausted { capacity: 4 })));
        assert_eq!(err.to_string(), "Pool exhausted (hard capacity 4)");
    }

    #[test]
    fn source_exposes_the_wrapped_error() {
        use std::error::Error;
        let err = CoreError::from(TimerError::UnknownVariant(TimerVariant::Stopwatch));
        assert!(err.source().is_some());
    }
}
