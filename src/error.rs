//! Node error types
//!
//! The duty cycle itself is fail-silent: these errors only travel as far as
//! the orchestrator, which logs them and carries on with the cycle.

use core::fmt;

/// Result type for fallible hardware operations
pub type Result<T> = core::result::Result<T, NodeError>;

/// Errors raised by the hardware capability implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NodeError {
    /// The peripheral rail switch pin could not be driven
    Rail,
    /// The radio rejected or failed to push out the payload
    Transport,
    /// The wake timer could not be scheduled
    WakeTimer,
    /// The climate sensor failed to initialise
    Sensor,
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::Rail => write!(f, "peripheral rail switch failed"),
            NodeError::Transport => write!(f, "radio transmission failed"),
            NodeError::WakeTimer => write!(f, "wake timer could not be scheduled"),
            NodeError::Sensor => write!(f, "climate sensor initialisation failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_the_failing_part() {
        assert_eq!(
            format!("{}", NodeError::Transport),
            "radio transmission failed"
        );
        assert_eq!(format!("{}", NodeError::Rail), "peripheral rail switch failed");
    }
}
