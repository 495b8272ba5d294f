//! Startup configuration validation: the checks `main` runs before binding a
//! socket, separate from `loader`'s best-effort layered merge (which never
//! fails — bad input there just falls back to defaults).

use crate::error::ConfigValidationError;

use super::Config;

/// Rejects configurations that would make the server unable to run
/// correctly: a room capacity of zero can never fill, non-positive arena
/// bounds break every position clamp, and a zero-capacity outbound queue
/// can never deliver a frame.
pub fn validate(config: &Config) -> Result<(), ConfigValidationError> {
    if config.server.room_capacity < 1 {
        return Err(ConfigValidationError::RoomCapacityTooSmall(
            config.server.room_capacity,
        ));
    }
    if config.simulation.arena_width <= 0.0 || config.simulation.arena_height <= 0.0 {
        return Err(ConfigValidationError::InvalidArenaBounds);
    }
    if config.server.outbound_queue_capacity < 1 {
        return Err(ConfigValidationError::QueueCapacityTooSmall(
            config.server.outbound_queue_capacity,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn zero_room_capacity_is_rejected() {
        let mut config = Config::default();
        config.server.room_capacity = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigValidationError::RoomCapacityTooSmall(0))
        ));
    }

    #[test]
    fn non_positive_arena_bounds_are_rejected() {
        let mut config = Config::default();
        config.simulation.arena_width = 0.0;
        assert!(matches!(
            validate(&config),
            Err(ConfigValidationError::InvalidArenaBounds)
        ));
    }

    #[test]
    fn zero_queue_capacity_is_rejected() {
        let mut config = Config::default();
        config.server.outbound_queue_capacity = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigValidationError::QueueCapacityTooSmall(0))
        ));
    }
}
