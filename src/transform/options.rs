// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::{DEFAULT_THRESHOLD_MAX, DEFAULT_THRESHOLD_MIN};
use crate::errors::ConfigError;
use serde::Deserialize;

/// Backpressure and batching knobs of a buffering transform.
///
/// The transform stops taking input once `threshold_max` chunks are buffered
/// and signals drain again only after the buffer fell below `threshold_min`
/// (hysteresis). Each turn hands at most `max_per_turn` chunks to the stage;
/// the rest is processed in deferred turns.
///
/// # Example
/// ```yaml
/// transform:
///   threshold_min: 20
///   threshold_max: 100
///   max_per_turn: 50
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    pub threshold_min: usize,
    pub threshold_max: usize,
    /// `None` processes the whole buffer in one turn.
    pub max_per_turn: Option<usize>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            threshold_min: DEFAULT_THRESHOLD_MIN,
            threshold_max: DEFAULT_THRESHOLD_MAX,
            max_per_turn: None,
        }
    }
}

impl TransformOptions {
    pub fn with_max_per_turn(mut self, max_per_turn: usize) -> Self {
        self.max_per_turn = Some(max_per_turn);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.threshold_min >= self.threshold_max {
            return Err(ConfigError::InvalidThresholds {
                min: self.threshold_min,
                max: self.threshold_max,
            });
        }

        if self.max_per_turn == Some(0) {
            return Err(ConfigError::ZeroMaxPerTurn);
        }

        Ok(())
    }

    pub(crate) fn turn_size(&self, buffered: usize) -> usize {
        match self.max_per_turn {
            Some(limit) => buffered.min(limit),
            None => buffered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_form_a_valid_band() {
        let options = TransformOptions::default();
        assert_eq!(options.threshold_min, 20);
        assert_eq!(options.threshold_max, 100);
        assert_eq!(options.max_per_turn, None);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn inverted_or_empty_band_is_rejected() {
        let options = TransformOptions {
            threshold_min: 100,
            threshold_max: 100,
            max_per_turn: None,
        };
        assert!(matches!(
            options.validate(),
            Err(ConfigError::InvalidThresholds { min: 100, max: 100 })
        ));
    }

    #[test]
    fn zero_sized_turns_are_rejected() {
        let options = TransformOptions::default().with_max_per_turn(0);
        assert!(matches!(options.validate(), Err(ConfigError::ZeroMaxPerTurn)));
    }

    #[test]
    fn turn_size_is_capped_by_max_per_turn() {
        assert_eq!(TransformOptions::default().turn_size(250), 250);
        assert_eq!(TransformOptions::default().with_max_per_turn(10).turn_size(250), 10);
        assert_eq!(TransformOptions::default().with_max_per_turn(10).turn_size(3), 3);
    }
}
