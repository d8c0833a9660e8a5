//  _____       ______   ____
// |_   _|     |  ____|/ ____|  Institute of Embedded Systems
//   | |  _ __ | |__  | (___    Zurich University of Applied Sciences
//   | | | '_ \|  __|  \___ \   8401 Winterthur, Switzerland
//  _| |_| | | | |____ ____) |
// |_____|_| |_|______|_____/
//
// Copyright 2025 Institute of Embedded Systems at Zurich University of Applied Sciences.
// All rights reserved.
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

use crate::*;

/// Scheduler parameters
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct Config {
    /// Number of failed CSL transmissions after which a child is no longer scheduled.
    ///
    /// The message is only dropped by the indirect sender.
    pub max_csl_triggered_tx_attempts: u8,
    /// How long before the window the frame is requested from the scheduler, not counting the
    /// time to transfer the frame to the radio
    pub csl_request_ahead_us: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_csl_triggered_tx_attempts: 4,
            csl_request_ahead_us: 2000,
        }
    }
}

impl Config {
    /// Lead time between frame request and the start of the window.
    ///
    /// Rounded up to whole units of ten symbols.
    pub(crate) fn frame_request_ahead_us(&self, bus_speed_hz: u32) -> u32 {
        (self.csl_request_ahead_us + bus_tx_time_us(bus_speed_hz))
            .next_multiple_of(US_PER_TEN_SYMBOLS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ahead() {
        let config = Config::default();
        assert_eq!(config.frame_request_ahead_us(0), 2080);
        // 2000 + 1200 is a multiple of 160
        assert_eq!(config.frame_request_ahead_us(1_000_000), 3200);

        let config = Config {
            csl_request_ahead_us: 0,
            ..Default::default()
        };
        assert_eq!(config.frame_request_ahead_us(0), 0);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: Config = serde_json::from_str(r#"{"max_csl_triggered_tx_attempts": 2}"#).unwrap();
        assert_eq!(
            config,
            Config {
                max_csl_triggered_tx_attempts: 2,
                ..Default::default()
            }
        );
        assert_eq!(serde_json::from_str::<Config>("{}").unwrap(), Config::default());
    }
}
