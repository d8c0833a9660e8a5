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

//! Scheduler for indirect transmissions to children using coordinated sampled listening (CSL)
//!
//! A CSL child only listens during short periodic windows. The scheduler picks the child whose
//! window comes next, asks the transmission layer to request the frame in time, adjusts the frame
//! so it hits the window and keeps track of retries.
//!
//! All entry points must be called from the same context and run to completion.

#![cfg_attr(not(test), no_std)]

use csl_api::*;

mod config;
mod event_log;
mod frame_request;
mod scheduler;
mod sent_frame;
mod states;
mod timing;

#[cfg(test)]
mod mock;

pub use crate::{
    config::Config,
    scheduler::CslTxScheduler,
    states::State,
    timing::{next_csl_tx_window, CslTxWindow},
};

#[cfg(feature = "defmt")]
#[allow(unused_imports)]
use defmt::{debug, error, info, warn};

#[cfg(not(feature = "defmt"))]
#[allow(unused_imports)]
use log::{debug, error, info, warn};

/// Longest frame on the bus is 127 bytes plus some metadata
const FRAME_BYTES_ON_BUS: u64 = 150;
const US_PER_S: u64 = 1_000_000;
const US_PER_MS: u32 = 1000;

/// Time needed to shift the longest frame over the bus, rounded up.
fn bus_tx_time_us(bus_speed_hz: u32) -> u32 {
    if bus_speed_hz == 0 {
        return 0;
    }
    (FRAME_BYTES_ON_BUS * 8 * US_PER_S).div_ceil(bus_speed_hz as u64) as u32
}

/// Wraps defmt::write and returns Ok() to make it behave like core::write!.
#[cfg(feature = "defmt")]
#[macro_export]
macro_rules! defmt_write_wrapper {
    ($($arg:expr),*) => {{
        defmt::write!($($arg),*);
        Ok(())
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_tx_time() {
        assert_eq!(bus_tx_time_us(0), 0);
        // 1200 bits at 1 MHz
        assert_eq!(bus_tx_time_us(1_000_000), 1200);
        // rounded up
        assert_eq!(bus_tx_time_us(7_000_000), 172);
    }
}
