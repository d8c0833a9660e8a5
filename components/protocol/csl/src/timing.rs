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

use crate::*;

/// Next receive window of a CSL child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CslTxWindow {
    /// Radio time the window opens
    pub start: TimeUs,
    /// Time from now until the window opens
    pub delay: u32,
    /// Time from the child's last rx timestamp until the window opens
    pub delay_from_last_rx: u32,
}

/// Find the first window of the child that opens at or after `radio_now + request_ahead_us`.
///
/// Windows repeat every period, starting at `last_rx_timestamp + phase`. The result is the same as
/// stepping through the windows period by period but takes a single division no matter how long
/// ago the child was last heard.
///
/// Panics if the child has no CSL period.
pub fn next_csl_tx_window(csl: &CslInfo, radio_now: TimeUs, request_ahead_us: u32) -> CslTxWindow {
    let period = csl.period_us();
    assert!(period > 0, "CSL period not set");

    let first_window = csl.last_rx_timestamp.wrapping_add(csl.phase_us());
    let earliest = radio_now.wrapping_add(request_ahead_us as TimeUs);

    let mut start = (earliest - earliest % period).wrapping_add(first_window % period);
    if start < earliest {
        start = start.wrapping_add(period);
    }

    CslTxWindow {
        start,
        delay: start.wrapping_sub(radio_now) as u32,
        delay_from_last_rx: start.wrapping_sub(csl.last_rx_timestamp) as u32,
    }
}
