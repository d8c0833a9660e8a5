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

//! Macros for generating parseable event log messages
//!
//! Format: `$<radio time>;<child rloc16>;<kind>;<json content>`

use crate::*;

#[macro_export]
macro_rules! event_log {
    ($radio_time:expr,$rloc16:expr,$kind:expr,$content:expr) => {
        info!("${};{:x};{};{}", $radio_time, $rloc16, $kind, $content);
    };
}

#[macro_export]
macro_rules! event_log_schedule {
    ($radio_time:expr,$rloc16:expr,$delay_us:expr) => {
        info!(
            "${};{:x};schedule;{{\"delay_us\":{}}}",
            $radio_time, $rloc16, $delay_us
        );
    };
}

#[macro_export]
macro_rules! event_log_frame_request {
    ($radio_time:expr,$rloc16:expr,$channel:expr,$is_retransmission:expr,$tx_delay:expr) => {
        info!(
            "${};{:x};frame_request;{{\"channel\":{},\"retransmission\":{},\"tx_delay_us\":{}}}",
            $radio_time, $rloc16, $channel, $is_retransmission, $tx_delay
        );
    };
}

#[macro_export]
macro_rules! event_log_sent {
    ($radio_time:expr,$rloc16:expr,$result:expr) => {
        event_log!(
            $radio_time,
            $rloc16,
            "sent",
            $crate::event_log::DisplayableTxResult($result)
        );
    };
}

#[macro_export]
macro_rules! event_log_clear {
    ($radio_time:expr) => {
        info!("${};-;clear;{{}}", $radio_time);
    };
}

pub(crate) struct DisplayableTxResult<'a>(pub(crate) &'a Result<(), Error>);

/// result as JSON to make it parseable
macro_rules! tx_result_to_json_string {
    ($fmt:expr,$write:tt,$result:expr) => {
        match $result {
            Ok(()) => $write!($fmt, "{{\"result\":\"success\"}}"),
            Err(error) => $write!($fmt, "{{\"result\":\"{}\"}}", error),
        }
    };
}

impl core::fmt::Display for DisplayableTxResult<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        tx_result_to_json_string!(f, write, self.0)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DisplayableTxResult<'_> {
    fn format(&self, fmt: defmt::Formatter) {
        fn wrapper(result: &Result<(), Error>, fmt: defmt::Formatter) -> core::fmt::Result {
            tx_result_to_json_string!(fmt, defmt_write_wrapper, result)
        }
        let _ = wrapper(self.0, fmt);
    }
}
