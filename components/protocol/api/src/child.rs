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

/// Child entry of the neighbor table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Child {
    pub rloc16: Rloc16,
    pub csl: CslInfo,
    pub indirect: IndirectInfo,
}

/// Coordinated sampled listening parameters of a child
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CslInfo {
    /// Whether `period` and `phase` can be trusted
    pub synchronized: bool,
    /// Interval between two receive windows in units of ten symbols, 0 if not set
    pub period: u16,
    /// Offset of the receive window relative to `last_rx_timestamp` in units of ten symbols
    pub phase: u16,
    /// Channel the child listens on, 0 for the PAN channel
    pub channel: Channel,
    /// Synchronized timeout in seconds
    pub timeout: u32,
    pub last_heard: TimeMs,
    /// Radio time of the last frame received from the child that carried a CSL IE
    pub last_rx_timestamp: TimeUs,
    /// Consecutive CSL transmissions that failed
    pub tx_attempts: u8,
}

impl CslInfo {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn period_us(&self) -> u64 {
        self.period as u64 * US_PER_TEN_SYMBOLS as u64
    }

    pub fn phase_us(&self) -> u64 {
        self.phase as u64 * US_PER_TEN_SYMBOLS as u64
    }
}

/// Indirect transmission state of a child
///
/// The sequence number, frame counter and key id of the last attempt are kept so a retransmission
/// is identical to the first attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IndirectInfo {
    /// Message currently being sent to the child
    pub message: Option<MessageId>,
    pub message_count: u16,
    pub tx_attempts: u8,
    pub data_sequence_number: u8,
    pub frame_counter: u32,
    pub key_id: u8,
}

impl Child {
    pub fn new(rloc16: Rloc16) -> Self {
        Self {
            rloc16,
            ..Default::default()
        }
    }

    pub fn has_indirect_message(&self) -> bool {
        self.indirect.message_count > 0
    }
}
