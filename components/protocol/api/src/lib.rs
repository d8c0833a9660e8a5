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

//! Interfaces between the CSL transmit scheduler and the parts of the stack it talks to

#![cfg_attr(not(test), no_std)]

mod child;
mod child_table;
mod error;

pub use crate::{
    child::{Child, CslInfo, IndirectInfo},
    child_table::Children,
    error::Error,
};

#[cfg(feature = "defmt")]
#[allow(unused_imports)]
use defmt::{debug, error, info, warn};

#[cfg(not(feature = "defmt"))]
#[allow(unused_imports)]
use log::{debug, error, info, warn};

/// Radio time in microseconds
pub type TimeUs = u64;
/// Time in milliseconds
pub type TimeMs = u64;
/// IEEE 802.15.4 channel number
pub type Channel = u8;
/// Short address of a child
pub type Rloc16 = u16;
/// Handle of a message in the indirect message queue
pub type MessageId = u16;
/// Stable handle of an entry in a [`ChildTable`]
pub type ChildIndex = usize;

/// Duration of ten symbols on the 2.4 GHz O-QPSK PHY, the unit of CSL period and phase.
pub const US_PER_TEN_SYMBOLS: u32 = 160;

/// State carried from the frame request to the sent frame callback.
///
/// Owned by the scheduler, only interpreted by the [`IndirectSender`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameContext {
    /// Offset into the message where the next fragment starts
    pub message_next_offset: u16,
}

/// MAC frame handed out by the transmission layer
pub trait TxFrame {
    /// Whether the frame has no content (e.g. preparation failed)
    fn is_empty(&self) -> bool;

    fn sequence(&self) -> u8;

    fn set_sequence(&mut self, sequence: u8);

    fn security_enabled(&self) -> bool;

    /// Fails if the frame carries no auxiliary security header
    fn frame_counter(&self) -> Result<u32, Error>;

    fn set_frame_counter(&mut self, frame_counter: u32);

    /// Fails if the frame carries no auxiliary security header
    fn key_id(&self) -> Result<u8, Error>;

    fn set_key_id(&mut self, key_id: u8);

    fn set_is_a_retransmission(&mut self, is_a_retransmission: bool);

    fn set_channel(&mut self, channel: Channel);

    /// Delay relative to the delay base time after which the frame is sent
    fn set_tx_delay(&mut self, delay: u32);

    /// Lower 32 bits of the radio time the transmit delay refers to
    fn set_tx_delay_base_time(&mut self, base_time: u32);

    fn set_csma_ca_enabled(&mut self, enabled: bool);
}

/// Transmission layer and radio platform
pub trait Radio {
    /// Current radio time
    fn now(&self) -> TimeUs;

    /// Speed of the bus between host and radio in Hz, 0 if unknown
    fn bus_speed(&self) -> u32;

    fn pan_channel(&self) -> Channel;

    /// Ask the transmission layer to request a CSL frame after `delay_ms`.
    ///
    /// A new request replaces a pending one.
    fn request_csl_frame_transmission(&mut self, delay_ms: u32);
}

/// Neighbor table holding the children
pub trait ChildTable {
    /// Iterate over all valid children in a fixed order
    fn iter(&self) -> impl Iterator<Item = (ChildIndex, &Child)>;

    fn iter_mut(&mut self) -> impl Iterator<Item = (ChildIndex, &mut Child)>;

    /// Returns `None` if the entry was removed
    fn get(&self, index: ChildIndex) -> Option<&Child>;

    fn get_mut(&mut self, index: ChildIndex) -> Option<&mut Child>;
}

/// Owner of the indirect message queues
pub trait IndirectSender<F: TxFrame> {
    /// Fill `frame` with the content of the child's current indirect message
    fn prepare_frame_for_child(
        &mut self,
        frame: &mut F,
        context: &mut FrameContext,
        child: &mut Child,
    ) -> Result<(), Error>;

    /// Final outcome of a frame sent to `child`
    fn handle_sent_frame_to_child(
        &mut self,
        frame: &F,
        context: &FrameContext,
        result: Result<(), Error>,
        child: &mut Child,
    );
}
