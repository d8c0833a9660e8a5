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

//! Collaborators for testing the scheduler

use crate::*;

pub(crate) type TestChildren = Children<8>;

#[derive(Debug, Default)]
pub(crate) struct MockRadio {
    pub(crate) now: TimeUs,
    pub(crate) bus_speed: u32,
    /// Delays of all transmission requests in ms
    pub(crate) requests: Vec<u32>,
}

impl MockRadio {
    pub(crate) const PAN_CHANNEL: Channel = 11;

    pub(crate) fn new(now: TimeUs) -> Self {
        Self {
            now,
            ..Default::default()
        }
    }
}

impl Radio for MockRadio {
    fn now(&self) -> TimeUs {
        self.now
    }

    fn bus_speed(&self) -> u32 {
        self.bus_speed
    }

    fn pan_channel(&self) -> Channel {
        Self::PAN_CHANNEL
    }

    fn request_csl_frame_transmission(&mut self, delay_ms: u32) {
        self.requests.push(delay_ms);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MockFrame {
    pub(crate) empty: bool,
    pub(crate) sequence: u8,
    pub(crate) security_enabled: bool,
    pub(crate) frame_counter: u32,
    pub(crate) key_id: u8,
    pub(crate) is_a_retransmission: bool,
    pub(crate) channel: Channel,
    pub(crate) tx_delay: u32,
    pub(crate) tx_delay_base_time: u32,
    pub(crate) csma_ca_enabled: bool,
}

impl Default for MockFrame {
    fn default() -> Self {
        Self {
            empty: true,
            sequence: 0,
            security_enabled: false,
            frame_counter: 0,
            key_id: 0,
            is_a_retransmission: false,
            channel: 0,
            tx_delay: 0,
            tx_delay_base_time: 0,
            csma_ca_enabled: true,
        }
    }
}

impl TxFrame for MockFrame {
    fn is_empty(&self) -> bool {
        self.empty
    }

    fn sequence(&self) -> u8 {
        self.sequence
    }

    fn set_sequence(&mut self, sequence: u8) {
        self.sequence = sequence;
    }

    fn security_enabled(&self) -> bool {
        self.security_enabled
    }

    fn frame_counter(&self) -> Result<u32, Error> {
        match self.security_enabled {
            true => Ok(self.frame_counter),
            false => Err(Error::Security),
        }
    }

    fn set_frame_counter(&mut self, frame_counter: u32) {
        self.frame_counter = frame_counter;
    }

    fn key_id(&self) -> Result<u8, Error> {
        match self.security_enabled {
            true => Ok(self.key_id),
            false => Err(Error::Security),
        }
    }

    fn set_key_id(&mut self, key_id: u8) {
        self.key_id = key_id;
    }

    fn set_is_a_retransmission(&mut self, is_a_retransmission: bool) {
        self.is_a_retransmission = is_a_retransmission;
    }

    fn set_channel(&mut self, channel: Channel) {
        self.channel = channel;
    }

    fn set_tx_delay(&mut self, delay: u32) {
        self.tx_delay = delay;
    }

    fn set_tx_delay_base_time(&mut self, base_time: u32) {
        self.tx_delay_base_time = base_time;
    }

    fn set_csma_ca_enabled(&mut self, enabled: bool) {
        self.csma_ca_enabled = enabled;
    }
}

#[derive(Debug)]
pub(crate) struct MockIndirectSender {
    pub(crate) prepare_result: Result<(), Error>,
    pub(crate) security_enabled: bool,
    /// Simulate the message being removed while the frame is prepared
    pub(crate) remove_message_on_prepare: bool,
    /// Simulate the child losing its CSL parameters while the frame is prepared
    pub(crate) clear_period_on_prepare: bool,
    pub(crate) prepared: Vec<Rloc16>,
    pub(crate) sent: Vec<(Rloc16, Result<(), Error>)>,
}

impl MockIndirectSender {
    pub(crate) const SEQUENCE: u8 = 10;
    pub(crate) const FRAME_COUNTER: u32 = 100;
    pub(crate) const KEY_ID: u8 = 1;
}

impl Default for MockIndirectSender {
    fn default() -> Self {
        Self {
            prepare_result: Ok(()),
            security_enabled: true,
            remove_message_on_prepare: false,
            clear_period_on_prepare: false,
            prepared: Vec::new(),
            sent: Vec::new(),
        }
    }
}

impl IndirectSender<MockFrame> for MockIndirectSender {
    fn prepare_frame_for_child(
        &mut self,
        frame: &mut MockFrame,
        _context: &mut FrameContext,
        child: &mut Child,
    ) -> Result<(), Error> {
        self.prepare_result?;
        self.prepared.push(child.rloc16);

        if self.remove_message_on_prepare {
            child.indirect.message = None;
            child.indirect.message_count = 0;
        }
        if self.clear_period_on_prepare {
            child.csl.period = 0;
        }

        *frame = MockFrame {
            empty: false,
            sequence: Self::SEQUENCE,
            security_enabled: self.security_enabled,
            frame_counter: Self::FRAME_COUNTER,
            key_id: Self::KEY_ID,
            ..Default::default()
        };
        Ok(())
    }

    fn handle_sent_frame_to_child(
        &mut self,
        _frame: &MockFrame,
        _context: &FrameContext,
        result: Result<(), Error>,
        child: &mut Child,
    ) {
        self.sent.push((child.rloc16, result));
    }
}

/// Scheduler with a lead time of 5 units and no bus delay
pub(crate) fn setup() -> (MockRadio, TestChildren, CslTxScheduler) {
    let radio = MockRadio::new(0);
    let config = Config {
        csl_request_ahead_us: 5 * US_PER_TEN_SYMBOLS,
        ..Default::default()
    };
    let scheduler = CslTxScheduler::new(config, &radio);
    (radio, Children::new(), scheduler)
}

/// Add synchronized child
pub(crate) fn add_child(
    children: &mut TestChildren,
    rloc16: Rloc16,
    period: u16,
    phase: u16,
    last_rx_timestamp: TimeUs,
) -> ChildIndex {
    let mut child = Child::new(rloc16);
    child.csl = CslInfo {
        synchronized: true,
        period,
        phase,
        last_rx_timestamp,
        ..Default::default()
    };
    children.add(child).unwrap()
}

pub(crate) fn queue_message(children: &mut TestChildren, index: ChildIndex, message: MessageId) {
    let child = children.get_mut(index).unwrap();
    child.indirect.message_count += 1;
    child.indirect.message.get_or_insert(message);
}
