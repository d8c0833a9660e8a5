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

use std::{
    collections::{BTreeMap, VecDeque},
    fmt,
    fs::File,
    io::{self, BufReader, BufWriter, Write},
};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use rand::RngCore;
use serde::Serialize;

use csl::Config;
use csl_api::*;

pub const PAN_CHANNEL: Channel = 11;
/// A child receives frames that start this close to one of its windows
pub const CSL_RX_GUARD_US: i64 = 400;
/// Air time of the frame plus waiting for the ack
pub const TX_DURATION_US: TimeUs = 4_500;
pub const CSL_TIMEOUT_S: u32 = 100;
pub const US_PER_MS: TimeUs = 1000;

/// Frame as the transmission layer sees it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimFrame {
    /// `None` if the frame was never filled
    pub destination: Option<Rloc16>,
    pub message: MessageId,
    pub sequence: u8,
    pub security_enabled: bool,
    pub frame_counter: u32,
    pub key_id: u8,
    pub is_a_retransmission: bool,
    pub channel: Channel,
    pub tx_delay: u32,
    pub tx_delay_base_time: u32,
    pub csma_ca_enabled: bool,
}

impl TxFrame for SimFrame {
    fn is_empty(&self) -> bool {
        self.destination.is_none()
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
pub struct SimRadio {
    pub now: TimeUs,
    bus_speed: u32,
    /// Delay of the last frame request in ms, until the event loop picks it up
    pending_request: Option<u32>,
}

impl SimRadio {
    pub fn new(bus_speed: u32) -> Self {
        Self {
            now: 0,
            bus_speed,
            pending_request: None,
        }
    }

    pub fn take_request(&mut self) -> Option<u32> {
        self.pending_request.take()
    }

    /// Radio time at which `frame` goes on air.
    ///
    /// The delay base time only holds the lower 32 bits, the upper ones are taken from the
    /// current time.
    pub fn tx_time(&self, frame: &SimFrame) -> TimeUs {
        let mut base_time = (self.now & !(u32::MAX as TimeUs)) | frame.tx_delay_base_time as TimeUs;
        if base_time > self.now {
            base_time = base_time.wrapping_sub(1 << 32);
        }
        base_time + frame.tx_delay as TimeUs
    }
}

impl Radio for SimRadio {
    fn now(&self) -> TimeUs {
        self.now
    }

    fn bus_speed(&self) -> u32 {
        self.bus_speed
    }

    fn pan_channel(&self) -> Channel {
        PAN_CHANNEL
    }

    fn request_csl_frame_transmission(&mut self, delay_ms: u32) {
        trace!("CSL frame requested in {}ms", delay_ms);
        self.pending_request = Some(delay_ms);
    }
}

/// Receiving side of a CSL child
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SimChild {
    pub rloc16: Rloc16,
    /// In units of ten symbols
    pub period: u16,
    /// 0 for the PAN channel
    pub channel: Channel,
    /// Deviation of the child's clock from the parent's
    pub drift_ppm: i32,
    /// Radio time of one of the child's receive windows
    pub window_origin: TimeUs,
}

impl SimChild {
    /// Window period measured with the parent's clock
    fn actual_period_us(&self) -> i64 {
        let period = self.period as i64 * US_PER_TEN_SYMBOLS as i64;
        period + period * self.drift_ppm as i64 / 1_000_000
    }

    /// Start of the last receive window at or before `time`
    fn previous_window(&self, time: TimeUs) -> i64 {
        let period = self.actual_period_us();
        let origin = self.window_origin as i64;
        origin + (time as i64 - origin).div_euclid(period) * period
    }

    pub fn listening_channel(&self) -> Channel {
        match self.channel {
            0 => PAN_CHANNEL,
            channel => channel,
        }
    }

    pub fn is_listening(&self, time: TimeUs, channel: Channel) -> bool {
        if channel != self.listening_channel() {
            return false;
        }
        let previous = self.previous_window(time);
        let next = previous + self.actual_period_us();
        let time = time as i64;
        time - previous <= CSL_RX_GUARD_US || next - time <= CSL_RX_GUARD_US
    }

    /// CSL parameters the parent learns from a frame of the child received at `time`.
    ///
    /// The phase is truncated to ten symbols so the parent expects the window slightly early.
    pub fn csl_info(&self, time: TimeUs) -> CslInfo {
        let next = self.previous_window(time) + self.actual_period_us();
        let phase = (next - time as i64) / US_PER_TEN_SYMBOLS as i64;
        CslInfo {
            synchronized: true,
            period: self.period,
            phase: phase as u16,
            channel: self.channel,
            timeout: CSL_TIMEOUT_S,
            last_heard: time / US_PER_MS,
            last_rx_timestamp: time,
            tx_attempts: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub rloc16: Rloc16,
    pub message: MessageId,
}

/// Indirect message queues of all children
#[derive(Debug, Default)]
pub struct SimIndirectSender {
    queues: BTreeMap<Rloc16, VecDeque<MessageId>>,
    next_message: MessageId,
    next_sequence: u8,
    frame_counter: u32,
    pub delivered: Vec<Delivery>,
}

impl SimIndirectSender {
    pub const KEY_ID: u8 = 1;

    pub fn enqueue(&mut self, child: &mut Child) -> MessageId {
        let message = self.next_message;
        self.next_message = self.next_message.wrapping_add(1);
        self.queues.entry(child.rloc16).or_default().push_back(message);
        child.indirect.message_count += 1;
        child.indirect.message.get_or_insert(message);
        message
    }

    /// Number of messages not delivered yet
    pub fn queued(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    /// Drop the current message of every child the scheduler gave up on, returns the number of
    /// dropped messages
    pub fn drop_undeliverable(&mut self, children: &mut impl ChildTable, max_attempts: u8) -> usize {
        let mut dropped = 0;
        for (_, child) in children.iter_mut() {
            if child.csl.tx_attempts < max_attempts {
                continue;
            }
            let queue = self.queues.entry(child.rloc16).or_default();
            if let Some(message) = queue.pop_front() {
                warn!("dropping message {} for child {:x}", message, child.rloc16);
                dropped += 1;
            }
            child.indirect.message_count = queue.len() as u16;
            child.indirect.message = queue.front().copied();
            child.indirect.tx_attempts = 0;
            child.csl.tx_attempts = 0;
        }
        dropped
    }
}

impl IndirectSender<SimFrame> for SimIndirectSender {
    fn prepare_frame_for_child(
        &mut self,
        frame: &mut SimFrame,
        context: &mut FrameContext,
        child: &mut Child,
    ) -> Result<(), Error> {
        let message = self
            .queues
            .get(&child.rloc16)
            .and_then(VecDeque::front)
            .copied()
            .ok_or(Error::NotFound)?;

        *frame = SimFrame {
            destination: Some(child.rloc16),
            message,
            sequence: self.next_sequence,
            security_enabled: true,
            frame_counter: self.frame_counter,
            key_id: Self::KEY_ID,
            csma_ca_enabled: true,
            ..Default::default()
        };
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.frame_counter += 1;
        // every message fits into a single frame
        context.message_next_offset = 0;
        Ok(())
    }

    fn handle_sent_frame_to_child(
        &mut self,
        frame: &SimFrame,
        _context: &FrameContext,
        result: Result<(), Error>,
        child: &mut Child,
    ) {
        if result.is_err() {
            return;
        }
        let queue = self.queues.entry(child.rloc16).or_default();
        if queue.front() == Some(&frame.message) {
            queue.pop_front();
            info!("message {} delivered to child {:x}", frame.message, child.rloc16);
            self.delivered.push(Delivery {
                rloc16: child.rloc16,
                message: frame.message,
            });
        }
        child.indirect.message_count = queue.len() as u16;
        child.indirect.message = queue.front().copied();
    }
}

#[derive(Debug, Clone)]
pub struct SimParams {
    /// Probability of a lost frame or ack in parts per thousand
    pub packet_error_rate_ppt: u32,
    /// Probability of a busy channel in parts per thousand
    pub channel_access_failure_ppt: u32,
    /// Mean time between two messages for the same child
    pub message_interval_us: TimeUs,
    /// Time between two frames from a child that carry its CSL parameters
    pub resync_interval_us: TimeUs,
    pub bus_speed_hz: u32,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            packet_error_rate_ppt: 0,
            channel_access_failure_ppt: 5,
            message_interval_us: 2_000_000,
            resync_interval_us: 2_000_000,
            bus_speed_hz: 1_000_000,
        }
    }
}

#[derive(Debug)]
pub enum SimEvent {
    Enqueue(ChildIndex),
    /// Child sent a frame with a CSL IE, e.g. a data poll
    Resync(ChildIndex),
    Housekeeping,
    FrameRequest,
    TxDone {
        frame: SimFrame,
        result: Result<(), Error>,
    },
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct Report {
    pub enqueued: usize,
    pub queued: usize,
    pub dropped: usize,
    pub transmissions: usize,
    pub retransmissions: usize,
    /// Retransmissions that differ from the previous attempt in sequence number or frame counter
    pub retransmission_mismatches: usize,
    pub no_acks: usize,
    pub channel_access_failures: usize,
    pub aborted: usize,
    pub delivered: Vec<Delivery>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "messages enqueued:       {}", self.enqueued)?;
        writeln!(f, "messages delivered:      {}", self.delivered.len())?;
        writeln!(f, "messages dropped:        {}", self.dropped)?;
        writeln!(f, "messages still queued:   {}", self.queued)?;
        writeln!(f, "transmissions:           {}", self.transmissions)?;
        writeln!(f, "retransmissions:         {}", self.retransmissions)?;
        writeln!(f, "no acks:                 {}", self.no_acks)?;
        writeln!(f, "channel access failures: {}", self.channel_access_failures)?;
        write!(f, "aborted frame requests:  {}", self.aborted)
    }
}

/// Decide whether the frame sent at `tx_time` reaches the child
pub fn transmit(
    frame: &SimFrame,
    tx_time: TimeUs,
    child: Option<&SimChild>,
    params: &SimParams,
    mut rng: impl RngCore,
) -> Result<(), Error> {
    if rng.next_u32() % 1000 < params.channel_access_failure_ppt {
        warn!("channel access failure simulation: channel busy");
        return Err(Error::ChannelAccessFailure);
    }

    let Some(child) = child else {
        return Err(Error::NoAck);
    };

    if !child.is_listening(tx_time, frame.channel) {
        warn!(
            "child {:x} not listening on channel {} at {}us",
            child.rloc16, frame.channel, tx_time
        );
        return Err(Error::NoAck);
    }

    if rng.next_u32() % 1000 < params.packet_error_rate_ppt {
        warn!("packet error simulation: dropping frame");
        return Err(Error::NoAck);
    }

    Ok(())
}

#[derive(Serialize)]
struct SimMetadata<'a> {
    config: &'a Config,
    packet_error_rate_ppt: u32,
    channel_access_failure_ppt: u32,
    children: &'a [SimChild],
}

pub fn write_metadata_to_file(
    children: &[SimChild],
    config: &Config,
    params: &SimParams,
    file_path: &str,
) -> io::Result<()> {
    let metadata = SimMetadata {
        config,
        packet_error_rate_ppt: params.packet_error_rate_ppt,
        channel_access_failure_ppt: params.channel_access_failure_ppt,
        children,
    };
    let mut meta_file = BufWriter::new(File::create(file_path)?);
    serde_json::to_writer_pretty(&mut meta_file, &metadata)?;
    writeln!(meta_file)?;
    meta_file.flush()
}

/// Scheduler configuration from a JSON file, missing fields keep their default
pub fn read_config_from_file(file_path: &str) -> io::Result<Config> {
    let config_file = BufReader::new(File::open(file_path)?);
    Ok(serde_json::from_reader(config_file)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(drift_ppm: i32) -> SimChild {
        SimChild {
            rloc16: 0x401,
            period: 3125,
            channel: 0,
            drift_ppm,
            window_origin: 1000,
        }
    }

    #[test]
    fn tx_time_from_lower_bits() {
        let mut radio = SimRadio::new(0);
        let frame = SimFrame {
            tx_delay_base_time: 0xffff_ff00,
            tx_delay: 0x200,
            ..Default::default()
        };

        radio.now = 0xffff_ff80;
        assert_eq!(radio.tx_time(&frame), 0x1_0000_0100);

        // upper bits of now already moved on
        radio.now = 0x1_0000_0050;
        assert_eq!(radio.tx_time(&frame), 0x1_0000_0100);
    }

    #[test]
    fn listening() {
        let child = child(0);
        assert!(child.is_listening(1000, PAN_CHANNEL));
        assert!(child.is_listening(1000 + 500_000 * 3 + 300, PAN_CHANNEL));
        assert!(child.is_listening(1000 + 500_000 - 300, PAN_CHANNEL));
        assert!(!child.is_listening(1000 + 1000, PAN_CHANNEL));
        assert!(!child.is_listening(1000, PAN_CHANNEL + 1));
    }

    #[test]
    fn csl_info_points_to_window() {
        let child = child(0);
        let csl = child.csl_info(123_456);
        let window = csl.last_rx_timestamp + csl.phase_us();
        assert!(child.is_listening(window, PAN_CHANNEL));
        assert!(window <= 501_000);
        assert!(501_000 - window < US_PER_TEN_SYMBOLS as TimeUs);
    }

    #[test]
    fn metadata_and_config_files() {
        let dir = std::env::temp_dir();
        let meta_path = dir.join("csl_sim_meta_test.json");
        let meta_path = meta_path.to_str().unwrap();
        let config = Config {
            max_csl_triggered_tx_attempts: 7,
            ..Default::default()
        };
        write_metadata_to_file(&[child(-3)], &config, &SimParams::default(), meta_path).unwrap();

        let metadata: serde_json::Value =
            serde_json::from_reader(File::open(meta_path).unwrap()).unwrap();
        assert_eq!(metadata["config"]["max_csl_triggered_tx_attempts"], 7);
        assert_eq!(metadata["children"][0]["rloc16"], 0x401);
        assert_eq!(metadata["children"][0]["drift_ppm"], -3);

        let config_path = dir.join("csl_sim_config_test.json");
        let config_path = config_path.to_str().unwrap();
        std::fs::write(config_path, "{\"csl_request_ahead_us\": 500}").unwrap();
        assert_eq!(
            read_config_from_file(config_path).unwrap(),
            Config {
                csl_request_ahead_us: 500,
                ..Default::default()
            }
        );

        std::fs::write(config_path, "{\"csl_request_ahead_us\": -1}").unwrap();
        assert!(read_config_from_file(config_path).is_err());
    }

    #[test]
    fn drift() {
        let child = child(20);
        // 10us per period
        assert!(child.is_listening(1000 + 100 * 500_010, PAN_CHANNEL));
        assert!(!child.is_listening(1000 + 100 * 500_000, PAN_CHANNEL));
    }
}
