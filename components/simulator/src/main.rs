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

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use rand::{RngCore, SeedableRng};
use std::{collections::BTreeMap, env, time::Duration};

use csl::{Config, CslTxScheduler};
use csl_api::{Child, ChildTable, Children, Error, Rloc16, TimeUs, US_PER_TEN_SYMBOLS};
use timer_queue::TimerQueue;

mod logger;
mod sim;

use crate::sim::*;

const MAX_CHILDREN: usize = 64;
/// 100ms, 200ms, 500ms and 1s in units of ten symbols
const CSL_PERIODS: [u16; 4] = [625, 1250, 3125, 6250];
const MAX_DRIFT_PPM: u32 = 20;
/// Short address of the first child of router 0x400
const FIRST_CHILD_RLOC16: Rloc16 = 0x401;
const HOUSEKEEPING_INTERVAL_US: TimeUs = 1_000_000;

const EVENT_FILE_PATH: &str = "/tmp/csl_events.csv";
const SIMULATION_METADATA_FILE_PATH: &str = "/tmp/csl_sim_meta.json";

type SimChildren = Children<MAX_CHILDREN>;

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut rng_seed: u64 = 0;
    let mut num_children: usize = 10;
    let mut simulation_ms: TimeUs = 60_000;
    let mut config = Config::default();
    let mut params = SimParams::default();

    for chunk in args[1..].chunks_exact(2) {
        let (arg, val) = (&chunk[0], &chunk[1]);
        match arg.as_str() {
            "--config" => {
                config = read_config_from_file(val).expect("invalid config file");
            }
            "--seed" => {
                rng_seed = val.parse().expect("invalid rng seed");
            }
            "--children" => {
                num_children = val.parse().expect("invalid number of children");
            }
            "--time_ms" => {
                simulation_ms = val.parse().expect("invalid simulation time");
            }
            "--per" => {
                params.packet_error_rate_ppt = val.parse().expect("invalid packet error rate");
            }
            "--max_attempts" => {
                config.max_csl_triggered_tx_attempts =
                    val.parse().expect("invalid number of attempts");
            }
            "--request_ahead_us" => {
                config.csl_request_ahead_us = val.parse().expect("invalid request ahead time");
            }
            _ => panic!("unknown argument: {}", arg),
        }
    }

    assert!(
        num_children <= MAX_CHILDREN,
        "can't have more than {MAX_CHILDREN} children"
    );

    let mut rng = get_rng(rng_seed);

    let children = random_children(num_children, &mut rng);

    write_metadata_to_file(&children, &config, &params, SIMULATION_METADATA_FILE_PATH).unwrap();

    if let Err(e) = logger::init(log::Level::Trace, Some(EVENT_FILE_PATH)) {
        panic!("{e}");
    }

    let report = run(children, config, &params, simulation_ms * US_PER_MS, rng);
    log::logger().flush();

    println!("{report}");
}

fn get_rng(rng_seed: u64) -> impl RngCore {
    println!("RNG seed: {rng_seed:#x}");
    rand_chacha::ChaCha8Rng::seed_from_u64(rng_seed)
}

fn random_children(num_children: usize, mut rng: impl RngCore) -> Vec<SimChild> {
    (0..num_children)
        .map(|i| {
            let period = CSL_PERIODS[rng.next_u32() as usize % CSL_PERIODS.len()];
            // most children stay on the PAN channel
            let channel = match rng.next_u32() % 4 {
                0 => 11 + (rng.next_u32() % 16) as u8,
                _ => 0,
            };
            SimChild {
                rloc16: FIRST_CHILD_RLOC16 + i as Rloc16,
                period,
                channel,
                drift_ppm: (rng.next_u32() % (2 * MAX_DRIFT_PPM + 1)) as i32 - MAX_DRIFT_PPM as i32,
                window_origin: rng.next_u64() % (period as TimeUs * US_PER_TEN_SYMBOLS as TimeUs),
            }
        })
        .collect()
}

/// Somewhere between half and one and a half `interval`
fn random_interval(interval: TimeUs, mut rng: impl RngCore) -> TimeUs {
    interval / 2 + rng.next_u64() % interval.max(1)
}

fn run(
    sim_children: Vec<SimChild>,
    config: Config,
    params: &SimParams,
    duration_us: TimeUs,
    mut rng: impl RngCore,
) -> Report {
    let mut radio = SimRadio::new(params.bus_speed_hz);
    let mut sender = SimIndirectSender::default();
    let mut report = Report::default();

    // table index is the index into `sim_children`
    let mut children = SimChildren::new();
    for sim_child in &sim_children {
        let mut child = Child::new(sim_child.rloc16);
        child.csl = sim_child.csl_info(0);
        children.add(child).expect("child table full");
    }

    let mut scheduler = CslTxScheduler::new(config, &radio);
    let max_attempts = scheduler.config().max_csl_triggered_tx_attempts;

    // sequence number and frame counter of the last attempt per child
    let mut last_attempts: BTreeMap<Rloc16, (u8, u32)> = BTreeMap::new();

    let mut events = TimerQueue::new();
    for index in 0..sim_children.len() {
        events.schedule(
            random_interval(params.message_interval_us, &mut rng),
            SimEvent::Enqueue(index),
        );
        events.schedule(
            random_interval(params.resync_interval_us, &mut rng),
            SimEvent::Resync(index),
        );
    }
    events.schedule(HOUSEKEEPING_INTERVAL_US, SimEvent::Housekeeping);

    while let Some((time, event)) = events.pop() {
        assert!(time >= radio.now, "bug: time cannot go backwards");
        if time > duration_us {
            break;
        }
        radio.now = time;
        debug!(
            "{:=^60}",
            format!(" {:>9?} ({}us) ", Duration::from_micros(time), time)
        );

        match event {
            SimEvent::Enqueue(index) => {
                if let Some(child) = children.get_mut(index) {
                    let message = sender.enqueue(child);
                    info!("message {} for child {:x} queued", message, child.rloc16);
                    report.enqueued += 1;
                }
                scheduler.update(&mut radio, &children);
                events.schedule(
                    time + random_interval(params.message_interval_us, &mut rng),
                    SimEvent::Enqueue(index),
                );
            }
            SimEvent::Resync(index) => {
                if let Some(child) = children.get_mut(index) {
                    let tx_attempts = child.csl.tx_attempts;
                    child.csl = sim_children[index].csl_info(time);
                    child.csl.tx_attempts = tx_attempts;
                    trace!("child {:x} resynchronized, phase {}", child.rloc16, child.csl.phase);
                }
                scheduler.update(&mut radio, &children);
                events.schedule(time + params.resync_interval_us, SimEvent::Resync(index));
            }
            SimEvent::Housekeeping => {
                report.dropped += sender.drop_undeliverable(&mut children, max_attempts);
                scheduler.update(&mut radio, &children);
                events.schedule(time + HOUSEKEEPING_INTERVAL_US, SimEvent::Housekeeping);
            }
            SimEvent::FrameRequest => {
                let mut frame = SimFrame::default();
                match scheduler.handle_frame_request(&mut frame, &radio, &mut children, &mut sender)
                {
                    Ok(()) => {
                        assert!(!frame.csma_ca_enabled, "bug: CSL frame with CSMA-CA");
                        let tx_time = radio.tx_time(&frame);
                        assert!(tx_time >= time, "bug: CSL window already passed");

                        let Some(rloc16) = frame.destination else {
                            unreachable!("bug: frame request succeeded with empty frame");
                        };
                        let attempt = (frame.sequence, frame.frame_counter);
                        if frame.is_a_retransmission {
                            report.retransmissions += 1;
                            if last_attempts.get(&rloc16) != Some(&attempt) {
                                error!("retransmission to child {:x} differs from last attempt", rloc16);
                                report.retransmission_mismatches += 1;
                            }
                        }
                        last_attempts.insert(rloc16, attempt);

                        let sim_child = sim_children.iter().find(|c| c.rloc16 == rloc16);
                        let result = transmit(&frame, tx_time, sim_child, params, &mut rng);
                        report.transmissions += 1;
                        events.schedule(tx_time + TX_DURATION_US, SimEvent::TxDone { frame, result });
                    }
                    Err(e) => {
                        warn!("CSL frame request failed: {}", e);
                        report.aborted += 1;
                        scheduler.handle_sent_frame(
                            &frame,
                            Err(Error::Aborted),
                            &mut radio,
                            &mut children,
                            &mut sender,
                        );
                    }
                }
            }
            SimEvent::TxDone { frame, result } => {
                match result {
                    Err(Error::NoAck) => report.no_acks += 1,
                    Err(Error::ChannelAccessFailure) => report.channel_access_failures += 1,
                    _ => {}
                }
                scheduler.handle_sent_frame(&frame, result, &mut radio, &mut children, &mut sender);
                if result.is_ok() {
                    // indirect sender moved on to the next message
                    scheduler.update(&mut radio, &children);
                }
            }
        }

        // a new request replaces the pending one
        if let Some(delay_ms) = radio.take_request() {
            events.cancel_unless(|event| !matches!(event, SimEvent::FrameRequest));
            events.schedule(time + delay_ms as TimeUs * US_PER_MS, SimEvent::FrameRequest);
        }
    }

    report.queued = sender.queued();
    report.delivered = sender.delivered;
    report
}
