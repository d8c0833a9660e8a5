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

#[derive(Debug)]
pub struct CslTxScheduler {
    pub(crate) config: Config,
    /// Lead time including bus transfer, see [`Config::csl_request_ahead_us`]
    pub(crate) frame_request_ahead_us: u32,
    /// Child the next CSL transmission is for
    pub(crate) tx_child: Option<ChildIndex>,
    /// Message the transmission layer is currently sending to `tx_child`
    pub(crate) tx_message: Option<MessageId>,
    pub(crate) frame_context: FrameContext,
}

impl CslTxScheduler {
    pub fn new(config: Config, radio: &impl Radio) -> Self {
        let frame_request_ahead_us = config.frame_request_ahead_us(radio.bus_speed());
        debug!("CSL frame request ahead: {}us", frame_request_ahead_us);
        Self {
            config,
            frame_request_ahead_us,
            tx_child: None,
            tx_message: None,
            frame_context: FrameContext::default(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn frame_request_ahead_us(&self) -> u32 {
        self.frame_request_ahead_us
    }

    pub fn state(&self) -> State {
        State::from_parts(self.tx_child, self.tx_message)
    }

    pub fn frame_context(&self) -> &FrameContext {
        &self.frame_context
    }

    /// Next window of `child` as seen from `radio_now`
    pub fn next_csl_transmission(&self, child: &Child, radio_now: TimeUs) -> CslTxWindow {
        next_csl_tx_window(&child.csl, radio_now, self.frame_request_ahead_us)
    }

    /// Reevaluate the schedule after something changed.
    ///
    /// Must be called when a message for a CSL child is queued or removed and when the CSL
    /// parameters of a child change.
    pub fn update(&mut self, radio: &mut impl Radio, children: &impl ChildTable) {
        if self.tx_message.is_none() {
            self.reschedule_csl_tx(radio, children);
            return;
        }

        if let Some(index) = self.tx_child {
            let message = children.get(index).and_then(|child| child.indirect.message);
            if message != self.tx_message {
                // transmission already started, wait for the sent frame callback to reschedule
                debug!("message of child in flight changed, waiting for tx done");
                self.tx_child = None;
                self.frame_context.message_next_offset = 0;
            }
        }
    }

    /// Reset the CSL state of all children and return to idle
    pub fn clear(&mut self, radio: &impl Radio, children: &mut impl ChildTable) {
        for (_, child) in children.iter_mut() {
            child.csl.reset();
        }
        self.frame_context = FrameContext::default();
        self.tx_child = None;
        self.tx_message = None;
        event_log_clear!(radio.now());
    }

    /// Select the child with the closest window and request the transmission from the radio.
    ///
    /// Must not be called while the transmission layer is already sending (i.e. `tx_message` is
    /// set). Returns the selected child.
    pub fn reschedule_csl_tx(
        &mut self,
        radio: &mut impl Radio,
        children: &impl ChildTable,
    ) -> Option<ChildIndex> {
        let radio_now = radio.now();

        let best = children
            .iter()
            .filter(|(_, child)| self.is_schedulable(child))
            .map(|(index, child)| {
                let window = self.next_csl_transmission(child, radio_now);
                (index, child.rloc16, window.delay)
            })
            .fold(None, |best, candidate| match best {
                // first child wins on equal delay
                Some((_, _, min_delay)) if min_delay <= candidate.2 => best,
                _ => Some(candidate),
            });

        self.tx_child = best.map(|(index, rloc16, delay)| {
            event_log_schedule!(radio_now, rloc16, delay);
            // frame is requested the lead time before the window
            let request_delay = delay.saturating_sub(self.frame_request_ahead_us);
            radio.request_csl_frame_transmission(request_delay / US_PER_MS);
            index
        });
        self.tx_child
    }

    fn is_schedulable(&self, child: &Child) -> bool {
        child.csl.synchronized
            && child.csl.period > 0
            && child.has_indirect_message()
            && child.csl.tx_attempts < self.config.max_csl_triggered_tx_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::*;

    #[test]
    fn request_ahead_from_bus_speed() {
        let mut radio = MockRadio::new(0);
        radio.bus_speed = 1_000_000;
        let scheduler = CslTxScheduler::new(Config::default(), &radio);
        assert_eq!(scheduler.frame_request_ahead_us(), 3200);
        assert!(scheduler.state().is_idle());
    }

    #[test]
    fn selects_closest_window() {
        let (mut radio, mut children, mut scheduler) = setup();
        let a = add_child(&mut children, 0x401, 100, 10, 0);
        let b = add_child(&mut children, 0x402, 100, 50, 0);
        queue_message(&mut children, b, 1);
        queue_message(&mut children, a, 2);

        scheduler.update(&mut radio, &children);

        assert_eq!(scheduler.state(), State::Selected { child: a });
        // window in 1600us minus 800us lead time
        assert_eq!(radio.requests, [0]);
    }

    #[test]
    fn first_child_wins_tie() {
        let (mut radio, mut children, mut scheduler) = setup();
        let a = add_child(&mut children, 0x401, 100, 10, 0);
        let b = add_child(&mut children, 0x402, 100, 10, 0);
        let c = add_child(&mut children, 0x403, 50, 10, 0);
        for (index, message) in [(a, 1), (b, 2), (c, 3)] {
            queue_message(&mut children, index, message);
        }

        assert_eq!(scheduler.reschedule_csl_tx(&mut radio, &children), Some(a));

        // removing the first child makes the next one in order win
        children.remove(a);
        assert_eq!(scheduler.reschedule_csl_tx(&mut radio, &children), Some(b));
    }

    #[test]
    fn skips_unschedulable_children() {
        let (mut radio, mut children, mut scheduler) = setup();
        // no message
        add_child(&mut children, 0x401, 100, 1, 0);
        // not synchronized
        let b = add_child(&mut children, 0x402, 100, 2, 0);
        queue_message(&mut children, b, 1);
        children.get_mut(b).unwrap().csl.synchronized = false;
        // no period
        let c = add_child(&mut children, 0x403, 0, 3, 0);
        queue_message(&mut children, c, 2);
        // farthest window but schedulable
        let d = add_child(&mut children, 0x404, 100, 90, 0);
        queue_message(&mut children, d, 3);

        assert_eq!(scheduler.reschedule_csl_tx(&mut radio, &children), Some(d));
        assert_eq!(radio.requests.len(), 1);
    }

    #[test]
    fn max_attempts_reached() {
        let (mut radio, mut children, mut scheduler) = setup();
        let c = add_child(&mut children, 0x401, 100, 10, 0);
        queue_message(&mut children, c, 1);
        children.get_mut(c).unwrap().csl.tx_attempts =
            scheduler.config().max_csl_triggered_tx_attempts;

        assert_eq!(scheduler.reschedule_csl_tx(&mut radio, &children), None);
        assert!(scheduler.state().is_idle());
        assert!(radio.requests.is_empty());

        children.get_mut(c).unwrap().csl.tx_attempts -= 1;
        assert_eq!(scheduler.reschedule_csl_tx(&mut radio, &children), Some(c));
    }

    #[test]
    fn delay_converted_to_ms() {
        let (mut radio, mut children, mut scheduler) = setup();
        radio.now = 1_000;
        // window at 625 * 160us = 100ms, requested 800us ahead
        let a = add_child(&mut children, 0x401, 3125, 625, 0);
        queue_message(&mut children, a, 1);
        scheduler.update(&mut radio, &children);
        assert_eq!(radio.requests, [98]);
    }

    #[test]
    fn update_while_in_flight_keeps_selection() {
        let (mut radio, mut children, mut scheduler) = setup();
        let a = add_child(&mut children, 0x401, 100, 10, 0);
        let b = add_child(&mut children, 0x402, 100, 5, 0);
        queue_message(&mut children, a, 1);
        scheduler.update(&mut radio, &children);
        scheduler.tx_message = Some(1);

        // b has a closer window but a transmission is in flight
        queue_message(&mut children, b, 2);
        scheduler.update(&mut radio, &children);

        assert_eq!(
            scheduler.state(),
            State::InFlight {
                child: a,
                message: 1
            }
        );
        assert_eq!(radio.requests.len(), 1);
    }

    #[test]
    fn update_detects_changed_message() {
        let (mut radio, mut children, mut scheduler) = setup();
        let a = add_child(&mut children, 0x401, 100, 10, 0);
        queue_message(&mut children, a, 1);
        scheduler.update(&mut radio, &children);
        scheduler.tx_message = Some(1);
        scheduler.frame_context.message_next_offset = 42;

        children.get_mut(a).unwrap().indirect.message = Some(7);
        scheduler.update(&mut radio, &children);

        assert_eq!(
            scheduler.state(),
            State::WaitingForInFlightCompletion { message: 1 }
        );
        assert_eq!(scheduler.frame_context().message_next_offset, 0);

        // no reselection until the transmission is done
        scheduler.update(&mut radio, &children);
        assert_eq!(radio.requests.len(), 1);
    }

    #[test]
    fn update_detects_removed_child() {
        let (mut radio, mut children, mut scheduler) = setup();
        let a = add_child(&mut children, 0x401, 100, 10, 0);
        queue_message(&mut children, a, 1);
        scheduler.update(&mut radio, &children);
        scheduler.tx_message = Some(1);

        children.remove(a);
        scheduler.update(&mut radio, &children);

        assert_eq!(
            scheduler.state(),
            State::WaitingForInFlightCompletion { message: 1 }
        );
    }

    #[test]
    fn clear() {
        let (mut radio, mut children, mut scheduler) = setup();
        let a = add_child(&mut children, 0x401, 100, 10, 1234);
        let b = add_child(&mut children, 0x402, 200, 20, 5678);
        queue_message(&mut children, a, 1);
        queue_message(&mut children, b, 2);
        {
            let child = children.get_mut(a).unwrap();
            child.csl.tx_attempts = 2;
            child.csl.channel = 15;
            child.csl.timeout = 30;
            child.csl.last_heard = 99;
        }
        scheduler.update(&mut radio, &children);
        scheduler.tx_message = Some(1);
        scheduler.frame_context.message_next_offset = 12;

        scheduler.clear(&radio, &mut children);

        assert!(scheduler.state().is_idle());
        assert_eq!(*scheduler.frame_context(), FrameContext::default());
        for (_, child) in children.iter() {
            assert_eq!(child.csl, CslInfo::default());
        }
        // indirect state belongs to the indirect sender
        assert_eq!(children.get(a).unwrap().indirect.message, Some(1));

        // nothing synchronized anymore
        assert_eq!(scheduler.reschedule_csl_tx(&mut radio, &children), None);
    }
}
