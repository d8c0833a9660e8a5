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

impl CslTxScheduler {
    /// Handle the outcome of a CSL transmission.
    ///
    /// Failed transmissions are retried by scheduling again, only successful ones are reported to
    /// the indirect sender. `result` must be `Ok`, `NoAck`, `ChannelAccessFailure` or `Aborted`.
    pub fn handle_sent_frame<F: TxFrame>(
        &mut self,
        frame: &F,
        result: Result<(), Error>,
        radio: &mut impl Radio,
        children: &mut impl ChildTable,
        indirect_sender: &mut impl IndirectSender<F>,
    ) {
        // `tx_child` is cleared by `update` if the message changed in the meantime
        let tx_child = self.tx_child.take();
        self.tx_message = None;

        let Some(index) = tx_child else {
            debug!("CSL tx result no longer of interest: {:?}", result);
            return;
        };

        let radio_now = radio.now();
        let max_attempts = self.config.max_csl_triggered_tx_attempts;

        let Some(child) = children.get_mut(index) else {
            warn!("child of CSL tx is gone");
            self.reschedule_csl_tx(radio, children);
            return;
        };
        event_log_sent!(radio_now, child.rloc16, &result);

        match result {
            Ok(()) => {
                child.csl.tx_attempts = 0;
                child.indirect.tx_attempts = 0;
                indirect_sender.handle_sent_frame_to_child(
                    frame,
                    &self.frame_context,
                    result,
                    child,
                );
            }
            Err(error @ (Error::NoAck | Error::ChannelAccessFailure | Error::Aborted)) => {
                if error == Error::NoAck {
                    child.csl.tx_attempts = child.csl.tx_attempts.saturating_add(1);
                    info!(
                        "CSL tx to child {:x} failed, attempt {}/{}",
                        child.rloc16, child.csl.tx_attempts, max_attempts
                    );
                }

                // The message is only dropped by the indirect sender once its own attempts are
                // used up, so keep what is needed to retransmit the same frame.
                if !frame.is_empty() {
                    child.indirect.data_sequence_number = frame.sequence();
                    if frame.security_enabled() {
                        if let Ok(frame_counter) = frame.frame_counter() {
                            child.indirect.frame_counter = frame_counter;
                        }
                        if let Ok(key_id) = frame.key_id() {
                            child.indirect.key_id = key_id;
                        }
                    }
                }

                self.reschedule_csl_tx(radio, children);
            }
            Err(error) => unreachable!("invalid CSL tx result: {}", error),
        }
    }
}
