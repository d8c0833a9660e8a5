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
    /// Provide the frame for the CSL transmission the radio was asked for.
    ///
    /// Called by the transmission layer right before it sends. The frame content comes from the
    /// indirect sender; the timing, channel and retransmission fields are set here.
    pub fn handle_frame_request<F: TxFrame>(
        &mut self,
        frame: &mut F,
        radio: &impl Radio,
        children: &mut impl ChildTable,
        indirect_sender: &mut impl IndirectSender<F>,
    ) -> Result<(), Error> {
        let index = self.tx_child.ok_or(Error::Aborted)?;
        let child = children.get_mut(index).ok_or(Error::Aborted)?;

        indirect_sender.prepare_frame_for_child(frame, &mut self.frame_context, child)?;

        if child.csl.period == 0 {
            warn!("child {:x} lost its CSL period", child.rloc16);
            return Err(Error::Aborted);
        }

        self.tx_message = child.indirect.message;
        if self.tx_message.is_none() {
            warn!("no indirect message for child {:x}", child.rloc16);
            return Err(Error::Aborted);
        }

        let is_retransmission = child.indirect.tx_attempts > 0 || child.csl.tx_attempts > 0;
        if is_retransmission {
            // a retransmission must use the same sequence number, frame counter and key id as
            // the previous attempt
            frame.set_is_a_retransmission(true);
            frame.set_sequence(child.indirect.data_sequence_number);
            if frame.security_enabled() {
                frame.set_frame_counter(child.indirect.frame_counter);
                frame.set_key_id(child.indirect.key_id);
            }
        } else {
            frame.set_is_a_retransmission(false);
        }

        let channel = match child.csl.channel {
            0 => radio.pan_channel(),
            channel => channel,
        };
        frame.set_channel(channel);

        // a late request moves on to a later window the radio can still reach
        let radio_now = radio.now();
        let window = self.next_csl_transmission(child, radio_now);
        frame.set_tx_delay(window.delay_from_last_rx);
        // radio only needs the lower bits
        frame.set_tx_delay_base_time(child.csl.last_rx_timestamp as u32);
        frame.set_csma_ca_enabled(false);

        event_log_frame_request!(
            radio_now,
            child.rloc16,
            channel,
            is_retransmission,
            window.delay_from_last_rx
        );

        Ok(())
    }
}
