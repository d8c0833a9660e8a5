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

/// Scheduler state
///
/// Derived from the selected child and the message the transmission layer is sending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Nothing selected, next update selects a child
    Idle,
    /// Child selected, waiting for the transmission layer to request the frame
    Selected { child: ChildIndex },
    /// Frame handed to the transmission layer
    InFlight {
        child: ChildIndex,
        message: MessageId,
    },
    /// Message of the selected child changed while its frame was in flight
    WaitingForInFlightCompletion { message: MessageId },
}

impl State {
    pub(crate) fn from_parts(child: Option<ChildIndex>, message: Option<MessageId>) -> Self {
        match (child, message) {
            (None, None) => State::Idle,
            (Some(child), None) => State::Selected { child },
            (Some(child), Some(message)) => State::InFlight { child, message },
            (None, Some(message)) => State::WaitingForInFlightCompletion { message },
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, State::Idle)
    }

    fn state_as_string(&self) -> &str {
        match self {
            State::Idle => "Idle",
            State::Selected { .. } => "Selected",
            State::InFlight { .. } => "InFlight",
            State::WaitingForInFlightCompletion { .. } => "WaitingForInFlightCompletion",
        }
    }
}

impl core::fmt::Display for State {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(fmt, "{}", self.state_as_string())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for State {
    fn format(&self, fmt: defmt::Formatter) {
        use defmt::write;
        write!(fmt, "{}", self.state_as_string())
    }
}
