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

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Operation was aborted, e.g. nothing to send or message disappeared
    Aborted,
    /// Frame was sent but not acknowledged
    NoAck,
    /// Channel could not be acquired
    ChannelAccessFailure,
    /// No buffer available to build the frame
    NoBufs,
    InvalidState,
    NotFound,
    /// Frame could not be secured
    Security,
}

impl Error {
    fn as_str(&self) -> &'static str {
        match self {
            Error::Aborted => "aborted",
            Error::NoAck => "no_ack",
            Error::ChannelAccessFailure => "channel_access_failure",
            Error::NoBufs => "no_bufs",
            Error::InvalidState => "invalid_state",
            Error::NotFound => "not_found",
            Error::Security => "security",
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, fmt: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(fmt, "{}", self.as_str())
    }
}
