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

//! Writes CSL scheduler events from the log to a CSV file

use std::{
    fs::File,
    io::{self, BufWriter, Write},
};

/// Log messages starting with this char are events
pub const EVENT_INDICATOR_CHAR: char = '$';

const FILE_HEADER: &str = "radio_time_us;child;kind;content";

pub struct CslEventWriter<W: Write = BufWriter<File>> {
    out: W,
}

impl CslEventWriter {
    pub fn create(output_file_path: &str) -> io::Result<Self> {
        Self::new(BufWriter::new(File::create(output_file_path)?))
    }
}

impl<W: Write> CslEventWriter<W> {
    pub fn new(mut out: W) -> io::Result<Self> {
        writeln!(out, "{FILE_HEADER}")?;
        Ok(Self { out })
    }

    /// Write event if `message` is one, returns whether it was
    pub fn write_event(&mut self, message: &str) -> io::Result<bool> {
        match message.strip_prefix(EVENT_INDICATOR_CHAR) {
            Some(event) => {
                writeln!(self.out, "{event}")?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
