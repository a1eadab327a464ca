//! # Console Module
//!
//! Character device behind the console traps. [`StdConsole`] talks to the
//! host terminal; [`BufferConsole`] keeps everything in memory.

use std::collections::VecDeque;
use std::io::{self, Read, Write};

/// Byte-oriented console used by the trap routines
pub trait Console {
    /// Next input byte, `None` once input is exhausted
    fn getc(&mut self) -> Option<u8>;
    /// Writes one byte.
    fn putc(&mut self, c: u8);
    /// Pushes buffered output out.
    fn flush(&mut self) {}
}

/// Host stdin/stdout
#[derive(Default)]
pub struct StdConsole;

impl Console for StdConsole {
    fn getc(&mut self) -> Option<u8> {
        self.flush();
        let mut byte = [0u8; 1];
        match io::stdin().read(&mut byte) {
            Ok(1) => Some(byte[0]),
            _ => None,
        }
    }

    fn putc(&mut self, c: u8) {
        let _ = io::stdout().write_all(&[c]);
    }

    fn flush(&mut self) {
        let _ = io::stdout().flush();
    }
}

/// In-memory console with scripted input
#[derive(Default)]
pub struct BufferConsole {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl BufferConsole {
    /// An empty console
    pub fn new() -> Self {
        Self::default()
    }

    /// A console whose input is `input`
    pub fn with_input(input: &str) -> Self {
        Self {
            input: input.bytes().collect(),
            output: Vec::new(),
        }
    }

    /// Everything written so far
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Output decoded lossily as UTF-8
    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Console for BufferConsole {
    fn getc(&mut self) -> Option<u8> {
        self.input.pop_front()
    }

    fn putc(&mut self, c: u8) {
        self.output.push(c);
    }
}
