//! Paper-tape object emitters.
//!
//! Both formats carry 12-bit words as pairs of 6-bit bytes:
//! - RIM tags every word with an origin pair (`0o200 | high six bits of
//!   the address`, then the low six bits).
//! - BIN punches an origin pair (`0o100 | high six bits`) only when the
//!   emission location breaks sequence, punches field changes as a single
//!   `0o300 | field << 3` byte, and ends with a checksum word: the sum of
//!   all origin and data bytes modulo 4096. Field bytes and the leader
//!   never enter the checksum.
//!
//! Every byte flows through one sink which adds it to the running
//! checksum and hands it to the selected stream. NOPUNCH swaps the
//! stream out without losing it, ENPUNCH swaps it back.

use std::io;
use std::io::Write;

use crate::address::WORD_MASK;

/// A leader/trailer punch: channel 8 only.
pub const LEADER_BYTE: u8 = 0o200;

/// Default leader length, about two feet of tape.
pub const LEADER_LENGTH: usize = 240;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum TapeFormat {
    Rim,
    Bin,
}

enum Sink<'a> {
    Writing(&'a mut dyn Write),
    Suppressed(&'a mut dyn Write),
    Off,
}

pub struct ObjectWriter<'a> {
    sink: Sink<'a>,
    format: TapeFormat,
    checksum: u16,
    emitted: bool,
    /// Location the next BIN word would land on without a new origin.
    position: Option<u16>,
}

impl<'a> ObjectWriter<'a> {
    /// A writer that swallows everything; used for pass 1.
    pub fn off(format: TapeFormat) -> Self {
        ObjectWriter {
            sink: Sink::Off,
            format,
            checksum: 0,
            emitted: false,
            position: None,
        }
    }

    pub fn new(out: &'a mut dyn Write, format: TapeFormat) -> Self {
        ObjectWriter {
            sink: Sink::Writing(out),
            format,
            checksum: 0,
            emitted: false,
            position: None,
        }
    }

    pub fn format(&self) -> TapeFormat {
        self.format
    }

    pub fn set_format(&mut self, format: TapeFormat) {
        self.format = format;
        self.position = None;
    }

    /// Whether any word has been punched since the last segment start.
    pub fn has_emitted(&self) -> bool {
        self.emitted
    }

    pub fn start_segment(&mut self) {
        self.emitted = false;
        self.position = None;
    }

    pub fn reset_checksum(&mut self) {
        self.checksum = 0;
    }

    /// NOPUNCH: keep the stream aside and stop writing.
    pub fn suppress(&mut self) {
        if let Sink::Writing(_) = self.sink {
            match std::mem::replace(&mut self.sink, Sink::Off) {
                Sink::Writing(w) => self.sink = Sink::Suppressed(w),
                other => self.sink = other,
            }
        }
    }

    /// ENPUNCH: resume writing to the stashed stream.
    pub fn resume(&mut self) {
        if let Sink::Suppressed(_) = self.sink {
            match std::mem::replace(&mut self.sink, Sink::Off) {
                Sink::Suppressed(w) => self.sink = Sink::Writing(w),
                other => self.sink = other,
            }
        }
    }

    fn is_writing(&self) -> bool {
        matches!(self.sink, Sink::Writing(_))
    }

    fn put(&mut self, byte: u8, checksummed: bool) -> io::Result<()> {
        if let Sink::Writing(out) = &mut self.sink {
            out.write_all(&[byte])?;
            if checksummed {
                self.checksum = (self.checksum + u16::from(byte)) & WORD_MASK;
            }
        }
        Ok(())
    }

    fn pair(&mut self, value: u16, flag: u8) -> io::Result<()> {
        self.put(flag | ((value >> 6) & 0o77) as u8, true)?;
        self.put((value & 0o77) as u8, true)
    }

    /// Punch an origin marker for `loc` now.
    pub fn origin(&mut self, loc: u16) -> io::Result<()> {
        if !self.is_writing() {
            return Ok(());
        }
        let loc = loc & WORD_MASK;
        match self.format {
            TapeFormat::Rim => self.pair(loc, 0o200)?,
            TapeFormat::Bin => self.pair(loc, 0o100)?,
        }
        self.position = Some(loc);
        Ok(())
    }

    /// Force an origin marker before the next word.
    pub fn origin_break(&mut self) {
        self.position = None;
    }

    /// Punch one word at `loc`. A word the assembler produced counts as
    /// emitted even while suppressed, so both passes see the same segment
    /// state; only the physical position is gated.
    pub fn word(&mut self, loc: u16, value: u16) -> io::Result<()> {
        let loc = loc & WORD_MASK;
        self.emitted = true;
        if !self.is_writing() {
            return Ok(());
        }
        match self.format {
            TapeFormat::Rim => self.pair(loc, 0o200)?,
            TapeFormat::Bin => {
                if self.position != Some(loc) {
                    self.origin(loc)?;
                }
            }
        }
        self.pair(value & WORD_MASK, 0)?;
        self.position = Some(loc.wrapping_add(1) & WORD_MASK);
        Ok(())
    }

    /// Punch a field-change byte. Never checksummed.
    pub fn field_change(&mut self, field: u16) -> io::Result<()> {
        self.put(0o300 | (((field & 0o7) << 3) as u8), false)?;
        self.position = None;
        Ok(())
    }

    /// Punch the accumulated checksum as a trailing word pair, then clear
    /// it. The checksum bytes themselves are not checksummed.
    pub fn checksum_word(&mut self) -> io::Result<()> {
        let sum = self.checksum;
        self.put(((sum >> 6) & 0o77) as u8, false)?;
        self.put((sum & 0o77) as u8, false)?;
        self.checksum = 0;
        Ok(())
    }

    pub fn leader(&mut self, length: usize) -> io::Result<()> {
        for _ in 0..length {
            self.put(LEADER_BYTE, false)?;
        }
        Ok(())
    }
}
