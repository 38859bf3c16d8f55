//! The assembly listing.
//!
//! Pages hold 55 physical lines, the first five being a header (form feed,
//! title and page number, sub-title, two blanks). Source lines print in
//! one of four shapes:
//! - source only,
//! - source with a value (assignments and origins),
//! - source with location and value, `@` flagging a generated indirection,
//! - location and value only (literal pool flushes).
//!
//! XLIST swaps the output stream aside and back, the same way NOPUNCH
//! gates the object file.

use std::io;
use std::io::Write;

use crate::address::Address;
use crate::address::WORD_MASK;
use crate::symbol::SymbolTable;
use crate::symbol::SymbolType;

pub const PAGE_LINES: usize = 55;
const HEADER_LINES: usize = 5;
const TITLE_LENGTH: usize = 63;

/// Width of the number/location/value margin before the source text.
const MARGIN: usize = 19;

const DUMP_COLUMNS: usize = 5;
const XREF_PER_ROW: usize = 8;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum LineShape {
    Plain,
    Value(u16),
    LocValue {
        loc: Address,
        value: u16,
        indirect: bool,
    },
}

enum Gate<'a> {
    Writing(&'a mut dyn Write),
    Suppressed(&'a mut dyn Write),
    Off,
}

pub struct Listing<'a> {
    gate: Gate<'a>,
    title: String,
    subtitle: String,
    page: usize,
    line_on_page: usize,
}

impl<'a> Listing<'a> {
    /// A listing that swallows everything; used for pass 1.
    pub fn off() -> Self {
        Listing {
            gate: Gate::Off,
            title: String::new(),
            subtitle: String::new(),
            page: 0,
            line_on_page: 0,
        }
    }

    pub fn new(out: &'a mut dyn Write, title: &str, subtitle: &str) -> Self {
        Listing {
            gate: Gate::Writing(out),
            title: title.to_owned(),
            subtitle: subtitle.to_owned(),
            page: 0,
            line_on_page: 0,
        }
    }

    /// TITLE: install a new running title and break the page.
    pub fn set_title(&mut self, title: &str) {
        self.title = title.chars().take(TITLE_LENGTH).collect();
        self.page_break();
    }

    /// EJECT: the next line starts a fresh page.
    pub fn page_break(&mut self) {
        self.line_on_page = 0;
    }

    /// XLIST: no argument toggles, otherwise zero disables and non-zero
    /// enables.
    pub fn toggle(&mut self, enable: Option<bool>) {
        let writing = matches!(self.gate, Gate::Writing(_));
        let enable = enable.unwrap_or(!writing);
        match std::mem::replace(&mut self.gate, Gate::Off) {
            Gate::Writing(out) | Gate::Suppressed(out) => {
                self.gate = if enable {
                    Gate::Writing(out)
                } else {
                    Gate::Suppressed(out)
                };
            }
            Gate::Off => {}
        }
    }

    fn put_line(&mut self, text: &str) -> io::Result<()> {
        if !matches!(self.gate, Gate::Writing(_)) {
            return Ok(());
        }
        if self.line_on_page == 0 || self.line_on_page >= PAGE_LINES {
            self.header()?;
        }
        if let Gate::Writing(out) = &mut self.gate {
            writeln!(out, "{}", text.trim_end())?;
        }
        self.line_on_page += 1;
        Ok(())
    }

    fn header(&mut self) -> io::Result<()> {
        self.page += 1;
        if let Gate::Writing(out) = &mut self.gate {
            writeln!(out, "\x0c{:<64}PAGE {}", self.title, self.page)?;
            writeln!(out, "{}", self.subtitle)?;
            writeln!(out)?;
            writeln!(out)?;
            writeln!(out)?;
        }
        self.line_on_page = HEADER_LINES;
        Ok(())
    }

    pub fn source_line(&mut self, number: usize, shape: LineShape, text: &str) -> io::Result<()> {
        let line = match shape {
            LineShape::Plain => format!("{:5}{:14}{}", number, "", text),
            LineShape::Value(value) => {
                format!("{:5} {:5} {:04o}   {}", number, "", value & WORD_MASK, text)
            }
            LineShape::LocValue {
                loc,
                value,
                indirect,
            } => {
                let flag = if indirect { '@' } else { ' ' };
                format!(
                    "{:5} {} {:04o}{}  {}",
                    number,
                    loc,
                    value & WORD_MASK,
                    flag,
                    text
                )
            }
        };
        self.put_line(&line)
    }

    /// A location/value continuation row, as literal pool flushes print.
    pub fn continuation(&mut self, loc: Address, value: u16) -> io::Result<()> {
        self.put_line(&format!("{:5} {} {:04o}", "", loc, value & WORD_MASK))
    }

    /// A queued diagnostic: caret under the offending column, then the tag.
    pub fn diagnostic(&mut self, tag: &str, column: usize) -> io::Result<()> {
        self.put_line(&format!("{}^ {}", " ".repeat(MARGIN + column), tag))
    }

    /// The `-d` user symbol dump, column-major.
    pub fn symbol_dump(&mut self, table: &SymbolTable) -> io::Result<()> {
        self.page_break();
        self.put_line("USER SYMBOLS")?;
        self.put_line("")?;

        let symbols = table.user_symbols();
        let rows = (symbols.len() + DUMP_COLUMNS - 1) / DUMP_COLUMNS;
        for row in 0..rows {
            let mut line = String::new();
            for column in 0..DUMP_COLUMNS {
                if let Some(symbol) = symbols.get(column * rows + row) {
                    line.push_str(&format!(
                        "{}{:<6} {:04o}   ",
                        symbol.marker(),
                        symbol.name(),
                        symbol.value & WORD_MASK
                    ));
                }
            }
            self.put_line(&line)?;
        }
        Ok(())
    }

    /// The `-x` concordance: definition line, A/M/U, name, then reference
    /// lines eight to a row.
    pub fn concordance(&mut self, table: &SymbolTable, arena: &[u32]) -> io::Result<()> {
        self.page_break();
        self.put_line("CROSS REFERENCE")?;
        self.put_line("")?;

        for symbol in table.user_symbols() {
            let marker = if !symbol.defined_conditionally() {
                'U'
            } else if symbol.kind.contains(SymbolType::REDEFINED) {
                'M'
            } else {
                'A'
            };
            let definition = arena.get(symbol.xref_index).copied().unwrap_or(0);
            let start = symbol.xref_index.saturating_add(1).min(arena.len());
            let end = start.saturating_add(symbol.xref_count).min(arena.len());
            let references = &arena[start..end];

            let mut head = format!("{:5} {} {:<6}", definition, marker, symbol.name());
            for reference in references.iter().take(XREF_PER_ROW) {
                head.push_str(&format!("{:6}", reference));
            }
            self.put_line(&head)?;

            for chunk in references.chunks(XREF_PER_ROW).skip(1) {
                let mut row = format!("{:14}", "");
                for reference in chunk {
                    row.push_str(&format!("{:6}", reference));
                }
                self.put_line(&row)?;
            }
        }
        Ok(())
    }
}
