//! The assembly engine.
//!
//! One [Assembler] owns every piece of mutable state: the symbol table,
//! the two literal pools, the location counter, the radix, and the three
//! output writers. The same line driver runs twice over the buffered
//! source: pass 1 defines symbols and counts cross-references, pass 2
//! punches the object tape and prints the listing and error file.
//!
//! A statement is dispatched on its first lexeme:
//! - `/` comment, `;` separator, `$` end of assembly, `*` origin,
//! - `NAME,` label, `NAME=` assignment, pseudo-op name, or
//! - an expression whose value is punched at the current location.

use std::fmt;
use std::io;
use std::io::Write;

use log::debug;
use log::trace;

use crate::address::Address;
use crate::address::WORD_MASK;
use crate::diagnostic::Diagnostic;
use crate::lexer::Lexer;
use crate::listing::LineShape;
use crate::listing::Listing;
use crate::literal::LiteralPool;
use crate::object::ObjectWriter;
use crate::object::TapeFormat;
use crate::object::LEADER_LENGTH;
use crate::symbol::Definition;
use crate::symbol::SymbolTable;
use crate::symbol::TableFull;

use self::directive::Directive;

mod directive;
mod eval;
mod numbers;

/// Observable effects of the command-line flags.
#[derive(Debug, Default, Clone)]
pub struct Options {
    /// `-d`: dump the user symbol table at the end of the listing.
    pub dump_symbols: bool,
    /// `-l`: allow off-page operands to be reached through generated
    /// current-page literals.
    pub generate_links: bool,
    /// `-r`: punch RIM format instead of BIN.
    pub rim_format: bool,
    /// `-x`: print the concordance at the end of the listing.
    pub cross_reference: bool,
}

/// Where the second pass writes.
pub struct Outputs<'a> {
    pub object: &'a mut dyn Write,
    pub listing: &'a mut dyn Write,
    pub errors: &'a mut dyn Write,
}

#[derive(Debug)]
pub enum AssembleError {
    Io(io::Error),
    /// The only fatal diagnostic.
    SymbolTableFull,
}

impl From<io::Error> for AssembleError {
    fn from(error: io::Error) -> Self {
        AssembleError::Io(error)
    }
}

impl fmt::Display for AssembleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssembleError::Io(error) => write!(f, "{}", error),
            AssembleError::SymbolTableFull => f.write_str("symbol table full"),
        }
    }
}

impl std::error::Error for AssembleError {}

#[derive(Debug, Default)]
pub struct Summary {
    /// Errors recorded during pass 2; non-zero means a failing exit.
    pub errors: usize,
}

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
enum Pass {
    One,
    Two,
}

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
enum Radix {
    Octal,
    Decimal,
}

impl Radix {
    fn base(self) -> u16 {
        match self {
            Radix::Octal => 8,
            Radix::Decimal => 10,
        }
    }
}

pub struct Assembler<'a> {
    options: Options,
    source_name: String,
    pending: Option<Outputs<'a>>,

    symbols: SymbolTable,
    xref: Vec<u32>,

    lexer: Lexer,
    object: ObjectWriter<'a>,
    listing: Listing<'a>,
    errfile: Option<&'a mut dyn Write>,

    pass: Pass,
    radix: Radix,
    clc: Address,
    reloc: u16,
    zero_pool: LiteralPool,
    page_pool: LiteralPool,

    errors: [usize; 2],
    line_abandoned: bool,
    line_pending: bool,
    line_diags: Vec<(Diagnostic, usize)>,
    line_loc_val: Option<(Address, u16, bool)>,
    line_val: Option<u16>,
    end_seen: bool,
}

impl<'a> Assembler<'a> {
    pub fn new(source_name: &str, options: Options, outputs: Outputs<'a>) -> Self {
        let format = if options.rim_format {
            TapeFormat::Rim
        } else {
            TapeFormat::Bin
        };
        Assembler {
            options,
            source_name: source_name.to_owned(),
            pending: Some(outputs),
            symbols: SymbolTable::new(),
            xref: Vec::new(),
            lexer: Lexer::new(""),
            object: ObjectWriter::off(format),
            listing: Listing::off(),
            errfile: None,
            pass: Pass::One,
            radix: Radix::Octal,
            clc: Address::new(0, 0o200),
            reloc: 0,
            zero_pool: LiteralPool::new(0),
            page_pool: LiteralPool::new(0o200),
            errors: [0, 0],
            line_abandoned: false,
            line_pending: false,
            line_diags: Vec::new(),
            line_loc_val: None,
            line_val: None,
            end_seen: false,
        }
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    /// Run both passes over `source`.
    pub fn assemble(&mut self, source: &str) -> Result<Summary, AssembleError> {
        self.lexer = Lexer::new(source);

        debug!("{}: pass 1", self.source_name);
        self.begin_pass(Pass::One);
        self.run_pass()?;

        self.size_xref();

        debug!("{}: pass 2", self.source_name);
        self.begin_pass(Pass::Two);
        self.lexer.rewind();
        self.object.leader(LEADER_LENGTH)?;
        self.run_pass()?;

        if self.object.format() == TapeFormat::Bin {
            self.object.checksum_word()?;
        }
        self.object.leader(LEADER_LENGTH)?;

        if self.options.dump_symbols {
            self.listing.symbol_dump(&self.symbols)?;
        }
        if self.options.cross_reference {
            self.listing.concordance(&self.symbols, &self.xref)?;
        }

        Ok(Summary {
            errors: self.errors[1],
        })
    }

    /// Re-create the permanent table as assembleable source: the `-p`
    /// output.
    pub fn write_permanent_symbols(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "EXPUNGE")?;
        for symbol in self.symbols.iter() {
            if !symbol.is_fixed() || !symbol.is_defined() {
                continue;
            }
            if symbol.is_mri() {
                writeln!(out, "FIXMRI {}={:04o}", symbol.name(), symbol.value & WORD_MASK)?;
            } else {
                writeln!(out, "{}={:04o}", symbol.name(), symbol.value & WORD_MASK)?;
            }
        }
        writeln!(out, "FIXTAB")?;
        writeln!(out, "$")
    }

    fn begin_pass(&mut self, pass: Pass) {
        self.pass = pass;
        self.radix = Radix::Octal;
        self.clc = Address::new(0, 0o200);
        self.reloc = 0;
        self.zero_pool = LiteralPool::new(0);
        self.page_pool = LiteralPool::new(0o200);
        self.line_abandoned = false;
        self.line_pending = false;
        self.line_diags.clear();
        self.line_loc_val = None;
        self.line_val = None;
        self.end_seen = false;

        let format = if self.options.rim_format {
            TapeFormat::Rim
        } else {
            TapeFormat::Bin
        };
        match pass {
            Pass::One => {
                self.object = ObjectWriter::off(format);
                self.listing = Listing::off();
            }
            Pass::Two => {
                if let Some(outputs) = self.pending.take() {
                    self.object = ObjectWriter::new(outputs.object, format);
                    self.listing = Listing::new(outputs.listing, &self.source_name, "");
                    self.errfile = Some(outputs.errors);
                } else {
                    self.object = ObjectWriter::off(format);
                    self.listing = Listing::off();
                }
            }
        }
    }

    fn run_pass(&mut self) -> Result<(), AssembleError> {
        loop {
            if !self.advance_line()? {
                self.error(Diagnostic::NoDollarAtEnd, 0)?;
                self.end_of_tape()?;
                self.finish_line()?;
                return Ok(());
            }
            self.process_line()?;
            if self.end_seen {
                self.finish_line()?;
                return Ok(());
            }
        }
    }

    /// Print the pending listing for the current line, then load the next
    /// one. Returns false at end of input.
    fn advance_line(&mut self) -> Result<bool, AssembleError> {
        self.finish_line()?;
        if !self.lexer.advance_line() {
            return Ok(false);
        }
        self.line_pending = true;
        self.line_abandoned = false;
        trace!("{:4} | {}", self.lexer.line_number(), self.lexer.line());
        Ok(true)
    }

    fn finish_line(&mut self) -> Result<(), AssembleError> {
        if self.line_pending {
            let shape = if let Some((loc, value, indirect)) = self.line_loc_val {
                LineShape::LocValue {
                    loc,
                    value,
                    indirect,
                }
            } else if let Some(value) = self.line_val {
                LineShape::Value(value)
            } else {
                LineShape::Plain
            };
            let text = self.lexer.line();
            self.listing
                .source_line(self.lexer.line_number(), shape, &text)?;
            self.line_pending = false;
        }
        for (diag, column) in std::mem::take(&mut self.line_diags) {
            self.listing.diagnostic(diag.tag(), column)?;
        }
        self.line_loc_val = None;
        self.line_val = None;
        Ok(())
    }

    fn process_line(&mut self) -> Result<(), AssembleError> {
        loop {
            self.lexer.next_lexeme();
            let Some(&first) = self.lexer.lexeme().first() else {
                return Ok(());
            };
            match first {
                b'/' => {
                    self.lexer.skip_to_end();
                    return Ok(());
                }
                b';' => continue,
                b'$' => {
                    self.end_of_tape()?;
                    self.end_seen = true;
                    return Ok(());
                }
                b'*' => self.origin_statement()?,
                _ => self.statement()?,
            }
            if self.end_seen || self.line_abandoned {
                return Ok(());
            }
        }
    }

    fn statement(&mut self) -> Result<(), AssembleError> {
        let first = self.lexer.lexeme()[0];
        if first.is_ascii_alphabetic() {
            let name = String::from_utf8_lossy(self.lexer.lexeme()).into_owned();
            let column = self.lexer.column();
            let index = self.find_symbol(&name)?;

            if self.symbols.get(index).is_pseudo() {
                match Directive::from_name(&name) {
                    Some(directive) => self.directive(directive)?,
                    None => self.error(Diagnostic::IllegalCharacter, column)?,
                }
                return Ok(());
            }
            if self.lexer.take_significant(b',') {
                return self.define_label(index, column);
            }
            if self.lexer.take_significant(b'=') {
                return self.assignment(index, column);
            }
            return self.expression_statement();
        }

        if first.is_ascii_digit() || matches!(first, b'.' | b'(' | b'[' | b'"' | b'-' | b'+') {
            return self.expression_statement();
        }

        self.error(Diagnostic::IllegalCharacter, self.lexer.column())
    }

    fn define_label(&mut self, index: usize, column: usize) -> Result<(), AssembleError> {
        let value = self.relocated_clc().bits();
        let pass2 = self.pass == Pass::Two;
        match self.symbols.define(index, value, true, pass2) {
            Definition::Duplicate => self.error(Diagnostic::DuplicateTag, column)?,
            Definition::Permanent => self.error(Diagnostic::IllegalRedefine, column)?,
            _ => {}
        }
        self.note_definition(index);
        Ok(())
    }

    fn assignment(&mut self, index: usize, column: usize) -> Result<(), AssembleError> {
        self.lexer.next_lexeme();
        if self.lexer.lexeme().is_empty() {
            return self.error(Diagnostic::IllegalEquals, column);
        }
        let value = self.exprs()?.value & WORD_MASK;
        let pass2 = self.pass == Pass::Two;
        match self.symbols.define(index, value, false, pass2) {
            Definition::Redefined { again: true } => self.error(Diagnostic::Redefined, column)?,
            // Permanent symbols silently win; the first pass-2 redefinition
            // only earns its `#` marker.
            _ => {}
        }
        self.note_definition(index);
        self.line_val = Some(value);
        Ok(())
    }

    fn expression_statement(&mut self) -> Result<(), AssembleError> {
        let evaluation = self.exprs()?;
        if !self.line_abandoned {
            self.emit(evaluation.value, evaluation.indirect)?;
        }
        Ok(())
    }

    fn origin_statement(&mut self) -> Result<(), AssembleError> {
        let column = self.lexer.column();
        self.lexer.next_lexeme();
        if self.lexer.lexeme().is_empty() {
            return self.error(Diagnostic::IllegalExpression, column);
        }
        let before = self.total_errors();
        let evaluation = self.exprs()?;
        if self.total_errors() != before {
            // an erroneous origin must not move the location counter
            return Ok(());
        }
        let word = evaluation.value.wrapping_sub(self.reloc) & WORD_MASK;
        self.set_origin(word)?;
        self.line_val = Some(evaluation.value);
        Ok(())
    }

    fn set_origin(&mut self, word: u16) -> Result<(), AssembleError> {
        if word & 0o7600 != self.clc.page_base() {
            self.flush_page_pool()?;
            self.page_pool.reset(word & 0o7600);
        }
        self.clc = self.clc.with_word(word);
        self.object.origin_break();
        self.check_pool_collision()
    }

    /// Punch one word at the current location and advance it.
    fn emit(&mut self, value: u16, indirect: bool) -> Result<(), AssembleError> {
        let value = value & WORD_MASK;
        let display = self.relocated_clc();
        trace!("      {} {:04o}", display, value);
        if self.line_loc_val.is_none() {
            self.line_loc_val = Some((display, value, indirect));
        }
        self.object.word(self.clc.word(), value)?;
        self.step_clc()
    }

    fn step_clc(&mut self) -> Result<(), AssembleError> {
        self.clc = self.clc.step();
        self.check_pool_collision()
    }

    fn check_pool_collision(&mut self) -> Result<(), AssembleError> {
        if self.clc.page() == 0
            && self.zero_pool.collides(self.clc.offset())
            && self.zero_pool.flag_overflow()
        {
            self.error(Diagnostic::PageZeroExceeded, 0)?;
        } else if self.clc.page_base() == self.page_pool.base()
            && self.clc.page() != 0
            && self.page_pool.collides(self.clc.offset())
            && self.page_pool.flag_overflow()
        {
            self.error(Diagnostic::PageExceeded, 0)?;
        }
        Ok(())
    }

    fn flush_page_pool(&mut self) -> Result<(), AssembleError> {
        self.flush_pool(false)
    }

    fn flush_zero_pool(&mut self) -> Result<(), AssembleError> {
        self.flush_pool(true)
    }

    fn flush_pool(&mut self, zero: bool) -> Result<(), AssembleError> {
        let pool = if zero { &self.zero_pool } else { &self.page_pool };
        let base = pool.base();
        let entries: Vec<(u16, u16)> = pool.entries().collect();
        if entries.is_empty() {
            return Ok(());
        }

        self.object.origin_break();
        for (offset, value) in entries {
            let loc = base | offset;
            self.object.word(loc, value)?;
            self.listing
                .continuation(Address::new(self.clc.field(), loc), value)?;
        }

        let pool = if zero {
            &mut self.zero_pool
        } else {
            &mut self.page_pool
        };
        pool.reset(base);
        Ok(())
    }

    /// `$`, or running off the end of the source.
    fn end_of_tape(&mut self) -> Result<(), AssembleError> {
        self.flush_page_pool()?;
        self.flush_zero_pool()
    }

    fn find_symbol(&mut self, name: &str) -> Result<usize, AssembleError> {
        match self.symbols.lookup(name) {
            Ok(index) => Ok(index),
            Err(TableFull) => {
                self.error(Diagnostic::SymbolTableFull, self.lexer.column())?;
                self.finish_line()?;
                Err(AssembleError::SymbolTableFull)
            }
        }
    }

    /// Tally a use of the symbol for the concordance.
    fn note_reference(&mut self, index: usize) {
        let line = self.lexer.line_number() as u32;
        let enabled = self.options.cross_reference;
        let pass2 = self.pass == Pass::Two;
        let symbol = self.symbols.get_mut(index);
        if symbol.is_fixed() || symbol.is_pseudo() {
            return;
        }
        if !pass2 {
            symbol.xref_count += 1;
        } else if enabled && symbol.xref_count < symbol.xref_capacity {
            symbol.xref_count += 1;
            let slot = symbol.xref_index + symbol.xref_count;
            self.xref[slot] = line;
        }
    }

    fn note_definition(&mut self, index: usize) {
        if self.pass != Pass::Two || !self.options.cross_reference {
            return;
        }
        let line = self.lexer.line_number() as u32;
        let symbol = self.symbols.get(index);
        if symbol.is_fixed() || symbol.is_pseudo() {
            return;
        }
        let slot = symbol.xref_index;
        if slot < self.xref.len() {
            self.xref[slot] = line;
        }
    }

    /// Lay out the concordance arena from the pass-1 tallies: one
    /// definition slot plus one per reference.
    fn size_xref(&mut self) {
        if !self.options.cross_reference {
            for symbol in self.symbols.iter_mut() {
                symbol.xref_count = 0;
            }
            return;
        }
        let mut offset = 0;
        for symbol in self.symbols.iter_mut() {
            if symbol.is_fixed() || symbol.is_pseudo() {
                symbol.xref_count = 0;
                continue;
            }
            symbol.xref_index = offset;
            symbol.xref_capacity = symbol.xref_count;
            symbol.xref_count = 0;
            offset += symbol.xref_capacity + 1;
        }
        self.xref = vec![0; offset];
    }

    /// Where the listing and label values say we are: the location
    /// counter plus the RELOC offset.
    fn relocated_clc(&self) -> Address {
        self.clc
            .with_word(self.clc.word().wrapping_add(self.reloc))
    }

    fn total_errors(&self) -> usize {
        self.errors[0] + self.errors[1]
    }

    /// Record a diagnostic. Pass-1 diagnostics only count; pass-2
    /// diagnostics reach the error file and the listing.
    fn error(&mut self, diag: Diagnostic, column: usize) -> Result<(), AssembleError> {
        if diag.aborts_line() {
            self.line_abandoned = true;
            self.lexer.skip_to_end();
        }
        match self.pass {
            Pass::One => self.errors[0] += 1,
            Pass::Two => {
                self.errors[1] += 1;
                self.line_diags.push((diag, column));
                let line = self.lexer.line_number();
                let loc = self.relocated_clc();
                if let Some(err) = self.errfile.as_deref_mut() {
                    writeln!(
                        err,
                        "{}({}:{}) : error:  {} at Loc = {}",
                        self.source_name,
                        line,
                        column + 1,
                        diag.phrase(),
                        loc
                    )?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolType;

    pub(super) struct Assembly {
        pub object: Vec<u8>,
        pub listing: String,
        pub errors: String,
        pub summary: Summary,
        pub symbols: Vec<(String, u16, SymbolType)>,
    }

    pub(super) fn assemble_with(source: &str, options: Options) -> Assembly {
        let mut object = Vec::new();
        let mut listing = Vec::new();
        let mut errors = Vec::new();
        let (summary, symbols) = {
            let mut assembler = Assembler::new(
                "test.pal",
                options,
                Outputs {
                    object: &mut object,
                    listing: &mut listing,
                    errors: &mut errors,
                },
            );
            let summary = assembler.assemble(source).unwrap();
            let symbols = assembler
                .symbols()
                .iter()
                .map(|s| (s.name().to_owned(), s.value, s.kind))
                .collect();
            (summary, symbols)
        };
        Assembly {
            object,
            listing: String::from_utf8(listing).unwrap(),
            errors: String::from_utf8(errors).unwrap(),
            summary,
            symbols,
        }
    }

    pub(super) fn assemble(source: &str) -> Assembly {
        assemble_with(source, Options::default())
    }

    /// Decode a BIN tape into origin/word pairs, dropping the trailing
    /// checksum word.
    pub(super) fn bin_words(tape: &[u8]) -> Vec<(u16, u16)> {
        let body: Vec<u8> = tape
            .iter()
            .copied()
            .skip_while(|&b| b == 0o200)
            .collect();
        let body: Vec<u8> = body
            .iter()
            .copied()
            .rev()
            .skip_while(|&b| b == 0o200)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        let mut words = Vec::new();
        let mut loc = 0u16;
        let mut bytes = body.iter().copied().peekable();
        while let Some(first) = bytes.next() {
            if first & 0o300 == 0o300 {
                continue; // field byte
            }
            let second = bytes.next().unwrap_or(0);
            let value = (u16::from(first & 0o77) << 6) | u16::from(second & 0o77);
            if first & 0o100 != 0 {
                loc = value;
            } else {
                words.push((loc, value));
                loc = (loc + 1) & WORD_MASK;
            }
        }
        words.pop(); // checksum
        words
    }

    #[test]
    fn assembles_a_minimal_program() {
        let assembly = assemble("*200\nCLA\nHLT\n$\n");

        assert_eq!(
            bin_words(&assembly.object),
            [(0o200, 0o7200), (0o201, 0o7402)]
        );
        assert_eq!(assembly.summary.errors, 0);
        assert!(assembly.errors.is_empty());
    }

    #[test]
    fn leader_and_trailer_wrap_the_bin_tape() {
        let assembly = assemble("*200\nCLA\n$\n");

        assert!(assembly.object.starts_with(&[0o200; 240]));
        assert!(assembly.object.ends_with(&[0o200; 240]));
    }

    #[test]
    fn bin_checksum_sums_origin_and_data_bytes() {
        let assembly = assemble("*200\nCLA\nHLT\n$\n");

        let body = &assembly.object[240..assembly.object.len() - 240];
        let (payload, checksum) = body.split_at(body.len() - 2);
        let sum: u16 = payload.iter().map(|&b| u16::from(b)).sum::<u16>() & WORD_MASK;
        assert_eq!(
            checksum,
            [((sum >> 6) & 0o77) as u8, (sum & 0o77) as u8]
        );
    }

    #[test]
    fn current_page_references_fuse_into_the_mri() {
        let assembly = assemble("*200\nTAD LBL\nHLT\nLBL, 7\n$\n");

        assert_eq!(
            bin_words(&assembly.object),
            [(0o200, 0o1202), (0o201, 0o7402), (0o202, 0o0007)]
        );
    }

    #[test]
    fn labels_take_the_current_location() {
        let assembly = assemble("*200\nA, CLA\nB, HLT\n$\n");

        let a = assembly.symbols.iter().find(|s| s.0 == "A").unwrap();
        let b = assembly.symbols.iter().find(|s| s.0 == "B").unwrap();
        assert_eq!(a.1, 0o200);
        assert_eq!(b.1, 0o201);
        assert!(a.2.contains(SymbolType::LABEL));
    }

    #[test]
    fn multiple_statements_share_a_line() {
        let assembly = assemble("*200\nCLA; HLT\n$\n");

        assert_eq!(
            bin_words(&assembly.object),
            [(0o200, 0o7200), (0o201, 0o7402)]
        );
    }

    #[test]
    fn comments_are_ignored() {
        let assembly = assemble("*200\nCLA /CLEAR THE AC\n/ NOTHING HERE\nHLT\n$\n");

        assert_eq!(
            bin_words(&assembly.object),
            [(0o200, 0o7200), (0o201, 0o7402)]
        );
    }

    #[test]
    fn microinstructions_or_together() {
        let assembly = assemble("*200\nCLA CLL\n$\n");

        assert_eq!(bin_words(&assembly.object), [(0o200, 0o7300)]);
    }

    #[test]
    fn indirect_references_keep_the_operand_page_bits() {
        let assembly = assemble("*200\nPTR, 0\n*210\nTAD I PTR\n$\n");

        let words = bin_words(&assembly.object);
        assert_eq!(words.last(), Some(&(0o210, 0o1600)));
    }

    #[test]
    fn page_zero_references_fuse_directly() {
        let assembly = assemble("*10\nK7, 7\n*200\nTAD K7\n$\n");

        let words = bin_words(&assembly.object);
        assert_eq!(words.last(), Some(&(0o200, 0o1010)));
    }

    #[test]
    fn missing_end_marker_is_diagnosed() {
        let assembly = assemble("*200\nCLA\n");

        assert!(assembly.errors.contains("no $ at end of source"));
        assert_eq!(assembly.summary.errors, 1);
    }

    #[test]
    fn error_lines_carry_file_line_and_column() {
        let assembly = assemble("*200\nTAD NOWHERE\n$\n");

        assert!(assembly
            .errors
            .contains("test.pal(2:5) : error:  undefined symbol at Loc = 00200"));
    }

    #[test]
    fn undefined_symbols_read_as_zero() {
        let assembly = assemble("*200\nTAD NOWHERE\n$\n");

        assert_eq!(bin_words(&assembly.object), [(0o200, 0o1000)]);
    }

    #[test]
    fn duplicate_labels_are_diagnosed() {
        let assembly = assemble("*200\nA, CLA\nA, HLT\n$\n");

        assert!(assembly.errors.contains("duplicate tag"));
        let a = assembly.symbols.iter().find(|s| s.0 == "A").unwrap();
        assert!(a.2.contains(SymbolType::DUPLICATE));
    }

    #[test]
    fn pass_two_redefinition_is_diagnosed_once_marked_always() {
        let assembly = assemble_with(
            "A=5\nA=6\n$\n",
            Options {
                dump_symbols: true,
                ..Options::default()
            },
        );

        assert_eq!(assembly.summary.errors, 1);
        assert!(assembly.errors.contains("redefined symbol"));
        let a = assembly.symbols.iter().find(|s| s.0 == "A").unwrap();
        assert_eq!(a.1, 6);
        assert!(a.2.contains(SymbolType::REDEFINED));
        assert!(assembly.listing.contains("#A"));
    }

    #[test]
    fn relocated_code_keeps_virtual_labels_and_real_locations() {
        let assembly = assemble("*200\nRELOC 400\nA, CLA\nJMP A\n$\n");

        let a = assembly.symbols.iter().find(|s| s.0 == "A").unwrap();
        assert_eq!(a.1, 0o400);
        // words still punch at the un-relocated location
        assert_eq!(
            bin_words(&assembly.object),
            [(0o200, 0o7200), (0o201, 0o5200)]
        );
    }

    #[test]
    fn rim_format_tapes_tag_every_word() {
        let assembly = assemble_with(
            "*200\nCLA\n$\n",
            Options {
                rim_format: true,
                ..Options::default()
            },
        );

        let body = &assembly.object[240..assembly.object.len() - 240];
        assert_eq!(body, [0o202, 0o00, 0o72, 0o00]);
    }
}
