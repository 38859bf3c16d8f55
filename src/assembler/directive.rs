//! The pseudo-ops.
//!
//! Directive names live in the symbol table as PSEUDO entries so EXPUNGE
//! and lookup behave uniformly; the handlers themselves dispatch through
//! this enum. Handlers share the line-scanning state with the driver and
//! leave the cursor on whatever they did not consume.

use crate::address::Address;
use crate::diagnostic::Diagnostic;
use crate::lexer::is_blank;
use crate::object::TapeFormat;
use crate::symbol::name_key;
use crate::symbol::Definition;
use crate::symbol::SymbolType;

use super::eval::is_term_start;
use super::AssembleError;
use super::Assembler;
use super::Pass;
use super::Radix;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub(super) enum Directive {
    Octal,
    Decimal,
    Field,
    Page,
    Segmnt,
    Reloc,
    Fixmri,
    Fixtab,
    Expunge,
    Enpunch,
    Nopunch,
    Rimpunch,
    Binpunch,
    Text,
    Title,
    Zblock,
    Eject,
    Xlist,
    Pause,
    Ifdef,
    Ifndef,
    Ifzero,
    Ifnzero,
    Dubl,
    Fltg,
    Bank,
}

impl Directive {
    pub(super) fn from_name(name: &str) -> Option<Directive> {
        Some(match name_key(name) {
            "OCTAL" => Directive::Octal,
            "DECIMA" => Directive::Decimal,
            "FIELD" => Directive::Field,
            "PAGE" => Directive::Page,
            "SEGMNT" => Directive::Segmnt,
            "RELOC" => Directive::Reloc,
            "FIXMRI" => Directive::Fixmri,
            "FIXTAB" => Directive::Fixtab,
            "EXPUNG" => Directive::Expunge,
            "ENPUNC" => Directive::Enpunch,
            "NOPUNC" => Directive::Nopunch,
            "RIMPUN" => Directive::Rimpunch,
            "BINPUN" => Directive::Binpunch,
            "TEXT" => Directive::Text,
            "TITLE" => Directive::Title,
            "ZBLOCK" => Directive::Zblock,
            "EJECT" => Directive::Eject,
            "XLIST" => Directive::Xlist,
            "PAUSE" => Directive::Pause,
            "IFDEF" => Directive::Ifdef,
            "IFNDEF" => Directive::Ifndef,
            "IFZERO" => Directive::Ifzero,
            "IFNZER" => Directive::Ifnzero,
            "DUBL" => Directive::Dubl,
            "FLTG" => Directive::Fltg,
            "BANK" => Directive::Bank,
            _ => return None,
        })
    }
}

impl<'a> Assembler<'a> {
    pub(super) fn directive(&mut self, directive: Directive) -> Result<(), AssembleError> {
        match directive {
            Directive::Octal => {
                self.radix = Radix::Octal;
                Ok(())
            }
            Directive::Decimal => {
                self.radix = Radix::Decimal;
                Ok(())
            }
            Directive::Field => self.field_directive(),
            Directive::Page => self.page_directive(),
            Directive::Segmnt => self.segmnt_directive(),
            Directive::Reloc => self.reloc_directive(),
            Directive::Fixmri => self.fixmri_directive(),
            Directive::Fixtab => {
                self.symbols.fixtab();
                Ok(())
            }
            Directive::Expunge => {
                self.symbols.expunge();
                Ok(())
            }
            Directive::Enpunch => {
                self.object.resume();
                Ok(())
            }
            Directive::Nopunch => {
                self.object.suppress();
                Ok(())
            }
            Directive::Rimpunch => self.rimpunch_directive(),
            Directive::Binpunch => self.binpunch_directive(),
            Directive::Text => self.text_directive(),
            Directive::Title => self.title_directive(),
            Directive::Zblock => self.zblock_directive(),
            Directive::Eject => {
                self.listing.page_break();
                Ok(())
            }
            Directive::Xlist => {
                let argument = self.optional_value()?;
                self.listing.toggle(argument.map(|v| v != 0));
                Ok(())
            }
            Directive::Pause => Ok(()),
            Directive::Ifdef => self.conditional_symbol(true),
            Directive::Ifndef => self.conditional_symbol(false),
            Directive::Ifzero => self.conditional_value(true),
            Directive::Ifnzero => self.conditional_value(false),
            Directive::Dubl => self.dubl_directive(),
            Directive::Fltg => self.fltg_directive(),
            Directive::Bank => self.error(Diagnostic::NotImplemented, self.lexer.column()),
        }
    }

    /// Evaluate a trailing expression if one is present.
    fn optional_value(&mut self) -> Result<Option<u16>, AssembleError> {
        match self.lexer.peek_significant() {
            Some(byte) if is_term_start(byte) || byte == b'-' || byte == b'+' => {
                self.lexer.next_lexeme();
                Ok(Some(self.exprs()?.value))
            }
            _ => Ok(None),
        }
    }

    fn field_directive(&mut self) -> Result<(), AssembleError> {
        let column = self.lexer.column();
        let argument = self.optional_value()?;
        if self.object.format() == TapeFormat::Rim {
            return self.error(Diagnostic::FieldInRim, column);
        }
        let field = argument.unwrap_or_else(|| self.clc.field() + 1);
        if field > 7 {
            return self.error(Diagnostic::IllegalExpression, column);
        }

        self.flush_page_pool()?;
        self.flush_zero_pool()?;
        self.object.field_change(field)?;
        self.clc = Address::new(field, 0o200);
        self.zero_pool.reset(0);
        self.page_pool.reset(0o200);
        self.object.origin(0o200)?;
        Ok(())
    }

    fn page_directive(&mut self) -> Result<(), AssembleError> {
        let word = match self.optional_value()? {
            Some(page) => (page & 0o37) << 7,
            None => self.clc.word().wrapping_add(0o177) & 0o7600,
        };
        self.set_origin(word)
    }

    fn segmnt_directive(&mut self) -> Result<(), AssembleError> {
        let word = match self.optional_value()? {
            Some(segment) => (segment & 0o3) << 10,
            None => self.clc.word().wrapping_add(0o1777) & 0o6000,
        };
        self.set_origin(word)
    }

    fn reloc_directive(&mut self) -> Result<(), AssembleError> {
        self.reloc = match self.optional_value()? {
            Some(target) => target.wrapping_sub(self.clc.word()) & 0o7777,
            None => 0,
        };
        self.line_val = Some(self.reloc);
        Ok(())
    }

    /// `FIXMRI NAME=expr`: define an instruction that fuses operands.
    fn fixmri_directive(&mut self) -> Result<(), AssembleError> {
        self.lexer.next_lexeme();
        let column = self.lexer.column();
        let lexeme = self.lexer.lexeme().to_vec();
        if !lexeme.first().is_some_and(u8::is_ascii_alphabetic) {
            return self.error(Diagnostic::IllegalEquals, column);
        }
        let name = String::from_utf8_lossy(&lexeme).into_owned();
        if !self.lexer.take_significant(b'=') {
            return self.error(Diagnostic::IllegalEquals, column);
        }
        self.lexer.next_lexeme();
        if self.lexer.lexeme().is_empty() {
            return self.error(Diagnostic::IllegalEquals, column);
        }
        let value = self.exprs()?.value;

        let index = self.find_symbol(&name)?;
        let pass2 = self.pass == Pass::Two;
        let outcome = self.symbols.define(index, value, false, pass2);
        if !matches!(outcome, Definition::Permanent) {
            self.symbols.get_mut(index).kind.insert(SymbolType::MRI);
        }
        self.note_definition(index);
        self.line_val = Some(value);
        Ok(())
    }

    fn rimpunch_directive(&mut self) -> Result<(), AssembleError> {
        let argument = self.optional_value()?;
        if self.object.format() == TapeFormat::Bin && self.object.has_emitted() {
            self.flush_page_pool()?;
            self.flush_zero_pool()?;
            // a length of -1 asks for a segment without a checksum
            if argument != Some(0o7777) {
                self.object.checksum_word()?;
            }
            let length = match argument {
                Some(0o7777) | None => 8,
                Some(n) => usize::from(n),
            };
            self.object.leader(length)?;
        }
        self.object.set_format(TapeFormat::Rim);
        self.object.start_segment();
        Ok(())
    }

    fn binpunch_directive(&mut self) -> Result<(), AssembleError> {
        let argument = self.optional_value()?;
        if self.object.format() == TapeFormat::Rim && self.object.has_emitted() {
            let base = self.zero_pool.base();
            self.zero_pool.reset(base);
            let base = self.page_pool.base();
            self.page_pool.reset(base);
            self.object.leader(argument.map_or(8, usize::from))?;
            self.object.reset_checksum();
        }
        self.object.set_format(TapeFormat::Bin);
        self.object.start_segment();
        Ok(())
    }

    /// `TEXT <delim>chars<delim>`: trimmed six-bit ASCII, two per word.
    fn text_directive(&mut self) -> Result<(), AssembleError> {
        let delimiter = loop {
            match self.lexer.take_char() {
                None => return self.error(Diagnostic::IllegalCharacter, self.lexer.column()),
                Some(byte) if is_blank(byte) => continue,
                Some(byte) => break byte,
            }
        };
        let mut chars = Vec::new();
        loop {
            match self.lexer.take_char() {
                None => break,
                Some(byte) if byte == delimiter => break,
                Some(byte) => chars.push(byte),
            }
        }

        if chars.is_empty() {
            return self.emit(0, false);
        }
        for pair in chars.chunks(2) {
            let high = u16::from(pair[0] & 0o77);
            let low = pair.get(1).map_or(0, |&c| u16::from(c & 0o77));
            self.emit((high << 6) | low, false)?;
        }
        Ok(())
    }

    /// `TITLE <delim>text<delim>`: a doubled delimiter escapes itself.
    fn title_directive(&mut self) -> Result<(), AssembleError> {
        let delimiter = loop {
            match self.lexer.take_char() {
                None => return Ok(()),
                Some(byte) if is_blank(byte) => continue,
                Some(byte) => break byte,
            }
        };
        let mut title = String::new();
        loop {
            match self.lexer.take_char() {
                None => break,
                Some(byte) if byte == delimiter => {
                    if self.lexer.peek_char() == Some(delimiter) {
                        self.lexer.take_char();
                        title.push(delimiter as char);
                    } else {
                        break;
                    }
                }
                Some(byte) => title.push(byte as char),
            }
        }
        self.listing.set_title(&title);
        Ok(())
    }

    fn zblock_directive(&mut self) -> Result<(), AssembleError> {
        let column = self.lexer.column();
        self.lexer.next_lexeme();
        if self.lexer.lexeme().is_empty() {
            return self.error(Diagnostic::IllegalExpression, column);
        }
        let count = self.exprs()?.value;
        if count >= 0o4000 {
            return self.error(Diagnostic::IllegalExpression, column);
        }
        if u32::from(self.clc.word()) + u32::from(count) > 0o10000 {
            return self.error(Diagnostic::IllegalExpression, column);
        }
        for _ in 0..count {
            self.emit(0, false)?;
        }
        Ok(())
    }

    fn conditional_symbol(&mut self, want_defined: bool) -> Result<(), AssembleError> {
        self.lexer.next_lexeme();
        let column = self.lexer.column();
        let lexeme = self.lexer.lexeme().to_vec();
        if !lexeme.first().is_some_and(u8::is_ascii_alphabetic) {
            return self.error(Diagnostic::IllegalCharacter, column);
        }
        let name = String::from_utf8_lossy(&lexeme).into_owned();
        let index = self.find_symbol(&name)?;
        self.note_reference(index);
        let defined = self.symbols.get(index).defined_conditionally();
        self.conditional_block(defined == want_defined)
    }

    fn conditional_value(&mut self, want_zero: bool) -> Result<(), AssembleError> {
        let column = self.lexer.column();
        self.lexer.next_lexeme();
        if self.lexer.lexeme().is_empty() {
            return self.error(Diagnostic::IllegalExpression, column);
        }
        let value = self.exprs()?.value;
        self.conditional_block((value == 0) == want_zero)
    }

    /// Enter or skip a `<` … `>` block. A skipped block is crossed
    /// character by character, tracking nesting, stopping early at `$`.
    fn conditional_block(&mut self, condition: bool) -> Result<(), AssembleError> {
        if !self.lexer.take_significant(b'<') {
            return self.error(Diagnostic::IllegalCharacter, self.lexer.column());
        }
        if condition {
            // assemble the body; the closing > reads as a blank
            return Ok(());
        }
        let mut depth = 1usize;
        loop {
            match self.lexer.take_char() {
                Some(b'<') => depth += 1,
                Some(b'>') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                Some(b'$') => {
                    self.lexer.unread_char();
                    return Ok(());
                }
                Some(_) => {}
                None => {
                    if !self.advance_line()? {
                        return Ok(());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::assemble;
    use super::super::tests::assemble_with;
    use super::super::tests::bin_words;
    use super::super::Options;

    #[test]
    fn radix_switches_change_number_values() {
        let assembly = assemble("*200\nDECIMAL\n9\nOCTAL\n10\n$\n");

        assert_eq!(
            bin_words(&assembly.object),
            [(0o200, 0o0011), (0o201, 0o0010)]
        );
    }

    #[test]
    fn field_change_punches_a_field_byte_and_restarts_at_0200() {
        let assembly = assemble("*200\nCLA\nFIELD 1\nHLT\n$\n");

        let body = &assembly.object[240..assembly.object.len() - 240];
        assert!(body.contains(&0o310));
        let words = bin_words(&assembly.object);
        assert_eq!(words, [(0o200, 0o7200), (0o200, 0o7402)]);
    }

    #[test]
    fn field_is_illegal_in_rim_mode() {
        let assembly = assemble_with(
            "*200\nFIELD 1\n$\n",
            Options {
                rim_format: true,
                ..Options::default()
            },
        );

        assert!(assembly.errors.contains("not allowed in RIM"));
    }

    #[test]
    fn page_without_an_argument_rounds_up() {
        let assembly = assemble("*205\nCLA\nPAGE\nHLT\n$\n");

        assert_eq!(
            bin_words(&assembly.object),
            [(0o205, 0o7200), (0o400, 0o7402)]
        );
    }

    #[test]
    fn page_with_an_argument_selects_the_page() {
        let assembly = assemble("PAGE 3\nCLA\n$\n");

        assert_eq!(bin_words(&assembly.object), [(0o600, 0o7200)]);
    }

    #[test]
    fn segmnt_aligns_to_one_kiloword() {
        let assembly = assemble("*201\nCLA\nSEGMNT\nHLT\nSEGMNT 3\nCLA\n$\n");

        assert_eq!(
            bin_words(&assembly.object),
            [(0o201, 0o7200), (0o2000, 0o7402), (0o6000, 0o7200)]
        );
    }

    #[test]
    fn fixmri_defines_a_fusing_instruction() {
        let assembly = assemble("FIXMRI LDA=1000\n*200\nLDA SPOT\nSPOT, 0\n$\n");

        assert_eq!(
            bin_words(&assembly.object),
            [(0o200, 0o1201), (0o201, 0o0000)]
        );
    }

    #[test]
    fn expunge_drops_the_permanent_catalogue() {
        let assembly = assemble("EXPUNGE\n*200\nTAD\n$\n");

        // TAD is no longer defined, so it reads as zero
        assert!(assembly.errors.contains("undefined symbol"));
        assert_eq!(bin_words(&assembly.object), [(0o200, 0o0000)]);
    }

    #[test]
    fn text_packs_two_characters_per_word() {
        let assembly = assemble("*200\nTEXT /AB/\n$\n");

        assert_eq!(bin_words(&assembly.object), [(0o200, 0o0102)]);
    }

    #[test]
    fn text_leaves_an_odd_character_in_the_high_bits() {
        let assembly = assemble("*200\nTEXT /ABC/\n$\n");

        assert_eq!(
            bin_words(&assembly.object),
            [(0o200, 0o0102), (0o201, 0o0300)]
        );
    }

    #[test]
    fn empty_text_still_emits_a_word() {
        let assembly = assemble("*200\nTEXT //\n$\n");

        assert_eq!(bin_words(&assembly.object), [(0o200, 0o0000)]);
    }

    #[test]
    fn zblock_emits_zero_words() {
        let assembly = assemble("*200\nZBLOCK 3\nHLT\n$\n");

        assert_eq!(
            bin_words(&assembly.object),
            [
                (0o200, 0),
                (0o201, 0),
                (0o202, 0),
                (0o203, 0o7402)
            ]
        );
    }

    #[test]
    fn negative_zblock_is_diagnosed() {
        let assembly = assemble("*200\nZBLOCK -1\n$\n");

        assert!(assembly.errors.contains("illegal expression"));
        assert!(bin_words(&assembly.object).is_empty());
    }

    #[test]
    fn false_conditional_skips_its_block() {
        let assembly = assemble("*200\nIFNZERO 0 <CLA>\nHLT\n$\n");

        assert_eq!(bin_words(&assembly.object), [(0o200, 0o7402)]);
    }

    #[test]
    fn true_conditional_assembles_its_block() {
        let assembly = assemble("*200\nIFZERO 0 <CLA>\nHLT\n$\n");

        assert_eq!(
            bin_words(&assembly.object),
            [(0o200, 0o7200), (0o201, 0o7402)]
        );
    }

    #[test]
    fn conditional_blocks_nest_across_lines() {
        let assembly = assemble("*200\nIFDEF NOSUCH <\nCLA\nIFDEF NOSUCH <HLT>\nIAC\n>\nOSR\n$\n");

        assert_eq!(bin_words(&assembly.object), [(0o200, 0o7404)]);
    }

    #[test]
    fn ifdef_takes_the_block_for_a_defined_symbol() {
        let assembly = assemble("FLAG=1\n*200\nIFDEF FLAG <CLA>\nIFNDEF FLAG <HLT>\n$\n");

        assert_eq!(bin_words(&assembly.object), [(0o200, 0o7200)]);
        assert!(assembly.errors.is_empty());
    }

    #[test]
    fn nopunch_suppresses_words_until_enpunch() {
        let assembly = assemble("*200\nCLA\nNOPUNCH\nIAC\nENPUNCH\nHLT\n$\n");

        assert_eq!(
            bin_words(&assembly.object),
            [(0o200, 0o7200), (0o202, 0o7402)]
        );
    }

    #[test]
    fn bank_is_not_implemented() {
        let assembly = assemble("*200\nBANK\n$\n");

        assert!(assembly.errors.contains("not implemented"));
    }

    #[test]
    fn xlist_hides_lines_from_the_listing() {
        let assembly = assemble("*200\nXLIST 0\nCLA\nXLIST 1\nHLT\n$\n");

        assert!(!assembly.listing.contains("CLA"));
        assert!(assembly.listing.contains("HLT"));
    }

    #[test]
    fn title_changes_the_listing_header() {
        let assembly = assemble("TITLE /ADDER TEST/\n*200\nCLA\n$\n");

        assert!(assembly.listing.contains("ADDER TEST"));
    }
}
