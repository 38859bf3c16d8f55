//! Expression evaluation.
//!
//! A statement's value is a chain of blank-separated terms combined by
//! implicit OR; each term is a chain of elements bound by the binary
//! operators `+ - ^ % & !`, all left-associative at equal precedence.
//! Elements are symbols, digit runs in the current radix, `.` (the
//! relocated location counter), quoted characters, and the literal
//! brackets `(…)` / `[…]`, whose value is the address of a pooled word.
//!
//! When the accumulated value is a memory-reference instruction, further
//! MRI-typed terms (`I`, `Z`, another opcode) OR in as modifiers; the
//! first plain term is the operand address and fuses into the low bits:
//! directly for page zero, with the page bit for the current page, or
//! through a generated current-page literal when links are enabled.

use crate::address::INDIRECT_BIT;
use crate::address::OFFSET_MASK;
use crate::address::PAGE_BIT;
use crate::address::PAGE_WORDS;
use crate::address::WORD_MASK;
use crate::diagnostic::Diagnostic;

use super::AssembleError;
use super::Assembler;
use super::Pass;

/// The outcome of a statement expression. `indirect` is set when MRI
/// fusion had to reach the operand through a literal, so the listing can
/// flag the word with `@`.
pub(super) struct Evaluation {
    pub value: u16,
    pub indirect: bool,
}

struct Term {
    value: u16,
    mri: bool,
}

impl Term {
    fn number(value: u16) -> Self {
        Term { value, mri: false }
    }
}

pub(super) fn is_term_start(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'.' | b'"' | b'(' | b'[')
}

fn is_operator(byte: u8) -> bool {
    matches!(byte, b'+' | b'-' | b'^' | b'%' | b'&' | b'!')
}

impl<'a> Assembler<'a> {
    /// Evaluate the implicit-OR chain starting at the current lexeme.
    pub(super) fn exprs(&mut self) -> Result<Evaluation, AssembleError> {
        let first = self.expr()?;
        let mut value = first.value;
        let mut mri = first.mri;
        let mut indirect = false;

        while let Some(next) = self.lexer.peek_significant() {
            if !is_term_start(next) {
                break;
            }
            self.lexer.next_lexeme();
            let column = self.lexer.column();
            let term = self.expr()?;
            if mri {
                if term.mri {
                    value |= term.value;
                } else {
                    value = self.fuse(value, term.value, column, &mut indirect)?;
                    mri = false;
                }
            } else {
                value |= term.value;
            }
            if self.line_abandoned {
                break;
            }
        }

        Ok(Evaluation {
            value: value & WORD_MASK,
            indirect,
        })
    }

    /// One term: elements bound by binary operators.
    fn expr(&mut self) -> Result<Term, AssembleError> {
        let mut term = self.element()?;
        while let Some(op) = self.lexer.peek_significant() {
            if !is_operator(op) {
                break;
            }
            self.lexer.next_lexeme();
            if !self.lexer.next_lexeme_strict() {
                self.error(Diagnostic::IllegalBlank, self.lexer.column())?;
                return Ok(term);
            }
            if self.lexer.lexeme().is_empty() {
                self.error(Diagnostic::IllegalExpression, self.lexer.column())?;
                return Ok(term);
            }
            let rhs = self.element()?;
            term.value = self.apply(op, term.value, rhs.value)?;
            term.mri = false;
            if self.line_abandoned {
                break;
            }
        }
        Ok(term)
    }

    fn apply(&mut self, op: u8, lhs: u16, rhs: u16) -> Result<u16, AssembleError> {
        Ok(match op {
            b'+' => lhs.wrapping_add(rhs) & WORD_MASK,
            b'-' => lhs.wrapping_sub(rhs) & WORD_MASK,
            b'^' => ((u32::from(lhs) * u32::from(rhs)) & u32::from(WORD_MASK)) as u16,
            b'%' => {
                if rhs == 0 {
                    self.error(Diagnostic::IllegalExpression, self.lexer.column())?;
                    0
                } else {
                    lhs / rhs
                }
            }
            b'&' => lhs & rhs,
            b'!' => lhs | rhs,
            _ => lhs,
        })
    }

    fn element(&mut self) -> Result<Term, AssembleError> {
        let column = self.lexer.column();
        let lexeme = self.lexer.lexeme().to_vec();
        let Some(&first) = lexeme.first() else {
            self.error(Diagnostic::IllegalExpression, column)?;
            return Ok(Term::number(0));
        };
        match first {
            b'A'..=b'Z' => {
                let name = String::from_utf8_lossy(&lexeme).into_owned();
                let index = self.find_symbol(&name)?;
                if self.symbols.get(index).is_pseudo() {
                    self.error(Diagnostic::IllegalExpression, column)?;
                    return Ok(Term::number(0));
                }
                self.note_reference(index);
                let symbol = self.symbols.get(index);
                let value = symbol.value & WORD_MASK;
                let mri = symbol.is_mri();
                let defined = symbol.is_defined();
                if !defined && self.pass == Pass::Two {
                    self.error(Diagnostic::Undefined, column)?;
                }
                Ok(Term { value, mri })
            }
            b'0'..=b'9' => self.number_term(&lexeme, column),
            b'.' => Ok(Term::number(self.relocated_clc().word())),
            b'"' => {
                if lexeme.len() == 2 {
                    Ok(Term::number(u16::from(lexeme[1]) | 0o200))
                } else {
                    self.error(Diagnostic::IllegalCharacter, column)?;
                    Ok(Term::number(0))
                }
            }
            b'(' => self.literal_element(false, column),
            b'[' => self.literal_element(true, column),
            b'-' => {
                if !self.lexer.next_lexeme_strict() {
                    self.error(Diagnostic::IllegalBlank, self.lexer.column())?;
                    return Ok(Term::number(0));
                }
                let operand = self.element()?;
                Ok(Term::number(0u16.wrapping_sub(operand.value) & WORD_MASK))
            }
            b'+' => {
                if !self.lexer.next_lexeme_strict() {
                    self.error(Diagnostic::IllegalBlank, self.lexer.column())?;
                    return Ok(Term::number(0));
                }
                let operand = self.element()?;
                Ok(Term::number(operand.value))
            }
            _ => {
                self.error(Diagnostic::IllegalCharacter, column)?;
                Ok(Term::number(0))
            }
        }
    }

    /// A digit run in the current radix.
    fn number_term(&mut self, lexeme: &[u8], column: usize) -> Result<Term, AssembleError> {
        let base = self.radix.base();
        let mut value: u16 = 0;
        let mut bad_digit = false;
        let mut bad_char = false;
        for &byte in lexeme {
            if byte.is_ascii_digit() {
                let digit = u16::from(byte - b'0');
                if digit >= base {
                    bad_digit = true;
                }
                value = value.wrapping_mul(base).wrapping_add(digit) & WORD_MASK;
            } else {
                bad_char = true;
            }
        }
        if bad_char {
            self.error(Diagnostic::IllegalCharacter, column)?;
        } else if bad_digit {
            self.error(Diagnostic::NotInRadix, column)?;
        }
        Ok(Term::number(value))
    }

    /// `(expr)` or `[expr]`: pool the value, yield its address. The
    /// closing bracket is optional.
    fn literal_element(&mut self, page_zero: bool, column: usize) -> Result<Term, AssembleError> {
        self.lexer.next_lexeme();
        if self.lexer.lexeme().is_empty() {
            self.error(Diagnostic::IllegalExpression, column)?;
            return Ok(Term::number(0));
        }
        let inner = self.exprs()?;
        let closing = if page_zero { b']' } else { b')' };
        self.lexer.take_significant(closing);

        let address = if page_zero {
            self.pool_zero(inner.value, column)?
        } else {
            self.pool_current(inner.value, column)?
        };
        Ok(Term::number(address))
    }

    /// Pool on the current page; on page zero the two pools coincide.
    fn pool_current(&mut self, value: u16, column: usize) -> Result<u16, AssembleError> {
        if self.clc.page() == 0 {
            return self.pool_zero(value, column);
        }
        let insertion = self.page_pool.insert(value, self.clc.offset());
        if insertion.overflow {
            self.error(Diagnostic::PageExceeded, column)?;
        }
        Ok(self.page_pool.base() | insertion.offset)
    }

    fn pool_zero(&mut self, value: u16, column: usize) -> Result<u16, AssembleError> {
        let code_offset = if self.clc.page() == 0 {
            self.clc.offset()
        } else {
            0
        };
        let insertion = self.zero_pool.insert(value, code_offset);
        if insertion.overflow {
            self.error(Diagnostic::PageZeroExceeded, column)?;
        }
        Ok(insertion.offset)
    }

    /// Attach an operand address to a memory-reference instruction.
    fn fuse(
        &mut self,
        opcode: u16,
        target: u16,
        column: usize,
        indirect: &mut bool,
    ) -> Result<u16, AssembleError> {
        let target = target & WORD_MASK;
        if target < PAGE_WORDS {
            return Ok(opcode | target);
        }
        if target >> 7 == self.relocated_clc().word() >> 7 {
            return Ok(opcode | PAGE_BIT | (target & OFFSET_MASK));
        }
        if self.options.generate_links && opcode & INDIRECT_BIT == 0 {
            let address = self.pool_current(target, column)?;
            *indirect = true;
            return Ok(opcode | INDIRECT_BIT | PAGE_BIT | (address & OFFSET_MASK));
        }
        let diag = if opcode & INDIRECT_BIT != 0 {
            Diagnostic::IllegalIndirect
        } else {
            Diagnostic::OffPage
        };
        self.error(diag, column)?;
        Ok(opcode | (target & OFFSET_MASK))
    }
}

#[cfg(test)]
mod tests {
    use yare::parameterized;

    use super::super::tests::assemble;
    use super::super::tests::assemble_with;
    use super::super::tests::bin_words;
    use super::super::Options;

    fn first_word(source: &str) -> u16 {
        let assembly = assemble(source);
        bin_words(&assembly.object)[0].1
    }

    #[parameterized(
        add = { "*200\n2+3\n$\n", 0o5 },
        subtract = { "*200\n7-3\n$\n", 0o4 },
        multiply = { "*200\n3^4\n$\n", 0o14 },
        divide = { "*200\n17%2\n$\n", 0o7 },
        and = { "*200\n17&6\n$\n", 0o6 },
        or = { "*200\n10!3\n$\n", 0o13 },
        left_associative = { "*200\n2+3^2\n$\n", 0o12 },
        unary_minus = { "*200\n-1\n$\n", 0o7776 },
        quoted_character = { "*200\n\"A\n$\n", 0o301 },
        dot_is_here = { "*200\n.\n$\n", 0o200 },
        dot_in_arithmetic = { "*200\nJMP .-0\n$\n", 0o5200 },
    )]
    fn expression_values(source: &str, expected: u16) {
        assert_eq!(first_word(source), expected);
    }

    #[test]
    fn blank_separated_terms_or_together() {
        assert_eq!(first_word("*200\nCLA IAC\n$\n"), 0o7201);
    }

    #[test]
    fn division_by_zero_is_diagnosed() {
        let assembly = assemble("*200\n5%0\nHLT\n$\n");

        assert!(assembly.errors.contains("illegal expression"));
    }

    #[test]
    fn octal_is_the_default_radix() {
        assert_eq!(first_word("*200\n100\n$\n"), 0o100);
    }

    #[test]
    fn decimal_digits_under_octal_are_diagnosed() {
        let assembly = assemble("*200\n9\n$\n");

        assert!(assembly.errors.contains("number not in current radix"));
        assert!(assembly.listing.contains("IC radix"));
    }

    #[test]
    fn current_page_literal_lands_at_the_top_of_the_page() {
        let assembly = assemble("*200\nTAD (123)\nHLT\n$\n");

        assert_eq!(
            bin_words(&assembly.object),
            [(0o200, 0o1377), (0o201, 0o7402), (0o377, 0o0123)]
        );
    }

    #[test]
    fn page_zero_literal_lands_at_the_top_of_page_zero() {
        let assembly = assemble("*200\nTAD [7]\nHLT\n$\n");

        assert_eq!(
            bin_words(&assembly.object),
            [(0o200, 0o1177), (0o201, 0o7402), (0o177, 0o0007)]
        );
    }

    #[test]
    fn equal_literals_share_a_word() {
        let assembly = assemble("*200\nTAD (55)\nTAD (55)\nTAD (66)\n$\n");

        let words = bin_words(&assembly.object);
        assert_eq!(words[0].1, words[1].1);
        assert_eq!(
            &words[3..],
            [(0o376, 0o0066), (0o377, 0o0055)]
        );
    }

    #[test]
    fn off_page_reference_without_links_is_diagnosed() {
        let assembly = assemble("*200\nTAD FAR\n*400\nFAR, 7\n$\n");

        assert!(assembly.errors.contains("off-page reference"));
    }

    #[test]
    fn off_page_reference_with_links_goes_through_a_literal() {
        let assembly = assemble_with(
            "*200\nTAD FAR\nHLT\n*400\nFAR, 7\n$\n",
            Options {
                generate_links: true,
                ..Options::default()
            },
        );

        // the instruction defers through a literal holding FAR's address
        let words = bin_words(&assembly.object);
        assert_eq!(words[0], (0o200, 0o1777));
        assert!(words.contains(&(0o377, 0o0400)));
        assert!(assembly.listing.contains('@'));
        assert!(assembly.errors.is_empty());
    }

    #[test]
    fn double_indirection_through_a_link_is_illegal() {
        let assembly = assemble_with(
            "*200\nTAD I FAR\n*400\nFAR, 7\n$\n",
            Options {
                generate_links: true,
                ..Options::default()
            },
        );

        assert!(assembly.errors.contains("illegal indirect"));
    }

    #[test]
    fn blank_after_an_operator_is_illegal() {
        let assembly = assemble("*200\nTAD A- 1\nA, 0\n$\n");

        assert!(assembly.errors.contains("illegal blank"));
    }

    #[test]
    fn pseudo_op_in_an_expression_is_illegal() {
        let assembly = assemble("*200\nTAD PAGE\n$\n");

        assert!(assembly.errors.contains("illegal expression"));
    }
}
