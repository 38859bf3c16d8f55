//! Source intake and lexeme segmentation.
//!
//! Lines are read one at a time into a working buffer with tabs expanded to
//! every eighth column, carriage returns stripped, letters folded to upper
//! case, and the text masked to 7-bit ASCII. A lexeme is a run of
//! alphanumerics, a quoted character (`"x`), or a single punctuation
//! character; its extent is `[lexstart, lexterm)`.

/// Longest physical line the assembler will look at.
pub const MAX_LINE: usize = 96;

const TAB_STOP: usize = 8;

pub struct Lexer {
    lines: Vec<String>,
    next: usize,
    buf: Vec<u8>,
    line_number: usize,
    cc: usize,
    lexstart: usize,
    lexterm: usize,
}

/// Space, tab, form feed, and `>` delimit lexemes. `>` is a delimiter
/// because it closes a conditional block mid-statement.
pub fn is_blank(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\x0c' | b'>')
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            lines: source.lines().map(str::to_owned).collect(),
            next: 0,
            buf: Vec::new(),
            line_number: 0,
            cc: 0,
            lexstart: 0,
            lexterm: 0,
        }
    }

    /// Restart from the first line for the second pass.
    pub fn rewind(&mut self) {
        self.next = 0;
        self.buf.clear();
        self.line_number = 0;
        self.cc = 0;
        self.lexstart = 0;
        self.lexterm = 0;
    }

    /// Load the next source line. Returns false at end of input.
    pub fn advance_line(&mut self) -> bool {
        let Some(raw) = self.lines.get(self.next) else {
            return false;
        };

        self.buf.clear();
        for ch in raw.bytes() {
            match ch {
                b'\r' => {}
                b'\t' => loop {
                    self.buf.push(b' ');
                    if self.buf.len() % TAB_STOP == 0 {
                        break;
                    }
                },
                _ => self.buf.push(ch.to_ascii_uppercase() & 0x7f),
            }
        }
        self.buf.truncate(MAX_LINE);

        self.next += 1;
        self.line_number += 1;
        self.cc = 0;
        self.lexstart = 0;
        self.lexterm = 0;
        true
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// The expanded text of the current line, as the listing shows it.
    pub fn line(&self) -> String {
        self.buf.iter().map(|&b| b as char).collect()
    }

    /// Column of the current lexeme, for caret alignment.
    pub fn column(&self) -> usize {
        self.lexstart
    }

    pub fn lexeme(&self) -> &[u8] {
        &self.buf[self.lexstart..self.lexterm]
    }

    pub fn at_end_of_line(&self) -> bool {
        self.cc >= self.buf.len()
    }

    fn skip_blanks(&mut self) {
        while self.cc < self.buf.len() && is_blank(self.buf[self.cc]) {
            self.cc += 1;
        }
    }

    /// Scan the next lexeme. At end of line the lexeme is empty.
    pub fn next_lexeme(&mut self) {
        self.skip_blanks();
        self.scan();
    }

    /// Scan the next lexeme, refusing a blank delimiter before it. Returns
    /// false if a blank had to be skipped; the lexeme is scanned anyway.
    pub fn next_lexeme_strict(&mut self) -> bool {
        let blank = self.cc < self.buf.len() && is_blank(self.buf[self.cc]);
        self.next_lexeme();
        !blank
    }

    fn scan(&mut self) {
        self.lexstart = self.cc;
        if self.cc >= self.buf.len() {
            self.lexterm = self.cc;
            return;
        }
        let first = self.buf[self.cc];
        if first.is_ascii_alphanumeric() {
            while self.cc < self.buf.len() && self.buf[self.cc].is_ascii_alphanumeric() {
                self.cc += 1;
            }
        } else if first == b'"' && self.cc + 1 < self.buf.len() {
            self.cc += 2;
        } else {
            self.cc += 1;
        }
        self.lexterm = self.cc;
    }

    /// Next significant (non-blank) character, without consuming anything.
    pub fn peek_significant(&self) -> Option<u8> {
        self.buf[self.cc..].iter().copied().find(|&b| !is_blank(b))
    }

    /// Consume the next significant character if it equals `expected`.
    pub fn take_significant(&mut self, expected: u8) -> bool {
        let mut cc = self.cc;
        while cc < self.buf.len() && is_blank(self.buf[cc]) {
            cc += 1;
        }
        if cc < self.buf.len() && self.buf[cc] == expected {
            self.cc = cc + 1;
            true
        } else {
            false
        }
    }

    /// Take one raw character, blanks included.
    pub fn take_char(&mut self) -> Option<u8> {
        let ch = self.buf.get(self.cc).copied();
        if ch.is_some() {
            self.cc += 1;
        }
        ch
    }

    pub fn peek_char(&self) -> Option<u8> {
        self.buf.get(self.cc).copied()
    }

    /// Unread the current lexeme so it is scanned again.
    pub fn push_back(&mut self) {
        self.cc = self.lexstart;
    }

    /// Unread the character just taken.
    pub fn unread_char(&mut self) {
        self.cc = self.cc.saturating_sub(1);
    }

    /// Abandon the rest of the line.
    pub fn skip_to_end(&mut self) {
        self.cc = self.buf.len();
    }
}
