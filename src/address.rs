use std::fmt;

/// Mask of a 12-bit machine word.
pub const WORD_MASK: u16 = 0o7777;
/// Number of words in one page.
pub const PAGE_WORDS: u16 = 0o200;
/// Mask of the 7-bit in-page offset.
pub const OFFSET_MASK: u16 = 0o177;
/// Bit set in an instruction to select "current page" addressing.
pub const PAGE_BIT: u16 = 0o200;
/// Bit set in an instruction to defer through the operand address.
pub const INDIRECT_BIT: u16 = 0o400;

/// A 15-bit program location: a 3-bit memory field plus a 12-bit word
/// address inside that field.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub struct Address(u16);

impl Address {
    pub const fn new(field: u16, word: u16) -> Self {
        Address(((field & 0o7) << 12) | (word & WORD_MASK))
    }

    pub const fn from_bits(bits: u16) -> Self {
        Address(bits & 0o77777)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn field(self) -> u16 {
        self.0 >> 12
    }

    pub fn word(self) -> u16 {
        self.0 & WORD_MASK
    }

    /// The 5-bit page number inside the field.
    pub fn page(self) -> u16 {
        self.word() >> 7
    }

    /// The 7-bit offset inside the page.
    pub fn offset(self) -> u16 {
        self.0 & OFFSET_MASK
    }

    /// First word of the page this address lies on.
    pub fn page_base(self) -> u16 {
        self.word() & !OFFSET_MASK & WORD_MASK
    }

    pub fn with_word(self, word: u16) -> Self {
        Address::new(self.field(), word)
    }

    /// Advance by one word, wrapping inside the field.
    pub fn step(self) -> Self {
        self.with_word(self.word().wrapping_add(1))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:o}{:04o}", self.field(), self.word())
    }
}
