//! The permanent symbol catalogue seeded into every fresh symbol table.
//!
//! The memory-reference opcodes (and the `I`/`Z` modifiers, which combine
//! into them) carry the MRI type so the evaluator can fuse operand
//! addresses; everything else is a plain fixed value.

/// Memory-reference instructions and their modifiers.
pub(super) const MRI: &[(&str, u16)] = &[
    ("AND", 0o0000),
    ("TAD", 0o1000),
    ("ISZ", 0o2000),
    ("DCA", 0o3000),
    ("JMS", 0o4000),
    ("JMP", 0o5000),
    ("I", 0o0400),
    ("Z", 0o0000),
];

/// Operate microinstructions, EAE, and the common IOTs.
pub(super) const FIXED: &[(&str, u16)] = &[
    // group 1
    ("NOP", 0o7000),
    ("IAC", 0o7001),
    ("BSW", 0o7002),
    ("RAL", 0o7004),
    ("RTL", 0o7006),
    ("RAR", 0o7010),
    ("RTR", 0o7012),
    ("CML", 0o7020),
    ("CMA", 0o7040),
    ("CIA", 0o7041),
    ("CLL", 0o7100),
    ("STL", 0o7120),
    ("CLA", 0o7200),
    ("GLK", 0o7204),
    ("STA", 0o7240),
    // group 2
    ("HLT", 0o7402),
    ("OSR", 0o7404),
    ("SKP", 0o7410),
    ("SNL", 0o7420),
    ("SZL", 0o7430),
    ("SZA", 0o7440),
    ("SNA", 0o7450),
    ("SMA", 0o7500),
    ("SPA", 0o7510),
    ("LAS", 0o7604),
    // EAE
    ("SCL", 0o7403),
    ("MUY", 0o7405),
    ("DVI", 0o7407),
    ("NMI", 0o7411),
    ("SHL", 0o7413),
    ("ASR", 0o7415),
    ("LSR", 0o7417),
    ("MQL", 0o7421),
    ("SCA", 0o7441),
    ("MQA", 0o7501),
    ("SWP", 0o7521),
    ("CAM", 0o7621),
    // processor IOTs
    ("SKON", 0o6000),
    ("ION", 0o6001),
    ("IOF", 0o6002),
    ("SRQ", 0o6003),
    ("GTF", 0o6004),
    ("RTF", 0o6005),
    ("SGT", 0o6006),
    ("CAF", 0o6007),
    // high-speed reader and punch
    ("RSF", 0o6011),
    ("RRB", 0o6012),
    ("RFC", 0o6014),
    ("PSF", 0o6021),
    ("PCF", 0o6022),
    ("PPC", 0o6024),
    ("PLS", 0o6026),
    // console keyboard and teleprinter
    ("KCF", 0o6030),
    ("KSF", 0o6031),
    ("KCC", 0o6032),
    ("KRS", 0o6034),
    ("KIE", 0o6035),
    ("KRB", 0o6036),
    ("TFL", 0o6040),
    ("TSF", 0o6041),
    ("TCF", 0o6042),
    ("TPC", 0o6044),
    ("TSK", 0o6045),
    ("TLS", 0o6046),
    // extended memory
    ("CDF", 0o6201),
    ("CIF", 0o6202),
    ("RDF", 0o6214),
    ("RIF", 0o6224),
    ("RIB", 0o6234),
    ("RMF", 0o6244),
];

/// Pseudo-op names. These survive EXPUNGE; only the first six characters
/// of a name are significant.
pub(super) const PSEUDO: &[&str] = &[
    "BANK", "BINPUNCH", "DECIMAL", "DUBL", "EJECT", "ENPUNCH", "EXPUNGE", "FIELD", "FIXMRI",
    "FIXTAB", "FLTG", "IFDEF", "IFNDEF", "IFNZERO", "IFZERO", "NOPUNCH", "OCTAL", "PAGE", "PAUSE",
    "RELOC", "RIMPUNCH", "SEGMNT", "TEXT", "TITLE", "XLIST", "ZBLOCK",
];
