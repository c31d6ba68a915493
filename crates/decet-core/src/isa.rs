//! Closed instruction set and operand-type tables.
//!
//! Any mnemonic, operand count, or operand-type/opcode pairing not admitted
//! by the tables in this module is illegal by definition. Mnemonic matching
//! is exact (lowercase): `MOV` is not a mnemonic, it is a label candidate.

/// Lowest accepted immediate operand value.
pub const IMMEDIATE_MIN: i16 = -127;

/// Highest accepted immediate operand value.
pub const IMMEDIATE_MAX: i16 = 127;

/// First addressable struct field.
pub const STRUCT_FIELD_MIN: i16 = 1;

/// Last addressable struct field.
pub const STRUCT_FIELD_MAX: i16 = 2;

/// The 16 machine opcodes with their assigned 4-bit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Opcode {
    Mov = 0x0,
    Cmp = 0x1,
    Add = 0x2,
    Sub = 0x3,
    Not = 0x4,
    Clr = 0x5,
    Lea = 0x6,
    Inc = 0x7,
    Dec = 0x8,
    Jmp = 0x9,
    Bne = 0xA,
    Get = 0xB,
    Prn = 0xC,
    Jsr = 0xD,
    Rts = 0xE,
    Hlt = 0xF,
}

impl Opcode {
    /// All opcodes in code order.
    pub const ALL: [Self; 16] = [
        Self::Mov,
        Self::Cmp,
        Self::Add,
        Self::Sub,
        Self::Not,
        Self::Clr,
        Self::Lea,
        Self::Inc,
        Self::Dec,
        Self::Jmp,
        Self::Bne,
        Self::Get,
        Self::Prn,
        Self::Jsr,
        Self::Rts,
        Self::Hlt,
    ];

    /// Returns the assigned 4-bit opcode value.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Converts a 4-bit code back into an opcode.
    #[must_use]
    pub const fn from_u4(code: u8) -> Option<Self> {
        match code {
            0x0 => Some(Self::Mov),
            0x1 => Some(Self::Cmp),
            0x2 => Some(Self::Add),
            0x3 => Some(Self::Sub),
            0x4 => Some(Self::Not),
            0x5 => Some(Self::Clr),
            0x6 => Some(Self::Lea),
            0x7 => Some(Self::Inc),
            0x8 => Some(Self::Dec),
            0x9 => Some(Self::Jmp),
            0xA => Some(Self::Bne),
            0xB => Some(Self::Get),
            0xC => Some(Self::Prn),
            0xD => Some(Self::Jsr),
            0xE => Some(Self::Rts),
            0xF => Some(Self::Hlt),
            _ => None,
        }
    }

    /// Returns the source-text mnemonic for this opcode.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Mov => "mov",
            Self::Cmp => "cmp",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Not => "not",
            Self::Clr => "clr",
            Self::Lea => "lea",
            Self::Inc => "inc",
            Self::Dec => "dec",
            Self::Jmp => "jmp",
            Self::Bne => "bne",
            Self::Get => "get",
            Self::Prn => "prn",
            Self::Jsr => "jsr",
            Self::Rts => "rts",
            Self::Hlt => "hlt",
        }
    }

    /// Resolves a mnemonic string. Matching is exact.
    #[must_use]
    pub fn from_mnemonic(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.mnemonic() == name)
    }

    /// Number of operands this opcode requires (0, 1, or 2).
    #[must_use]
    pub const fn operand_count(self) -> u8 {
        match self {
            Self::Mov | Self::Cmp | Self::Add | Self::Sub => 2,
            Self::Rts | Self::Hlt => 0,
            _ => 1,
        }
    }
}

/// Operand type codes as they appear in the instruction word's 2-bit fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum OperandKind {
    /// `#n` literal value.
    Immediate = 0b00,
    /// Bare label reference.
    Label = 0b01,
    /// `label.field` struct field access.
    StructField = 0b10,
    /// `r0`..`r7` register direct.
    Register = 0b11,
}

impl OperandKind {
    /// Returns the 2-bit type code.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Converts a 2-bit type code back into an operand kind.
    #[must_use]
    pub const fn from_u2(code: u8) -> Option<Self> {
        match code {
            0b00 => Some(Self::Immediate),
            0b01 => Some(Self::Label),
            0b10 => Some(Self::StructField),
            0b11 => Some(Self::Register),
            _ => None,
        }
    }
}

impl std::fmt::Display for OperandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Immediate => "immediate",
            Self::Label => "label",
            Self::StructField => "struct",
            Self::Register => "register",
        };
        write!(f, "{name}")
    }
}

/// Whether `kind` is a legal SOURCE operand type for `op`.
///
/// Immediate and register sources are accepted only by the two-operand
/// arithmetic/move group; label and struct sources additionally by `lea`.
#[must_use]
pub const fn source_kind_is_legal(op: Opcode, kind: OperandKind) -> bool {
    match kind {
        OperandKind::Immediate | OperandKind::Register => {
            matches!(op, Opcode::Mov | Opcode::Cmp | Opcode::Add | Opcode::Sub)
        }
        OperandKind::Label | OperandKind::StructField => matches!(
            op,
            Opcode::Mov | Opcode::Cmp | Opcode::Add | Opcode::Sub | Opcode::Lea
        ),
    }
}

/// Whether `kind` is a legal DESTINATION operand type for `op`.
///
/// Only `cmp` and `prn` accept an immediate destination; every kind is
/// rejected by the zero-operand opcodes.
#[must_use]
pub const fn destination_kind_is_legal(op: Opcode, kind: OperandKind) -> bool {
    match kind {
        OperandKind::Immediate => matches!(op, Opcode::Cmp | Opcode::Prn),
        OperandKind::Label | OperandKind::StructField | OperandKind::Register => {
            !matches!(op, Opcode::Rts | Opcode::Hlt)
        }
    }
}

/// Whether `name` is a register name (`r0`..`r7`).
#[must_use]
pub fn is_register_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next() == Some('r')
        && chars.next().is_some_and(|c| ('0'..='7').contains(&c))
        && chars.next().is_none()
}

/// Whether `name` collides with a mnemonic or a register name and is
/// therefore unusable as a label or macro name.
#[must_use]
pub fn is_reserved_word(name: &str) -> bool {
    Opcode::from_mnemonic(name).is_some() || is_register_name(name)
}
