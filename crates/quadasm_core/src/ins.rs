//! Instruction and data word types, the opcode table, and per-opcode
//! addressing-mode legality (Table 1).

use quadasm_util::base4;

/// The sixteen opcodes, numbered in the machine's native order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Mov = 0,
    Cmp = 1,
    Add = 2,
    Sub = 3,
    Lea = 4,
    Clr = 5,
    Not = 6,
    Inc = 7,
    Dec = 8,
    Jmp = 9,
    Bne = 10,
    Jsr = 11,
    Red = 12,
    Prn = 13,
    Rts = 14,
    Stop = 15,
}

impl Opcode {
    pub fn from_mnemonic(s: &str) -> Option<Self> {
        use Opcode::*;
        Some(match s {
            "mov" => Mov,
            "cmp" => Cmp,
            "add" => Add,
            "sub" => Sub,
            "lea" => Lea,
            "clr" => Clr,
            "not" => Not,
            "inc" => Inc,
            "dec" => Dec,
            "jmp" => Jmp,
            "bne" => Bne,
            "jsr" => Jsr,
            "red" => Red,
            "prn" => Prn,
            "rts" => Rts,
            "stop" => Stop,
            _ => return None,
        })
    }

    pub fn code(self) -> u32 {
        self as u32
    }

    /// Legal addressing modes for the source operand, empty if the opcode
    /// takes no source.
    pub fn src_modes(self) -> &'static [AddressingMode] {
        use AddressingMode::*;
        use Opcode::*;
        match self {
            Mov | Cmp | Add | Sub => &[Immediate, Direct, Matrix, Register],
            Lea => &[Direct, Matrix],
            _ => &[],
        }
    }

    /// Legal addressing modes for the destination operand, empty if the
    /// opcode takes no destination.
    pub fn dst_modes(self) -> &'static [AddressingMode] {
        use AddressingMode::*;
        use Opcode::*;
        match self {
            Mov | Add | Sub | Lea | Clr | Not | Inc | Dec | Red | Jmp | Bne | Jsr => {
                &[Direct, Matrix, Register]
            }
            Cmp | Prn => &[Immediate, Direct, Matrix, Register],
            Rts | Stop => &[],
        }
    }

    pub fn operand_count(self) -> usize {
        let has_src = !self.src_modes().is_empty();
        let has_dst = !self.dst_modes().is_empty();
        has_src as usize + has_dst as usize
    }
}

/// Addressing modes, numbered as they appear in an encoded instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    Immediate = 0,
    Direct = 1,
    Matrix = 2,
    Register = 3,
}

impl AddressingMode {
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// A general-purpose register, `r0` through `r7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register(pub u8);

impl Register {
    pub fn parse(s: &str) -> Option<Self> {
        let digit = s.strip_prefix('r')?;
        let n: u8 = digit.parse().ok()?;
        (n <= 7).then_some(Register(n))
    }
}

/// One operand as written in source, before the symbol table resolves any
/// label it names.
#[derive(Debug, Clone)]
pub enum Operand {
    Immediate(i32),
    Direct(String),
    Matrix(String, Register, Register),
    Register(Register),
}

impl Operand {
    pub fn mode(&self) -> AddressingMode {
        match self {
            Operand::Immediate(_) => AddressingMode::Immediate,
            Operand::Direct(_) => AddressingMode::Direct,
            Operand::Matrix(..) => AddressingMode::Matrix,
            Operand::Register(_) => AddressingMode::Register,
        }
    }
}

/// Absolute/External/Relocatable tag carried by every encoded word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Are {
    Absolute = 0,
    External = 1,
    Relocatable = 2,
}

impl Are {
    pub fn code(self) -> u32 {
        self as u32
    }
}

/// One word of the instruction image, in whichever of the three shapes a
/// machine word can take.
#[derive(Debug, Clone)]
pub enum InstructionWord {
    /// The opcode word itself: opcode plus both addressing modes.
    Command { opcode: Opcode, src_mode: Option<AddressingMode>, dst_mode: Option<AddressingMode> },
    /// A shared word for two register operands (src in the high nibble).
    Registers { src: Register, dst: Register },
    /// A single register operand, sharing the word layout with `Registers`
    /// by putting the lone register in the dst half.
    Register { reg: Register, dst: bool },
    /// An address payload with its ARE tag: a resolved label, an immediate
    /// value, or a matrix index pair packed by the caller.
    Address { value: i32, are: Are },
}

/// One word of the data image (from `.data`, `.string`, or `.mat`).
#[derive(Debug, Clone, Copy)]
pub struct DataWord(pub i32);

/// A record of one place an external symbol was used, for the `.ext` file.
#[derive(Debug, Clone)]
pub struct ExternalUse {
    pub name: String,
    pub address: i32,
}

/// Field width, in base-4 digits, of an encoded machine word.
pub const WORD_DIGITS: usize = 5;

/// Words an operand occupies on its own: one, except a matrix reference,
/// which needs a second word for its two register indices.
pub fn operand_word_count(op: &Operand) -> usize {
    match op {
        Operand::Matrix(..) => 2,
        _ => 1,
    }
}

/// Total words (including the command word) an instruction occupies. Two
/// register operands share a single word.
pub fn total_word_count(src: Option<&Operand>, dst: Option<&Operand>) -> usize {
    let shared_registers = matches!(
        (src, dst),
        (Some(Operand::Register(_)), Some(Operand::Register(_)))
    );
    let operand_words = if shared_registers {
        1
    } else {
        src.map(operand_word_count).unwrap_or(0) + dst.map(operand_word_count).unwrap_or(0)
    };
    1 + operand_words
}

impl InstructionWord {
    /// Encode this word's 10-bit payload as 5 base-4 digits.
    pub fn encode(&self) -> String {
        match self {
            InstructionWord::Command { opcode, src_mode, dst_mode } => {
                let src = src_mode.map(AddressingMode::code).unwrap_or(0);
                let dst = dst_mode.map(AddressingMode::code).unwrap_or(0);
                let payload = (opcode.code() << 6) | (src << 4) | (dst << 2);
                base4::encode_unsigned(payload, WORD_DIGITS)
            }
            InstructionWord::Registers { src, dst } => {
                let payload = ((src.0 as u32) << 6) | ((dst.0 as u32) << 2);
                base4::encode_unsigned(payload, WORD_DIGITS)
            }
            InstructionWord::Register { reg, dst } => {
                let payload = if *dst { (reg.0 as u32) << 2 } else { (reg.0 as u32) << 6 };
                base4::encode_unsigned(payload, WORD_DIGITS)
            }
            InstructionWord::Address { value, are } => {
                let payload = ((*value as u32 & 0xFF) << 2) | are.code();
                base4::encode_unsigned(payload, WORD_DIGITS)
            }
        }
    }
}

impl DataWord {
    pub fn encode(&self) -> String {
        base4::encode_signed(self.0, WORD_DIGITS)
    }
}

#[test]
fn opcode_numeric_order_matches_machine_table() {
    assert_eq!(Opcode::Mov.code(), 0);
    assert_eq!(Opcode::Cmp.code(), 1);
    assert_eq!(Opcode::Lea.code(), 4);
    assert_eq!(Opcode::Stop.code(), 15);
}

#[test]
fn lea_only_allows_direct_and_matrix_sources() {
    assert_eq!(Opcode::Lea.src_modes(), &[AddressingMode::Direct, AddressingMode::Matrix]);
}

#[test]
fn jump_family_excludes_immediate_but_allows_matrix() {
    for op in [Opcode::Jmp, Opcode::Bne, Opcode::Jsr] {
        assert_eq!(op.dst_modes(), &[AddressingMode::Direct, AddressingMode::Matrix, AddressingMode::Register]);
    }
}

#[test]
fn register_parsing_bounds() {
    assert_eq!(Register::parse("r0"), Some(Register(0)));
    assert_eq!(Register::parse("r7"), Some(Register(7)));
    assert_eq!(Register::parse("r8"), None);
    assert_eq!(Register::parse("x1"), None);
}

#[test]
fn two_register_operands_share_one_word() {
    let src = Operand::Register(Register(1));
    let dst = Operand::Register(Register(2));
    assert_eq!(total_word_count(Some(&src), Some(&dst)), 2);
}

#[test]
fn matrix_operand_needs_two_words() {
    let dst = Operand::Matrix("M".to_string(), Register(1), Register(2));
    assert_eq!(total_word_count(None, Some(&dst)), 3);
}

#[test]
fn command_word_round_trip_through_base4() {
    let word = InstructionWord::Command {
        opcode: Opcode::Mov,
        src_mode: Some(AddressingMode::Immediate),
        dst_mode: Some(AddressingMode::Direct),
    };
    let encoded = word.encode();
    assert_eq!(encoded.len(), WORD_DIGITS);
    let decoded = base4::decode_unsigned(&encoded).unwrap();
    assert_eq!(decoded >> 6, Opcode::Mov.code());
}
