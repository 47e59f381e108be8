//! Core bytecode structures: opcodes and the `Chunk` container.
//!
//! A chunk is an append-only byte stream, a constant pool addressed by a
//! one-byte index, and a position per code byte for diagnostics. Multi-byte
//! operands (jump offsets) are two bytes, big-endian, relative to the byte
//! right after the operand.

use core::fmt;

use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{value::Value, Position};

/// Maximum number of constants in one chunk (the index is a single byte).
pub const MAX_CONSTANTS: usize = 256;

/// One-byte opcodes, in their stable assigned order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum OpCode {
    /// Return from the current function.
    Return,
    /// `a + b` (numbers or strings).
    Add,
    /// `a - b`.
    Subtract,
    /// `a * b`.
    Multiply,
    /// `a / b`.
    Divide,
    /// Push constant `[u8 index]`.
    Constant,
    /// Arithmetic negation.
    Negate,
    /// Push `null`.
    Null,
    /// Push `true`.
    True,
    /// Push `false`.
    False,
    /// Logical not.
    Not,
    /// `a == b`.
    Equal,
    /// `a > b`.
    Greater,
    /// `a < b`.
    Less,
    /// Pop and print.
    Print,
    /// Discard the top of the stack.
    Pop,
    /// Define global `[u8 name constant]`.
    DefineGlobal,
    /// Read global `[u8 name constant]`.
    GetGlobal,
    /// Read local `[u8 slot]`.
    GetLocal,
    /// Assign global `[u8 name constant]`.
    SetGlobal,
    /// Assign local `[u8 slot]`.
    SetLocal,
    /// Forward jump `[u16 offset]`.
    Jump,
    /// Forward jump if top is falsey `[u16 offset]` (does not pop).
    JumpIfFalse,
    /// Backward jump `[u16 offset]`.
    Loop,
    /// Call `[u8 argument count]`.
    Call,
}

impl OpCode {
    /// Every opcode, indexed by its byte.
    pub const ALL: [Self; 25] = [
        Self::Return,
        Self::Add,
        Self::Subtract,
        Self::Multiply,
        Self::Divide,
        Self::Constant,
        Self::Negate,
        Self::Null,
        Self::True,
        Self::False,
        Self::Not,
        Self::Equal,
        Self::Greater,
        Self::Less,
        Self::Print,
        Self::Pop,
        Self::DefineGlobal,
        Self::GetGlobal,
        Self::GetLocal,
        Self::SetGlobal,
        Self::SetLocal,
        Self::Jump,
        Self::JumpIfFalse,
        Self::Loop,
        Self::Call,
    ];

    /// Number of operand bytes following the opcode.
    pub const fn operand_len(self) -> usize {
        match self {
            Self::Constant
            | Self::DefineGlobal
            | Self::GetGlobal
            | Self::SetGlobal
            | Self::GetLocal
            | Self::SetLocal
            | Self::Call => 1,
            Self::Jump | Self::JumpIfFalse | Self::Loop => 2,
            _ => 0,
        }
    }

    /// Mnemonic used by the disassembler.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Return => "RETURN",
            Self::Add => "ADD",
            Self::Subtract => "SUBTRACT",
            Self::Multiply => "MULTIPLY",
            Self::Divide => "DIVIDE",
            Self::Constant => "CONSTANT",
            Self::Negate => "NEGATE",
            Self::Null => "NULL",
            Self::True => "TRUE",
            Self::False => "FALSE",
            Self::Not => "NOT",
            Self::Equal => "EQUAL",
            Self::Greater => "GREATER",
            Self::Less => "LESS",
            Self::Print => "PRINT",
            Self::Pop => "POP",
            Self::DefineGlobal => "DEFINE_GLOBAL",
            Self::GetGlobal => "GET_GLOBAL",
            Self::GetLocal => "GET_LOCAL",
            Self::SetGlobal => "SET_GLOBAL",
            Self::SetLocal => "SET_LOCAL",
            Self::Jump => "JUMP",
            Self::JumpIfFalse => "JUMP_IF_FALSE",
            Self::Loop => "LOOP",
            Self::Call => "CALL",
        }
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> Self { op as Self }
}

impl TryFrom<u8> for OpCode {
    type Error = ChunkError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Self::ALL.get(usize::from(byte)).copied().ok_or(ChunkError::UnknownOpcode(byte))
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.mnemonic()) }
}

/// Errors raised while building or decoding a chunk.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ChunkError {
    /// The constant pool is full.
    #[error("Too many constants in one chunk.")]
    TooManyConstants,
    /// A forward jump does not fit in 16 bits.
    #[error("Too much code to jump over.")]
    JumpTooLarge,
    /// A backward jump does not fit in 16 bits.
    #[error("Loop body too large.")]
    LoopTooLarge,
    /// A byte that is not an opcode.
    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),
}

/// A compiled function body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    /// Bytecode stream.
    pub code: Vec<u8>,
    /// Constant pool (at most `MAX_CONSTANTS` entries).
    pub constants: Vec<Value>,
    /// Source position of each code byte.
    pub positions: Vec<Position>,
}

impl Chunk {
    /// Empty chunk.
    pub const fn new() -> Self {
        Self { code: Vec::new(), constants: Vec::new(), positions: Vec::new() }
    }

    /// Code length in bytes.
    pub fn len(&self) -> usize { self.code.len() }

    /// True if no code was emitted.
    pub fn is_empty(&self) -> bool { self.code.is_empty() }

    /// Appends a raw byte.
    pub fn write(&mut self, byte: u8, pos: Position) {
        self.code.push(byte);
        self.positions.push(pos);
    }

    /// Appends an opcode.
    pub fn write_op(&mut self, op: OpCode, pos: Position) { self.write(op.into(), pos); }

    /// Adds a constant and returns its index.
    pub fn add_constant(&mut self, value: Value) -> Result<u8, ChunkError> {
        let index = u8::try_from(self.constants.len()).map_err(|_| ChunkError::TooManyConstants)?;
        self.constants.push(value);
        Ok(index)
    }

    /// Index of an existing constant equal to `value`.
    pub fn find_constant(&self, value: Value) -> Option<u8> {
        self.constants.iter().position(|c| *c == value).and_then(|i| u8::try_from(i).ok())
    }

    /// Constant at `index`.
    pub fn constant(&self, index: u8) -> Option<Value> { self.constants.get(usize::from(index)).copied() }

    /// Emits `op` followed by a `0xffff` placeholder; returns the placeholder offset.
    pub fn write_jump(&mut self, op: OpCode, pos: Position) -> usize {
        self.write_op(op, pos);
        self.write(0xff, pos);
        self.write(0xff, pos);
        self.code.len() - 2
    }

    /// Patches the placeholder at `offset` to land on the current end of code.
    pub fn patch_jump(&mut self, offset: usize) -> Result<(), ChunkError> {
        let jump = self.code.len() - offset - 2;
        let jump = u16::try_from(jump).map_err(|_| ChunkError::JumpTooLarge)?;
        self.code[offset..offset + 2].copy_from_slice(&jump.to_be_bytes());
        Ok(())
    }

    /// Emits a backward jump to `loop_start`.
    pub fn write_loop(&mut self, loop_start: usize, pos: Position) -> Result<(), ChunkError> {
        self.write_op(OpCode::Loop, pos);
        let offset = self.code.len() - loop_start + 2;
        let offset = u16::try_from(offset).map_err(|_| ChunkError::LoopTooLarge)?;
        let [hi, lo] = offset.to_be_bytes();
        self.write(hi, pos);
        self.write(lo, pos);
        Ok(())
    }

    /// Reads a big-endian `u16` operand at `offset`.
    pub fn read_u16(&self, offset: usize) -> u16 {
        u16::from_be_bytes([self.code[offset], self.code[offset + 1]])
    }

    /// Position of the byte at `offset` (start of file if out of range).
    pub fn position_at(&self, offset: usize) -> Position {
        self.positions.get(offset).copied().unwrap_or_default()
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const P: Position = Position::START;

    #[test]
    fn opcode_byte_roundtrip() {
        for (i, op) in OpCode::ALL.iter().enumerate() {
            assert_eq!(u8::from(*op) as usize, i);
            assert_eq!(OpCode::try_from(u8::from(*op)), Ok(*op));
        }
        assert_eq!(OpCode::try_from(200), Err(ChunkError::UnknownOpcode(200)));
    }

    #[test]
    fn constant_pool_is_capped() {
        let mut c = Chunk::new();
        for i in 0..MAX_CONSTANTS {
            assert_eq!(c.add_constant(Value::Int(i as i64)), Ok(i as u8));
        }
        assert_eq!(c.add_constant(Value::Null), Err(ChunkError::TooManyConstants));
        assert_eq!(c.find_constant(Value::Int(17)), Some(17));
    }

    #[test]
    fn forward_jump_lands_after_patch_point() {
        let mut c = Chunk::new();
        let at = c.write_jump(OpCode::JumpIfFalse, P);
        c.write_op(OpCode::Pop, P);
        c.write_op(OpCode::Null, P);
        c.patch_jump(at).unwrap();
        assert_eq!(c.read_u16(at), 2);
        // ip after the operand + offset == end of code
        assert_eq!(at + 2 + usize::from(c.read_u16(at)), c.len());
    }

    #[test]
    fn loop_jumps_back_to_start() {
        let mut c = Chunk::new();
        c.write_op(OpCode::Null, P);
        let start = c.len();
        c.write_op(OpCode::Pop, P);
        c.write_op(OpCode::Null, P);
        c.write_loop(start, P).unwrap();
        let operand = c.len() - 2;
        assert_eq!(c.len() - usize::from(c.read_u16(operand)), start);
    }

    #[test]
    fn oversized_jump_is_an_error() {
        let mut c = Chunk::new();
        let at = c.write_jump(OpCode::Jump, P);
        for _ in 0..=usize::from(u16::MAX) {
            c.write_op(OpCode::Pop, P);
        }
        assert_eq!(c.patch_jump(at), Err(ChunkError::JumpTooLarge));
        assert_eq!(c.write_loop(0, P), Err(ChunkError::LoopTooLarge));
    }

    #[test]
    fn positions_follow_code() {
        let mut c = Chunk::new();
        c.write_op(OpCode::Null, Position::new(1, 1));
        c.write_op(OpCode::Return, Position::new(2, 5));
        assert_eq!(c.positions.len(), c.code.len());
        assert_eq!(c.position_at(1), Position::new(2, 5));
    }
}
