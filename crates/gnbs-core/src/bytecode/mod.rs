//! Bytecode GNBS : opcodes, chunks, désassemblage.

pub mod chunk;
pub mod disasm;

pub use chunk::{Chunk, ChunkError, OpCode, MAX_CONSTANTS};
