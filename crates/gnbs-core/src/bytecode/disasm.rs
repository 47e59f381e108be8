//! Minimal textual disassembly helpers used by the CLI and the VM trace.

use core::fmt::Write;

use crate::{
    bytecode::chunk::{Chunk, OpCode},
    heap::{FnRef, Heap},
    value::Value,
};

/// Multi-line disassembly of one chunk, with a title header.
pub fn disassemble(chunk: &Chunk, heap: &Heap, title: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {title} == (consts={}, bytes={})", chunk.constants.len(), chunk.len());
    let mut offset = 0;
    while offset < chunk.len() {
        offset = disassemble_instruction(chunk, heap, offset, &mut out);
        out.push('\n');
    }
    out
}

/// Disassembly of the script and every function reachable through its constants.
pub fn disassemble_program(heap: &Heap, script: FnRef) -> String {
    let mut out = String::new();
    let mut pending = vec![script];
    while let Some(f) = pending.pop() {
        let function = heap.function(f);
        let title = heap.function_name(f).map_or_else(|| String::from("<script>"), |n| format!("<fn {n}>"));
        out.push_str(&disassemble(&function.chunk, heap, &title));
        // reverse keeps declaration order when popping
        for c in function.chunk.constants.iter().rev() {
            if let Value::Function(nested) = *c {
                pending.push(nested);
            }
        }
    }
    out
}

/// Writes the instruction at `offset` (no trailing newline); returns the next offset.
pub fn disassemble_instruction(chunk: &Chunk, heap: &Heap, offset: usize, out: &mut String) -> usize {
    let pos = chunk.position_at(offset);
    let _ = write!(out, "{offset:04} | {:>7} | ", pos.to_string());

    let op = match OpCode::try_from(chunk.code[offset]) {
        Ok(op) => op,
        Err(e) => {
            let _ = write!(out, "{e}");
            return offset + 1;
        }
    };
    if offset + op.operand_len() >= chunk.len() && op.operand_len() > 0 {
        let _ = write!(out, "{:<16} <truncated>", op.mnemonic());
        return chunk.len();
    }

    match op {
        OpCode::Constant | OpCode::DefineGlobal | OpCode::GetGlobal | OpCode::SetGlobal => {
            let index = chunk.code[offset + 1];
            let shown = chunk.constant(index).map_or_else(|| String::from("?"), |v| show_const(heap, v));
            let _ = write!(out, "{:<16} {index:4} '{shown}'", op.mnemonic());
            offset + 2
        }
        OpCode::GetLocal | OpCode::SetLocal | OpCode::Call => {
            let _ = write!(out, "{:<16} {:4}", op.mnemonic(), chunk.code[offset + 1]);
            offset + 2
        }
        OpCode::Jump | OpCode::JumpIfFalse | OpCode::Loop => {
            let jump = usize::from(chunk.read_u16(offset + 1));
            let next = offset + 3;
            let target = if op == OpCode::Loop { next.saturating_sub(jump) } else { next + jump };
            let _ = write!(out, "{:<16} {offset:4} -> {target}", op.mnemonic());
            next
        }
        _ => {
            out.push_str(op.mnemonic());
            offset + 1
        }
    }
}

fn show_const(heap: &Heap, value: Value) -> String {
    let s = heap.display(value).to_string();
    if s.chars().count() <= 64 {
        s
    } else {
        let head: String = s.chars().take(64).collect();
        format!("{head}…")
    }
}
