//! gnbs-vm — machine virtuelle à pile pour GNBS
//!
//! - Une pile d'opérandes partagée ; chaque frame y possède une fenêtre qui
//!   commence au slot de l'appelé
//! - Une pile bornée de frames (`VmOptions::frames_max`) ; la dépasser est
//!   une erreur d'exécution, jamais un crash de l'hôte
//! - Globales dans une `Table`, chaînes internées dans le `Heap` de la VM
//! - Après une erreur, pile et frames sont remises à zéro ; globales et
//!   chaînes persistent (le REPL continue)
//!
//! ```
//! use gnbs_vm::Vm;
//!
//! let (mut vm, out) = Vm::with_captured_output();
//! vm.interpret("var a = 1; var b = 2; print a + b;").unwrap();
//! assert_eq!(out.get(), "3\n");
//! ```

#![deny(missing_docs)]

use core::cmp::Ordering;
use std::io::{self, Write};

use gnbs_compiler::{CompileError, Compiler, CompilerOptions};
use gnbs_core::{
    bytecode::OpCode,
    heap::{FnRef, Heap, StrRef},
    object::NativeFn,
    table::Table,
    value::Value,
};

pub mod capture;
pub mod error;
pub mod frame;
pub mod natives;

pub use capture::Captured;
pub use error::{InterpretError, RuntimeError, RuntimeErrorKind, TraceLine};
pub use frame::CallFrame;

/// Profondeur d'appel maximale par défaut.
pub const FRAMES_MAX: usize = 64;

type Step<T> = Result<T, RuntimeErrorKind>;

/* ─────────────────────────── Options ─────────────────────────── */

/// Options d'exécution.
#[derive(Debug, Clone, Copy)]
pub struct VmOptions {
    /// Un événement `trace` par instruction (pile + instruction désassemblée).
    pub trace_execution: bool,
    /// Transmis au compilateur : désassemblage en `debug`.
    pub print_code: bool,
    /// Nombre maximal de frames actives.
    pub frames_max: usize,
}

impl Default for VmOptions {
    fn default() -> Self { Self { trace_execution: false, print_code: false, frames_max: FRAMES_MAX } }
}

/* ─────────────────────────── VM ─────────────────────────── */

/// Session d'exécution : tas, globales, pile, frames suspendues, sortie.
pub struct Vm {
    heap: Heap,
    globals: Table,
    stack: Vec<Value>,
    /// Appelants suspendus ; la frame courante vit dans `run`.
    frames: Vec<CallFrame>,
    out: Box<dyn Write>,
    options: VmOptions,
}

impl Default for Vm {
    fn default() -> Self { Self::new() }
}

impl Vm {
    /// VM écrivant sur stdout, natives par défaut chargées.
    pub fn new() -> Self { Self::with_options(VmOptions::default()) }

    /// VM configurée.
    pub fn with_options(options: VmOptions) -> Self {
        let mut vm = Self {
            heap: Heap::new(),
            globals: Table::new(),
            stack: Vec::with_capacity(256),
            frames: Vec::with_capacity(options.frames_max),
            out: Box::new(io::stdout()),
            options,
        };
        for &(name, arity, func) in natives::DEFAULTS {
            vm.define_native(name, arity, func);
        }
        vm
    }

    /// Variante utile pour tests : sortie capturée.
    pub fn with_captured_output() -> (Self, Captured) {
        let cap = Captured::default();
        (Self::new().with_output(cap.clone()), cap)
    }

    /// Remplace le writer de `print`.
    #[must_use]
    pub fn with_output<W: Write + 'static>(mut self, w: W) -> Self {
        self.out = Box::new(w);
        self
    }

    /// Enregistre une native comme globale `name`.
    pub fn define_native(&mut self, name: &str, arity: Option<u8>, func: NativeFn) {
        let r = self.heap.alloc_native(name, arity, func);
        let key = self.heap.native(r).name;
        self.globals.set(key, Value::Native(r));
    }

    /// Tas de la session.
    pub const fn heap(&self) -> &Heap { &self.heap }

    /// Valeur de la globale `name`, si définie.
    pub fn global(&self, name: &str) -> Option<Value> { self.globals.get(self.heap.lookup(name)?) }

    /// Hauteur de la pile d'opérandes (0 entre deux exécutions).
    pub fn stack_len(&self) -> usize { self.stack.len() }

    /// Compile `source` dans le tas de la VM, sans l'exécuter.
    pub fn compile(&mut self, source: &str) -> Result<FnRef, CompileError> {
        Compiler::new(CompilerOptions { print_code: self.options.print_code }).compile(source, &mut self.heap)
    }

    /// Compile puis exécute `source`.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(bytes = source.len())))]
    pub fn interpret(&mut self, source: &str) -> Result<(), InterpretError> {
        let script = self.compile(source)?;
        self.execute(script)?;
        Ok(())
    }

    /// Exécute un script rendu par [`Vm::compile`] sur cette même VM.
    ///
    /// Un handle qui ne désigne pas un script de ce tas (autre VM, fonction
    /// déclarée) est refusé avec `UnknownScript`, sans trace.
    pub fn execute(&mut self, script: FnRef) -> Result<(), RuntimeError> {
        if !self.heap.get_function(script).is_some_and(|f| f.name.is_none()) {
            return Err(RuntimeError { kind: RuntimeErrorKind::UnknownScript, trace: Vec::new() });
        }
        let base = self.stack.len();
        self.stack.push(Value::Function(script));
        let mut frame = CallFrame::new(script, base);
        match self.run(&mut frame) {
            Ok(()) => {
                self.out.flush().map_err(|e| self.runtime_error(e.into(), &frame))?;
                Ok(())
            }
            Err(kind) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(target: "gnbs::vm", error = %kind, depth = self.frames.len() + 1, "runtime error");
                let err = self.runtime_error(kind, &frame);
                self.reset();
                Err(err)
            }
        }
    }

    fn reset(&mut self) {
        self.stack.clear();
        self.frames.clear();
    }

    fn runtime_error(&self, kind: RuntimeErrorKind, current: &CallFrame) -> RuntimeError {
        let trace = core::iter::once(current)
            .chain(self.frames.iter().rev())
            .map(|f| {
                let function = self.heap.function(f.function);
                TraceLine {
                    pos: function.chunk.position_at(f.current_offset()),
                    function: function.name.map(|n| self.heap.str(n).to_owned()),
                }
            })
            .collect();
        RuntimeError { kind, trace }
    }

    /* ────────── Boucle d'exécution ────────── */

    fn run(&mut self, frame: &mut CallFrame) -> Step<()> {
        loop {
            #[cfg(feature = "tracing")]
            if self.options.trace_execution {
                self.trace_instruction(frame);
            }

            let op = OpCode::try_from(self.read_byte(frame)?)?;
            match op {
                OpCode::Constant => {
                    let value = self.read_constant(frame)?;
                    self.push(value);
                }
                OpCode::Null => self.push(Value::Null),
                OpCode::True => self.push(Value::Bool(true)),
                OpCode::False => self.push(Value::Bool(false)),
                OpCode::Pop => {
                    self.pop()?;
                }

                OpCode::GetLocal => {
                    let slot = frame.base + usize::from(self.read_byte(frame)?);
                    let value = *self.stack.get(slot).ok_or(RuntimeErrorKind::StackUnderflow)?;
                    self.push(value);
                }
                OpCode::SetLocal => {
                    let slot = frame.base + usize::from(self.read_byte(frame)?);
                    let value = self.peek(0)?;
                    *self.stack.get_mut(slot).ok_or(RuntimeErrorKind::StackUnderflow)? = value;
                }
                OpCode::DefineGlobal => {
                    let name = self.read_name(frame)?;
                    let value = self.peek(0)?;
                    self.globals.set(name, value);
                    self.pop()?;
                }
                OpCode::GetGlobal => {
                    let name = self.read_name(frame)?;
                    let value = self.globals.get(name).ok_or_else(|| self.undefined(name))?;
                    self.push(value);
                }
                OpCode::SetGlobal => {
                    let name = self.read_name(frame)?;
                    let value = self.peek(0)?;
                    if self.globals.set(name, value) {
                        self.globals.delete(name);
                        return Err(self.undefined(name));
                    }
                }

                OpCode::Equal => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.push(Value::Bool(a == b));
                }
                OpCode::Greater | OpCode::Less => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.push(Value::Bool(compare(op, a, b)?));
                }
                OpCode::Add => {
                    if let (Value::Str(a), Value::Str(b)) = (self.peek(1)?, self.peek(0)?) {
                        self.pop()?;
                        self.pop()?;
                        let joined = self.heap.concat(a, b);
                        self.push(Value::Str(joined));
                    } else {
                        self.binary(op)?;
                    }
                }
                OpCode::Subtract | OpCode::Multiply | OpCode::Divide => self.binary(op)?,
                OpCode::Negate => {
                    let value = match self.pop()? {
                        Value::Int(i) => Value::Int(i.checked_neg().ok_or(RuntimeErrorKind::IntegerOverflow)?),
                        Value::Float(x) => Value::Float(-x),
                        _ => return Err(RuntimeErrorKind::Number),
                    };
                    self.push(value);
                }
                OpCode::Not => {
                    let value = self.pop()?;
                    self.push(Value::Bool(value.is_falsey()));
                }

                OpCode::Print => {
                    let value = self.pop()?;
                    writeln!(self.out, "{}", self.heap.display(value))?;
                }

                OpCode::Jump => {
                    let offset = self.read_u16(frame)?;
                    frame.ip += usize::from(offset);
                }
                OpCode::JumpIfFalse => {
                    let offset = self.read_u16(frame)?;
                    if self.peek(0)?.is_falsey() {
                        frame.ip += usize::from(offset);
                    }
                }
                OpCode::Loop => {
                    let offset = self.read_u16(frame)?;
                    frame.ip = frame.ip.checked_sub(usize::from(offset)).ok_or(RuntimeErrorKind::Corrupt(frame.ip))?;
                }

                OpCode::Call => {
                    let argc = self.read_byte(frame)?;
                    self.call_value(frame, argc)?;
                }
                OpCode::Return => {
                    let result = self.pop()?;
                    self.stack.truncate(frame.base);
                    match self.frames.pop() {
                        // retour du script : fin de l'exécution
                        None => return Ok(()),
                        Some(caller) => {
                            self.push(result);
                            *frame = caller;
                        }
                    }
                }
            }
        }
    }

    /* ────────── Appels ────────── */

    fn call_value(&mut self, frame: &mut CallFrame, argc: u8) -> Step<()> {
        let callee = self.peek(usize::from(argc))?;
        let base = self.stack.len() - usize::from(argc) - 1;
        match callee {
            Value::Function(f) => {
                let arity = self.heap.function(f).arity;
                if arity != argc {
                    return Err(RuntimeErrorKind::Arity { expected: arity, got: argc });
                }
                if self.frames.len() + 1 >= self.options.frames_max {
                    return Err(RuntimeErrorKind::StackOverflow);
                }
                let caller = core::mem::replace(frame, CallFrame::new(f, base));
                self.frames.push(caller);
                Ok(())
            }
            Value::Native(n) => {
                let native = self.heap.native(n);
                let (arity, func) = (native.arity, native.func);
                if let Some(expected) = arity.filter(|&a| a != argc) {
                    return Err(RuntimeErrorKind::Arity { expected, got: argc });
                }
                let result = func(&self.stack[base + 1..], &mut self.heap)?;
                self.stack.truncate(base);
                self.push(result);
                Ok(())
            }
            _ => Err(RuntimeErrorKind::NotCallable),
        }
    }

    /* ────────── Arithmétique ────────── */

    fn binary(&mut self, op: OpCode) -> Step<()> {
        let b = self.pop()?;
        let a = self.pop()?;
        let value = arithmetic(op, a, b)?;
        self.push(value);
        Ok(())
    }

    /* ────────── Lecture du bytecode ────────── */

    fn read_byte(&self, frame: &mut CallFrame) -> Step<u8> {
        let byte = self
            .heap
            .function(frame.function)
            .chunk
            .code
            .get(frame.ip)
            .copied()
            .ok_or(RuntimeErrorKind::Corrupt(frame.ip))?;
        frame.ip += 1;
        Ok(byte)
    }

    fn read_u16(&self, frame: &mut CallFrame) -> Step<u16> {
        let hi = self.read_byte(frame)?;
        let lo = self.read_byte(frame)?;
        Ok(u16::from_be_bytes([hi, lo]))
    }

    fn read_constant(&self, frame: &mut CallFrame) -> Step<Value> {
        let index = self.read_byte(frame)?;
        self.heap.function(frame.function).chunk.constant(index).ok_or(RuntimeErrorKind::Corrupt(frame.current_offset()))
    }

    fn read_name(&self, frame: &mut CallFrame) -> Step<StrRef> {
        self.read_constant(frame)?.as_str_ref().ok_or(RuntimeErrorKind::Corrupt(frame.current_offset()))
    }

    fn undefined(&self, name: StrRef) -> RuntimeErrorKind {
        RuntimeErrorKind::UndefinedVariable(self.heap.str(name).to_owned())
    }

    /* ────────── Pile ────────── */

    fn push(&mut self, value: Value) { self.stack.push(value); }

    fn pop(&mut self) -> Step<Value> { self.stack.pop().ok_or(RuntimeErrorKind::StackUnderflow) }

    fn peek(&self, distance: usize) -> Step<Value> {
        self.stack
            .len()
            .checked_sub(distance + 1)
            .map(|i| self.stack[i])
            .ok_or(RuntimeErrorKind::StackUnderflow)
    }

    #[cfg(feature = "tracing")]
    fn trace_instruction(&self, frame: &CallFrame) {
        use core::fmt::Write as _;

        let chunk = &self.heap.function(frame.function).chunk;
        if frame.ip >= chunk.len() {
            return;
        }
        let mut line = String::from("          ");
        for &value in &self.stack {
            let _ = write!(line, "[ {} ]", self.heap.display(value));
        }
        line.push('\n');
        gnbs_core::disasm::disassemble_instruction(chunk, &self.heap, frame.ip, &mut line);
        tracing::trace!(target: "gnbs::vm", "{line}");
    }
}

/* ─────────────────────────── Opérations ─────────────────────────── */

/// Erreur de type : nombres de types différents, ou non-nombres.
const fn operand_error(a: Value, b: Value) -> RuntimeErrorKind {
    if a.is_number() && b.is_number() {
        RuntimeErrorKind::SameType
    } else {
        RuntimeErrorKind::Numbers
    }
}

fn arithmetic(op: OpCode, a: Value, b: Value) -> Step<Value> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => {
            let result = match op {
                OpCode::Add => x.checked_add(y),
                OpCode::Subtract => x.checked_sub(y),
                OpCode::Multiply => x.checked_mul(y),
                _ if y == 0 => return Err(RuntimeErrorKind::DivisionByZero),
                _ => x.checked_div(y),
            };
            result.map(Value::Int).ok_or(RuntimeErrorKind::IntegerOverflow)
        }
        (Value::Float(x), Value::Float(y)) => Ok(Value::Float(match op {
            OpCode::Add => x + y,
            OpCode::Subtract => x - y,
            OpCode::Multiply => x * y,
            _ => x / y,
        })),
        _ => Err(operand_error(a, b)),
    }
}

fn compare(op: OpCode, a: Value, b: Value) -> Step<bool> {
    let ordering = match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(&y)),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(&y),
        _ => return Err(operand_error(a, b)),
    };
    let wanted = if op == OpCode::Greater { Ordering::Greater } else { Ordering::Less };
    Ok(ordering == Some(wanted))
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(src: &str) -> (Result<(), InterpretError>, String, Vm) {
        let (mut vm, out) = Vm::with_captured_output();
        let r = vm.interpret(src);
        (r, out.get(), vm)
    }

    fn runtime_message(src: &str) -> String {
        match run(src).0 {
            Err(InterpretError::Runtime(e)) => e.kind.to_string(),
            other => panic!("erreur d'exécution attendue, obtenu {other:?}"),
        }
    }

    #[test]
    fn arithmetic_rules() {
        assert_eq!(arithmetic(OpCode::Add, Value::Int(2), Value::Int(3)).unwrap(), Value::Int(5));
        assert_eq!(arithmetic(OpCode::Divide, Value::Int(7), Value::Int(2)).unwrap(), Value::Int(3));
        assert_eq!(arithmetic(OpCode::Divide, Value::Float(1.0), Value::Float(4.0)).unwrap(), Value::Float(0.25));
        assert!(matches!(arithmetic(OpCode::Add, Value::Int(1), Value::Float(1.0)), Err(RuntimeErrorKind::SameType)));
        assert!(matches!(arithmetic(OpCode::Add, Value::Int(1), Value::Null), Err(RuntimeErrorKind::Numbers)));
        assert!(matches!(
            arithmetic(OpCode::Divide, Value::Int(1), Value::Int(0)),
            Err(RuntimeErrorKind::DivisionByZero)
        ));
        assert!(matches!(
            arithmetic(OpCode::Multiply, Value::Int(i64::MAX), Value::Int(2)),
            Err(RuntimeErrorKind::IntegerOverflow)
        ));
    }

    #[test]
    fn comparisons() {
        assert!(compare(OpCode::Less, Value::Int(1), Value::Int(2)).unwrap());
        assert!(!compare(OpCode::Greater, Value::Float(f64::NAN), Value::Float(0.0)).unwrap());
        assert!(compare(OpCode::Greater, Value::Int(1), Value::Float(0.0)).is_err());
    }

    #[test]
    fn truthiness_and_equality() {
        let (r, out, _) = run("print !0; print !null; print 1 == 1.0; print \"a\" == \"a\"; print 1 != 2;");
        r.unwrap();
        assert_eq!(out, "false\ntrue\nfalse\ntrue\ntrue\n");
    }

    #[test]
    fn runtime_error_resets_stack_but_keeps_globals() {
        let (mut vm, out) = Vm::with_captured_output();
        vm.interpret("var kept = 41;").unwrap();
        let err = vm.interpret("{ var a = 1; print a + null; }").unwrap_err();
        assert_eq!(err.exit_code(), 70);
        assert_eq!(vm.stack_len(), 0);
        vm.interpret("print kept + 1;").unwrap();
        assert_eq!(out.get(), "42\n");
    }

    #[test]
    fn execute_rejects_foreign_handles() {
        let (mut vm, out) = Vm::with_captured_output();
        let script = vm.compile("function f() {} print 7;").unwrap();
        vm.execute(script).unwrap();
        vm.execute(script).unwrap();
        assert_eq!(out.get(), "7\n7\n");

        let Some(Value::Function(f)) = vm.global("f") else { panic!("f non défini") };
        let err = vm.execute(f).unwrap_err();
        assert!(matches!(err.kind, RuntimeErrorKind::UnknownScript));
        assert!(err.trace.is_empty());

        let (mut other, other_out) = Vm::with_captured_output();
        let err = other.execute(script).unwrap_err();
        assert!(matches!(err.kind, RuntimeErrorKind::UnknownScript));
        assert_eq!(other.stack_len(), 0);
        assert_eq!(other_out.get(), "");
    }

    #[test]
    fn assigning_undefined_global_fails_and_stays_undefined() {
        let (mut vm, _) = Vm::with_captured_output();
        let err = vm.interpret("ghost = 1;").unwrap_err();
        assert_eq!(err.to_string(), "undefined variable 'ghost'\n[line 1:9] in script");
        assert_eq!(vm.global("ghost"), None);
    }

    #[test]
    fn unary_and_integer_errors() {
        assert_eq!(runtime_message("print -\"x\";"), "operand must be a number");
        assert_eq!(runtime_message("print 1 / 0;"), "division by zero");
        assert_eq!(runtime_message("print 9223372036854775807 + 1;"), "integer overflow");
        assert_eq!(runtime_message("print true < false;"), "operands must be numbers");
        assert_eq!(runtime_message("var x = 1; x();"), "can only call functions");
    }

    #[test]
    fn natives_are_globals() {
        let (r, out, vm) = run("print str(1.5) + \"!\"; print clock() > 0.0; print clock;");
        r.unwrap();
        assert_eq!(out, "1.5!\ntrue\n<native fn>\n");
        assert!(matches!(vm.global("clock"), Some(Value::Native(_))));
        assert_eq!(runtime_message("clock(1);"), "expected 0 arguments but got 1");
    }

    #[test]
    fn stack_overflow_is_an_error() {
        let msg = runtime_message("function f() { return f(); } f();");
        assert_eq!(msg, "stack overflow");

        let mut vm = Vm::with_options(VmOptions { frames_max: 4, ..VmOptions::default() }).with_output(io::sink());
        vm.interpret("function d(n) { if (n > 0) return d(n - 1); return 0; } d(2);").unwrap();
        assert!(vm.interpret("d(3);").is_err());
    }
}
