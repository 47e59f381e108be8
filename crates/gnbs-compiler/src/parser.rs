//! Session de compilation : curseur de jetons, diagnostics, émission.
//!
//! Un `Parser` vit le temps d'une compilation. Il détient le scanner, les
//! deux jetons `previous`/`current`, la pile des contextes de fonction et un
//! accès mutable au tas (interning des noms, allocation des fonctions).

use gnbs_core::{
    bytecode::{Chunk, OpCode},
    heap::{FnRef, Heap},
    object::Function,
    value::Value,
    Position,
};
use gnbs_lexer::{Keyword, Scanner, Token, TokenKind};

use crate::{
    context::{ContextStack, FunctionContext, FunctionKind, Local, MAX_LOCALS},
    diagnostic::{Diagnostic, Location},
    CompilerOptions,
};

/// Résultat brut d'une compilation : le script est produit même en cas
/// d'erreurs, mais ne doit alors pas être exécuté.
#[derive(Debug)]
pub struct Compilation {
    /// Fonction de plus haut niveau.
    pub script: FnRef,
    /// Diagnostics, dans l'ordre de la source.
    pub diagnostics: Vec<Diagnostic>,
}

impl Compilation {
    /// Vrai si aucune erreur n'a été signalée.
    pub fn is_ok(&self) -> bool { self.diagnostics.is_empty() }
}

pub(crate) struct Parser<'s, 'h> {
    scanner: Scanner<'s>,
    pub(crate) previous: Token<'s>,
    pub(crate) current: Token<'s>,
    pub(crate) heap: &'h mut Heap,
    pub(crate) contexts: ContextStack<'s>,
    diagnostics: Vec<Diagnostic>,
    pub(crate) panic_mode: bool,
    /// Profondeur de récursion courante (expressions, instructions, blocs).
    nesting: usize,
    /// Imbrication excessive : le reste de la source est abandonné.
    too_deep: bool,
    options: CompilerOptions,
}

/// Imbrication maximale avant abandon de la compilation.
pub const MAX_NESTING: usize = 256;

const NO_TOKEN: Token<'static> = Token { kind: TokenKind::Eof, lexeme: "", pos: Position::START };

impl<'s, 'h> Parser<'s, 'h> {
    pub(crate) fn new(source: &'s str, heap: &'h mut Heap, options: CompilerOptions) -> Self {
        Self {
            scanner: Scanner::new(source),
            previous: NO_TOKEN,
            current: NO_TOKEN,
            heap,
            contexts: ContextStack::new(FunctionContext::new(FunctionKind::Script, None)),
            diagnostics: Vec::new(),
            panic_mode: false,
            nesting: 0,
            too_deep: false,
            options,
        }
    }

    /// Compile tout le programme.
    pub(crate) fn compile(mut self) -> Compilation {
        self.advance();
        while !self.matches(TokenKind::Eof) {
            self.declaration();
        }
        self.emit_return();
        let root = std::mem::replace(
            &mut self.contexts,
            ContextStack::new(FunctionContext::new(FunctionKind::Script, None)),
        )
        .into_root();
        self.log_function(&root.function);
        let script = self.heap.alloc_function(root.function);
        Compilation { script, diagnostics: self.diagnostics }
    }

    /* ────────── Curseur ────────── */

    pub(crate) fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.scan_token();
            let TokenKind::Error(kind) = self.current.kind else { break };
            self.error_at_current(&kind.to_string());
        }
    }

    pub(crate) fn check(&self, kind: TokenKind<'_>) -> bool { self.current.kind == kind }

    pub(crate) fn matches(&mut self, kind: TokenKind<'_>) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    pub(crate) fn matches_kw(&mut self, kw: Keyword) -> bool { self.matches(TokenKind::Kw(kw)) }

    pub(crate) fn consume(&mut self, kind: TokenKind<'_>, message: &str) {
        if self.check(kind) {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    /// Consomme un identifiant et rend son texte.
    pub(crate) fn consume_ident(&mut self, message: &str) -> Option<&'s str> {
        if let TokenKind::Ident(name) = self.current.kind {
            self.advance();
            Some(name)
        } else {
            self.error_at_current(message);
            None
        }
    }

    /* ────────── Diagnostics ────────── */

    pub(crate) fn error(&mut self, message: &str) { self.error_at(self.previous, message); }

    pub(crate) fn error_at_current(&mut self, message: &str) { self.error_at(self.current, message); }

    fn error_at(&mut self, token: Token<'s>, message: &str) {
        if self.panic_mode || self.too_deep {
            return;
        }
        self.panic_mode = true;
        let location = match token.kind {
            TokenKind::Eof => Location::End,
            TokenKind::Error(_) => Location::Here,
            _ => Location::At(token.lexeme.to_owned()),
        };
        self.diagnostics.push(Diagnostic { message: message.to_owned(), pos: token.pos, location });
    }

    /// Saute jusqu'à une frontière d'instruction.
    pub(crate) fn synchronize(&mut self) {
        self.panic_mode = false;
        while self.current.kind != TokenKind::Eof {
            if self.previous.kind == TokenKind::Semi {
                return;
            }
            if let TokenKind::Kw(
                Keyword::Class
                | Keyword::Function
                | Keyword::Var
                | Keyword::For
                | Keyword::If
                | Keyword::While
                | Keyword::Print
                | Keyword::Return,
            ) = self.current.kind
            {
                return;
            }
            self.advance();
        }
    }

    /// Exécute `f` un niveau plus profond. Au-delà de `MAX_NESTING`, signale
    /// l'erreur une seule fois et saute jusqu'à `Eof`.
    pub(crate) fn nested(&mut self, f: impl FnOnce(&mut Self)) {
        if self.nesting >= MAX_NESTING {
            if !self.too_deep {
                self.error_at_current("Too much nesting.");
                self.too_deep = true;
            }
            while !self.check(TokenKind::Eof) {
                self.advance();
            }
            return;
        }
        self.nesting += 1;
        f(self);
        self.nesting -= 1;
    }

    /* ────────── Émission ────────── */

    pub(crate) fn chunk(&mut self) -> &mut Chunk { &mut self.contexts.current.function.chunk }

    pub(crate) fn emit_byte(&mut self, byte: u8) {
        let pos = self.previous.pos;
        self.chunk().write(byte, pos);
    }

    pub(crate) fn emit_op(&mut self, op: OpCode) { self.emit_byte(op.into()); }

    pub(crate) fn emit_ops(&mut self, a: OpCode, b: OpCode) {
        self.emit_op(a);
        self.emit_op(b);
    }

    pub(crate) fn emit_with(&mut self, op: OpCode, operand: u8) {
        self.emit_op(op);
        self.emit_byte(operand);
    }

    pub(crate) fn emit_return(&mut self) { self.emit_ops(OpCode::Null, OpCode::Return); }

    pub(crate) fn make_constant(&mut self, value: Value) -> u8 {
        match self.chunk().add_constant(value) {
            Ok(index) => index,
            Err(e) => {
                self.error(&e.to_string());
                0
            }
        }
    }

    pub(crate) fn emit_constant(&mut self, value: Value) {
        let index = self.make_constant(value);
        self.emit_with(OpCode::Constant, index);
    }

    pub(crate) fn emit_jump(&mut self, op: OpCode) -> usize {
        let pos = self.previous.pos;
        self.chunk().write_jump(op, pos)
    }

    pub(crate) fn patch_jump(&mut self, offset: usize) {
        if let Err(e) = self.chunk().patch_jump(offset) {
            self.error(&e.to_string());
        }
    }

    pub(crate) fn emit_loop(&mut self, loop_start: usize) {
        let pos = self.previous.pos;
        if let Err(e) = self.chunk().write_loop(loop_start, pos) {
            self.error(&e.to_string());
        }
    }

    /* ────────── Portées et variables ────────── */

    pub(crate) fn begin_scope(&mut self) { self.contexts.current.scope_depth += 1; }

    pub(crate) fn end_scope(&mut self) {
        let ctx = &mut self.contexts.current;
        ctx.scope_depth -= 1;
        let depth = ctx.scope_depth;
        let mut pops = 0;
        while ctx.locals.last().is_some_and(|l| l.depth.map_or(true, |d| d > depth)) {
            ctx.locals.pop();
            pops += 1;
        }
        for _ in 0..pops {
            self.emit_op(OpCode::Pop);
        }
    }

    /// Constante de nom (réutilisée si déjà présente dans le chunk).
    pub(crate) fn identifier_constant(&mut self, name: &str) -> u8 {
        let value = Value::Str(self.heap.intern(name));
        match self.chunk().find_constant(value) {
            Some(index) => index,
            None => self.make_constant(value),
        }
    }

    pub(crate) fn add_local(&mut self, name: &'s str) {
        if self.contexts.current.locals.len() == MAX_LOCALS {
            self.error("Too many local variables in function.");
            return;
        }
        self.contexts.current.locals.push(Local { name, depth: None });
    }

    pub(crate) fn declare_variable(&mut self, name: &'s str) {
        let ctx = &self.contexts.current;
        if ctx.scope_depth == 0 {
            return;
        }
        let duplicate = ctx
            .locals
            .iter()
            .rev()
            .take_while(|l| l.depth.map_or(true, |d| d >= ctx.scope_depth))
            .any(|l| l.name == name);
        if duplicate {
            self.error("Already a variable with this name in this scope.");
        }
        self.add_local(name);
    }

    /// Déclare une variable ; rend sa constante de nom si globale, 0 sinon.
    pub(crate) fn parse_variable(&mut self, message: &str) -> u8 {
        let Some(name) = self.consume_ident(message) else { return 0 };
        self.declare_variable(name);
        if self.contexts.current.scope_depth > 0 {
            return 0;
        }
        self.identifier_constant(name)
    }

    pub(crate) fn mark_initialized(&mut self) {
        let ctx = &mut self.contexts.current;
        if ctx.scope_depth == 0 {
            return;
        }
        let depth = ctx.scope_depth;
        if let Some(local) = ctx.locals.last_mut() {
            local.depth = Some(depth);
        }
    }

    pub(crate) fn define_variable(&mut self, global: u8) {
        if self.contexts.current.scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        self.emit_with(OpCode::DefineGlobal, global);
    }

    /// Slot de la locale `name` la plus interne, si elle existe.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn resolve_local(&mut self, name: &str) -> Option<u8> {
        let (slot, depth) = self
            .contexts
            .current
            .locals
            .iter()
            .enumerate()
            .rev()
            .find_map(|(i, l)| (l.name == name).then_some((i, l.depth)))?;
        if depth.is_none() {
            self.error("Can't read local variable in its own initializer.");
        }
        // MAX_LOCALS == 256 : le slot tient sur un octet
        Some(slot as u8)
    }

    /* ────────── Fonctions ────────── */

    pub(crate) fn begin_function(&mut self, kind: FunctionKind) {
        let name = self.heap.intern(self.previous.lexeme);
        self.contexts.push(FunctionContext::new(kind, Some(name)));
    }

    /// Termine la fonction courante, l'alloue et rend son handle.
    pub(crate) fn end_function(&mut self) -> Option<FnRef> {
        self.emit_return();
        let mut ctx = self.contexts.pop()?;
        ctx.function.arity = u8::try_from(ctx.params).unwrap_or(u8::MAX);
        self.log_function(&ctx.function);
        Some(self.heap.alloc_function(ctx.function))
    }

    #[cfg(feature = "tracing")]
    fn log_function(&self, function: &Function) {
        if self.options.print_code && self.diagnostics.is_empty() {
            let title = function.name.map_or("<script>", |n| self.heap.str(n));
            let text = gnbs_core::disasm::disassemble(&function.chunk, self.heap, title);
            tracing::debug!(target: "gnbs::compiler", "\n{text}");
        }
    }

    #[cfg(not(feature = "tracing"))]
    fn log_function(&self, _function: &Function) {
        let _ = self.options.print_code;
    }
}
