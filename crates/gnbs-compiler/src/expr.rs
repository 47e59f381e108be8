//! Expressions : Pratt, table de règles par genre de jeton.

use gnbs_core::{bytecode::OpCode, value::Value};
use gnbs_lexer::{Keyword, TokenKind};

use crate::parser::Parser;

/// Niveaux de précédence, du plus lâche au plus serré.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Precedence {
    None,
    Assignment, // =
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * /
    Unary,      // ! -
    Call,       // ()
    Primary,
}

impl Precedence {
    const fn next(self) -> Self {
        match self {
            Self::None => Self::Assignment,
            Self::Assignment => Self::Or,
            Self::Or => Self::And,
            Self::And => Self::Equality,
            Self::Equality => Self::Comparison,
            Self::Comparison => Self::Term,
            Self::Term => Self::Factor,
            Self::Factor => Self::Unary,
            Self::Unary => Self::Call,
            Self::Call | Self::Primary => Self::Primary,
        }
    }
}

type ParseFn<'s, 'h> = fn(&mut Parser<'s, 'h>, bool);

struct ParseRule<'s, 'h> {
    prefix: Option<ParseFn<'s, 'h>>,
    infix: Option<ParseFn<'s, 'h>>,
    precedence: Precedence,
}

impl<'s, 'h> Parser<'s, 'h> {
    fn rule(kind: TokenKind<'s>) -> ParseRule<'s, 'h> {
        use Precedence as P;
        use TokenKind as T;

        let (prefix, infix, precedence): (Option<ParseFn<'s, 'h>>, Option<ParseFn<'s, 'h>>, _) = match kind {
            T::LParen => (Some(Self::grouping), Some(Self::call), P::Call),
            T::Minus => (Some(Self::unary), Some(Self::binary), P::Term),
            T::Plus => (None, Some(Self::binary), P::Term),
            T::Slash | T::Star => (None, Some(Self::binary), P::Factor),
            T::Bang => (Some(Self::unary), None, P::None),
            T::Ne | T::EqEq => (None, Some(Self::binary), P::Equality),
            T::Gt | T::Ge | T::Lt | T::Le => (None, Some(Self::binary), P::Comparison),
            T::Ident(_) => (Some(Self::variable), None, P::None),
            T::Str(_) => (Some(Self::string), None, P::None),
            T::Int(_) | T::Float(_) => (Some(Self::number), None, P::None),
            T::Kw(Keyword::And) => (None, Some(Self::and), P::And),
            T::Kw(Keyword::Or) => (None, Some(Self::or), P::Or),
            T::Kw(Keyword::True | Keyword::False | Keyword::Null) => (Some(Self::literal), None, P::None),
            _ => (None, None, P::None),
        };
        ParseRule { prefix, infix, precedence }
    }

    pub(crate) fn expression(&mut self) { self.parse_precedence(Precedence::Assignment); }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.nested(|p| p.climb(precedence));
    }

    fn climb(&mut self, precedence: Precedence) {
        self.advance();
        let Some(prefix) = Self::rule(self.previous.kind).prefix else {
            self.error("Expect expression.");
            return;
        };
        let can_assign = precedence <= Precedence::Assignment;
        prefix(self, can_assign);

        while precedence <= Self::rule(self.current.kind).precedence {
            self.advance();
            if let Some(infix) = Self::rule(self.previous.kind).infix {
                infix(self, can_assign);
            }
        }

        if can_assign && self.matches(TokenKind::Eq) {
            self.error("Invalid assignment target.");
        }
    }

    /* ────────── Préfixes ────────── */

    fn number(&mut self, _can_assign: bool) {
        match self.previous.kind {
            TokenKind::Int(i) => self.emit_constant(Value::Int(i)),
            TokenKind::Float(x) => self.emit_constant(Value::Float(x)),
            _ => {}
        }
    }

    fn string(&mut self, _can_assign: bool) {
        if let TokenKind::Str(s) = self.previous.kind {
            let s = self.heap.intern(s);
            self.emit_constant(Value::Str(s));
        }
    }

    fn literal(&mut self, _can_assign: bool) {
        match self.previous.kind {
            TokenKind::Kw(Keyword::True) => self.emit_op(OpCode::True),
            TokenKind::Kw(Keyword::False) => self.emit_op(OpCode::False),
            TokenKind::Kw(Keyword::Null) => self.emit_op(OpCode::Null),
            _ => {}
        }
    }

    fn grouping(&mut self, _can_assign: bool) {
        self.expression();
        self.consume(TokenKind::RParen, "Expect ')' after expression.");
    }

    fn unary(&mut self, _can_assign: bool) {
        let op = self.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match op {
            TokenKind::Minus => self.emit_op(OpCode::Negate),
            TokenKind::Bang => self.emit_op(OpCode::Not),
            _ => {}
        }
    }

    fn variable(&mut self, can_assign: bool) {
        if let TokenKind::Ident(name) = self.previous.kind {
            self.named_variable(name, can_assign);
        }
    }

    fn named_variable(&mut self, name: &'s str, can_assign: bool) {
        let (get, set, arg) = match self.resolve_local(name) {
            Some(slot) => (OpCode::GetLocal, OpCode::SetLocal, slot),
            None => (OpCode::GetGlobal, OpCode::SetGlobal, self.identifier_constant(name)),
        };
        if can_assign && self.matches(TokenKind::Eq) {
            self.expression();
            self.emit_with(set, arg);
        } else {
            self.emit_with(get, arg);
        }
    }

    /* ────────── Infixes ────────── */

    fn binary(&mut self, _can_assign: bool) {
        let op = self.previous.kind;
        self.parse_precedence(Self::rule(op).precedence.next());
        match op {
            TokenKind::Plus => self.emit_op(OpCode::Add),
            TokenKind::Minus => self.emit_op(OpCode::Subtract),
            TokenKind::Star => self.emit_op(OpCode::Multiply),
            TokenKind::Slash => self.emit_op(OpCode::Divide),
            TokenKind::EqEq => self.emit_op(OpCode::Equal),
            TokenKind::Ne => self.emit_ops(OpCode::Equal, OpCode::Not),
            TokenKind::Gt => self.emit_op(OpCode::Greater),
            TokenKind::Ge => self.emit_ops(OpCode::Less, OpCode::Not),
            TokenKind::Lt => self.emit_op(OpCode::Less),
            TokenKind::Le => self.emit_ops(OpCode::Greater, OpCode::Not),
            _ => {}
        }
    }

    fn call(&mut self, _can_assign: bool) {
        let argc = self.argument_list();
        self.emit_with(OpCode::Call, argc);
    }

    fn argument_list(&mut self) -> u8 {
        let mut argc: u8 = 0;
        if !self.check(TokenKind::RParen) {
            loop {
                self.expression();
                if argc == u8::MAX {
                    self.error("Can't have more than 255 arguments.");
                }
                argc = argc.saturating_add(1);
                if !self.matches(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, "Expect ')' after arguments.");
        argc
    }

    fn and(&mut self, _can_assign: bool) {
        let end_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::And);
        self.patch_jump(end_jump);
    }

    fn or(&mut self, _can_assign: bool) {
        let else_jump = self.emit_jump(OpCode::JumpIfFalse);
        let end_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(else_jump);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::Or);
        self.patch_jump(end_jump);
    }
}
