//! gnbs-lexer — analyse lexicale pour GNBS
//!
//! Faits saillants :
//! - `Scanner::scan_token()` produit un jeton à la demande ; une fois la source
//!   épuisée il renvoie `Eof` indéfiniment
//! - commentaires `//` et `/* */` (non imbriqués), chaînes sans échappement
//!   (multi-lignes autorisées), entiers vs flottants (`.` suivi d'un chiffre)
//! - mots-clés reconnus par table exacte ; ce ne sont jamais des identifiants
//! - les erreurs lexicales ne lèvent rien : elles deviennent des jetons
//!   `TokenKind::Error` que le compilateur signale avec leur position
//!
//! Exemple éclair :
//! ```
//! use gnbs_lexer::{Scanner, TokenKind};
//!
//! let mut sc = Scanner::new("var x = 1.5;");
//! let mut n = 0;
//! loop {
//!     let tok = sc.scan_token();
//!     if tok.kind == TokenKind::Eof { break; }
//!     n += 1;
//! }
//! assert_eq!(n, 5);
//! ```

#![deny(missing_docs)]

use core::fmt;

use gnbs_core::Position;

/* ─────────────────────────── LineMap ─────────────────────────── */

/// Table des lignes pour (byte offset) → `Position`.
#[derive(Debug, Clone)]
pub struct LineMap {
    /// Offsets des débuts de lignes (toujours contient 0).
    pub line_starts: Vec<usize>,
}

impl LineMap {
    /// Construit la table à partir d'un `&str`.
    pub fn new(src: &str) -> Self {
        let mut ls = Vec::with_capacity(64);
        ls.push(0);
        for (i, b) in src.bytes().enumerate() {
            if b == b'\n' {
                ls.push(i + 1);
            }
        }
        Self { line_starts: ls }
    }

    /// Convertit un offset en position, 1-based.
    #[allow(clippy::cast_possible_truncation)]
    pub fn position(&self, off: usize) -> Position {
        // binary search
        let idx = match self.line_starts.binary_search(&off) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let col = off.saturating_sub(self.line_starts[idx]) + 1;
        Position::new((idx + 1) as u32, col as u32)
    }
}

/* ─────────────────────────── Tokens ─────────────────────────── */

/// Mots réservés.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    /// `and`
    And,
    /// `class` (réservé)
    Class,
    /// `else`
    Else,
    /// `false`
    False,
    /// `for`
    For,
    /// `function`
    Function,
    /// `if`
    If,
    /// `null`
    Null,
    /// `or`
    Or,
    /// `print`
    Print,
    /// `return`
    Return,
    /// `super` (réservé)
    Super,
    /// `this` (réservé)
    This,
    /// `true`
    True,
    /// `var`
    Var,
    /// `while`
    While,
}

/// Genre de jeton lexical.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TokenKind<'a> {
    /// Fin de fichier.
    Eof,
    /// Identifiant.
    Ident(&'a str),
    /// Mot-clé.
    Kw(Keyword),
    /// Littéral entier.
    Int(i64),
    /// Littéral flottant.
    Float(f64),
    /// Littéral chaîne (contenu entre guillemets, brut).
    Str(&'a str),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `;`
    Semi,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `!`
    Bang,
    /// `!=`
    Ne,
    /// `=`
    Eq,
    /// `==`
    EqEq,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// Erreur lexicale.
    Error(LexErrorKind),
}

/// Jeton : genre, texte source exact et position du premier caractère.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'a> {
    /// Genre (avec charge utile éventuelle).
    pub kind: TokenKind<'a>,
    /// Texte source couvert par le jeton.
    pub lexeme: &'a str,
    /// Position du premier caractère.
    pub pos: Position,
}

/* ─────────────────────────── Erreurs ─────────────────────────── */

/// Genre d'erreur lexicale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexErrorKind {
    /// Caractère inattendu.
    UnexpectedChar(char),
    /// Chaîne non terminée.
    UnterminatedString,
    /// Commentaire bloc non terminé.
    UnterminatedBlockComment,
    /// Entier hors de `i64`.
    IntOverflow,
}

impl fmt::Display for LexErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedChar(c) => write!(f, "Unexpected character '{c}'."),
            Self::UnterminatedString => f.write_str("Unterminated string."),
            Self::UnterminatedBlockComment => f.write_str("Unterminated block comment."),
            Self::IntOverflow => f.write_str("Integer literal out of range."),
        }
    }
}

/* ─────────────────────────── Scanner ─────────────────────────── */

/// Analyseur lexical (une passe, en avant uniquement).
pub struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    /// Position courante en bytes.
    off: usize,
    /// `Eof` déjà rendu par l'itérateur.
    finished: bool,
    /// Table des lignes (exposée pour diagnostics).
    pub lines: LineMap,
}

impl<'a> Scanner<'a> {
    /// Crée un scanner sur `src`.
    pub fn new(src: &'a str) -> Self {
        Self { src, bytes: src.as_bytes(), off: 0, finished: false, lines: LineMap::new(src) }
    }

    /// Prochain jeton ; `Eof` indéfiniment en fin de source.
    pub fn scan_token(&mut self) -> Token<'a> {
        if let Some(start) = self.skip_ws_and_comments() {
            return self.make(start, TokenKind::Error(LexErrorKind::UnterminatedBlockComment));
        }
        let start = self.off;
        let Some(b) = self.bump() else {
            return self.make(start, TokenKind::Eof);
        };

        let kind = match b {
            b if is_ident_start(b) => {
                self.consume_while(is_ident_continue);
                let s = &self.src[start..self.off];
                keyword_of(s).map_or(TokenKind::Ident(s), TokenKind::Kw)
            }
            b if b.is_ascii_digit() => self.lex_number(start),
            b'"' => self.lex_string(start),

            b'!' => if self.eat(b'=') { TokenKind::Ne } else { TokenKind::Bang },
            b'=' => if self.eat(b'=') { TokenKind::EqEq } else { TokenKind::Eq },
            b'<' => if self.eat(b'=') { TokenKind::Le } else { TokenKind::Lt },
            b'>' => if self.eat(b'=') { TokenKind::Ge } else { TokenKind::Gt },

            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b',' => TokenKind::Comma,
            b'.' => TokenKind::Dot,
            b';' => TokenKind::Semi,
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,

            _ => {
                // caractère complet, même hors ASCII
                let ch = self.src[start..].chars().next().unwrap_or(char::REPLACEMENT_CHARACTER);
                self.off = start + ch.len_utf8();
                TokenKind::Error(LexErrorKind::UnexpectedChar(ch))
            }
        };
        self.make(start, kind)
    }

    /// Tokenise toute la source (inclut l'`Eof` final).
    pub fn tokenize(self) -> Vec<Token<'a>> { self.collect() }

    /* ────────── Primitives internes ────────── */

    #[inline] fn peek(&self) -> Option<u8> { self.bytes.get(self.off).copied() }
    #[inline] fn peek2(&self) -> Option<u8> { self.bytes.get(self.off + 1).copied() }
    #[inline] fn bump(&mut self) -> Option<u8> { let b = self.peek(); if b.is_some() { self.off += 1; } b }
    #[inline] fn eat(&mut self, b: u8) -> bool { if self.peek() == Some(b) { self.off += 1; true } else { false } }

    fn consume_while(&mut self, mut p: impl FnMut(u8) -> bool) {
        while let Some(b) = self.peek() {
            if p(b) { self.off += 1; } else { break; }
        }
    }

    fn make(&self, start: usize, kind: TokenKind<'a>) -> Token<'a> {
        Token { kind, lexeme: &self.src[start..self.off], pos: self.lines.position(start) }
    }

    /// Saute blancs et commentaires ; renvoie le début d'un commentaire bloc non terminé.
    fn skip_ws_and_comments(&mut self) -> Option<usize> {
        loop {
            self.consume_while(|b| b.is_ascii_whitespace());
            match (self.peek(), self.peek2()) {
                (Some(b'/'), Some(b'/')) => self.consume_while(|b| b != b'\n'),
                (Some(b'/'), Some(b'*')) => {
                    let start = self.off;
                    self.off += 2;
                    loop {
                        match (self.peek(), self.peek2()) {
                            (None, _) => return Some(start),
                            (Some(b'*'), Some(b'/')) => { self.off += 2; break; }
                            _ => self.off += 1,
                        }
                    }
                }
                _ => return None,
            }
        }
    }

    fn lex_string(&mut self, start: usize) -> TokenKind<'a> {
        self.consume_while(|b| b != b'"');
        if self.eat(b'"') {
            TokenKind::Str(&self.src[start + 1..self.off - 1])
        } else {
            TokenKind::Error(LexErrorKind::UnterminatedString)
        }
    }

    fn lex_number(&mut self, start: usize) -> TokenKind<'a> {
        self.consume_while(|b| b.is_ascii_digit());
        let is_float = self.peek() == Some(b'.') && self.peek2().is_some_and(|d| d.is_ascii_digit());
        if is_float {
            self.off += 1;
            self.consume_while(|b| b.is_ascii_digit());
        }
        let raw = &self.src[start..self.off];
        if is_float {
            // `chiffres.chiffres` est toujours un f64 valide
            TokenKind::Float(raw.parse().unwrap_or(f64::NAN))
        } else {
            raw.parse().map_or(TokenKind::Error(LexErrorKind::IntOverflow), TokenKind::Int)
        }
    }
}

impl<'a> Iterator for Scanner<'a> {
    type Item = Token<'a>;

    /// Jetons jusqu'à `Eof` inclus, puis `None`.
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let tok = self.scan_token();
        self.finished = tok.kind == TokenKind::Eof;
        Some(tok)
    }
}

/* ─────────────────────────── Helpers ─────────────────────────── */

#[inline]
const fn is_ident_start(b: u8) -> bool { b == b'_' || b.is_ascii_alphabetic() }

#[inline]
const fn is_ident_continue(b: u8) -> bool { b == b'_' || b.is_ascii_alphanumeric() }

#[inline]
fn keyword_of(s: &str) -> Option<Keyword> {
    use Keyword::*;
    Some(match s {
        "and" => And,
        "class" => Class,
        "else" => Else,
        "false" => False,
        "for" => For,
        "function" => Function,
        "if" => If,
        "null" => Null,
        "or" => Or,
        "print" => Print,
        "return" => Return,
        "super" => Super,
        "this" => This,
        "true" => True,
        "var" => Var,
        "while" => While,
        _ => return None,
    })
}

/* ─────────────────────────── Tests ─────────────────────────── */
