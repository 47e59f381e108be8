//! Erreurs d'exécution et résultat global d'une interprétation.

use core::fmt;
use std::io;

use gnbs_compiler::CompileError;
use gnbs_core::{bytecode::ChunkError, object::NativeError, Position};
use thiserror::Error;

/* ------------------------------ Erreurs ------------------------------ */

/// Cause d'une erreur d'exécution.
#[derive(Debug, Error)]
pub enum RuntimeErrorKind {
    /// Opérandes numériques de types différents (`1 + 1.0`).
    #[error("operands must have the same type")]
    SameType,

    /// Opérande non numérique d'un opérateur binaire.
    #[error("operands must be numbers")]
    Numbers,

    /// Opérande non numérique de `-` unaire.
    #[error("operand must be a number")]
    Number,

    /// Globale lue ou affectée sans avoir été définie.
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    /// Mauvaise arité.
    #[error("expected {expected} arguments but got {got}")]
    Arity {
        /// Paramètres déclarés.
        expected: u8,
        /// Arguments fournis.
        got: u8,
    },

    /// Appel d'une valeur qui n'est pas une fonction.
    #[error("can only call functions")]
    NotCallable,

    /// Trop de frames actives.
    #[error("stack overflow")]
    StackOverflow,

    /// Division entière par zéro.
    #[error("division by zero")]
    DivisionByZero,

    /// Débordement arithmétique entier.
    #[error("integer overflow")]
    IntegerOverflow,

    /// Échec remonté par une native.
    #[error(transparent)]
    Native(#[from] NativeError),

    /// Écriture de `print` impossible.
    #[error("io: {0}")]
    Io(#[from] io::Error),

    /// Bytecode invalide (opcode inconnu).
    #[error(transparent)]
    Bytecode(#[from] ChunkError),

    /// Bytecode tronqué ou opérande hors limites.
    #[error("corrupt bytecode at offset {0}")]
    Corrupt(usize),

    /// Pile vide là où le bytecode attend une valeur.
    #[error("stack underflow")]
    StackUnderflow,

    /// Handle qui ne désigne pas un script compilé par cette VM.
    #[error("unknown script")]
    UnknownScript,
}

/// Une ligne de la trace : position + fonction (`None` pour le script).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceLine {
    /// Position de l'instruction en cours dans cette frame.
    pub pos: Position,
    /// Nom de la fonction.
    pub function: Option<String>,
}

impl fmt::Display for TraceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}:{}] in ", self.pos.line, self.pos.column)?;
        match &self.function {
            Some(name) => write!(f, "{name}()"),
            None => f.write_str("script"),
        }
    }
}

/// Erreur d'exécution : cause + trace des frames, la plus interne d'abord.
#[derive(Debug)]
pub struct RuntimeError {
    /// Cause.
    pub kind: RuntimeErrorKind,
    /// Frames actives au moment de l'erreur.
    pub trace: Vec<TraceLine>,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for line in &self.trace {
            write!(f, "\n{line}")?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> { Some(&self.kind) }
}

/* ------------------------------ Résultat ------------------------------ */

/// Échec d'`interpret` : compilation ou exécution.
#[derive(Debug, Error)]
pub enum InterpretError {
    /// Au moins un diagnostic de compilation ; rien n'a été exécuté.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Erreur d'exécution.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl InterpretError {
    /// Code de sortie conventionnel (`sysexits`) : 65 ou 70.
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Compile(_) => 65,
            Self::Runtime(_) => 70,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runtime_error_lists_frames() {
        let err = RuntimeError {
            kind: RuntimeErrorKind::UndefinedVariable("x".into()),
            trace: vec![
                TraceLine { pos: Position::new(2, 5), function: Some("f".into()) },
                TraceLine { pos: Position::new(4, 1), function: None },
            ],
        };
        assert_eq!(err.to_string(), "undefined variable 'x'\n[line 2:5] in f()\n[line 4:1] in script");
    }

    #[test]
    fn exit_codes() {
        let rt = InterpretError::Runtime(RuntimeError { kind: RuntimeErrorKind::StackOverflow, trace: vec![] });
        let ce = InterpretError::Compile(CompileError { diagnostics: vec![] });
        assert_eq!(rt.exit_code(), 70);
        assert_eq!(ce.exit_code(), 65);
    }

    #[test]
    fn native_errors_are_transparent() {
        let kind: RuntimeErrorKind = NativeError::Msg("boom".into()).into();
        assert_eq!(kind.to_string(), "boom");
        assert_eq!(RuntimeErrorKind::Arity { expected: 2, got: 3 }.to_string(), "expected 2 arguments but got 3");
    }
}
