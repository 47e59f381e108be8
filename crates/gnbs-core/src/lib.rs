//! gnbs-core — primitives partagées du compilateur et de la VM GNBS
//!
//! Fournit :
//! - `Position` (ligne, colonne) attachée aux jetons et aux octets de bytecode
//! - `fnv1a` : hachage 32 bits des chaînes internées
//! - `Value` : union étiquetée des valeurs runtime (primitives + handles)
//! - `Heap` : arène des chaînes internées, fonctions et natives
//! - `Table` : table de hachage à adressage ouvert (globales, pool d'interning)
//! - `bytecode` : `Chunk`, `OpCode` et désassembleur textuel
//!
//! Features :
//! - `serde` : derive (dé)sérialisation sur `Position` et `OpCode`

#![deny(missing_docs)]

/* ─────────────────────────── Imports ─────────────────────────── */

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ─────────────────────────── Modules publics ─────────────────────────── */

/// Primitives de bytecode (chunk, opcodes, désassembleur).
pub mod bytecode;
/// Hachage FNV-1a 32 bits.
pub mod fnv1a;
/// Arène des objets et pool d'interning.
pub mod heap;
/// Fonctions et natives.
pub mod object;
/// Table de hachage à adressage ouvert.
pub mod table;
/// Valeurs runtime.
pub mod value;

/// Compatibilité : ré-exporte le désassembleur textuel.
pub use bytecode::disasm;

/* ─────────────────────────── Positions ─────────────────────────── */

/// Position d'un caractère dans la source : ligne et colonne, 1-based.
///
/// La colonne compte les octets depuis le début de la ligne.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Position {
    /// Ligne (1-based).
    pub line: u32,
    /// Colonne (1-based, en octets).
    pub column: u32,
}

impl Position {
    /// Début de fichier.
    pub const START: Self = Self { line: 1, column: 1 };

    /// Construit une position.
    pub const fn new(line: u32, column: u32) -> Self { Self { line, column } }
}

impl Default for Position {
    fn default() -> Self { Self::START }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/* ─────────────────────────── Prélude (reexports utiles) ─────────────────────────── */

/// Prélude pratique pour importer les types/funcs clés du crate.
pub mod prelude {
    /// Réexports utiles pour une importation rapide.
    pub use super::{
        bytecode::{Chunk, ChunkError, OpCode},
        heap::{FnRef, Heap, NativeRef, StrRef},
        object::{Function, Native, NativeError, NativeFn},
        table::Table,
        value::Value,
        Position,
    };
}

/* ─────────────────────────── Tests ─────────────────────────── */
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_display_and_order() {
        let a = Position::new(3, 7);
        let b = Position::new(4, 1);
        assert_eq!(a.to_string(), "3:7");
        assert!(a < b);
        assert_eq!(Position::default(), Position::START);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn position_serde_roundtrip() {
        let p = Position::new(12, 5);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"line":12,"column":5}"#);
        let back: Position = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
