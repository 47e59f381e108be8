//! Valeurs runtime.
//!
//! `Value` est une union fermée : primitives copiées par valeur, objets
//! désignés par un handle vers le `Heap`. Deux chaînes internées sont égales
//! si et seulement si leurs handles le sont.

use crate::heap::{FnRef, NativeRef, StrRef};

/// Valeur dynamique manipulée par la VM.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    /// `null`.
    Null,
    /// Booléen.
    Bool(bool),
    /// Entier 64 bits signé.
    Int(i64),
    /// Flottant 64 bits.
    Float(f64),
    /// Chaîne internée.
    Str(StrRef),
    /// Fonction utilisateur.
    Function(FnRef),
    /// Fonction native.
    Native(NativeRef),
}

impl Value {
    /// Seuls `null` et `false` sont faux.
    pub const fn is_falsey(self) -> bool {
        matches!(self, Self::Null | Self::Bool(false))
    }

    /// Vrai pour les entiers et flottants.
    pub const fn is_number(self) -> bool {
        matches!(self, Self::Int(_) | Self::Float(_))
    }

    /// Handle de chaîne, si c'en est une.
    pub const fn as_str_ref(self) -> Option<StrRef> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self { Self::Null }
}

impl From<bool> for Value { fn from(v: bool) -> Self { Self::Bool(v) } }
impl From<i64> for Value { fn from(v: i64) -> Self { Self::Int(v) } }
impl From<f64> for Value { fn from(v: f64) -> Self { Self::Float(v) } }
impl From<StrRef> for Value { fn from(v: StrRef) -> Self { Self::Str(v) } }
impl From<FnRef> for Value { fn from(v: FnRef) -> Self { Self::Function(v) } }
impl From<NativeRef> for Value { fn from(v: NativeRef) -> Self { Self::Native(v) } }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_null_and_false_are_falsey() {
        assert!(Value::Null.is_falsey());
        assert!(Value::Bool(false).is_falsey());
        assert!(!Value::Bool(true).is_falsey());
        assert!(!Value::Int(0).is_falsey());
        assert!(!Value::Float(0.0).is_falsey());
    }

    #[test]
    fn equality_is_type_strict() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
        assert_eq!(Value::Int(7), Value::from(7i64));
        assert_ne!(Value::Null, Value::Bool(false));
    }
}
