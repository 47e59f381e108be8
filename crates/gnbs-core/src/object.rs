//! Objets alloués dans le tas : fonctions compilées et natives.

use thiserror::Error;

use crate::{
    bytecode::Chunk,
    heap::{Heap, StrRef},
    value::Value,
};

/// Fonction compilée (y compris le script de plus haut niveau).
#[derive(Debug, Clone, Default)]
pub struct Function {
    /// Nom ; `None` pour le script.
    pub name: Option<StrRef>,
    /// Nombre de paramètres.
    pub arity: u8,
    /// Corps compilé.
    pub chunk: Chunk,
}

impl Function {
    /// Fonction vide, nommée ou non.
    pub fn new(name: Option<StrRef>) -> Self {
        Self { name, arity: 0, chunk: Chunk::new() }
    }
}

/// Erreurs remontées par une native.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NativeError {
    /// Message générique.
    #[error("{0}")]
    Msg(String),
}

/// Signature d'une native : arguments (fenêtre de la pile) + tas mutable.
pub type NativeFn = fn(&[Value], &mut Heap) -> Result<Value, NativeError>;

/// Fonction native enregistrée.
#[derive(Clone)]
pub struct Native {
    /// Nom global.
    pub name: StrRef,
    /// Arité ; `None` accepte n'importe quel nombre d'arguments.
    pub arity: Option<u8>,
    /// Pointeur de fonction.
    pub func: NativeFn,
}

impl core::fmt::Debug for Native {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Native").field("name", &self.name).field("arity", &self.arity).finish_non_exhaustive()
    }
}
