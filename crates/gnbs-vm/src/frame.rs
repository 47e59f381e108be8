//! Frame d'appel.

use gnbs_core::heap::FnRef;

/// Invocation en cours d'une fonction.
///
/// `base` est l'index, dans la pile partagée, du slot 0 de la frame (l'appelé
/// lui-même) ; les arguments suivent. La frame ne possède pas sa fonction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallFrame {
    /// Fonction exécutée.
    pub function: FnRef,
    /// Prochain octet à lire dans son chunk.
    pub ip: usize,
    /// Début de la fenêtre de pile.
    pub base: usize,
}

impl CallFrame {
    /// Frame au début de `function`, fenêtre à partir de `base`.
    pub const fn new(function: FnRef, base: usize) -> Self { Self { function, ip: 0, base } }

    /// Offset de l'instruction en cours (le dernier octet lu lui appartient).
    pub const fn current_offset(&self) -> usize { self.ip.saturating_sub(1) }
}
