//! Contextes de compilation : un par fonction en cours, empilés.

use gnbs_core::{heap::StrRef, object::Function};

/// Nombre maximal de locales par fonction (slot sur un octet).
pub const MAX_LOCALS: usize = 256;

/// Nature de la fonction compilée.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Script de plus haut niveau.
    Script,
    /// Fonction déclarée.
    Function,
}

/// Variable locale : nom + profondeur de portée.
///
/// `depth == None` : déclarée mais initialiseur pas encore compilé.
#[derive(Debug, Clone, Copy)]
pub struct Local<'s> {
    pub name: &'s str,
    pub depth: Option<usize>,
}

/// Fonction en cours de compilation.
#[derive(Debug)]
pub struct FunctionContext<'s> {
    pub function: Function,
    pub kind: FunctionKind,
    pub locals: Vec<Local<'s>>,
    pub scope_depth: usize,
    /// Paramètres vus (peut dépasser 255 avant le diagnostic).
    pub params: usize,
}

impl<'s> FunctionContext<'s> {
    pub fn new(kind: FunctionKind, name: Option<StrRef>) -> Self {
        let mut locals = Vec::with_capacity(8);
        // slot 0 : l'appelé
        locals.push(Local { name: "", depth: Some(0) });
        Self { function: Function::new(name), kind, locals, scope_depth: 0, params: 0 }
    }
}

/// Pile explicite de contextes ; le sommet est toujours présent.
#[derive(Debug)]
pub struct ContextStack<'s> {
    pub current: FunctionContext<'s>,
    enclosing: Vec<FunctionContext<'s>>,
}

impl<'s> ContextStack<'s> {
    pub fn new(root: FunctionContext<'s>) -> Self { Self { current: root, enclosing: Vec::new() } }

    /// Entre dans une fonction imbriquée.
    pub fn push(&mut self, ctx: FunctionContext<'s>) {
        let outer = std::mem::replace(&mut self.current, ctx);
        self.enclosing.push(outer);
    }

    /// Sort de la fonction courante et la rend ; `None` à la racine.
    pub fn pop(&mut self) -> Option<FunctionContext<'s>> {
        let outer = self.enclosing.pop()?;
        Some(std::mem::replace(&mut self.current, outer))
    }

    pub fn into_root(mut self) -> FunctionContext<'s> {
        while self.pop().is_some() {}
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_restores_enclosing() {
        let mut stack = ContextStack::new(FunctionContext::new(FunctionKind::Script, None));
        stack.current.scope_depth = 2;
        stack.push(FunctionContext::new(FunctionKind::Function, None));
        assert_eq!(stack.current.kind, FunctionKind::Function);
        assert_eq!(stack.current.scope_depth, 0);
        let inner = stack.pop().unwrap();
        assert_eq!(inner.kind, FunctionKind::Function);
        assert_eq!(stack.current.scope_depth, 2);
        assert!(stack.pop().is_none());
        assert_eq!(stack.into_root().kind, FunctionKind::Script);
    }

    #[test]
    fn slot_zero_is_reserved() {
        let ctx = FunctionContext::new(FunctionKind::Script, None);
        assert_eq!(ctx.locals.len(), 1);
        assert_eq!(ctx.locals[0].depth, Some(0));
    }
}
