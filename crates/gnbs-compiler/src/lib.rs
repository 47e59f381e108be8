//! gnbs-compiler — compilateur GNBS en une passe
//!
//! - Entrée : texte source (UTF-8)
//! - Sortie : une `Function` de script rangée dans le `Heap`, dont le chunk
//!   contient directement le bytecode (aucun AST conservé)
//! - Instructions en descente récursive, expressions en Pratt
//! - Une pile explicite de contextes de fonction (`ContextStack`) : chaque
//!   déclaration de fonction empile un contexte, le dépile en fin de corps,
//!   puis l'émission reprend dans le chunk englobant
//! - Erreurs en « panic mode » : un seul diagnostic par construction fautive,
//!   puis resynchronisation sur une frontière d'instruction
//!
//! API principale :
//! ```
//! use gnbs_compiler::{Compiler, CompilerOptions};
//! use gnbs_core::heap::Heap;
//!
//! let mut heap = Heap::new();
//! let mut c = Compiler::new(CompilerOptions::default());
//! let script = c.compile("print 1 + 2;", &mut heap).unwrap();
//! assert!(!heap.function(script).chunk.is_empty());
//! ```

#![deny(missing_docs)]

use gnbs_core::heap::{FnRef, Heap};

mod context;
pub mod diagnostic;
mod expr;
mod parser;
mod stmt;

pub use context::MAX_LOCALS;
pub use diagnostic::{CompileError, Diagnostic, Location};
pub use parser::{Compilation, MAX_NESTING};

// ─────────────────────────────────────────────────────────────────────────────
// Options
// ─────────────────────────────────────────────────────────────────────────────

/// Options du compilateur.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompilerOptions {
    /// Trace le désassemblage de chaque fonction compilée (niveau `debug`).
    pub print_code: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Façade
// ─────────────────────────────────────────────────────────────────────────────

/// Compile `source` sans jamais échouer : le script est toujours produit.
pub fn compile_program(source: &str, heap: &mut Heap, options: CompilerOptions) -> Compilation {
    parser::Parser::new(source, heap, options).compile()
}

/// Compilateur réutilisable.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: CompilerOptions,
}

impl Compiler {
    /// Nouveau compilateur.
    pub const fn new(options: CompilerOptions) -> Self { Self { options } }

    /// Compile `source` ; échoue si au moins un diagnostic a été émis.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(bytes = source.len())))]
    pub fn compile(&mut self, source: &str, heap: &mut Heap) -> Result<FnRef, CompileError> {
        let Compilation { script, diagnostics } = compile_program(source, heap, self.options);
        if diagnostics.is_empty() {
            Ok(script)
        } else {
            #[cfg(feature = "tracing")]
            tracing::debug!(errors = diagnostics.len(), "compilation failed");
            Err(CompileError { diagnostics })
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
