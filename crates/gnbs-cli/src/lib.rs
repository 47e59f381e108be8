//! gnbs-cli — bibliothèque interne du binaire `gnbs`
//!
//! Le parsing d'arguments reste dans `main.rs` ; ici :
//! - exécution d'un fichier (`run_file`) ou d'une source (`run_source`)
//! - boucle interactive sur n'importe quel `BufRead` (`repl`)
//! - codes de sortie `sysexits` : 0, 64, 65, 70, 74
//! - traces (`feature = "trace"`) et couleurs (`feature = "color"`) optionnelles

#![deny(unused_must_use)]
#![forbid(unsafe_code)]

use std::{
    fs,
    io::{self, BufRead, Write},
    path::Path,
};

use anyhow::{Context, Result};
use gnbs_core::disasm::disassemble_program;
use gnbs_vm::{InterpretError, Vm, VmOptions};

#[cfg(feature = "color")]
use owo_colors::{OwoColorize, Stream};

// ───────────────────────────── Codes de sortie ─────────────────────────────

/// Succès.
pub const EX_OK: u8 = 0;
/// Mauvais usage de la ligne de commande.
pub const EX_USAGE: u8 = 64;
/// Erreur de compilation.
pub const EX_DATAERR: u8 = 65;
/// Erreur d'exécution.
pub const EX_SOFTWARE: u8 = 70;
/// Script illisible.
pub const EX_IOERR: u8 = 74;

// ───────────────────────────── Options ─────────────────────────────

/// Options d'exécution issues de la ligne de commande.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Affiche le bytecode (script + fonctions imbriquées) avant d'exécuter.
    pub disasm: bool,
    /// Trace chaque instruction exécutée (cible `gnbs::vm`, niveau `trace`).
    pub trace: bool,
    /// Désassemblage de chaque fonction compilée dans les logs `debug`.
    pub print_code: bool,
}

impl RunOptions {
    /// Options de VM correspondantes.
    pub fn vm_options(&self) -> VmOptions {
        VmOptions { trace_execution: self.trace, print_code: self.print_code, ..VmOptions::default() }
    }
}

// ───────────────────────────── Initialisation ─────────────────────────────

/// Initialise le logger selon la feature `trace`.
pub fn init_logger() {
    #[cfg(feature = "trace")]
    {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
            .format_timestamp(None)
            .format_target(true)
            .try_init();
    }
}

// ───────────────────────────── Exécution ─────────────────────────────

/// Lit et interprète `path`. Retourne un code de sortie.
pub fn run_file(path: &Path, opts: &RunOptions) -> u8 {
    let source = match read_source(path) {
        Ok(s) => s,
        Err(e) => {
            status_error("IO", &format!("{e:#}"));
            return EX_IOERR;
        }
    };
    #[cfg(feature = "trace")]
    log::debug!("running {} ({} bytes)", path.display(), source.len());

    let mut vm = Vm::with_options(opts.vm_options());
    run_source(&mut vm, &source, opts.disasm)
}

/// Compile puis exécute `source` dans `vm`. Les erreurs vont sur stderr.
pub fn run_source(vm: &mut Vm, source: &str, disasm: bool) -> u8 {
    let script = match vm.compile(source) {
        Ok(script) => script,
        Err(e) => return report(&e.into()),
    };
    if disasm {
        eprint!("{}", disassemble_program(vm.heap(), script));
    }
    match vm.execute(script) {
        Ok(()) => EX_OK,
        Err(e) => report(&e.into()),
    }
}

/// Boucle interactive : une ligne = un programme, dans une VM persistante.
///
/// Les erreurs sont affichées puis la boucle continue ; fin sur EOF.
pub fn repl<R: BufRead, W: Write>(vm: &mut Vm, input: R, mut prompt: W) -> Result<()> {
    let mut lines = input.lines();
    loop {
        write!(prompt, "> ")?;
        prompt.flush()?;
        let Some(line) = lines.next() else {
            writeln!(prompt)?;
            return Ok(());
        };
        let line = line.context("lecture de stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        if let Err(e) = vm.interpret(&line) {
            report(&e);
        }
    }
}

/// REPL sur stdin/stdout. Retourne un code de sortie.
pub fn run_repl(opts: &RunOptions) -> u8 {
    let mut vm = Vm::with_options(opts.vm_options());
    match repl(&mut vm, io::stdin().lock(), io::stdout()) {
        Ok(()) => EX_OK,
        Err(e) => {
            status_error("IO", &format!("{e:#}"));
            EX_IOERR
        }
    }
}

/// Affiche une erreur d'interprétation et rend son code de sortie.
pub fn report(err: &InterpretError) -> u8 {
    match err {
        InterpretError::Compile(e) => {
            for d in &e.diagnostics {
                eprintln!("{}", paint_error(&d.to_string()));
            }
        }
        InterpretError::Runtime(e) => {
            eprintln!("{}", paint_error(&e.kind.to_string()));
            for line in &e.trace {
                eprintln!("{line}");
            }
        }
    }
    err.exit_code()
}

// ───────────────────────────── Utilitaires E/S ─────────────────────────────

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("lecture: {}", path.display()))
}

// ───────────────────────────── Sorties jolies ─────────────────────────────

#[cfg(feature = "color")]
fn paint_error(msg: &str) -> String { msg.if_supports_color(Stream::Stderr, |t| t.red()).to_string() }

#[cfg(not(feature = "color"))]
fn paint_error(msg: &str) -> String { msg.to_owned() }

fn status_error(tag: &str, msg: &str) {
    #[cfg(feature = "color")]
    {
        eprintln!("{} {}", tag.if_supports_color(Stream::Stderr, |t| t.red().bold().to_string()), msg);
    }
    #[cfg(not(feature = "color"))]
    {
        eprintln!("{tag} {msg}");
    }
}

// ───────────────────────────── Tests ─────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use gnbs_vm::Captured;
    use pretty_assertions::assert_eq;

    #[test]
    fn repl_keeps_state_across_lines_and_errors() {
        let out = Captured::default();
        let mut vm = Vm::new().with_output(out.clone());
        let input = "var a = 40;\nprint nope;\n\nprint a + 2;\nprint ;\nprint a;\n";
        let mut prompt = Vec::new();
        repl(&mut vm, input.as_bytes(), &mut prompt).unwrap();
        assert_eq!(out.get(), "42\n40\n");
        assert_eq!(String::from_utf8(prompt).unwrap(), "> > > > > > > \n");
    }

    #[test]
    fn run_source_exit_codes() {
        let mut vm = Vm::new().with_output(io::sink());
        assert_eq!(run_source(&mut vm, "print 1;", false), EX_OK);
        assert_eq!(run_source(&mut vm, "print 1", false), EX_DATAERR);
        assert_eq!(run_source(&mut vm, "print 1 + 1.0;", false), EX_SOFTWARE);
    }

    #[test]
    fn unreadable_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let code = run_file(&dir.path().join("missing.gnbs"), &RunOptions::default());
        assert_eq!(code, EX_IOERR);
    }

    #[test]
    fn options_map_to_vm() {
        let opts = RunOptions { disasm: true, trace: true, print_code: false };
        let vm = opts.vm_options();
        assert!(vm.trace_execution);
        assert_eq!(vm.frames_max, gnbs_vm::FRAMES_MAX);
    }
}
