//! `gnbs` — CLI principal de GNBS
//!
//! Ici on fait uniquement : parsing d'arguments, initialisation (logger,
//! couleur), et délégation à `gnbs_cli` (lib).
//!
//! - `gnbs`          → REPL
//! - `gnbs script`   → exécute le fichier
//! - autre chose     → usage (64)

#![forbid(unsafe_code)]

use std::{path::PathBuf, process::ExitCode};

use clap::{ArgAction, Parser, ValueEnum};

use gnbs_cli as cli;

// ──────────────────────────── CLI (clap) ────────────────────────────

#[derive(Debug, Parser)]
#[command(name = "gnbs", version, about = "GNBS — compilateur bytecode en une passe et VM à pile", long_about = None)]
struct Opt {
    /// Augmente la verbosité (-v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,

    /// Mode silencieux (casse la verbosité)
    #[arg(short = 'q', long = "quiet", action = ArgAction::SetTrue)]
    quiet: bool,

    /// Force la couleur (si la feature `color` est compilée)
    #[arg(long = "color", value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,

    /// Affiche le bytecode sur stderr avant d'exécuter
    #[arg(long)]
    disasm: bool,

    /// Trace chaque instruction exécutée (logs `trace`)
    #[arg(long)]
    trace: bool,

    /// Script à exécuter ; REPL si omis
    script: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

// ──────────────────────────── Logger / Verbosité ────────────────────────────

fn init_telemetry(verbose: u8, quiet: bool, trace: bool) {
    #[cfg(feature = "trace")]
    {
        let level = if quiet {
            "error"
        } else {
            match verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        };
        let filter = if trace { format!("{level},gnbs::vm=trace") } else { level.to_owned() };
        std::env::set_var("RUST_LOG", std::env::var("RUST_LOG").unwrap_or(filter));
        cli::init_logger();
    }
    #[cfg(not(feature = "trace"))]
    let _ = (verbose, quiet, trace);
}

fn init_color(choice: ColorChoice) {
    // `owo-colors` détecte le TTY ; on ne force que sur demande.
    match choice {
        ColorChoice::Auto => {}
        ColorChoice::Always => {
            std::env::set_var("CLICOLOR_FORCE", "1");
            std::env::remove_var("NO_COLOR");
        }
        ColorChoice::Never => {
            std::env::set_var("NO_COLOR", "1");
            std::env::remove_var("CLICOLOR_FORCE");
        }
    }
}

// ──────────────────────────── main ────────────────────────────

fn main() -> ExitCode {
    let opt = match Opt::try_parse() {
        Ok(opt) => opt,
        Err(e) => {
            // --help / --version sortent sur stdout avec succès
            let code = if e.use_stderr() { cli::EX_USAGE } else { cli::EX_OK };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    init_color(opt.color);
    init_telemetry(opt.verbose, opt.quiet, opt.trace);

    let opts = cli::RunOptions { disasm: opt.disasm, trace: opt.trace, print_code: opt.verbose >= 2 && !opt.quiet };
    let code = match opt.script {
        Some(path) => cli::run_file(&path, &opts),
        None => cli::run_repl(&opts),
    };
    ExitCode::from(code)
}
