//! Diagnostics de compilation.

use core::fmt;

use gnbs_core::Position;

/// Où pointe un diagnostic par rapport au jeton fautif.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Fin de fichier.
    End,
    /// Sur un lexème précis.
    At(String),
    /// Jeton d'erreur lexicale : le message suffit.
    Here,
}

/// Une erreur de compilation, positionnée.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Message humain.
    pub message: String,
    /// Position du jeton fautif.
    pub pos: Position,
    /// Lexème fautif.
    pub location: Location,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}:{}] Error", self.pos.line, self.pos.column)?;
        match &self.location {
            Location::End => f.write_str(" at end")?,
            Location::At(lexeme) => write!(f, " at '{lexeme}'")?,
            Location::Here => {}
        }
        write!(f, ": {}", self.message)
    }
}

/// Erreur globale de compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    /// Diagnostics accumulés, dans l'ordre de la source.
    pub diagnostics: Vec<Diagnostic>,
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, d) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats() {
        let d = |location| Diagnostic { message: "Boom.".into(), pos: Position::new(3, 9), location };
        assert_eq!(d(Location::End).to_string(), "[line 3:9] Error at end: Boom.");
        assert_eq!(d(Location::At("x".into())).to_string(), "[line 3:9] Error at 'x': Boom.");
        assert_eq!(d(Location::Here).to_string(), "[line 3:9] Error: Boom.");
    }
}
