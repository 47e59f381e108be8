//! FNV-1a 32 bits, utilisé pour les chaînes internées.
//!
//! Forme directe employée par le tas et la table.

/// Base de décalage FNV 32 bits.
pub const OFFSET_BASIS: u32 = 2_166_136_261;
/// Nombre premier FNV 32 bits.
pub const PRIME: u32 = 16_777_619;

/// Hache une suite d'octets.
pub fn hash(bytes: &[u8]) -> u32 {
    let mut h = OFFSET_BASIS;
    for &b in bytes {
        h ^= u32::from(b);
        h = h.wrapping_mul(PRIME);
    }
    h
}

/// Hache le contenu UTF-8 d'une chaîne.
pub fn hash_str(s: &str) -> u32 { hash(s.as_bytes()) }
