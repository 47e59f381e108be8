//! Tas GNBS : arène d'objets indexée par handles.
//!
//! Rien n'est jamais libéré pendant la vie d'un `Heap` : les handles
//! restent valides tant que le tas existe. Les chaînes sont internées via une
//! `Table` auxiliaire, si bien qu'il n'existe qu'un seul `StrRef` par contenu
//! distinct et que l'égalité de chaînes se réduit à l'égalité de handles.

use core::fmt;

use crate::{
    fnv1a,
    object::{Function, Native, NativeFn},
    table::Table,
    value::Value,
};

/* ─────────────────────────── Handles ─────────────────────────── */

/// Handle d'une chaîne internée (index + hash précalculé).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrRef {
    index: u32,
    hash: u32,
}

impl StrRef {
    /// Hash FNV-1a du contenu.
    pub const fn hash(self) -> u32 { self.hash }
    /// Index dans l'arène des chaînes.
    pub const fn index(self) -> u32 { self.index }
}

/// Handle d'une fonction compilée.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FnRef(u32);

impl FnRef {
    /// Index dans l'arène des fonctions.
    pub const fn index(self) -> u32 { self.0 }
}

/// Handle d'une native.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeRef(u32);

impl NativeRef {
    /// Index dans l'arène des natives.
    pub const fn index(self) -> u32 { self.0 }
}

/* ─────────────────────────── Objets ─────────────────────────── */

/// Chaîne internée : contenu + hash précalculé.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternedString {
    content: Box<str>,
    hash: u32,
}

impl InternedString {
    /// Contenu.
    pub fn as_str(&self) -> &str { &self.content }
    /// Hash FNV-1a.
    pub const fn hash(&self) -> u32 { self.hash }
}

/* ─────────────────────────── Heap ─────────────────────────── */

/// Arène des chaînes, fonctions et natives d'une session.
#[derive(Debug, Default)]
pub struct Heap {
    strings: Vec<InternedString>,
    interned: Table,
    functions: Vec<Function>,
    natives: Vec<Native>,
}

#[allow(clippy::cast_possible_truncation)]
fn next_index(len: usize) -> u32 { len as u32 }

impl Heap {
    /// Tas vide.
    pub fn new() -> Self { Self::default() }

    /// Interne `s` : renvoie le handle existant ou en crée un.
    pub fn intern(&mut self, s: &str) -> StrRef {
        let hash = fnv1a::hash_str(s);
        if let Some(existing) = self.find(s, hash) {
            return existing;
        }
        let r = StrRef { index: next_index(self.strings.len()), hash };
        self.strings.push(InternedString { content: s.into(), hash });
        self.interned.set(r, Value::Null);
        r
    }

    /// Interne une chaîne déjà possédée (évite une copie si nouvelle).
    pub fn intern_owned(&mut self, s: String) -> StrRef {
        let hash = fnv1a::hash_str(&s);
        if let Some(existing) = self.find(&s, hash) {
            return existing;
        }
        let r = StrRef { index: next_index(self.strings.len()), hash };
        self.strings.push(InternedString { content: s.into_boxed_str(), hash });
        self.interned.set(r, Value::Null);
        r
    }

    /// Concatène deux chaînes internées et interne le résultat.
    pub fn concat(&mut self, a: StrRef, b: StrRef) -> StrRef {
        let (left, right) = (self.str(a), self.str(b));
        let mut s = String::with_capacity(left.len() + right.len());
        s.push_str(left);
        s.push_str(right);
        self.intern_owned(s)
    }

    /// Handle déjà interné pour `s`, sans rien créer.
    pub fn lookup(&self, s: &str) -> Option<StrRef> { self.find(s, fnv1a::hash_str(s)) }

    fn find(&self, s: &str, hash: u32) -> Option<StrRef> {
        let strings = &self.strings;
        self.interned.find_string(hash, |k| strings[k.index as usize].as_str() == s)
    }

    /// Contenu d'une chaîne.
    pub fn str(&self, r: StrRef) -> &str { self.strings[r.index as usize].as_str() }

    /// Objet chaîne complet.
    pub fn string(&self, r: StrRef) -> &InternedString { &self.strings[r.index as usize] }

    /// Nombre de chaînes distinctes internées.
    pub fn string_count(&self) -> usize { self.strings.len() }

    /// Range une fonction compilée dans l'arène.
    pub fn alloc_function(&mut self, function: Function) -> FnRef {
        let r = FnRef(next_index(self.functions.len()));
        self.functions.push(function);
        r
    }

    /// Fonction compilée.
    pub fn function(&self, r: FnRef) -> &Function { &self.functions[r.0 as usize] }

    /// Fonction compilée, si `r` désigne bien une fonction de ce tas.
    pub fn get_function(&self, r: FnRef) -> Option<&Function> { self.functions.get(r.0 as usize) }

    /// Enregistre une native sous `name`.
    pub fn alloc_native(&mut self, name: &str, arity: Option<u8>, func: NativeFn) -> NativeRef {
        let name = self.intern(name);
        let r = NativeRef(next_index(self.natives.len()));
        self.natives.push(Native { name, arity, func });
        r
    }

    /// Native enregistrée.
    pub fn native(&self, r: NativeRef) -> &Native { &self.natives[r.0 as usize] }

    /// Nom affichable d'une fonction (`None` pour le script).
    pub fn function_name(&self, r: FnRef) -> Option<&str> {
        self.function(r).name.map(|n| self.str(n))
    }

    /// Adaptateur `Display` pour une valeur.
    pub const fn display(&self, value: Value) -> ValueDisplay<'_> { ValueDisplay { heap: self, value } }
}

/* ─────────────────────────── Affichage ─────────────────────────── */

/// Forme affichable d'une `Value` (ce qu'écrit `print`).
pub struct ValueDisplay<'h> {
    heap: &'h Heap,
    value: Value,
}

impl fmt::Display for ValueDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => f.write_str(self.heap.str(s)),
            Value::Function(r) => match self.heap.function_name(r) {
                Some(name) => write!(f, "<fn {name}>"),
                None => f.write_str("<script>"),
            },
            Value::Native(_) => f.write_str("<native fn>"),
        }
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::NativeError;
    use proptest::prelude::*;

    #[test]
    fn interning_deduplicates() {
        let mut heap = Heap::new();
        let a = heap.intern("foo");
        let b = heap.intern("foo");
        let c = heap.intern_owned(String::from("foo"));
        let d = heap.intern("bar");
        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_ne!(a, d);
        assert_eq!(heap.string_count(), 2);
        assert_eq!(heap.string(a).hash(), fnv1a::hash_str("foo"));
    }

    #[test]
    fn concat_interns_result() {
        let mut heap = Heap::new();
        let foo = heap.intern("foo");
        let bar = heap.intern("bar");
        let joined = heap.concat(foo, bar);
        assert_eq!(heap.str(joined), "foobar");
        assert_eq!(heap.lookup("foobar"), Some(joined));
        assert_eq!(heap.concat(foo, bar), joined);
        assert_eq!(heap.lookup("nope"), None);
    }

    fn answer(_: &[Value], _: &mut Heap) -> Result<Value, NativeError> { Ok(Value::Int(42)) }

    #[test]
    fn display_forms() {
        let mut heap = Heap::new();
        let s = heap.intern("hi");
        let name = heap.intern("add");
        let f = heap.alloc_function(Function::new(Some(name)));
        let script = heap.alloc_function(Function::new(None));
        let n = heap.alloc_native("answer", Some(0), answer);
        let show = |v: Value| heap.display(v).to_string();
        assert_eq!(show(Value::Null), "null");
        assert_eq!(show(Value::Bool(false)), "false");
        assert_eq!(show(Value::Int(-3)), "-3");
        assert_eq!(show(Value::Float(2.0)), "2");
        assert_eq!(show(Value::Float(2.5)), "2.5");
        assert_eq!(show(Value::Str(s)), "hi");
        assert_eq!(show(Value::Function(f)), "<fn add>");
        assert_eq!(show(Value::Function(script)), "<script>");
        assert_eq!(show(Value::Native(n)), "<native fn>");
    }

    proptest! {
        #[test]
        fn handle_equality_matches_content_equality(a in "[a-c]{0,3}", b in "[a-c]{0,3}") {
            let mut heap = Heap::new();
            let ra = heap.intern(&a);
            let rb = heap.intern(&b);
            prop_assert_eq!(ra == rb, a == b);
        }
    }
}
