//! Table de hachage à adressage ouvert, clés = chaînes internées.
//!
//! Sondage linéaire sur une capacité puissance de deux (minimum 8), index de
//! départ = hash FNV-1a de la clé modulo la capacité. Une suppression laisse
//! une pierre tombale pour ne pas couper les chaînes de sondage ; une
//! insertion réutilise la première pierre tombale rencontrée.
//!
//! `count` inclut les pierres tombales et pilote le redimensionnement
//! (`(count + 1) / capacité > 0.75`) ; `len()` ne compte que les entrées
//! vivantes. Le redimensionnement double la capacité et ne recopie que les
//! entrées vivantes.

use crate::{heap::StrRef, value::Value};

/// Capacité minimale après la première insertion.
pub const MIN_CAPACITY: usize = 8;

// Charge maximale 3/4, en entiers.
const MAX_LOAD_NUM: usize = 3;
const MAX_LOAD_DEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Slot {
    Empty,
    Tombstone,
    Occupied(StrRef, Value),
}

/// Table `StrRef → Value`.
#[derive(Debug, Clone, Default)]
pub struct Table {
    slots: Vec<Slot>,
    /// Entrées vivantes + pierres tombales.
    count: usize,
    live: usize,
}

impl Table {
    /// Table vide (aucune allocation).
    pub const fn new() -> Self { Self { slots: Vec::new(), count: 0, live: 0 } }

    /// Nombre d'entrées vivantes.
    pub const fn len(&self) -> usize { self.live }

    /// Vrai si aucune entrée vivante.
    pub const fn is_empty(&self) -> bool { self.live == 0 }

    /// Nombre de cases allouées.
    pub fn capacity(&self) -> usize { self.slots.len() }

    /// Valeur associée à `key`.
    pub fn get(&self, key: StrRef) -> Option<Value> {
        if self.slots.is_empty() {
            return None;
        }
        match self.slots[find_slot(&self.slots, key)] {
            Slot::Occupied(_, v) => Some(v),
            _ => None,
        }
    }

    /// Vrai si `key` est présente.
    pub fn contains(&self, key: StrRef) -> bool { self.get(key).is_some() }

    /// Associe `value` à `key`. Renvoie `true` si la clé était absente.
    pub fn set(&mut self, key: StrRef, value: Value) -> bool {
        if (self.count + 1) * MAX_LOAD_DEN > self.slots.len() * MAX_LOAD_NUM {
            self.grow();
        }
        let idx = find_slot(&self.slots, key);
        let is_new = match self.slots[idx] {
            Slot::Occupied(..) => false,
            Slot::Tombstone => true,
            Slot::Empty => {
                self.count += 1;
                true
            }
        };
        if is_new {
            self.live += 1;
        }
        self.slots[idx] = Slot::Occupied(key, value);
        is_new
    }

    /// Supprime `key`. Renvoie `true` si elle était présente.
    pub fn delete(&mut self, key: StrRef) -> bool {
        if self.slots.is_empty() {
            return false;
        }
        let idx = find_slot(&self.slots, key);
        if matches!(self.slots[idx], Slot::Occupied(..)) {
            self.slots[idx] = Slot::Tombstone;
            self.live -= 1;
            true
        } else {
            false
        }
    }

    /// Cherche une clé par hash + contenu, sans disposer de son handle.
    ///
    /// `eq` compare le contenu de la clé candidate ; il n'est appelé que sur
    /// les clés de même hash.
    pub fn find_string(&self, hash: u32, mut eq: impl FnMut(StrRef) -> bool) -> Option<StrRef> {
        if self.slots.is_empty() {
            return None;
        }
        let mask = self.slots.len() - 1;
        let mut idx = hash as usize & mask;
        loop {
            match self.slots[idx] {
                Slot::Empty => return None,
                Slot::Occupied(k, _) if k.hash() == hash && eq(k) => return Some(k),
                Slot::Occupied(..) | Slot::Tombstone => {}
            }
            idx = (idx + 1) & mask;
        }
    }

    /// Itère sur les entrées vivantes (ordre des cases).
    pub fn iter(&self) -> impl Iterator<Item = (StrRef, Value)> + '_ {
        self.slots.iter().filter_map(|s| match *s {
            Slot::Occupied(k, v) => Some((k, v)),
            _ => None,
        })
    }

    fn grow(&mut self) {
        let capacity = (self.slots.len() * 2).max(MIN_CAPACITY);
        let old = std::mem::replace(&mut self.slots, vec![Slot::Empty; capacity]);
        self.count = 0;
        for slot in old {
            if let Slot::Occupied(k, v) = slot {
                let idx = find_slot(&self.slots, k);
                self.slots[idx] = Slot::Occupied(k, v);
                self.count += 1;
            }
        }
        self.live = self.count;
    }
}

/// Case de `key` : la sienne si présente, sinon la première pierre tombale
/// du chemin, sinon la case vide qui termine le sondage.
///
/// `slots` doit être non vide et contenir au moins une case vide.
fn find_slot(slots: &[Slot], key: StrRef) -> usize {
    let mask = slots.len() - 1;
    let mut idx = key.hash() as usize & mask;
    let mut tombstone = None;
    loop {
        match slots[idx] {
            Slot::Empty => return tombstone.unwrap_or(idx),
            Slot::Tombstone => {
                tombstone.get_or_insert(idx);
            }
            Slot::Occupied(k, _) if k == key => return idx,
            Slot::Occupied(..) => {}
        }
        idx = (idx + 1) & mask;
    }
}

/* ─────────────────────────── Tests ─────────────────────────── */

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::Heap;
    use proptest::prelude::*;

    fn keys(heap: &mut Heap, n: usize) -> Vec<StrRef> {
        (0..n).map(|i| heap.intern(&format!("k{i}"))).collect()
    }

    #[test]
    fn set_get_delete() {
        let mut heap = Heap::new();
        let a = heap.intern("a");
        let b = heap.intern("b");
        let mut t = Table::new();
        assert_eq!(t.get(a), None);
        assert!(t.set(a, Value::Int(1)));
        assert!(!t.set(a, Value::Int(2)));
        assert!(t.set(b, Value::Bool(true)));
        assert_eq!(t.get(a), Some(Value::Int(2)));
        assert_eq!(t.len(), 2);
        assert!(t.delete(a));
        assert!(!t.delete(a));
        assert_eq!(t.get(a), None);
        assert_eq!(t.get(b), Some(Value::Bool(true)));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn capacity_is_power_of_two_with_minimum() {
        let mut heap = Heap::new();
        let ks = keys(&mut heap, 100);
        let mut t = Table::new();
        assert_eq!(t.capacity(), 0);
        t.set(ks[0], Value::Null);
        assert_eq!(t.capacity(), MIN_CAPACITY);
        for &k in &ks {
            t.set(k, Value::Null);
            assert!(t.capacity().is_power_of_two());
            assert!(t.len() * 4 <= t.capacity() * 3);
        }
        assert_eq!(t.len(), 100);
    }

    #[test]
    fn tombstones_keep_probe_chains_and_get_reused() {
        let mut heap = Heap::new();
        let ks = keys(&mut heap, 6);
        let mut t = Table::new();
        for (i, &k) in ks.iter().enumerate() {
            t.set(k, Value::Int(i as i64));
        }
        for &k in &ks[..3] {
            assert!(t.delete(k));
        }
        for (i, &k) in ks.iter().enumerate().skip(3) {
            assert_eq!(t.get(k), Some(Value::Int(i as i64)));
        }
        let count_before = t.count;
        t.set(ks[0], Value::Int(42));
        assert_eq!(t.get(ks[0]), Some(Value::Int(42)));
        assert!(t.count <= count_before + 1);
    }

    #[test]
    fn resize_drops_tombstones() {
        let mut heap = Heap::new();
        let ks = keys(&mut heap, 40);
        let mut t = Table::new();
        for &k in &ks[..6] {
            t.set(k, Value::Null);
        }
        for &k in &ks[..5] {
            t.delete(k);
        }
        for &k in &ks[6..] {
            t.set(k, Value::Null);
        }
        assert_eq!(t.len(), 35);
        assert_eq!(t.iter().count(), 35);
        assert!(t.count >= t.live);
    }

    #[test]
    fn find_string_matches_hash_and_content() {
        let mut heap = Heap::new();
        let k = heap.intern("hello");
        let mut t = Table::new();
        t.set(k, Value::Null);
        let found = t.find_string(k.hash(), |c| heap.str(c) == "hello");
        assert_eq!(found, Some(k));
        assert_eq!(t.find_string(k.hash(), |_| false), None);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Set(usize, i64),
        Delete(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0usize..24, any::<i64>()).prop_map(|(k, v)| Op::Set(k, v)),
            (0usize..24).prop_map(Op::Delete),
        ]
    }

    proptest! {
        #[test]
        fn behaves_like_a_map(ops in prop::collection::vec(op(), 0..200)) {
            let mut heap = Heap::new();
            let ks = keys(&mut heap, 24);
            let mut t = Table::new();
            let mut model = std::collections::HashMap::new();
            for op in ops {
                match op {
                    Op::Set(i, v) => {
                        let fresh = t.set(ks[i], Value::Int(v));
                        prop_assert_eq!(fresh, model.insert(i, v).is_none());
                        prop_assert_eq!(t.get(ks[i]), Some(Value::Int(v)));
                        prop_assert!(t.len() * 4 <= t.capacity() * 3);
                    }
                    Op::Delete(i) => {
                        prop_assert_eq!(t.delete(ks[i]), model.remove(&i).is_some());
                        prop_assert_eq!(t.get(ks[i]), None);
                    }
                }
                prop_assert_eq!(t.len(), model.len());
            }
            for (i, &k) in ks.iter().enumerate() {
                prop_assert_eq!(t.get(k), model.get(&i).map(|&v| Value::Int(v)));
            }
        }
    }
}
