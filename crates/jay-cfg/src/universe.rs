//! Dense sets over a shared, growable universe of values.
//!
//! `UniverseSet` is a bit vector keyed by the index a shared [`Universe`]
//! assigns to each value, so `intersect`/`union_with`/`difference` run a
//! word at a time. The universe needs no up-front member list; it grows as
//! values are first seen.

use std::cell::RefCell;
use std::hash::Hash;
use std::rc::Rc;

use indexmap::IndexSet;

/// A shared interner assigning dense indices to values.
#[derive(Debug, Clone, Default)]
pub struct Universe<T> {
    values: Rc<RefCell<IndexSet<T>>>,
}

impl<T: Hash + Eq + Clone> Universe<T> {
    pub fn new() -> Self {
        Self {
            values: Rc::new(RefCell::new(IndexSet::new())),
        }
    }

    /// The index for `value`, interning it on first sight.
    pub fn index_of(&self, value: &T) -> usize {
        let mut values = self.values.borrow_mut();
        if let Some(index) = values.get_index_of(value) {
            index
        } else {
            values.insert_full(value.clone()).0
        }
    }

    pub fn len(&self) -> usize {
        self.values.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.borrow().is_empty()
    }

    fn same_universe(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.values, &other.values)
    }
}

/// A set of values dense in a [`Universe`], stored as a bit vector.
#[derive(Debug, Clone)]
pub struct UniverseSet<T> {
    universe: Universe<T>,
    words: Vec<u64>,
}

impl<T: Hash + Eq + Clone> UniverseSet<T> {
    pub fn new(universe: &Universe<T>) -> Self {
        Self {
            universe: universe.clone(),
            words: vec![0; universe.len().div_ceil(64).max(1)],
        }
    }

    fn grow_for(&mut self, index: usize) {
        let needed = index / 64 + 1;
        if needed > self.words.len() {
            let target = needed.max(2 * self.words.len());
            self.words.resize(target, 0);
        }
    }

    pub fn add(&mut self, value: &T) {
        let index = self.universe.index_of(value);
        self.grow_for(index);
        self.words[index / 64] |= 1 << (index % 64);
    }

    pub fn remove(&mut self, value: &T) {
        let index = self.universe.index_of(value);
        if index / 64 < self.words.len() {
            self.words[index / 64] &= !(1 << (index % 64));
        }
    }

    pub fn contains(&self, value: &T) -> bool {
        let index = self.universe.index_of(value);
        index / 64 < self.words.len() && self.words[index / 64] & (1 << (index % 64)) != 0
    }

    /// Keeps the elements present in both sets. The sets must share a
    /// universe.
    pub fn intersect(&mut self, other: &UniverseSet<T>) {
        assert!(
            self.universe.same_universe(&other.universe),
            "cannot intersect sets with different universes"
        );
        for (i, word) in self.words.iter_mut().enumerate() {
            *word &= other.words.get(i).copied().unwrap_or(0);
        }
    }

    /// Adds every element of `other`. The sets must share a universe.
    pub fn union_with(&mut self, other: &UniverseSet<T>) {
        assert!(
            self.universe.same_universe(&other.universe),
            "cannot take the union of sets with different universes"
        );
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        for (i, word) in other.words.iter().enumerate() {
            self.words[i] |= word;
        }
    }

    /// Removes every element of `other`. The sets must share a universe.
    pub fn difference(&mut self, other: &UniverseSet<T>) {
        assert!(
            self.universe.same_universe(&other.universe),
            "cannot take the difference of sets with different universes"
        );
        for (i, word) in other.words.iter().enumerate() {
            if i >= self.words.len() {
                break;
            }
            self.words[i] &= !word;
        }
    }
}
