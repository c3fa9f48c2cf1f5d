//! Shared, identity-carrying containers
//!
//! Arrays and dictionaries are reference types: cloning shares storage, and
//! two containers are the same node only when they share that storage. The
//! marshalling layer relies on [`Array::ptr_id`] and [`Dictionary::ptr_id`] to
//! detect containers that contain themselves.

use crate::Value;
use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::ffi::c_void;
use std::fmt;
use std::rc::Rc;

/// An ordered sequence of values
#[derive(Clone, Default)]
pub struct Array(Rc<RefCell<Vec<Value>>>);

impl Array {
    /// Create a new empty array
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an array owning the given values
    pub fn from_vec(values: Vec<Value>) -> Self {
        Self(Rc::new(RefCell::new(values)))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    /// Get a value by 0-based index
    pub fn get(&self, index: usize) -> Option<Value> {
        self.0.borrow().get(index).cloned()
    }

    /// Append a value
    pub fn push(&self, value: Value) {
        self.0.borrow_mut().push(value);
    }

    /// Replace the value at a 0-based index; returns false when out of range
    pub fn set(&self, index: usize, value: Value) -> bool {
        match self.0.borrow_mut().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Snapshot of the elements
    ///
    /// Elements are cloned (containers inside stay shared), so the snapshot can
    /// be iterated while the array itself is mutated or revisited.
    pub fn to_vec(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    /// Borrow the elements
    pub fn borrow(&self) -> Ref<'_, Vec<Value>> {
        self.0.borrow()
    }

    /// Identity of the underlying storage
    pub fn ptr_id(&self) -> *const c_void {
        Rc::as_ptr(&self.0) as *const c_void
    }

    /// Whether both arrays share storage
    pub fn ptr_eq(&self, other: &Array) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Array {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0.borrow() == *other.0.borrow()
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Array({} items @ {:p})", self.len(), self.ptr_id())
    }
}

/// A map of string keys to values with no defined iteration order
#[derive(Clone, Default)]
pub struct Dictionary(Rc<RefCell<HashMap<String, Value>>>);

impl Dictionary {
    /// Create a new empty dictionary
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dictionary owning the given entries
    pub fn from_map(map: HashMap<String, Value>) -> Self {
        Self(Rc::new(RefCell::new(map)))
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.borrow().get(key).cloned()
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.borrow_mut().insert(key.into(), value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.borrow_mut().remove(key)
    }

    /// Keys in sorted order
    pub fn sorted_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.0.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Snapshot of the entries, sorted by key
    pub fn entries(&self) -> Vec<(String, Value)> {
        let mut entries: Vec<(String, Value)> = self
            .0
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Identity of the underlying storage
    pub fn ptr_id(&self) -> *const c_void {
        Rc::as_ptr(&self.0) as *const c_void
    }

    /// Whether both dictionaries share storage
    pub fn ptr_eq(&self, other: &Dictionary) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Dictionary {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.0.borrow() == *other.0.borrow()
    }
}

impl fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dictionary({:?} @ {:p})", self.sorted_keys(), self.ptr_id())
    }
}
