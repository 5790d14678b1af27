//! Shared, mutable collections of the value graph.
//!
//! Every collection is a reference-counted cell so that an alias can point
//! at the very collection its anchor produced, including a collection that
//! contains itself. Identity is the address of the cell.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

use crate::value::format::Format;
use crate::value::Value;

#[derive(Debug, Default)]
pub struct SequenceData {
    pub items: Vec<Value>,
    pub format: Format,
}

#[derive(Clone, Default)]
pub struct Sequence(Rc<RefCell<SequenceData>>);

impl Sequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<Value>) -> Self {
        Self::with_format(items, Format::default())
    }

    pub fn with_format(items: Vec<Value>, format: Format) -> Self {
        Sequence(Rc::new(RefCell::new(SequenceData { items, format })))
    }

    pub fn borrow(&self) -> Ref<'_, SequenceData> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, SequenceData> {
        self.0.borrow_mut()
    }

    pub(crate) fn try_borrow(&self) -> Option<Ref<'_, SequenceData>> {
        self.0.try_borrow().ok()
    }

    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as *const u8 as usize
    }

    pub fn ptr_eq(&self, other: &Sequence) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn len(&self) -> usize {
        self.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.borrow().items.get(index).cloned()
    }

    pub fn push(&self, value: Value) {
        self.borrow_mut().items.push(value);
    }

    /// Snapshot of the items; the values themselves are shared.
    pub fn items(&self) -> Vec<Value> {
        self.borrow().items.clone()
    }

    pub fn format(&self) -> Format {
        self.borrow().format.clone()
    }
}

#[derive(Debug, Default)]
pub struct MappingData {
    /// Keys written in this mapping itself, in source order.
    pub entries: IndexMap<Value, Value>,
    /// Mappings merged in with `<<`, highest precedence first.
    pub merges: Vec<Mapping>,
    /// Number of own entries written before the `<<` key.
    pub merge_position: usize,
    pub format: Format,
}

impl MappingData {
    /// Own entries win over merged ones; earlier merges win over later ones.
    pub fn lookup(&self, key: &Value) -> Option<Value> {
        if let Some(value) = self.entries.get(key) {
            return Some(value.clone());
        }
        self.merges
            .iter()
            .filter_map(|merge| merge.try_borrow().and_then(|data| data.lookup(key)))
            .next()
    }

    /// Own entries followed by the merged keys they do not override.
    pub fn flattened(&self) -> IndexMap<Value, Value> {
        let mut out = self.entries.clone();
        for merge in &self.merges {
            let Some(data) = merge.try_borrow() else {
                continue;
            };
            for (key, value) in data.flattened() {
                out.entry(key).or_insert(value);
            }
        }
        out
    }
}

#[derive(Clone, Default)]
pub struct Mapping(Rc<RefCell<MappingData>>);

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        let mapping = Self::new();
        mapping.borrow_mut().entries.extend(entries);
        mapping
    }

    pub fn with_format(format: Format) -> Self {
        let mapping = Self::new();
        mapping.borrow_mut().format = format;
        mapping
    }

    pub fn borrow(&self) -> Ref<'_, MappingData> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, MappingData> {
        self.0.borrow_mut()
    }

    pub(crate) fn try_borrow(&self) -> Option<Ref<'_, MappingData>> {
        self.0.try_borrow().ok()
    }

    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as *const u8 as usize
    }

    pub fn ptr_eq(&self, other: &Mapping) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn get(&self, key: impl Into<Value>) -> Option<Value> {
        self.borrow().lookup(&key.into())
    }

    pub fn contains_key(&self, key: impl Into<Value>) -> bool {
        self.get(key).is_some()
    }

    /// Inserts into the mapping's own entries. A replaced key keeps its
    /// position.
    pub fn insert(&self, key: impl Into<Value>, value: impl Into<Value>) -> Option<Value> {
        self.borrow_mut().entries.insert(key.into(), value.into())
    }

    pub fn remove(&self, key: impl Into<Value>) -> Option<Value> {
        self.borrow_mut().entries.shift_remove(&key.into())
    }

    /// Number of keys visible through lookups, merged keys included.
    pub fn len(&self) -> usize {
        self.borrow().flattened().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn keys(&self) -> Vec<Value> {
        self.borrow().flattened().into_keys().collect()
    }

    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.borrow().flattened().into_iter().collect()
    }

    pub fn merges(&self) -> Vec<Mapping> {
        self.borrow().merges.clone()
    }

    pub fn format(&self) -> Format {
        self.borrow().format.clone()
    }
}

#[derive(Debug, Default)]
pub struct SetData {
    pub items: IndexSet<Value>,
    pub format: Format,
}

#[derive(Clone, Default)]
pub struct Set(Rc<RefCell<SetData>>);

impl Set {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: impl IntoIterator<Item = Value>) -> Self {
        let set = Self::new();
        set.borrow_mut().items.extend(items);
        set
    }

    pub fn borrow(&self) -> Ref<'_, SetData> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, SetData> {
        self.0.borrow_mut()
    }

    pub(crate) fn try_borrow(&self) -> Option<Ref<'_, SetData>> {
        self.0.try_borrow().ok()
    }

    pub fn identity(&self) -> usize {
        Rc::as_ptr(&self.0) as *const u8 as usize
    }

    pub fn ptr_eq(&self, other: &Set) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn contains(&self, value: impl Into<Value>) -> bool {
        self.borrow().items.contains(&value.into())
    }

    pub fn insert(&self, value: impl Into<Value>) -> bool {
        self.borrow_mut().items.insert(value.into())
    }

    pub fn len(&self) -> usize {
        self.borrow().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn items(&self) -> Vec<Value> {
        self.borrow().items.iter().cloned().collect()
    }

    pub fn format(&self) -> Format {
        self.borrow().format.clone()
    }
}

// A collection already being printed further up is printed as a marker; the
// exclusive borrow held while printing is what detects it.
impl fmt::Debug for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow_mut() {
            Ok(data) => f.debug_list().entries(data.items.iter()).finish(),
            Err(_) => f.write_str("<recursive sequence>"),
        }
    }
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow_mut() {
            Ok(data) => {
                let mut map = f.debug_map();
                map.entries(data.entries.iter());
                for merge in &data.merges {
                    map.entry(&"<<", merge);
                }
                map.finish()
            }
            Err(_) => f.write_str("<recursive mapping>"),
        }
    }
}

impl fmt::Debug for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow_mut() {
            Ok(data) => f.debug_set().entries(data.items.iter()).finish(),
            Err(_) => f.write_str("<recursive set>"),
        }
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(data) = self.0.try_borrow_mut() else {
            return f.write_str("[...]");
        };
        f.write_str("[")?;
        for (index, item) in data.items.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{item}")?;
        }
        f.write_str("]")
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(data) = self.0.try_borrow_mut() else {
            return f.write_str("{...}");
        };
        let entries = data.flattened();
        f.write_str("{")?;
        for (index, (key, value)) in entries.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}: {value}")?;
        }
        f.write_str("}")
    }
}

impl fmt::Display for Set {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Ok(data) = self.0.try_borrow_mut() else {
            return f.write_str("{...}");
        };
        f.write_str("{")?;
        for (index, item) in data.items.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{item}")?;
        }
        f.write_str("}")
    }
}
