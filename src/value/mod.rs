//! The native value graph produced by loading and consumed by dumping.
//!
//! Scalars carry an optional [`Meta`] handle and collections carry a
//! [`Format`]; neither takes part in equality or hashing, so a value loaded
//! in round-trip mode compares equal to the same value loaded safely.

pub mod collections;
pub mod format;
pub mod json;
pub mod timestamp;

use std::fmt;
use std::hash::{Hash, Hasher};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use smol_str::SmolStr;

use crate::comments::Comments;
use crate::num::format_float_default;
use crate::options::YamlVersion;

pub use collections::{Mapping, MappingData, Sequence, SequenceData, Set, SetData};
pub use format::{DocumentFormat, Format, Meta};
pub use timestamp::{Timestamp, TimestampFormat};

/// Nesting beyond which equality stops descending and assumes the rest
/// matches. Only reachable through cycles that are not shared by identity.
const MAX_EQ_DEPTH: usize = 512;

#[derive(Clone)]
pub enum Value {
    Null(Meta),
    Bool(bool, Meta),
    Int(i128, Meta),
    Float(f64, Meta),
    Str(String, Meta),
    Binary(Vec<u8>, Meta),
    Timestamp(Timestamp, Meta),
    Seq(Sequence),
    Map(Mapping),
    Set(Set),
}

impl Value {
    pub fn null() -> Self {
        Value::Null(Meta::none())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Value::Str(value.into(), Meta::none())
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null(_) => "null",
            Value::Bool(..) => "bool",
            Value::Int(..) => "int",
            Value::Float(..) => "float",
            Value::Str(..) => "str",
            Value::Binary(..) => "binary",
            Value::Timestamp(..) => "timestamp",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "mapping",
            Value::Set(_) => "set",
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self, Value::Seq(_) | Value::Map(_) | Value::Set(_))
    }

    pub fn meta(&self) -> Option<&Meta> {
        match self {
            Value::Null(meta)
            | Value::Bool(_, meta)
            | Value::Int(_, meta)
            | Value::Float(_, meta)
            | Value::Str(_, meta)
            | Value::Binary(_, meta)
            | Value::Timestamp(_, meta) => Some(meta),
            Value::Seq(_) | Value::Map(_) | Value::Set(_) => None,
        }
    }

    /// Snapshot of the formatting details, default when there are none.
    pub fn format(&self) -> Format {
        match self {
            Value::Seq(seq) => seq.format(),
            Value::Map(map) => map.format(),
            Value::Set(set) => set.format(),
            scalar => scalar
                .meta()
                .and_then(Meta::get)
                .cloned()
                .unwrap_or_default(),
        }
    }

    /// Edits the formatting details of the value in place. For collections
    /// the edit is visible through every alias.
    pub fn update_format(&mut self, edit: impl FnOnce(&mut Format)) {
        match self {
            Value::Seq(seq) => edit(&mut seq.borrow_mut().format),
            Value::Map(map) => edit(&mut map.borrow_mut().format),
            Value::Set(set) => edit(&mut set.borrow_mut().format),
            Value::Null(meta)
            | Value::Bool(_, meta)
            | Value::Int(_, meta)
            | Value::Float(_, meta)
            | Value::Str(_, meta)
            | Value::Binary(_, meta)
            | Value::Timestamp(_, meta) => meta.update(edit),
        }
    }

    pub fn anchor(&self) -> Option<SmolStr> {
        self.format().anchor
    }

    pub fn tag(&self) -> Option<String> {
        self.format().tag
    }

    pub fn comments(&self) -> Option<Comments> {
        self.format().comments.map(|comments| *comments)
    }

    /// Identity shared by every alias of the same node: the collection's
    /// address, or the formatting handle of an anchored scalar.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Seq(seq) => Some(seq.identity()),
            Value::Map(map) => Some(map.identity()),
            Value::Set(set) => Some(set.identity()),
            scalar => scalar
                .meta()
                .filter(|meta| meta.anchor().is_some())
                .and_then(Meta::identity),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value, _) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Int(value, _) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_i128().and_then(|value| i64::try_from(value).ok())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(value, _) => Some(*value),
            Value::Int(value, _) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(value, _) => Some(value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(value, _) => Some(value),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&Timestamp> {
        match self {
            Value::Timestamp(value, _) => Some(value),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Value::Seq(seq) => Some(seq),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&Set> {
        match self {
            Value::Set(set) => Some(set),
            _ => None,
        }
    }

    /// Mapping lookup by key, or sequence lookup by integer index.
    pub fn get(&self, key: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        match self {
            Value::Map(map) => map.borrow().lookup(&key),
            Value::Seq(seq) => {
                let index = usize::try_from(key.as_i128()?).ok()?;
                seq.get(index)
            }
            _ => None,
        }
    }

    /// Plain text of a scalar the way a YAML 1.2 document spells it.
    pub fn scalar_text(&self) -> Option<String> {
        Some(match self {
            Value::Null(_) => "null".to_owned(),
            Value::Bool(value, _) => value.to_string(),
            Value::Int(value, _) => itoa::Buffer::new().format(*value).to_owned(),
            Value::Float(value, _) => format_float_default(*value, YamlVersion::V1_2),
            Value::Str(value, _) => value.clone(),
            Value::Binary(value, _) => STANDARD.encode(value),
            Value::Timestamp(value, _) => value.to_string(),
            Value::Seq(_) | Value::Map(_) | Value::Set(_) => return None,
        })
    }
}

fn float_eq(a: f64, b: f64) -> bool {
    (a.is_nan() && b.is_nan()) || a == b
}

fn values_eq(a: &Value, b: &Value, depth: usize) -> bool {
    if depth > MAX_EQ_DEPTH {
        return true;
    }
    match (a, b) {
        (Value::Null(_), Value::Null(_)) => true,
        (Value::Bool(a, _), Value::Bool(b, _)) => a == b,
        (Value::Int(a, _), Value::Int(b, _)) => a == b,
        (Value::Float(a, _), Value::Float(b, _)) => float_eq(*a, *b),
        (Value::Str(a, _), Value::Str(b, _)) => a == b,
        (Value::Binary(a, _), Value::Binary(b, _)) => a == b,
        (Value::Timestamp(a, _), Value::Timestamp(b, _)) => a == b,
        (Value::Seq(a), Value::Seq(b)) => {
            if a.ptr_eq(b) {
                return true;
            }
            let (Some(a), Some(b)) = (a.try_borrow(), b.try_borrow()) else {
                return false;
            };
            a.items.len() == b.items.len()
                && a
                    .items
                    .iter()
                    .zip(b.items.iter())
                    .all(|(a, b)| values_eq(a, b, depth + 1))
        }
        (Value::Map(a), Value::Map(b)) => {
            if a.ptr_eq(b) {
                return true;
            }
            let (Some(a), Some(b)) = (a.try_borrow(), b.try_borrow()) else {
                return false;
            };
            let (a, b) = (a.flattened(), b.flattened());
            a.len() == b.len()
                && a.iter().all(|(key, value)| {
                    b.get(key)
                        .map(|other| values_eq(value, other, depth + 1))
                        .unwrap_or(false)
                })
        }
        (Value::Set(a), Value::Set(b)) => {
            if a.ptr_eq(b) {
                return true;
            }
            let (Some(a), Some(b)) = (a.try_borrow(), b.try_borrow()) else {
                return false;
            };
            a.items.len() == b.items.len() && a.items.iter().all(|item| b.items.contains(item))
        }
        _ => false,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        values_eq(self, other, 0)
    }
}

impl Eq for Value {}

// Collections hash their kind only: hashing their content would need a
// borrow that a mapping under construction cannot give.
impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null(_) | Value::Seq(_) | Value::Map(_) | Value::Set(_) => {}
            Value::Bool(value, _) => value.hash(state),
            Value::Int(value, _) => value.hash(state),
            Value::Float(value, _) => {
                let bits = if value.is_nan() {
                    f64::NAN.to_bits()
                } else if *value == 0.0 {
                    0
                } else {
                    value.to_bits()
                };
                bits.hash(state);
            }
            Value::Str(value, _) => value.hash(state),
            Value::Binary(value, _) => value.hash(state),
            Value::Timestamp(value, _) => value.hash(state),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null(_) => f.write_str("Null"),
            Value::Bool(value, _) => write!(f, "Bool({value})"),
            Value::Int(value, _) => write!(f, "Int({value})"),
            Value::Float(value, _) => write!(f, "Float({value:?})"),
            Value::Str(value, _) => write!(f, "Str({value:?})"),
            Value::Binary(value, _) => write!(f, "Binary({} bytes)", value.len()),
            Value::Timestamp(value, _) => write!(f, "Timestamp({value})"),
            Value::Seq(seq) => fmt::Debug::fmt(seq, f),
            Value::Map(map) => fmt::Debug::fmt(map, f),
            Value::Set(set) => fmt::Debug::fmt(set, f),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Seq(seq) => fmt::Display::fmt(seq, f),
            Value::Map(map) => fmt::Display::fmt(map, f),
            Value::Set(set) => fmt::Display::fmt(set, f),
            scalar => f.write_str(&scalar.scalar_text().unwrap_or_default()),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::null()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::string(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Str(value, Meta::none())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value, Meta::none())
    }
}

macro_rules! from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Int(i128::from(value), Meta::none())
                }
            }
        )*
    };
}

from_integer!(i8, i16, i32, i64, i128, u8, u16, u32, u64);

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value, Meta::none())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Binary(value, Meta::none())
    }
}

impl From<Timestamp> for Value {
    fn from(value: Timestamp) -> Self {
        Value::Timestamp(value, Meta::none())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Seq(Sequence::from_items(items))
    }
}

impl From<Sequence> for Value {
    fn from(value: Sequence) -> Self {
        Value::Seq(value)
    }
}

impl From<Mapping> for Value {
    fn from(value: Mapping) -> Self {
        Value::Map(value)
    }
}

impl From<Set> for Value {
    fn from(value: Set) -> Self {
        Value::Set(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}
