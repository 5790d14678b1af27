//! YAML 1.1 / 1.2 loading and dumping with a round-trip mode that keeps
//! comments, quoting, anchors, key order and number spelling.
//!
//! ```
//! let value = yaml_rt::round_trip_load("a: 0x1f  # hex\nb: 'quoted'\n")?;
//! assert_eq!(value.get("a").and_then(|v| v.as_i64()), Some(31));
//! assert_eq!(
//!     yaml_rt::round_trip_dump(&value)?,
//!     "a: 0x1f  # hex\nb: 'quoted'\n"
//! );
//! # Ok::<(), yaml_rt::Error>(())
//! ```

pub mod arena;
pub mod comments;
pub mod constants;
pub mod decode;
pub mod encode;
pub mod error;
pub mod event;
pub mod num;
pub mod options;
pub mod value;

use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

pub use crate::decode::Loader;
pub use crate::encode::Dumper;
pub use crate::error::{Error, ErrorKind, Mark, Warning, WarningKind};
pub use crate::options::{
    DumpOptions, DuplicateKeys, Encoding, Indent, LineBreak, LoadOptions, Mode, YamlVersion,
};
pub use crate::value::{Mapping, Sequence, Set, Timestamp, Value};

pub type Result<T> = std::result::Result<T, Error>;

/// The single document of `input`, restricted to the standard tags.
pub fn load(input: &str) -> Result<Value> {
    load_with_options(input, &LoadOptions::safe())
}

pub fn load_all(input: &str) -> Result<Vec<Value>> {
    load_all_with_options(input, &LoadOptions::safe())
}

pub fn load_with_options(input: &str, options: &LoadOptions) -> Result<Value> {
    Loader::new(input, options)?.load_single()
}

pub fn load_all_with_options(input: &str, options: &LoadOptions) -> Result<Vec<Value>> {
    Loader::new(input, options)?.load_all()
}

/// Like [`load_with_options`], also returning the warnings the load
/// produced, such as duplicate keys under [`DuplicateKeys::Warn`].
pub fn load_with_warnings(input: &str, options: &LoadOptions) -> Result<(Value, Vec<Warning>)> {
    let mut loader = Loader::new(input, options)?;
    let value = loader.load_single()?;
    Ok((value, loader.take_warnings()))
}

/// Loads keeping everything [`round_trip_dump`] needs to write the text back.
pub fn round_trip_load(input: &str) -> Result<Value> {
    load_with_options(input, &LoadOptions::round_trip())
}

pub fn dump(value: &Value) -> Result<String> {
    dump_with_options(value, &DumpOptions::safe())
}

pub fn dump_all(values: &[Value]) -> Result<String> {
    dump_all_with_options(values, &DumpOptions::safe())
}

pub fn dump_with_options(value: &Value, options: &DumpOptions) -> Result<String> {
    encode::dump(value, options)
}

pub fn dump_all_with_options(values: &[Value], options: &DumpOptions) -> Result<String> {
    encode::dump_all(values, options)
}

pub fn dump_to_writer<W: Write>(writer: W, values: &[Value], options: &DumpOptions) -> Result<()> {
    encode::to_writer(writer, values, options)
}

/// Dumps a value loaded by [`round_trip_load`] with its original formatting.
/// A value built in code is written with default formatting.
pub fn round_trip_dump(value: &Value) -> Result<String> {
    dump_with_options(value, &DumpOptions::round_trip())
}

pub fn from_str<T: DeserializeOwned>(input: &str) -> Result<T> {
    from_str_with_options(input, &LoadOptions::safe())
}

pub fn from_str_with_options<T: DeserializeOwned>(input: &str, options: &LoadOptions) -> Result<T> {
    from_value(&load_with_options(input, options)?)
}

pub fn from_slice<T: DeserializeOwned>(input: &[u8]) -> Result<T> {
    from_slice_with_options(input, &LoadOptions::safe())
}

pub fn from_slice_with_options<T: DeserializeOwned>(
    input: &[u8],
    options: &LoadOptions,
) -> Result<T> {
    from_value(&Loader::from_bytes(input, options)?.load_single()?)
}

pub fn from_reader<T: DeserializeOwned, R: Read>(reader: R) -> Result<T> {
    from_reader_with_options(reader, &LoadOptions::safe())
}

pub fn from_reader_with_options<T: DeserializeOwned, R: Read>(
    mut reader: R,
    options: &LoadOptions,
) -> Result<T> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    from_slice_with_options(&bytes, options)
}

pub fn to_string<T: Serialize>(value: &T) -> Result<String> {
    to_string_with_options(value, &DumpOptions::safe())
}

pub fn to_string_with_options<T: Serialize>(value: &T, options: &DumpOptions) -> Result<String> {
    dump_with_options(&to_value(value)?, options)
}

pub fn to_vec<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    to_vec_with_options(value, &DumpOptions::safe())
}

pub fn to_vec_with_options<T: Serialize>(value: &T, options: &DumpOptions) -> Result<Vec<u8>> {
    let mut dumper = Dumper::new(options)?;
    dumper.dump(&to_value(value)?)?;
    dumper.finish_bytes()
}

pub fn to_writer<T: Serialize, W: Write>(writer: W, value: &T) -> Result<()> {
    to_writer_with_options(writer, value, &DumpOptions::safe())
}

pub fn to_writer_with_options<T: Serialize, W: Write>(
    writer: W,
    value: &T,
    options: &DumpOptions,
) -> Result<()> {
    dump_to_writer(writer, &[to_value(value)?], options)
}

fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T> {
    serde_json::from_value(value.to_json()?).map_err(|err| Error::serde(err.to_string()))
}

fn to_value<T: Serialize>(value: &T) -> Result<Value> {
    let json = serde_json::to_value(value).map_err(|err| Error::serde(err.to_string()))?;
    Ok(Value::from_json(&json))
}
