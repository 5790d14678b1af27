pub mod analysis;
pub mod emitter;
pub mod representer;
pub mod serializer;
mod writer;

use std::io::Write;
use std::rc::Rc;

use log::debug;

use crate::encode::emitter::Emitter;
use crate::encode::representer::{Representer, RepresenterRegistry};
use crate::encode::serializer::Serializer;
use crate::error::Error;
use crate::options::{DumpOptions, Indent};
use crate::value::Value;
use crate::Result;

/// Dumps the documents of one stream, one at a time.
///
/// ```
/// use yaml_rt::encode::Dumper;
/// use yaml_rt::value::Value;
/// use yaml_rt::DumpOptions;
///
/// let mut dumper = Dumper::new(&DumpOptions::safe())?;
/// dumper.dump(&Value::from(vec![Value::from(1), Value::from(2)]))?;
/// dumper.dump(&Value::from("two"))?;
/// assert_eq!(dumper.finish()?, "- 1\n- 2\n--- two\n");
/// # Ok::<(), yaml_rt::Error>(())
/// ```
pub struct Dumper {
    representer: Representer,
    serializer: Serializer,
    emitter: Emitter,
    options: DumpOptions,
    documents: usize,
}

impl Dumper {
    pub fn new(options: &DumpOptions) -> Result<Self> {
        validate_options(options)?;
        let mut emitter = Emitter::new(options);
        let mut serializer = Serializer::new(options);
        serializer.open(&mut emitter)?;
        Ok(Self {
            representer: Representer::new(Rc::new(RepresenterRegistry::new()), options),
            serializer,
            emitter,
            options: options.clone(),
            documents: 0,
        })
    }

    /// Represents tagged values with `registry` before falling back to the
    /// standard representation.
    pub fn with_registry(mut self, registry: Rc<RepresenterRegistry>) -> Self {
        self.representer = Representer::new(registry, &self.options);
        self
    }

    pub fn dump(&mut self, value: &Value) -> Result<()> {
        let document = self.representer.represent(value)?;
        self.serializer.serialize(&document, &mut self.emitter)?;
        self.documents += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<String> {
        self.close()?;
        Ok(self.emitter.finish())
    }

    /// The output in the configured encoding.
    pub fn finish_bytes(mut self) -> Result<Vec<u8>> {
        self.close()?;
        Ok(self.emitter.finish_bytes())
    }

    fn close(&mut self) -> Result<()> {
        debug!("closing stream after {} documents", self.documents);
        self.serializer.close(&mut self.emitter)
    }
}

fn validate_indent(name: &str, indent: Indent) -> Result<()> {
    if indent.is_valid() {
        return Ok(());
    }
    Err(Error::emitter(format!(
        "{name} must be between 1 and 9, but got {}",
        indent.get_spaces()
    )))
}

fn validate_options(options: &DumpOptions) -> Result<()> {
    validate_indent("indent", options.indent)?;
    if let Some(indent) = options.map_indent {
        validate_indent("mapping indent", indent)?;
    }
    if let Some(indent) = options.sequence_indent {
        validate_indent("sequence indent", indent)?;
    }
    Ok(())
}

pub fn dump(value: &Value, options: &DumpOptions) -> Result<String> {
    dump_all(std::slice::from_ref(value), options)
}

pub fn dump_all(values: &[Value], options: &DumpOptions) -> Result<String> {
    let mut dumper = Dumper::new(options)?;
    for value in values {
        dumper.dump(value)?;
    }
    dumper.finish()
}

/// Writes the stream in the configured encoding.
pub fn to_writer<W: Write>(mut writer: W, values: &[Value], options: &DumpOptions) -> Result<()> {
    let mut dumper = Dumper::new(options)?;
    for value in values {
        dumper.dump(value)?;
    }
    writer.write_all(&dumper.finish_bytes()?)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::options::Encoding;
    use crate::value::Mapping;
    use rstest::rstest;

    fn sample() -> Value {
        Value::Map(Mapping::from_entries([
            (Value::from("a"), Value::from(1)),
            (
                Value::from("b"),
                Value::from(vec![Value::from(2), Value::from(3)]),
            ),
        ]))
    }

    #[rstest]
    fn test_dump_block_mapping() {
        let output = dump(&sample(), &DumpOptions::safe()).unwrap();
        assert_eq!(output, "a: 1\nb:\n  - 2\n  - 3\n");
    }

    #[rstest]
    fn test_dump_all_separates_documents() {
        let values = [Value::from(1), Value::from(2)];
        let output = dump_all(&values, &DumpOptions::safe()).unwrap();
        assert_eq!(output, "1\n--- 2\n");
    }

    #[rstest]
    fn test_explicit_markers() {
        let options = DumpOptions::safe()
            .with_explicit_start(true)
            .with_explicit_end(true);
        assert_eq!(dump(&Value::from("x"), &options).unwrap(), "--- x\n...\n");
    }

    #[rstest]
    #[case(DumpOptions::safe().with_indent(Indent::spaces(0)), "indent must be between 1 and 9, but got 0")]
    #[case(DumpOptions::safe().with_indent(Indent::spaces(10)), "indent must be between 1 and 9, but got 10")]
    #[case(
        DumpOptions::safe().with_sequence_indent(Some(Indent::spaces(12))),
        "sequence indent must be between 1 and 9, but got 12"
    )]
    fn test_invalid_indent_is_an_emitter_error(#[case] options: DumpOptions, #[case] problem: &str) {
        let err = dump(&sample(), &options).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Emitter);
        assert_eq!(err.problem(), Some(problem));
    }

    #[rstest]
    fn test_wider_indent() {
        let options = DumpOptions::safe().with_indent(Indent::spaces(4));
        let output = dump(&sample(), &options).unwrap();
        assert_eq!(output, "a: 1\nb:\n    - 2\n    - 3\n");
    }

    #[rstest]
    fn test_to_writer_encodes_utf16() {
        let options = DumpOptions::safe().with_encoding(Encoding::Utf16Le);
        let mut out = Vec::new();
        to_writer(&mut out, &[Value::from("a")], &options).unwrap();
        assert_eq!(out, vec![0xff, 0xfe, b'a', 0, b'\n', 0]);
    }
}
