pub mod composer;
pub mod constructor;
pub mod parser;
pub mod reader;
pub mod resolver;
pub mod scanner;
pub mod token;

use std::rc::Rc;

use log::debug;

use crate::decode::composer::Composer;
use crate::decode::constructor::{Constructor, Settings, TagRegistry};
use crate::decode::parser::Parser;
use crate::decode::reader::Reader;
use crate::decode::scanner::Scanner;
use crate::error::{Error, Warning};
use crate::event::EventKind;
use crate::options::{LoadOptions, Mode};
use crate::value::Value;
use crate::Result;

/// Loads the documents of one stream, one at a time.
pub struct Loader {
    composer: Composer,
    registry: Rc<TagRegistry>,
    options: LoadOptions,
    warnings: Vec<Warning>,
}

impl Loader {
    pub fn new(input: &str, options: &LoadOptions) -> Result<Self> {
        let reader = Reader::from_str(input, &options.name)?;
        Ok(Self::with_reader(reader, options))
    }

    /// Like [`Loader::new`], decoding the bytes by their byte order mark.
    pub fn from_bytes(input: &[u8], options: &LoadOptions) -> Result<Self> {
        let reader = Reader::from_bytes(input, &options.name)?;
        Ok(Self::with_reader(reader, options))
    }

    fn with_reader(reader: Reader, options: &LoadOptions) -> Self {
        let round_trip = options.mode == Mode::RoundTrip;
        let scanner = Scanner::new(reader)
            .with_round_trip(round_trip)
            .with_version(options.version);
        let parser = Parser::new(scanner).with_round_trip(round_trip);
        Self {
            composer: Composer::new(parser).with_max_depth(options.max_depth),
            registry: Rc::new(TagRegistry::for_mode(options.mode)),
            options: options.clone(),
            warnings: Vec::new(),
        }
    }

    /// Constructs with `registry` instead of the registry of the load mode.
    pub fn with_registry(mut self, registry: Rc<TagRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn next_document(&mut self) -> Result<Option<Value>> {
        let document = self.composer.compose_document();
        self.warnings.extend(self.composer.take_warnings());
        let Some(document) = document? else {
            return Ok(None);
        };
        let version = self.composer.parser().document_version();
        debug!("constructing document as YAML {version}");
        let settings = Settings::from_options(&self.options, version);
        let mut constructor = Constructor::new(&document, &self.registry, settings);
        let value = constructor.construct_document();
        self.warnings.extend(constructor.take_warnings());
        value.map(Some)
    }

    /// The only document of the stream, null for an empty stream.
    pub fn load_single(&mut self) -> Result<Value> {
        let value = self.next_document()?.unwrap_or_default();
        if self.composer.check_document()? {
            let mark = self
                .composer
                .parser_mut()
                .peek_event()?
                .filter(|event| matches!(event.kind, EventKind::DocumentStart { .. }))
                .and_then(|event| event.start_mark.clone());
            return Err(Error::composer(
                Some("expected a single document in the stream"),
                None,
                "but found another document",
                mark,
            ));
        }
        Ok(value)
    }

    pub fn load_all(&mut self) -> Result<Vec<Value>> {
        let mut values = Vec::new();
        while let Some(value) = self.next_document()? {
            values.push(value);
        }
        Ok(values)
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }
}

impl Iterator for Loader {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_document().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WarningKind;
    use rstest::rstest;

    #[rstest]
    fn test_load_single_rejects_second_document() {
        let mut loader = Loader::new("a\n--- b\n", &LoadOptions::safe()).unwrap();
        let err = loader.load_single().unwrap_err();
        assert_eq!(err.context(), Some("expected a single document in the stream"));
        assert_eq!(err.problem(), Some("but found another document"));
    }

    #[rstest]
    fn test_empty_stream_is_null() {
        let mut loader = Loader::new("# nothing\n", &LoadOptions::safe()).unwrap();
        assert!(loader.load_single().unwrap().is_null());
    }

    #[rstest]
    fn test_iterates_documents() {
        let loader = Loader::new("1\n---\n2\n...\n---\n3\n", &LoadOptions::safe()).unwrap();
        let values: Vec<Value> = loader.collect::<Result<_>>().unwrap();
        assert_eq!(values, vec![Value::from(1), Value::from(2), Value::from(3)]);
    }

    #[rstest]
    fn test_directive_selects_dialect_per_document() {
        let input = "%YAML 1.1\n---\nyes\n...\n---\nyes\n";
        let mut loader = Loader::new(input, &LoadOptions::safe()).unwrap();
        let values = loader.load_all().unwrap();
        assert_eq!(values, vec![Value::from(true), Value::from("yes")]);
    }

    #[rstest]
    fn test_warnings_are_collected() {
        let mut loader = Loader::new("- &a 1\n- &a 2\n- {k: 1, k: 2}\n", &LoadOptions::safe()).unwrap();
        loader.load_single().unwrap();
        let kinds: Vec<WarningKind> = loader.take_warnings().iter().map(|w| w.kind).collect();
        assert_eq!(kinds, vec![WarningKind::ReusedAnchor, WarningKind::DuplicateKey]);
    }

    #[rstest]
    fn test_bytes_with_utf16_bom() {
        let mut bytes = vec![0xff, 0xfe];
        for unit in "k: v\n".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let mut loader = Loader::from_bytes(&bytes, &LoadOptions::safe()).unwrap();
        assert_eq!(loader.load_single().unwrap().get("k"), Some(Value::from("v")));
    }
}
