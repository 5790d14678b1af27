//! Node graph to value graph.
//!
//! Constructors are looked up by tag in a [`TagRegistry`]. A constructor for
//! a collection is two-phase: it first allocates an empty value, which is
//! memoized right away so that aliases inside the collection (including
//! aliases to the collection itself) resolve to that same value, and it is
//! populated afterwards, either immediately when the caller asked for a deep
//! construction or once the rest of the document has been visited.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use indexmap::IndexMap;
use log::warn;

use crate::arena::{Document, Node, NodeData, NodeId, NodeKind};
use crate::constants::{
    TAG_BINARY, TAG_BOOL, TAG_FLOAT, TAG_INT, TAG_MAP, TAG_MERGE, TAG_NULL, TAG_OMAP, TAG_PAIRS,
    TAG_SEQ, TAG_SET, TAG_STR, TAG_TIMESTAMP, TAG_VALUE,
};
use crate::decode::resolver::Resolver;
use crate::error::{Error, MarkedError, Warning, WarningKind};
use crate::event::{Implicit, ScalarStyle};
use crate::num::{parse_bool, parse_float, parse_int};
use crate::options::{DuplicateKeys, LoadOptions, Mode, YamlVersion};
use crate::value::{DocumentFormat, Format, Mapping, Meta, Sequence, Set, Timestamp, Value};
use crate::Result;

type ConstructFn = dyn Fn(&mut Constructor<'_>, NodeId) -> Result<Value>;
type PopulateFn = dyn Fn(&mut Constructor<'_>, NodeId, &Value) -> Result<()>;

/// How to turn one node into a value.
pub struct Handler {
    construct: Box<ConstructFn>,
    populate: Option<Box<PopulateFn>>,
}

impl Handler {
    pub fn new(construct: impl Fn(&mut Constructor<'_>, NodeId) -> Result<Value> + 'static) -> Self {
        Self {
            construct: Box::new(construct),
            populate: None,
        }
    }

    /// `allocate` returns the value that aliases will see; `populate` fills
    /// it in later.
    pub fn two_phase(
        allocate: impl Fn(&mut Constructor<'_>, NodeId) -> Result<Value> + 'static,
        populate: impl Fn(&mut Constructor<'_>, NodeId, &Value) -> Result<()> + 'static,
    ) -> Self {
        Self {
            construct: Box::new(allocate),
            populate: Some(Box::new(populate)),
        }
    }
}

/// Constructors keyed by tag.
///
/// A registry created with [`TagRegistry::with_base`] checks its own entries
/// first and then defers to the base. Lookup order is exact tag, then the
/// longest matching tag prefix, then the fallback; when all of these miss, the
/// node is built as a plain string, sequence or mapping by its kind.
#[derive(Default)]
pub struct TagRegistry {
    exact: HashMap<String, Handler>,
    prefixes: Vec<(String, Handler)>,
    fallback: Option<Handler>,
    base: Option<Rc<TagRegistry>>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(base: Rc<TagRegistry>) -> Self {
        Self {
            base: Some(base),
            ..Self::default()
        }
    }

    pub fn add_constructor(&mut self, tag: impl Into<String>, handler: Handler) {
        self.exact.insert(tag.into(), handler);
    }

    /// Handler for every tag starting with `prefix`.
    pub fn add_multi_constructor(&mut self, prefix: impl Into<String>, handler: Handler) {
        self.prefixes.push((prefix.into(), handler));
    }

    /// Handler for tags nothing else matched.
    pub fn set_fallback(&mut self, handler: Handler) {
        self.fallback = Some(handler);
    }

    /// The standard types plus a fallback that rejects unknown tags.
    pub fn safe() -> Self {
        let mut registry = Self::standard();
        registry.set_fallback(Handler::new(construct_undefined));
        registry
    }

    /// The standard types plus a fallback that keeps unknown tags on plain
    /// strings, sequences and mappings.
    pub fn round_trip() -> Self {
        let mut registry = Self::standard();
        registry.set_fallback(Handler::two_phase(allocate_tagged, populate_tagged));
        registry
    }

    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Safe => Self::safe(),
            Mode::RoundTrip => Self::round_trip(),
        }
    }

    fn standard() -> Self {
        let mut registry = Self::new();
        registry.add_constructor(TAG_NULL, Handler::new(construct_null));
        registry.add_constructor(TAG_BOOL, Handler::new(construct_bool));
        registry.add_constructor(TAG_INT, Handler::new(construct_int));
        registry.add_constructor(TAG_FLOAT, Handler::new(construct_float));
        registry.add_constructor(TAG_STR, Handler::new(construct_str));
        registry.add_constructor(TAG_BINARY, Handler::new(construct_binary));
        registry.add_constructor(TAG_TIMESTAMP, Handler::new(construct_timestamp));
        registry.add_constructor(TAG_MERGE, Handler::new(construct_str));
        registry.add_constructor(TAG_VALUE, Handler::new(construct_str));
        registry.add_constructor(
            TAG_SEQ,
            Handler::two_phase(allocate_sequence, populate_sequence),
        );
        registry.add_constructor(TAG_MAP, Handler::two_phase(allocate_mapping, populate_mapping));
        registry.add_constructor(TAG_OMAP, Handler::two_phase(allocate_omap, populate_omap));
        registry.add_constructor(TAG_PAIRS, Handler::two_phase(allocate_pairs, populate_pairs));
        registry.add_constructor(TAG_SET, Handler::two_phase(allocate_set, populate_set));
        registry
    }

    fn lookup(&self, tag: &str) -> Option<&Handler> {
        self.lookup_exact(tag)
            .or_else(|| self.lookup_prefix(tag))
            .or_else(|| self.lookup_fallback())
    }

    fn lookup_exact(&self, tag: &str) -> Option<&Handler> {
        self.exact.get(tag).or_else(|| {
            self.base
                .as_deref()
                .and_then(|base| base.lookup_exact(tag))
        })
    }

    fn lookup_prefix(&self, tag: &str) -> Option<&Handler> {
        self.prefixes
            .iter()
            .filter(|(prefix, _)| tag.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, handler)| handler)
            .or_else(|| {
                self.base
                    .as_deref()
                    .and_then(|base| base.lookup_prefix(tag))
            })
    }

    fn lookup_fallback(&self) -> Option<&Handler> {
        self.fallback.as_ref().or_else(|| {
            self.base
                .as_deref()
                .and_then(TagRegistry::lookup_fallback)
        })
    }
}

/// The parts of [`LoadOptions`] construction depends on, with the dialect
/// settled for the current document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub round_trip: bool,
    pub version: YamlVersion,
    pub duplicate_keys: DuplicateKeys,
    pub preserve_quotes: bool,
}

impl Settings {
    pub fn from_options(options: &LoadOptions, version: YamlVersion) -> Self {
        Self {
            round_trip: options.mode == Mode::RoundTrip,
            version,
            duplicate_keys: options.duplicate_keys,
            preserve_quotes: options.preserve_quotes,
        }
    }
}

enum Populate<'a> {
    Handler(&'a Handler),
    Default,
}

/// Builds the value of one document.
pub struct Constructor<'a> {
    document: &'a Document,
    registry: &'a TagRegistry,
    settings: Settings,
    constructed: HashMap<NodeId, Value>,
    in_progress: HashSet<NodeId>,
    /// Allocated values waiting for their second phase, in allocation order.
    pending: Vec<NodeId>,
    populators: HashMap<NodeId, (Value, Populate<'a>)>,
    deep: bool,
    indentless_sequences: Option<bool>,
    warnings: Vec<Warning>,
}

impl<'a> Constructor<'a> {
    pub fn new(document: &'a Document, registry: &'a TagRegistry, settings: Settings) -> Self {
        Self {
            document,
            registry,
            settings,
            constructed: HashMap::new(),
            in_progress: HashSet::new(),
            pending: Vec::new(),
            populators: HashMap::new(),
            deep: false,
            indentless_sequences: None,
            warnings: Vec::new(),
        }
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn node(&self, id: NodeId) -> &'a Node {
        &self.document.arena[id]
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    pub fn construct_document(&mut self) -> Result<Value> {
        let Some(root) = self.document.root else {
            return Ok(Value::null());
        };
        let mut value = self.construct_object(root, false)?;
        while !self.pending.is_empty() {
            for id in std::mem::take(&mut self.pending) {
                self.populate(id)?;
            }
        }
        self.constructed.clear();
        self.in_progress.clear();
        self.populators.clear();
        if self.settings.round_trip {
            let document = self.document;
            let format = DocumentFormat {
                explicit_start: document.explicit_start,
                explicit_end: document.explicit_end,
                version: document.version,
                tags: document.tags.clone(),
                start_comments: document.start_comments.clone(),
                end_comments: document.end_comments.clone(),
                indentless_sequences: self.indentless_sequences.take(),
            };
            value.update_format(|target| target.document = Some(Box::new(format)));
        }
        Ok(value)
    }

    /// Value of a node, constructed at most once per document. With `deep`
    /// every collection reached from the node is populated before returning.
    pub fn construct_object(&mut self, id: NodeId, deep: bool) -> Result<Value> {
        if let Some(value) = self.constructed.get(&id).cloned() {
            if deep || self.deep {
                self.populate(id)?;
            }
            return Ok(value);
        }
        let node = self.node(id);
        if self.in_progress.contains(&id) {
            return Err(Error::constructor(
                None,
                None,
                "found unconstructable recursive node",
                node.start_mark.clone(),
            ));
        }
        let outer_deep = self.deep;
        if deep {
            self.deep = true;
        }
        self.in_progress.insert(id);
        let registry = self.registry;
        let (value, populate) = match registry.lookup(&node.tag) {
            Some(handler) => {
                let value = (handler.construct)(self, id)?;
                let populate = handler.populate.as_ref().map(|_| Populate::Handler(handler));
                (value, populate)
            }
            None => (allocate_by_kind(self, id)?, Some(Populate::Default)),
        };
        self.constructed.insert(id, value.clone());
        self.in_progress.remove(&id);
        if let Some(populate) = populate {
            self.populators.insert(id, (value.clone(), populate));
            if self.deep {
                self.populate(id)?;
            } else {
                self.pending.push(id);
            }
        }
        self.deep = outer_deep;
        Ok(value)
    }

    /// Runs the second phase of a node if it has not run yet. Everything
    /// reached from the node is populated as well.
    fn populate(&mut self, id: NodeId) -> Result<()> {
        let Some((value, populate)) = self.populators.remove(&id) else {
            return Ok(());
        };
        let outer_deep = std::mem::replace(&mut self.deep, true);
        let result = match populate {
            Populate::Handler(handler) => match &handler.populate {
                Some(populate) => populate(self, id, &value),
                None => Ok(()),
            },
            Populate::Default => populate_by_kind(self, id, &value),
        };
        self.deep = outer_deep;
        result
    }

    pub fn construct_scalar(&self, id: NodeId) -> Result<&'a str> {
        let node = self.node(id);
        node.scalar_value().ok_or_else(|| {
            Error::constructor(
                None,
                None,
                format!("expected a scalar node, but found {}", kind_name(node)),
                node.start_mark.clone(),
            )
        })
    }

    /// Logs a warning and keeps it for the caller.
    pub fn warn(&mut self, kind: WarningKind, detail: MarkedError) {
        warn!("{detail}");
        self.warnings.push(Warning::new(kind, detail));
    }

    /// Formatting details of a scalar worth keeping for a round trip.
    fn scalar_format(&self, node: &Node) -> Format {
        if !self.settings.round_trip {
            return Format::default();
        }
        let mut format = Format {
            anchor: node.anchor.clone(),
            tag: self.explicit_tag(node),
            comments: node.comments.clone(),
            ..Format::default()
        };
        if let NodeData::Scalar {
            style,
            fold_positions,
            ..
        } = &node.data
        {
            format.style = match style {
                Some(style @ (ScalarStyle::Literal | ScalarStyle::Folded)) => Some(*style),
                Some(style) if style.is_quoted() => {
                    (self.settings.preserve_quotes || node.tag != TAG_STR).then_some(*style)
                }
                _ => None,
            };
            if let Some(positions) = fold_positions {
                format.fold_positions = positions.clone();
            }
        }
        format
    }

    fn collection_format(&self, node: &Node) -> Format {
        if !self.settings.round_trip {
            return Format::default();
        }
        Format {
            anchor: node.anchor.clone(),
            tag: self.explicit_tag(node),
            flow_style: node.flow_style(),
            comments: node.comments.clone(),
            end_comments: node.end_comments.clone(),
            ..Format::default()
        }
    }

    /// The node's tag when implicit resolution would not have produced it.
    fn explicit_tag(&self, node: &Node) -> Option<String> {
        let resolver = Resolver::new(self.settings.version);
        let implied = match &node.data {
            NodeData::Scalar { value, style, .. } => {
                let plain = matches!(style, None | Some(ScalarStyle::Plain));
                resolver.resolve_scalar(value, Implicit::new(plain, !plain))
            }
            NodeData::Sequence { .. } => resolver.resolve_sequence(),
            NodeData::Mapping { .. } => resolver.resolve_mapping(),
        };
        (node.tag != implied).then(|| node.tag.clone())
    }

    fn scalar_meta(&self, node: &Node, spelling: Option<&str>) -> Meta {
        let mut format = self.scalar_format(node);
        if self.settings.round_trip {
            format.spelling = spelling.map(Into::into);
        }
        Meta::new(format)
    }

    fn insert_entry(
        &mut self,
        map: &Mapping,
        map_node: &Node,
        key_node: &Node,
        key: Value,
        value: Value,
    ) -> Result<()> {
        let previous = map.borrow().entries.get(&key).cloned();
        if let Some(previous) = previous {
            if previous != value {
                let detail = MarkedError::new(
                    Some("while constructing a mapping"),
                    map_node.start_mark.clone(),
                    format!(
                        "found duplicate key \"{key}\" with value \"{value}\" (original value: \"{previous}\")"
                    ),
                    key_node.start_mark.clone(),
                );
                match self.settings.duplicate_keys {
                    DuplicateKeys::Error => return Err(Error::Constructor(Box::new(detail))),
                    DuplicateKeys::Warn => self.warn(WarningKind::DuplicateKey, detail),
                    DuplicateKeys::Allow => {}
                }
            }
        }
        map.borrow_mut().entries.insert(key, value);
        Ok(())
    }

    fn merge_sources(&mut self, map_node: &Node, value_id: NodeId) -> Result<Vec<Mapping>> {
        let value_node = self.node(value_id);
        let ids: Vec<NodeId> = match value_node.kind() {
            NodeKind::Mapping => vec![value_id],
            NodeKind::Sequence => {
                for item in value_node.items() {
                    let item_node = self.node(*item);
                    if item_node.kind() != NodeKind::Mapping {
                        return Err(Error::constructor(
                            Some("while constructing a mapping"),
                            map_node.start_mark.clone(),
                            format!(
                                "expected a mapping for merging, but found {}",
                                kind_name(item_node)
                            ),
                            item_node.start_mark.clone(),
                        ));
                    }
                }
                value_node.items().to_vec()
            }
            NodeKind::Scalar => {
                return Err(Error::constructor(
                    Some("while constructing a mapping"),
                    map_node.start_mark.clone(),
                    format!(
                        "expected a mapping or list of mappings for merging, but found {}",
                        kind_name(value_node)
                    ),
                    value_node.start_mark.clone(),
                ))
            }
        };
        let mut sources = Vec::with_capacity(ids.len());
        for id in ids {
            match self.construct_object(id, true)? {
                Value::Map(mapping) => sources.push(mapping),
                other => {
                    return Err(Error::constructor(
                        Some("while constructing a mapping"),
                        map_node.start_mark.clone(),
                        format!("expected a mapping for merging, but found {}", other.kind_name()),
                        self.node(id).start_mark.clone(),
                    ))
                }
            }
        }
        Ok(sources)
    }
}

fn kind_name(node: &Node) -> &'static str {
    match node.kind() {
        NodeKind::Scalar => "scalar",
        NodeKind::Sequence => "sequence",
        NodeKind::Mapping => "mapping",
    }
}

fn construct_null(ctor: &mut Constructor<'_>, id: NodeId) -> Result<Value> {
    let text = ctor.construct_scalar(id)?;
    Ok(Value::Null(ctor.scalar_meta(ctor.node(id), Some(text))))
}

fn construct_bool(ctor: &mut Constructor<'_>, id: NodeId) -> Result<Value> {
    let text = ctor.construct_scalar(id)?;
    let node = ctor.node(id);
    match parse_bool(text) {
        Some(value) => Ok(Value::Bool(value, ctor.scalar_meta(node, Some(text)))),
        None => Err(Error::constructor(
            Some("while constructing a bool"),
            node.start_mark.clone(),
            format!("cannot interpret '{text}' as a bool"),
            node.start_mark.clone(),
        )),
    }
}

fn construct_int(ctor: &mut Constructor<'_>, id: NodeId) -> Result<Value> {
    let text = ctor.construct_scalar(id)?;
    let node = ctor.node(id);
    match parse_int(text, ctor.settings.version) {
        Some((value, int_format)) => {
            let mut meta = ctor.scalar_meta(node, Some(text));
            if ctor.settings.round_trip {
                meta.update(|format| format.int = Some(int_format));
            }
            Ok(Value::Int(value, meta))
        }
        None => Err(Error::constructor(
            Some("while constructing an int"),
            node.start_mark.clone(),
            format!("cannot interpret '{text}' as an int"),
            node.start_mark.clone(),
        )),
    }
}

fn construct_float(ctor: &mut Constructor<'_>, id: NodeId) -> Result<Value> {
    let text = ctor.construct_scalar(id)?;
    let node = ctor.node(id);
    let Some((value, float_format)) = parse_float(text, ctor.settings.version) else {
        return Err(Error::constructor(
            Some("while constructing a float"),
            node.start_mark.clone(),
            format!("cannot interpret '{text}' as a float"),
            node.start_mark.clone(),
        ));
    };
    if ctor.settings.version == YamlVersion::V1_1
        && float_format.exponent.is_some()
        && !float_format.dot
    {
        let detail = MarkedError::new(
            None,
            None,
            format!(
                "in YAML 1.1 floating point values should have a dot ('.') in their mantissa: {text}"
            ),
            node.start_mark.clone(),
        );
        ctor.warn(WarningKind::MantissaWithoutDot, detail);
    }
    let mut meta = ctor.scalar_meta(node, Some(text));
    if ctor.settings.round_trip {
        meta.update(|format| format.float = Some(float_format));
    }
    Ok(Value::Float(value, meta))
}

fn construct_str(ctor: &mut Constructor<'_>, id: NodeId) -> Result<Value> {
    let text = ctor.construct_scalar(id)?;
    Ok(Value::Str(text.to_owned(), ctor.scalar_meta(ctor.node(id), None)))
}

fn construct_binary(ctor: &mut Constructor<'_>, id: NodeId) -> Result<Value> {
    let text = ctor.construct_scalar(id)?;
    let node = ctor.node(id);
    let compact: String = text.chars().filter(|ch| !ch.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact.as_bytes()).map_err(|err| {
        Error::constructor(
            None,
            None,
            format!("failed to decode base64 data: {err}"),
            node.start_mark.clone(),
        )
    })?;
    Ok(Value::Binary(bytes, ctor.scalar_meta(node, Some(text))))
}

fn construct_timestamp(ctor: &mut Constructor<'_>, id: NodeId) -> Result<Value> {
    let text = ctor.construct_scalar(id)?;
    let node = ctor.node(id);
    let Some((value, timestamp_format)) = Timestamp::parse(text) else {
        return Err(Error::constructor(
            Some("while constructing a timestamp"),
            node.start_mark.clone(),
            format!("cannot interpret '{text}' as a timestamp"),
            node.start_mark.clone(),
        ));
    };
    let mut meta = ctor.scalar_meta(node, Some(text));
    if ctor.settings.round_trip && matches!(value, Timestamp::DateTime(_)) {
        meta.update(|format| format.timestamp = Some(timestamp_format));
    }
    Ok(Value::Timestamp(value, meta))
}

fn construct_undefined(ctor: &mut Constructor<'_>, id: NodeId) -> Result<Value> {
    let node = ctor.node(id);
    Err(Error::constructor(
        None,
        None,
        format!(
            "could not determine a constructor for the tag '{}'",
            node.tag
        ),
        node.start_mark.clone(),
    ))
}

fn allocate_by_kind(ctor: &mut Constructor<'_>, id: NodeId) -> Result<Value> {
    let node = ctor.node(id);
    match node.kind() {
        NodeKind::Scalar => construct_str(ctor, id),
        NodeKind::Sequence => allocate_sequence(ctor, id),
        NodeKind::Mapping => allocate_mapping(ctor, id),
    }
}

fn populate_by_kind(ctor: &mut Constructor<'_>, id: NodeId, value: &Value) -> Result<()> {
    match ctor.node(id).kind() {
        NodeKind::Scalar => Ok(()),
        NodeKind::Sequence => populate_sequence(ctor, id, value),
        NodeKind::Mapping => populate_mapping(ctor, id, value),
    }
}

fn allocate_tagged(ctor: &mut Constructor<'_>, id: NodeId) -> Result<Value> {
    let tag = ctor.node(id).tag.clone();
    let mut value = allocate_by_kind(ctor, id)?;
    value.update_format(|format| format.tag = Some(tag));
    Ok(value)
}

fn populate_tagged(ctor: &mut Constructor<'_>, id: NodeId, value: &Value) -> Result<()> {
    populate_by_kind(ctor, id, value)
}

fn expect_kind(ctor: &Constructor<'_>, id: NodeId, kind: NodeKind, context: &str) -> Result<()> {
    let node = ctor.node(id);
    if node.kind() == kind {
        return Ok(());
    }
    let expected = match kind {
        NodeKind::Scalar => "a scalar",
        NodeKind::Sequence => "a sequence",
        NodeKind::Mapping => "a mapping",
    };
    Err(Error::constructor(
        Some(context),
        node.start_mark.clone(),
        format!("expected {expected}, but found {}", kind_name(node)),
        node.start_mark.clone(),
    ))
}

fn allocate_sequence(ctor: &mut Constructor<'_>, id: NodeId) -> Result<Value> {
    expect_kind(ctor, id, NodeKind::Sequence, "while constructing a sequence")?;
    let format = ctor.collection_format(ctor.node(id));
    Ok(Value::Seq(Sequence::with_format(Vec::new(), format)))
}

fn populate_sequence(ctor: &mut Constructor<'_>, id: NodeId, value: &Value) -> Result<()> {
    let Value::Seq(seq) = value else {
        return Ok(());
    };
    let node = ctor.node(id);
    let mut items = Vec::with_capacity(node.items().len());
    for item in node.items() {
        items.push(ctor.construct_object(*item, false)?);
    }
    seq.borrow_mut().items = items;
    Ok(())
}

fn allocate_mapping(ctor: &mut Constructor<'_>, id: NodeId) -> Result<Value> {
    expect_kind(ctor, id, NodeKind::Mapping, "while constructing a mapping")?;
    let format = ctor.collection_format(ctor.node(id));
    Ok(Value::Map(Mapping::with_format(format)))
}

fn populate_mapping(ctor: &mut Constructor<'_>, id: NodeId, value: &Value) -> Result<()> {
    let Value::Map(map) = value else {
        return Ok(());
    };
    let node = ctor.node(id);
    let mut merges: Vec<Mapping> = Vec::new();
    let mut merge_position: Option<usize> = None;
    let mut own_count = 0;
    for pair in node.pairs() {
        let key_node = ctor.node(pair.key);
        if key_node.tag == TAG_MERGE {
            if merge_position.is_some() {
                let detail = MarkedError::new(
                    Some("while constructing a mapping"),
                    node.start_mark.clone(),
                    "found duplicate key \"<<\"",
                    key_node.start_mark.clone(),
                );
                match ctor.settings.duplicate_keys {
                    DuplicateKeys::Error => return Err(Error::Constructor(Box::new(detail))),
                    DuplicateKeys::Warn => ctor.warn(WarningKind::DuplicateKey, detail),
                    DuplicateKeys::Allow => continue,
                }
            }
            merge_position.get_or_insert(own_count);
            merges.extend(ctor.merge_sources(node, pair.value)?);
            continue;
        }
        let key = if key_node.tag == TAG_VALUE {
            Value::Str("=".to_owned(), ctor.scalar_meta(key_node, None))
        } else {
            ctor.construct_object(pair.key, true)?
        };
        if !ctor.settings.round_trip && matches!(key, Value::Map(_) | Value::Set(_)) {
            return Err(Error::constructor(
                Some("while constructing a mapping"),
                node.start_mark.clone(),
                "found unhashable key",
                key_node.start_mark.clone(),
            ));
        }
        let value_node = ctor.node(pair.value);
        if ctor.settings.round_trip
            && ctor.indentless_sequences.is_none()
            && value_node.kind() == NodeKind::Sequence
            && value_node.flow_style() == Some(false)
        {
            if let (Some(key_mark), Some(value_mark)) = (&key_node.start_mark, &value_node.start_mark) {
                ctor.indentless_sequences = Some(key_mark.column == value_mark.column);
            }
        }
        let value = ctor.construct_object(pair.value, false)?;
        ctor.insert_entry(map, node, key_node, key, value)?;
        own_count = map.borrow().entries.len();
    }
    if merges.is_empty() {
        return Ok(());
    }
    if ctor.settings.round_trip {
        let mut data = map.borrow_mut();
        data.merges = merges;
        data.merge_position = merge_position.unwrap_or(0);
        return Ok(());
    }
    let mut flattened: IndexMap<Value, Value> = IndexMap::new();
    for merge in &merges {
        let Some(data) = merge.try_borrow() else {
            continue;
        };
        for (key, value) in data.flattened() {
            flattened.entry(key).or_insert(value);
        }
    }
    let mut data = map.borrow_mut();
    let own = std::mem::take(&mut data.entries);
    flattened.extend(own);
    data.entries = flattened;
    Ok(())
}

fn allocate_omap(ctor: &mut Constructor<'_>, id: NodeId) -> Result<Value> {
    expect_kind(ctor, id, NodeKind::Sequence, "while constructing an ordered map")?;
    let mut format = ctor.collection_format(ctor.node(id));
    format.tag = Some(TAG_OMAP.to_owned());
    Ok(Value::Map(Mapping::with_format(format)))
}

/// Items of an `omap` or `pairs` node: each must be a mapping with exactly
/// one entry.
fn single_pairs<'a>(ctor: &Constructor<'a>, id: NodeId, context: &str) -> Result<Vec<(NodeId, NodeId)>> {
    let node = ctor.node(id);
    let mut pairs = Vec::with_capacity(node.items().len());
    for item in node.items() {
        let item_node = ctor.node(*item);
        if item_node.kind() != NodeKind::Mapping {
            return Err(Error::constructor(
                Some(context),
                node.start_mark.clone(),
                format!(
                    "expected a mapping of length 1, but found {}",
                    kind_name(item_node)
                ),
                item_node.start_mark.clone(),
            ));
        }
        let [pair] = item_node.pairs() else {
            return Err(Error::constructor(
                Some(context),
                node.start_mark.clone(),
                format!(
                    "expected a single mapping item, but found {} items",
                    item_node.pairs().len()
                ),
                item_node.start_mark.clone(),
            ));
        };
        pairs.push((pair.key, pair.value));
    }
    Ok(pairs)
}

fn populate_omap(ctor: &mut Constructor<'_>, id: NodeId, value: &Value) -> Result<()> {
    let Value::Map(map) = value else {
        return Ok(());
    };
    let node = ctor.node(id);
    for (key_id, value_id) in single_pairs(ctor, id, "while constructing an ordered map")? {
        let key = ctor.construct_object(key_id, true)?;
        let value = ctor.construct_object(value_id, false)?;
        let key_node = ctor.node(key_id);
        ctor.insert_entry(map, node, key_node, key, value)?;
    }
    Ok(())
}

fn allocate_pairs(ctor: &mut Constructor<'_>, id: NodeId) -> Result<Value> {
    expect_kind(ctor, id, NodeKind::Sequence, "while constructing pairs")?;
    let mut format = ctor.collection_format(ctor.node(id));
    format.tag = Some(TAG_PAIRS.to_owned());
    Ok(Value::Seq(Sequence::with_format(Vec::new(), format)))
}

fn populate_pairs(ctor: &mut Constructor<'_>, id: NodeId, value: &Value) -> Result<()> {
    let Value::Seq(seq) = value else {
        return Ok(());
    };
    let mut items = Vec::new();
    for (key_id, value_id) in single_pairs(ctor, id, "while constructing pairs")? {
        let key = ctor.construct_object(key_id, true)?;
        let value = ctor.construct_object(value_id, false)?;
        items.push(Value::from(vec![key, value]));
    }
    seq.borrow_mut().items = items;
    Ok(())
}

fn allocate_set(ctor: &mut Constructor<'_>, id: NodeId) -> Result<Value> {
    expect_kind(ctor, id, NodeKind::Mapping, "while constructing a set")?;
    let mut format = ctor.collection_format(ctor.node(id));
    format.tag = None;
    let set = Set::new();
    set.borrow_mut().format = format;
    Ok(Value::Set(set))
}

fn populate_set(ctor: &mut Constructor<'_>, id: NodeId, value: &Value) -> Result<()> {
    let Value::Set(set) = value else {
        return Ok(());
    };
    let node = ctor.node(id);
    for pair in node.pairs() {
        let key = ctor.construct_object(pair.key, true)?;
        set.borrow_mut().items.insert(key);
    }
    Ok(())
}
