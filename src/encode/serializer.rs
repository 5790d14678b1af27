//! Node graph to event stream.

use std::collections::{HashMap, HashSet};

use log::debug;
use smol_str::SmolStr;

use crate::arena::{Document, NodeData, NodeId};
use crate::decode::resolver::Resolver;
use crate::encode::emitter::Emitter;
use crate::error::Error;
use crate::event::{Event, EventKind, Implicit};
use crate::options::{DumpOptions, YamlVersion};
use crate::Result;

/// Walks documents and feeds their events to an [`Emitter`].
///
/// A node reached more than once is written in full the first time and as
/// an alias afterwards. It keeps the anchor it was loaded with; otherwise it
/// gets a generated `idNNN` anchor, numbered across the whole stream.
pub struct Serializer {
    explicit_start: bool,
    explicit_end: bool,
    version: Option<YamlVersion>,
    tags: Vec<(String, String)>,
    indentless_sequences: Option<bool>,
    last_anchor_id: usize,
    opened: bool,
    closed: bool,
}

impl Serializer {
    pub fn new(options: &DumpOptions) -> Self {
        Self {
            explicit_start: options.explicit_start,
            explicit_end: options.explicit_end,
            version: options.version,
            tags: options.tags.clone(),
            indentless_sequences: options.indentless_sequences,
            last_anchor_id: 0,
            opened: false,
            closed: false,
        }
    }

    pub fn open(&mut self, emitter: &mut Emitter) -> Result<()> {
        if self.closed {
            return Err(Error::serializer("serializer is closed"));
        }
        if self.opened {
            return Err(Error::serializer("serializer is already opened"));
        }
        self.opened = true;
        emitter.emit(Event::new(EventKind::StreamStart))
    }

    pub fn close(&mut self, emitter: &mut Emitter) -> Result<()> {
        if !self.opened {
            return Err(Error::serializer("serializer is not opened"));
        }
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        emitter.emit(Event::new(EventKind::StreamEnd))
    }

    pub fn serialize(&mut self, document: &Document, emitter: &mut Emitter) -> Result<()> {
        if !self.opened {
            return Err(Error::serializer("serializer is not opened"));
        }
        if self.closed {
            return Err(Error::serializer("serializer is closed"));
        }
        let version = document
            .version
            .or_else(|| self.version.map(YamlVersion::numbers));
        let dialect = version
            .and_then(|(major, minor)| YamlVersion::from_numbers(major, minor))
            .unwrap_or_default();
        let mut tags = document.tags.clone();
        for (handle, prefix) in &self.tags {
            if !tags.iter().any(|(existing, _)| existing == handle) {
                tags.push((handle.clone(), prefix.clone()));
            }
        }
        debug!("serializing document as YAML {dialect}");
        emitter.set_indentless_sequences(
            self.indentless_sequences
                .or(document.indentless_sequences)
                .unwrap_or(false),
        );
        emitter.emit(
            Event::new(EventKind::DocumentStart {
                explicit: self.explicit_start || document.explicit_start,
                version,
                tags,
            })
            .with_comments(document.start_comments.clone()),
        )?;
        if let Some(root) = document.root {
            let anchors = self.assign_anchors(document, root);
            let mut walk = Walk {
                document,
                resolver: Resolver::new(dialect),
                anchors,
                serialized: HashSet::new(),
                emitter: &mut *emitter,
            };
            walk.node(root)?;
        }
        emitter.emit(
            Event::new(EventKind::DocumentEnd {
                explicit: self.explicit_end || document.explicit_end,
            })
            .with_comments(document.end_comments.clone()),
        )
    }

    fn assign_anchors(&mut self, document: &Document, root: NodeId) -> HashMap<NodeId, SmolStr> {
        let mut references: HashMap<NodeId, usize> = HashMap::new();
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let count = references.entry(id).or_insert(0);
            *count += 1;
            if *count > 1 {
                continue;
            }
            order.push(id);
            match &document.arena[id].data {
                NodeData::Scalar { .. } => {}
                NodeData::Sequence { items, .. } => stack.extend(items.iter().rev()),
                NodeData::Mapping { pairs, .. } => {
                    for pair in pairs.iter().rev() {
                        stack.push(pair.value);
                        stack.push(pair.key);
                    }
                }
            }
        }
        let mut used: HashSet<SmolStr> = order
            .iter()
            .filter_map(|id| document.arena[*id].anchor.clone())
            .collect();
        let mut anchors = HashMap::new();
        for id in order {
            let node = &document.arena[id];
            if let Some(anchor) = &node.anchor {
                anchors.insert(id, anchor.clone());
            } else if references.get(&id).copied().unwrap_or(0) > 1 {
                let anchor = loop {
                    self.last_anchor_id += 1;
                    let candidate = SmolStr::new(format!("id{:03}", self.last_anchor_id));
                    if !used.contains(&candidate) {
                        break candidate;
                    }
                };
                used.insert(anchor.clone());
                anchors.insert(id, anchor);
            }
        }
        anchors
    }
}

struct Walk<'d, 'e> {
    document: &'d Document,
    resolver: Resolver,
    anchors: HashMap<NodeId, SmolStr>,
    serialized: HashSet<NodeId>,
    emitter: &'e mut Emitter,
}

impl Walk<'_, '_> {
    fn node(&mut self, id: NodeId) -> Result<()> {
        let anchor = self.anchors.get(&id).cloned();
        if !self.serialized.insert(id) {
            let Some(anchor) = anchor else {
                return Err(Error::serializer(
                    "found a node reached twice without an anchor",
                ));
            };
            return self.emitter.emit(Event::new(EventKind::Alias { anchor }));
        }
        let document = self.document;
        let node = &document.arena[id];
        match &node.data {
            NodeData::Scalar {
                value,
                style,
                fold_positions,
            } => {
                let implicit = if node.explicit_tag {
                    Implicit::NONE
                } else {
                    Implicit::new(
                        node.tag == self.resolver.resolve_scalar(value, Implicit::new(true, false)),
                        node.tag == self.resolver.resolve_scalar(value, Implicit::new(false, true)),
                    )
                };
                self.emitter.emit(
                    Event::new(EventKind::Scalar {
                        anchor,
                        tag: Some(node.tag.clone()),
                        implicit,
                        value: value.clone(),
                        style: *style,
                        fold_positions: fold_positions.clone(),
                    })
                    .with_comments(node.comments.clone()),
                )
            }
            NodeData::Sequence { items, flow_style } => {
                let implicit = !node.explicit_tag && node.tag == self.resolver.resolve_sequence();
                self.emitter.emit(
                    Event::new(EventKind::SequenceStart {
                        anchor,
                        tag: Some(node.tag.clone()),
                        implicit,
                        flow_style: flow_style.unwrap_or(false),
                    })
                    .with_comments(node.comments.clone()),
                )?;
                for item in items {
                    self.node(*item)?;
                }
                self.emitter.emit(
                    Event::new(EventKind::SequenceEnd).with_comments(node.end_comments.clone()),
                )
            }
            NodeData::Mapping { pairs, flow_style } => {
                let implicit = !node.explicit_tag && node.tag == self.resolver.resolve_mapping();
                self.emitter.emit(
                    Event::new(EventKind::MappingStart {
                        anchor,
                        tag: Some(node.tag.clone()),
                        implicit,
                        flow_style: flow_style.unwrap_or(false),
                    })
                    .with_comments(node.comments.clone()),
                )?;
                for pair in pairs {
                    self.node(pair.key)?;
                    self.node(pair.value)?;
                }
                self.emitter.emit(
                    Event::new(EventKind::MappingEnd).with_comments(node.end_comments.clone()),
                )
            }
        }
    }
}
