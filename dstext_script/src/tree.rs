//! Tree builder: turns classified elements into a parent-linked node forest.
//!
//! Directive elements never become nodes. They are held and applied to the
//! next content node. Parents are indices into the flat node list, which
//! owns every node and preserves creation order (a parent always precedes
//! its children).

use dstext_data::EntryId;
use log::debug;

use crate::diagnostics::{DiagnosticKind, Diagnostics, StructureError};
use crate::lexer::{Element, ElementKind, LexError, Lexer, NumericLink};

/// Entry metadata gathered from held directives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFields {
    /// Override title from `<<title ...>>`.
    pub title: Option<String>,
    pub script: Option<String>,
    pub condition: Option<String>,
    pub sequence: Option<String>,
    pub links: Vec<NumericLink>,
    pub title_links: Vec<String>,
}

impl EntryFields {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Payload of a node, by kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Title(String),
    Conversant(String),
    Speak {
        actor: String,
        text: String,
        fields: EntryFields,
    },
    Reply {
        text: String,
        fields: EntryFields,
    },
    Group {
        /// Inline text of the `<<group ...>>` line.
        title: String,
        fields: EntryFields,
    },
    SequenceNode {
        sequence: String,
        fields: EntryFields,
    },
}

impl NodeKind {
    /// Title and conversant lines form the header; content under them roots
    /// at the top level.
    pub fn is_header(&self) -> bool {
        matches!(self, NodeKind::Title(_) | NodeKind::Conversant(_))
    }

    pub fn fields(&self) -> Option<&EntryFields> {
        match self {
            NodeKind::Title(_) | NodeKind::Conversant(_) => None,
            NodeKind::Speak { fields, .. }
            | NodeKind::Reply { fields, .. }
            | NodeKind::Group { fields, .. }
            | NodeKind::SequenceNode { fields, .. } => Some(fields),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub id: EntryId,
    pub depth: usize,
    pub line: usize,
    /// Index of the parent node in the forest.
    pub parent: Option<usize>,
    pub kind: NodeKind,
}

/// Which held values a content node does not take.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Consumer {
    Entry,
    /// Keeps a pending override title for the next node.
    Group,
    /// Its own body is the sequence; a pending sequence waits.
    SequenceNode,
}

/// Directive values waiting for the next content node.
#[derive(Debug, Default)]
struct HeldState {
    script: Option<String>,
    condition: Option<String>,
    sequence: Option<String>,
    title: Option<String>,
    links: Vec<NumericLink>,
    title_links: Vec<String>,
}

impl HeldState {
    /// Store a directive. Content kinds are handed back.
    fn hold(&mut self, kind: ElementKind) -> Result<(), ElementKind> {
        match kind {
            ElementKind::Script(body) => self.script = non_blank(body),
            ElementKind::Condition(body) => self.condition = non_blank(body),
            ElementKind::Sequence(body) => self.sequence = non_blank(body),
            ElementKind::SetNodeTitle(text) => self.title = non_blank(text),
            ElementKind::LinkTo(link) => self.links.push(link),
            ElementKind::LinkTitle(title) => self.title_links.push(title),
            content => return Err(content),
        }
        Ok(())
    }

    fn take(&mut self, consumer: Consumer) -> EntryFields {
        EntryFields {
            title: if consumer == Consumer::Group {
                None
            } else {
                self.title.take()
            },
            script: self.script.take(),
            condition: self.condition.take(),
            sequence: if consumer == Consumer::SequenceNode {
                None
            } else {
                self.sequence.take()
            },
            links: std::mem::take(&mut self.links),
            title_links: std::mem::take(&mut self.title_links),
        }
    }

    fn is_empty(&self) -> bool {
        self.script.is_none()
            && self.condition.is_none()
            && self.sequence.is_none()
            && self.title.is_none()
            && self.links.is_empty()
            && self.title_links.is_empty()
    }
}

fn non_blank(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}

/// Builds the node forest of a single file. Consumed by [`TreeBuilder::build`],
/// so held state can never carry over into another file.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    held: HeldState,
    nodes: Vec<Node>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the forest from `elements`. The first element must be a title.
    ///
    /// # Errors
    /// Returns a [`StructureError`] when there are no elements or the first
    /// one is not a title line.
    pub fn build(
        mut self,
        elements: impl IntoIterator<Item = Element>,
        diags: &mut Diagnostics,
    ) -> Result<Vec<Node>, StructureError> {
        let mut elements = elements.into_iter();
        let first = elements.next().ok_or(StructureError::Empty)?;
        let ElementKind::Title(title) = first.kind else {
            return Err(StructureError::MissingTitle);
        };
        self.nodes.push(Node {
            id: 0,
            depth: first.depth,
            line: first.line,
            parent: None,
            kind: NodeKind::Title(title),
        });

        for Element { line, depth, kind } in elements {
            let content = match self.held.hold(kind) {
                Ok(()) => continue,
                Err(content) => content,
            };
            let Some(kind) = self.content_kind(content, line, diags) else {
                continue;
            };
            let id = self.next_id();
            let parent = self.resolve_parent(depth);
            debug!("node {id} at line {line}, depth {depth}, parent {parent:?}");
            self.nodes.push(Node {
                id,
                depth,
                line,
                parent,
                kind,
            });
        }

        if !self.held.is_empty() {
            diags.warn(
                None,
                DiagnosticKind::UnusedDirective {
                    what: "directive at end of file".into(),
                },
            );
        }
        Ok(self.nodes)
    }

    fn content_kind(&mut self, content: ElementKind, line: usize, diags: &mut Diagnostics) -> Option<NodeKind> {
        let kind = match content {
            ElementKind::Title(title) => {
                diags.warn(Some(line), DiagnosticKind::DuplicateTitle { title });
                return None;
            },
            ElementKind::Conversant(actor) => {
                if !self.held.take(Consumer::Entry).is_empty() {
                    diags.warn(
                        Some(line),
                        DiagnosticKind::UnusedDirective {
                            what: "directive before npc line".into(),
                        },
                    );
                }
                NodeKind::Conversant(actor)
            },
            ElementKind::Speak { actor, text } => NodeKind::Speak {
                actor,
                text,
                fields: self.held.take(Consumer::Entry),
            },
            ElementKind::Reply { text } => NodeKind::Reply {
                text,
                fields: self.held.take(Consumer::Entry),
            },
            ElementKind::Group(title) => NodeKind::Group {
                title,
                fields: self.held.take(Consumer::Group),
            },
            ElementKind::SequenceNode(sequence) => NodeKind::SequenceNode {
                sequence,
                fields: self.held.take(Consumer::SequenceNode),
            },
            directive => unreachable!("directive {directive:?} reached content handling"),
        };
        Some(kind)
    }

    /// Node count so far, unless some node already uses that id.
    fn next_id(&self) -> EntryId {
        let candidate = EntryId::try_from(self.nodes.len()).unwrap_or(EntryId::MAX);
        if self.nodes.iter().any(|n| n.id == candidate) {
            self.nodes.iter().map(|n| n.id).max().map_or(0, |max| max + 1)
        } else {
            candidate
        }
    }

    fn resolve_parent(&self, depth: usize) -> Option<usize> {
        let previous_index = self.nodes.len().checked_sub(1)?;
        let previous = &self.nodes[previous_index];
        if depth >= previous.depth {
            if previous.kind.is_header() {
                None
            } else {
                Some(previous_index)
            }
        } else {
            // outdent: attach beside the latest node at this depth, or root
            self.nodes
                .iter()
                .rposition(|n| n.depth == depth)
                .and_then(|sibling| self.nodes[sibling].parent)
        }
    }
}

/// Classify `source` and build its node forest.
///
/// Unrecognised lines and malformed directives are reported to `diags` and
/// skipped.
///
/// # Errors
/// Returns a [`StructureError`] when the file has no elements or does not
/// start with a title.
pub fn parse_script(source: &str, diags: &mut Diagnostics) -> Result<Vec<Node>, StructureError> {
    let mut elements = Vec::new();
    for item in Lexer::new(source) {
        match item {
            Ok(element) => elements.push(element),
            Err(LexError::Unrecognized { line, text }) => {
                diags.warn(Some(line), DiagnosticKind::UnrecognizedLine { text });
            },
            Err(LexError::Directive { line, error }) => diags.error(Some(line), error),
        }
    }
    TreeBuilder::new().build(elements, diags)
}
