//! Line classifier for dialogue scripts.
//!
//! Each call to [`Lexer::next`] turns one non-blank source line (and, for
//! block directives, the lines up to the closing `>>`) into an [`Element`].
//! Patterns are tried in a fixed order and the first match wins; several
//! markers share prefixes (`<<seqnode` / `<<seq`) so the order matters.

use std::sync::LazyLock;

use dstext_data::{ConversationId, EntryId};
use regex::Regex;

use crate::diagnostics::DirectiveError;

pub const TITLE_PREFIX: &str = "title:";
pub const NPC_PREFIX: &str = "npc:";
pub const SCRIPT_MARKER: &str = "<<script";
pub const CONDITION_MARKER: &str = "<<cond";
pub const TITLE_MARKER: &str = "<<title";
pub const LINK_MARKER: &str = "<<link";
pub const GROUP_MARKER: &str = "<<group";
pub const SEQUENCE_NODE_MARKER: &str = "<<seqnode";
pub const SEQUENCE_MARKER: &str = "<<seq";
pub const CLOSE_MARKER: &str = ">>";
pub const REPLY_ARROW: &str = "->";
/// Conversation id in `<<link C N>>` that stands for the file being imported.
pub const CURRENT_CONVERSATION: &str = "-1";

static SPEAKER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+?):").expect("speaker pattern"));
static REPLY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^.+?->").expect("reply pattern"));

/// A link to an entry by number, optionally in another conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericLink {
    /// `None` means the conversation currently being assembled.
    pub conversation: Option<ConversationId>,
    pub entry: EntryId,
}

/// One classified source line (or block).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// 1-based line the element starts on.
    pub line: usize,
    /// Number of leading tab characters.
    pub depth: usize,
    pub kind: ElementKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    Title(String),
    Conversant(String),
    Script(String),
    Condition(String),
    SetNodeTitle(String),
    LinkTo(NumericLink),
    LinkTitle(String),
    Group(String),
    SequenceNode(String),
    Sequence(String),
    Speak { actor: String, text: String },
    /// Spoken by the player actor.
    Reply { text: String },
}

/// Why a line produced no element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    Unrecognized { line: usize, text: String },
    Directive { line: usize, error: DirectiveError },
}

/// Iterator over the elements of one script.
///
/// Blank lines are dropped up front, so block bodies never contain them.
/// Separator lines (`---`, `===`) are skipped between elements.
pub struct Lexer<'a> {
    lines: Vec<(usize, &'a str)>,
    cursor: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        let lines = source
            .strip_prefix('\u{feff}')
            .unwrap_or(source)
            .lines()
            .enumerate()
            .filter(|(_, l)| !l.trim().is_empty())
            .map(|(i, l)| (i + 1, l))
            .collect();
        Self { lines, cursor: 0 }
    }

    fn classify(&mut self, line_no: usize, line: &str) -> Result<Element, LexError> {
        let depth = line.chars().take_while(|c| *c == '\t').count();
        let directive_err = |error| LexError::Directive { line: line_no, error };
        let kind = if let Some(rest) = line.strip_prefix(TITLE_PREFIX) {
            ElementKind::Title(required(rest.trim(), TITLE_PREFIX).map_err(directive_err)?)
        } else if let Some(rest) = line.strip_prefix(NPC_PREFIX) {
            ElementKind::Conversant(required(rest.trim(), NPC_PREFIX).map_err(directive_err)?)
        } else {
            let trimmed = line.trim();
            if trimmed.starts_with(SCRIPT_MARKER) {
                ElementKind::Script(self.read_block(SCRIPT_MARKER).map_err(directive_err)?)
            } else if trimmed.starts_with(CONDITION_MARKER) {
                ElementKind::Condition(self.read_block(CONDITION_MARKER).map_err(directive_err)?)
            } else if trimmed.starts_with(TITLE_MARKER) {
                ElementKind::SetNodeTitle(inline_argument(line, TITLE_MARKER))
            } else if trimmed.starts_with(LINK_MARKER) {
                parse_link(&inline_argument(line, LINK_MARKER)).map_err(directive_err)?
            } else if trimmed.starts_with(GROUP_MARKER) {
                ElementKind::Group(inline_argument(line, GROUP_MARKER))
            } else if trimmed.starts_with(SEQUENCE_NODE_MARKER) {
                ElementKind::SequenceNode(self.read_block(SEQUENCE_NODE_MARKER).map_err(directive_err)?)
            } else if trimmed.starts_with(SEQUENCE_MARKER) {
                ElementKind::Sequence(self.read_block(SEQUENCE_MARKER).map_err(directive_err)?)
            } else if let Some(caps) = SPEAKER_RE.captures(line) {
                let whole = caps.get(0).map_or(0, |m| m.end());
                ElementKind::Speak {
                    actor: caps[1].trim().to_string(),
                    text: line[whole..].trim().to_string(),
                }
            } else if REPLY_RE.is_match(line) {
                ElementKind::Reply {
                    text: line.replace(REPLY_ARROW, "").trim().to_string(),
                }
            } else {
                return Err(LexError::Unrecognized {
                    line: line_no,
                    text: trimmed.to_string(),
                });
            }
        };
        Ok(Element {
            line: line_no,
            depth,
            kind,
        })
    }

    /// Read a block directive starting at the cursor, through the first line
    /// containing `>>`. Leaves the cursor on that closing line.
    fn read_block(&mut self, marker: &'static str) -> Result<String, DirectiveError> {
        let mut raw = String::new();
        loop {
            let Some(&(_, line)) = self.lines.get(self.cursor) else {
                return Err(DirectiveError::Unterminated { marker });
            };
            raw.push_str(line);
            if line.contains(CLOSE_MARKER) {
                break;
            }
            raw.push('\n');
            self.cursor += 1;
        }
        Ok(raw
            .replace(marker, "")
            .replace(CLOSE_MARKER, "")
            .replace('\t', "")
            .trim()
            .to_string())
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Element, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let &(line_no, line) = self.lines.get(self.cursor)?;
            if is_separator(line) {
                self.cursor += 1;
                continue;
            }
            let result = self.classify(line_no, line);
            self.cursor += 1;
            return Some(result);
        }
    }
}

fn is_separator(line: &str) -> bool {
    matches!(line.trim(), "---" | "===")
}

fn required(value: &str, marker: &'static str) -> Result<String, DirectiveError> {
    if value.is_empty() {
        Err(DirectiveError::MissingArgument { marker })
    } else {
        Ok(value.to_string())
    }
}

/// Text between an inline directive's open marker and `>>`.
fn inline_argument(line: &str, marker: &str) -> String {
    line.replacen(marker, "", 1).replace(CLOSE_MARKER, "").trim().to_string()
}

/// Split a link argument into a numeric or a title link.
///
/// `<<link 3>>` links to entry 3 here, `<<link 2 7>>` to entry 7 of
/// conversation 2, `<<link -1 7>>` to entry 7 here, and anything else (`<<link Hub>>`, `<<link The Gate>>`)
/// is a title to be looked up.
fn parse_link(argument: &str) -> Result<ElementKind, DirectiveError> {
    let tokens: Vec<&str> = argument.split_whitespace().collect();
    let numeric = match tokens.as_slice() {
        [] => return Err(DirectiveError::MissingArgument { marker: LINK_MARKER }),
        [entry] => entry.parse().ok().map(|entry| NumericLink {
            conversation: None,
            entry,
        }),
        [conversation, entry, ..] => match (conversation_component(conversation), entry.parse()) {
            (Some(conversation), Ok(entry)) => Some(NumericLink { conversation, entry }),
            _ => None,
        },
    };
    Ok(match numeric {
        Some(link) => ElementKind::LinkTo(link),
        None => ElementKind::LinkTitle(argument.to_string()),
    })
}

/// Conversation part of a two-number link; `-1` means the current one.
fn conversation_component(token: &str) -> Option<Option<ConversationId>> {
    if token == CURRENT_CONVERSATION {
        Some(None)
    } else {
        token.parse().ok().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<ElementKind> {
        Lexer::new(src).map(|r| r.expect("classify ok").kind).collect()
    }

    fn single(src: &str) -> ElementKind {
        let mut v = kinds(src);
        assert_eq!(v.len(), 1, "expected one element from {src:?}");
        v.remove(0)
    }

    #[test]
    fn header_lines_are_classified_and_trimmed() {
        assert_eq!(single("title:   Demo  "), ElementKind::Title("Demo".into()));
        assert_eq!(single("npc: Guard"), ElementKind::Conversant("Guard".into()));
    }

    #[test]
    fn depth_counts_leading_tabs_only() {
        let elems: Vec<Element> = Lexer::new("\t\tYield -> \nGuard:\tHalt").map(|r| r.unwrap()).collect();
        assert_eq!(elems[0].depth, 2);
        assert_eq!(elems[1].depth, 0);
        assert_eq!(elems[1].line, 2);
    }

    #[test]
    fn speaker_and_reply_lines() {
        assert_eq!(
            single("Guard: Halt! Who goes there?"),
            ElementKind::Speak {
                actor: "Guard".into(),
                text: "Halt! Who goes there?".into()
            }
        );
        assert_eq!(single("\tYield -> "), ElementKind::Reply { text: "Yield".into() });
    }

    #[test]
    fn speaker_pattern_wins_over_reply_arrow() {
        assert_eq!(
            single("Guard: Halt! -> "),
            ElementKind::Speak {
                actor: "Guard".into(),
                text: "Halt! ->".into()
            }
        );
    }

    #[test]
    fn seqnode_is_tried_before_plain_seq() {
        assert_eq!(
            single("<<seqnode Camera(Closeup)>>"),
            ElementKind::SequenceNode("Camera(Closeup)".into())
        );
        assert_eq!(single("<<seq Delay(2)>>"), ElementKind::Sequence("Delay(2)".into()));
    }

    #[test]
    fn block_directive_spans_lines_and_strips_tabs() {
        let src = "\t<<script\n\t\tVariable[\"met\"] = true;\n\t\tQuest = 2;\n\t>>\nGuard: Hi";
        let elems: Vec<Element> = Lexer::new(src).map(|r| r.unwrap()).collect();
        assert_eq!(elems.len(), 2);
        assert_eq!(
            elems[0].kind,
            ElementKind::Script("Variable[\"met\"] = true;\nQuest = 2;".into())
        );
        assert_eq!(elems[0].depth, 1);
        assert_eq!(elems[1].line, 5);
    }

    #[test]
    fn block_body_skips_blank_lines_and_keeps_separators() {
        let src = "<<cond\n\nA == 1\n---\n>>";
        assert_eq!(single(src), ElementKind::Condition("A == 1\n---".into()));
    }

    #[test]
    fn unterminated_block_is_a_directive_error() {
        let mut lexer = Lexer::new("<<script\nx = 1");
        assert_eq!(
            lexer.next(),
            Some(Err(LexError::Directive {
                line: 1,
                error: DirectiveError::Unterminated { marker: SCRIPT_MARKER }
            }))
        );
        assert_eq!(lexer.next(), None);
    }

    #[test]
    fn link_arguments_split_numeric_and_title() {
        let link = |conversation, entry| ElementKind::LinkTo(NumericLink { conversation, entry });
        assert_eq!(single("<<link 3>>"), link(None, 3));
        assert_eq!(single("<<link 2 7>>"), link(Some(2), 7));
        assert_eq!(single("<<link 2 7 9>>"), link(Some(2), 7));
        assert_eq!(single("<<link Hub>>"), ElementKind::LinkTitle("Hub".into()));
        assert_eq!(single("<<link The Gate>>"), ElementKind::LinkTitle("The Gate".into()));
        assert_eq!(single("<<link 2 Gate>>"), ElementKind::LinkTitle("2 Gate".into()));
    }

    #[test]
    fn minus_one_conversation_means_current() {
        let link = |conversation, entry| ElementKind::LinkTo(NumericLink { conversation, entry });
        assert_eq!(single("<<link -1 7>>"), link(None, 7));
        assert_eq!(single("<<link -2 7>>"), ElementKind::LinkTitle("-2 7".into()));
        assert_eq!(single("<<link -1>>"), ElementKind::LinkTitle("-1".into()));
    }

    #[test]
    fn leading_byte_order_mark_is_ignored() {
        let elems: Vec<Element> = Lexer::new("\u{feff}title: Demo\nnpc: Guard")
            .map(|r| r.expect("classify ok"))
            .collect();
        assert_eq!(elems[0].kind, ElementKind::Title("Demo".into()));
        assert_eq!(elems[0].line, 1);
        assert_eq!(elems[1].kind, ElementKind::Conversant("Guard".into()));
    }

    #[test]
    fn empty_link_is_rejected() {
        let got: Vec<_> = Lexer::new("<<link  >>").collect();
        assert_eq!(
            got,
            vec![Err(LexError::Directive {
                line: 1,
                error: DirectiveError::MissingArgument { marker: LINK_MARKER }
            })]
        );
    }

    #[test]
    fn inline_directives() {
        assert_eq!(single("\t<<title Greeting>>"), ElementKind::SetNodeTitle("Greeting".into()));
        assert_eq!(single("<<group Choices>>"), ElementKind::Group("Choices".into()));
        assert_eq!(single("<<group>>"), ElementKind::Group(String::new()));
    }

    #[test]
    fn separators_and_unknown_lines() {
        let got: Vec<_> = Lexer::new("---\njust some words\n===").collect();
        assert_eq!(
            got,
            vec![Err(LexError::Unrecognized {
                line: 2,
                text: "just some words".into()
            })]
        );
    }

    #[test]
    fn header_without_value_is_rejected() {
        let got: Vec<_> = Lexer::new("title:   ").collect();
        assert!(matches!(
            got.as_slice(),
            [Err(LexError::Directive {
                error: DirectiveError::MissingArgument { marker: TITLE_PREFIX },
                ..
            })]
        ));
    }
}
