//! Key paths and their resolution against an in-memory document.
//!
//! A key path addresses one location in the document:
//!
//! | Syntax | Segments |
//! |--------|----------|
//! | `user.name` | `user`, `name` |
//! | `items[0].title` | `items`, `0`, `title` |
//! | `files["a.txt"]` | `files`, `a.txt` |
//!
//! Segments are plain strings. A segment only acts as a sequence index when
//! the node being walked is an array and the segment is a canonical
//! non-negative integer (`0`, `7`, `42`, never `07` or `-1`). Writes create
//! intermediate objects, never arrays.

use crate::error::PathError;
use serde_json::{Map, Value};
use std::fmt;
use std::iter::Peekable;
use std::str::{CharIndices, FromStr};

/// Writes may pad an array with fewer than this many `null`s to reach an
/// index past its end.
pub const MAX_INDEX_GAP: usize = 1024;

/// The whole persisted tree. The root is always an object.
pub type Document = Map<String, Value>;

/// A parsed, non-empty key path.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyPath {
    raw: String,
    segments: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ParseState {
    /// Expecting the first character of a segment.
    SegmentStart,
    /// Inside an unbracketed segment.
    Plain,
    /// Just closed a bracket; only `.`, `[` or the end may follow.
    AfterBracket,
}

impl KeyPath {
    /// Parse a key path from its surface syntax.
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut state = ParseState::SegmentStart;
        let mut chars = raw.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match (state, c) {
                (ParseState::SegmentStart, '.') => {
                    return Err(PathError::EmptySegment {
                        path: raw.to_owned(),
                        position: pos,
                    });
                }
                (ParseState::Plain, '.') => {
                    segments.push(std::mem::take(&mut current));
                    state = ParseState::SegmentStart;
                }
                (ParseState::AfterBracket, '.') => state = ParseState::SegmentStart,
                (ParseState::SegmentStart, '[') if pos > 0 => {
                    // `a.[0]` leaves an empty dotted segment behind.
                    return Err(PathError::EmptySegment {
                        path: raw.to_owned(),
                        position: pos,
                    });
                }
                (_, '[') => {
                    if state == ParseState::Plain {
                        segments.push(std::mem::take(&mut current));
                    }
                    segments.push(parse_bracket(raw, &mut chars, pos)?);
                    state = ParseState::AfterBracket;
                }
                (ParseState::AfterBracket, found) | (_, found @ ']') => {
                    return Err(PathError::UnexpectedChar {
                        path: raw.to_owned(),
                        found,
                        position: pos,
                    });
                }
                (_, c) => {
                    current.push(c);
                    state = ParseState::Plain;
                }
            }
        }

        match state {
            ParseState::SegmentStart => Err(PathError::EmptySegment {
                path: raw.to_owned(),
                position: raw.len(),
            }),
            ParseState::Plain => {
                segments.push(current);
                Ok(Self {
                    raw: raw.to_owned(),
                    segments,
                })
            }
            ParseState::AfterBracket => Ok(Self {
                raw: raw.to_owned(),
                segments,
            }),
        }
    }

    /// The segments in walk order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The path as it was written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always false; parsing rejects empty paths.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

/// Read a `[...]` segment. The opening bracket has already been consumed.
fn parse_bracket(
    raw: &str,
    chars: &mut Peekable<CharIndices<'_>>,
    open: usize,
) -> Result<String, PathError> {
    let unclosed = || PathError::UnclosedBracket {
        path: raw.to_owned(),
        position: open,
    };
    let mut segment = String::new();

    match chars.peek().copied() {
        Some((_, quote @ ('"' | '\''))) => {
            chars.next();
            loop {
                match chars.next() {
                    Some((_, '\\')) => match chars.next() {
                        Some((_, escaped)) => segment.push(escaped),
                        None => return Err(unclosed()),
                    },
                    Some((_, c)) if c == quote => break,
                    Some((_, c)) => segment.push(c),
                    None => return Err(unclosed()),
                }
            }
            match chars.next() {
                Some((_, ']')) => Ok(segment),
                Some((position, found)) => Err(PathError::UnexpectedChar {
                    path: raw.to_owned(),
                    found,
                    position,
                }),
                None => Err(unclosed()),
            }
        }
        _ => {
            loop {
                match chars.next() {
                    Some((_, ']')) => break,
                    Some((_, c)) => segment.push(c),
                    None => return Err(unclosed()),
                }
            }
            if segment.is_empty() {
                Err(PathError::EmptySegment {
                    path: raw.to_owned(),
                    position: open + 1,
                })
            } else {
                Ok(segment)
            }
        }
    }
}

impl FromStr for KeyPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KeyPath::parse(s)
    }
}

impl TryFrom<&str> for KeyPath {
    type Error = PathError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        KeyPath::parse(s)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Interpret a segment as a sequence index.
fn parse_index(segment: &str) -> Option<usize> {
    let canonical = segment == "0"
        || (!segment.is_empty()
            && !segment.starts_with('0')
            && segment.bytes().all(|b| b.is_ascii_digit()));
    if canonical {
        segment.parse().ok()
    } else {
        None
    }
}

fn child<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => items.get(parse_index(segment)?),
        _ => None,
    }
}

fn child_mut<'a>(node: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match node {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => items.get_mut(parse_index(segment)?),
        _ => None,
    }
}

/// Step into `segment` for writing, creating or replacing containers.
///
/// Arrays are indexed in place (padding with `null`, bounded by
/// [`MAX_INDEX_GAP`]) when the segment is an index. Anything else that is
/// not an object becomes an empty object.
fn descend<'a>(
    node: &'a mut Value,
    path: &KeyPath,
    segment: &str,
) -> Result<&'a mut Value, PathError> {
    let index = match node {
        Value::Array(_) => parse_index(segment),
        _ => None,
    };

    match (node, index) {
        (Value::Array(items), Some(index)) => {
            check_gap(path, index, items.len())?;
            if index >= items.len() {
                items.resize(index + 1, Value::Null);
            }
            Ok(&mut items[index])
        }
        (node, _) => {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            match node {
                Value::Object(map) => Ok(map.entry(segment).or_insert(Value::Null)),
                _ => unreachable!("node was replaced by an object"),
            }
        }
    }
}

/// Value at `path`, or `None` if any segment is missing or walks through a
/// scalar.
pub fn get<'a>(doc: &'a Document, path: &KeyPath) -> Option<&'a Value> {
    let (first, rest) = path.segments().split_first()?;
    rest.iter()
        .try_fold(doc.get(first)?, |node, segment| child(node, segment))
}

/// Whether `path` resolves to a value. An explicit `null` counts.
pub fn has(doc: &Document, path: &KeyPath) -> bool {
    get(doc, path).is_some()
}

/// Assign `value` at `path`, creating intermediate objects as needed.
///
/// Fails without touching the document when an index lands too far past the
/// end of an existing array.
pub fn set(doc: &mut Document, path: &KeyPath, value: Value) -> Result<(), PathError> {
    let Some((first, rest)) = path.segments().split_first() else {
        return Ok(());
    };
    check_gaps(doc, path)?;

    let mut slot = doc.entry(first.as_str()).or_insert(Value::Null);
    for segment in rest {
        slot = descend(slot, path, segment)?;
    }
    *slot = value;
    Ok(())
}

fn check_gap(path: &KeyPath, index: usize, len: usize) -> Result<(), PathError> {
    if index >= len && index - len >= MAX_INDEX_GAP {
        return Err(PathError::IndexTooFar {
            path: path.to_string(),
            index,
            len,
        });
    }
    Ok(())
}

/// Walk the existing part of `path` and reject array indices past the
/// padding bound before anything is written.
fn check_gaps(doc: &Document, path: &KeyPath) -> Result<(), PathError> {
    let Some((first, rest)) = path.segments().split_first() else {
        return Ok(());
    };
    let mut node = match doc.get(first) {
        Some(node) => node,
        None => return Ok(()),
    };
    for segment in rest {
        if let (Value::Array(items), Some(index)) = (node, parse_index(segment)) {
            check_gap(path, index, items.len())?;
        }
        node = match child(node, segment) {
            Some(next) => next,
            None => return Ok(()),
        };
    }
    Ok(())
}

/// Remove the entry at `path`. Returns whether anything was removed.
///
/// Array elements are removed and later elements shift down. Parents left
/// empty are kept.
pub fn unset(doc: &mut Document, path: &KeyPath) -> bool {
    let Some((last, parents)) = path.segments().split_last() else {
        return false;
    };
    let Some((first, middle)) = parents.split_first() else {
        return doc.remove(last).is_some();
    };

    let mut node = match doc.get_mut(first) {
        Some(node) => node,
        None => return false,
    };
    for segment in middle {
        node = match child_mut(node, segment) {
            Some(next) => next,
            None => return false,
        };
    }

    match node {
        Value::Object(map) => map.remove(last).is_some(),
        Value::Array(items) => match parse_index(last) {
            Some(index) if index < items.len() => {
                items.remove(index);
                true
            }
            _ => false,
        },
        _ => false,
    }
}

/// Replace the value at `path` with `updater(current)`.
///
/// `updater` runs exactly once. If it fails the document is left untouched.
pub fn update<F, E>(doc: &mut Document, path: &KeyPath, updater: F) -> Result<(), E>
where
    F: FnOnce(Option<Value>) -> Result<Value, E>,
    E: From<PathError>,
{
    update_with(doc, path, |current| updater(current).map(|next| (next, ())))
}

/// Like [`update`], but `updater` also hands back a side result, e.g. the
/// element popped off a sequence.
pub fn update_with<F, T, E>(doc: &mut Document, path: &KeyPath, updater: F) -> Result<T, E>
where
    F: FnOnce(Option<Value>) -> Result<(Value, T), E>,
    E: From<PathError>,
{
    let current = get(doc, path).cloned();
    let (next, out) = updater(current)?;
    set(doc, path, next)?;
    Ok(out)
}
