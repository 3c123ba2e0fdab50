//! Text-based recognizers for the syntactic units cursors can be placed on.
//!
//! Every recognizer answers the same question: starting at a byte offset,
//! where is the next (or previous) boundary of a unit of this kind? Forward
//! motion lands on the end of the unit containing or following the offset,
//! backward motion on the start of the unit containing or preceding it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;

/// Kinds of syntactic unit the engine knows how to step over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnitKind {
    Word,
    Symbol,
    List,
    Sexp,
    Defun,
    Number,
    Sentence,
    Line,
}

impl UnitKind {
    pub const ALL: [UnitKind; 8] = [
        UnitKind::Word,
        UnitKind::Symbol,
        UnitKind::List,
        UnitKind::Sexp,
        UnitKind::Defun,
        UnitKind::Number,
        UnitKind::Sentence,
        UnitKind::Line,
    ];

    pub fn name(self) -> &'static str {
        match self {
            UnitKind::Word => "word",
            UnitKind::Symbol => "symbol",
            UnitKind::List => "list",
            UnitKind::Sexp => "sexp",
            UnitKind::Defun => "defun",
            UnitKind::Number => "number",
            UnitKind::Sentence => "sentence",
            UnitKind::Line => "line",
        }
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    Forward,
    Backward,
}

/// Locate the next boundary of `kind` from `pos` in `direction`.
///
/// Returns `None` when there is no further unit in that direction (start or
/// end of text, or an unbalanced list).
pub fn locate_boundary(
    text: &str,
    kind: UnitKind,
    pos: usize,
    direction: Direction,
) -> Option<usize> {
    let pos = pos.min(text.len());
    match (kind, direction) {
        (UnitKind::Word, Direction::Forward) => forward_run(text, pos, is_word_char),
        (UnitKind::Word, Direction::Backward) => backward_run(text, pos, is_word_char),
        (UnitKind::Symbol, Direction::Forward) => forward_run(text, pos, is_symbol_char),
        (UnitKind::Symbol, Direction::Backward) => backward_run(text, pos, is_symbol_char),
        (UnitKind::Number, Direction::Forward) => forward_number(text, pos),
        (UnitKind::Number, Direction::Backward) => backward_number(text, pos),
        (UnitKind::Line, Direction::Forward) => forward_line(text, pos),
        (UnitKind::Line, Direction::Backward) => backward_line(text, pos),
        (UnitKind::Sentence, Direction::Forward) => forward_sentence(text, pos),
        (UnitKind::Sentence, Direction::Backward) => backward_sentence(text, pos),
        (UnitKind::List, Direction::Forward) => forward_list(text, pos),
        (UnitKind::List, Direction::Backward) => backward_list(text, pos),
        (UnitKind::Sexp, Direction::Forward) => forward_sexp(text, pos),
        (UnitKind::Sexp, Direction::Backward) => backward_sexp(text, pos),
        (UnitKind::Defun, Direction::Forward) => defun_ranges(text)
            .into_iter()
            .find(|range| range.end > pos)
            .map(|range| range.end),
        (UnitKind::Defun, Direction::Backward) => defun_ranges(text)
            .into_iter()
            .rev()
            .find(|range| range.start < pos)
            .map(|range| range.start),
    }
}

/// Bounds of the unit at `pos`.
///
/// A unit ending exactly at `pos` wins over one starting there, so a caret
/// placed right after a word selects that word. When `pos` sits between
/// units the following unit is returned.
pub fn bounds_at(text: &str, kind: UnitKind, pos: usize) -> Option<Range<usize>> {
    let pos = pos.min(text.len());
    if kind == UnitKind::Line {
        let start = text[..pos].rfind('\n').map_or(0, |i| i + 1);
        let end = text[pos..].find('\n').map_or(text.len(), |i| pos + i);
        return Some(start..end);
    }

    if let Some(start) = locate_boundary(text, kind, pos, Direction::Backward)
        && let Some(end) = locate_boundary(text, kind, start, Direction::Forward)
        && end >= pos
    {
        return Some(start..end);
    }

    let end = locate_boundary(text, kind, pos, Direction::Forward)?;
    let start = locate_boundary(text, kind, end, Direction::Backward)
        .unwrap_or(pos)
        .max(pos);
    Some(start..end)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric()
}

fn is_symbol_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_open(c: char) -> bool {
    matches!(c, '(' | '[' | '{')
}

fn is_close(c: char) -> bool {
    matches!(c, ')' | ']' | '}')
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn forward_run(text: &str, pos: usize, pred: fn(char) -> bool) -> Option<usize> {
    let rest = &text[pos..];
    let (start, _) = rest.char_indices().find(|(_, c)| pred(*c))?;
    let end = rest[start..]
        .char_indices()
        .find(|(_, c)| !pred(*c))
        .map_or(rest.len(), |(i, _)| start + i);
    Some(pos + end)
}

fn backward_run(text: &str, pos: usize, pred: fn(char) -> bool) -> Option<usize> {
    let before = &text[..pos];
    let (last, _) = before.char_indices().rev().find(|(_, c)| pred(*c))?;
    let start = before[..last]
        .char_indices()
        .rev()
        .find(|(_, c)| !pred(*c))
        .map_or(0, |(i, c)| i + c.len_utf8());
    Some(start)
}

fn forward_number(text: &str, pos: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = pos;
    while i < bytes.len() && !bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == bytes.len() {
        return None;
    }
    while i < bytes.len() {
        let separator = matches!(bytes[i], b'.' | b'_')
            && bytes[i - 1].is_ascii_digit()
            && bytes.get(i + 1).is_some_and(u8::is_ascii_digit);
        if bytes[i].is_ascii_digit() || separator {
            i += 1;
        } else {
            break;
        }
    }
    Some(i)
}

fn backward_number(text: &str, pos: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = pos;
    while i > 0 && !bytes[i - 1].is_ascii_digit() {
        i -= 1;
    }
    if i == 0 {
        return None;
    }
    while i > 0 {
        let separator = matches!(bytes[i - 1], b'.' | b'_')
            && i >= 2
            && bytes[i - 2].is_ascii_digit()
            && bytes.get(i).is_some_and(u8::is_ascii_digit);
        if bytes[i - 1].is_ascii_digit() || separator {
            i -= 1;
        } else {
            break;
        }
    }
    Some(i)
}

fn forward_line(text: &str, pos: usize) -> Option<usize> {
    if pos >= text.len() {
        return None;
    }
    // Already at the end of a line: step onto the next one
    let from = if text.as_bytes()[pos] == b'\n' {
        pos + 1
    } else {
        pos
    };
    // A final newline ends the last line rather than starting another
    if from == text.len() && from > pos {
        return None;
    }
    Some(text[from..].find('\n').map_or(text.len(), |i| from + i))
}

fn backward_line(text: &str, pos: usize) -> Option<usize> {
    if pos == 0 {
        return None;
    }
    let line_start = text[..pos].rfind('\n').map_or(0, |i| i + 1);
    if line_start < pos {
        return Some(line_start);
    }
    Some(text[..pos - 1].rfind('\n').map_or(0, |i| i + 1))
}

fn forward_sentence(text: &str, pos: usize) -> Option<usize> {
    let start = pos + text[pos..].find(|c: char| !c.is_whitespace())?;
    let mut chars = text[start..].char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let next = chars.peek().map(|(_, n)| *n);
        if is_terminator(c) && next.is_none_or(char::is_whitespace) {
            return Some(start + i + c.len_utf8());
        }
        // A blank line ends a sentence that has no terminator
        if c == '\n' && next == Some('\n') {
            return Some(start + i);
        }
    }
    Some(text.len())
}

fn backward_sentence(text: &str, pos: usize) -> Option<usize> {
    let limit = text[..pos].trim_end().len();
    if limit == 0 {
        return None;
    }
    let head = &text[..limit];
    let mut boundary = 0;
    for (i, c) in head.char_indices() {
        let after = i + c.len_utf8();
        if after >= limit {
            break;
        }
        let next = head[after..].chars().next();
        let ends = (is_terminator(c) && next.is_some_and(char::is_whitespace))
            || (c == '\n' && next == Some('\n'));
        if ends {
            boundary = after;
        }
    }
    let skip = text[boundary..limit]
        .find(|c: char| !c.is_whitespace())
        .unwrap_or(0);
    Some(boundary + skip)
}

fn forward_list(text: &str, pos: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text[pos..].char_indices() {
        if is_open(c) {
            depth += 1;
        } else if is_close(c) {
            // Closing a list we are inside of is not a forward step
            if depth == 0 {
                return None;
            }
            depth -= 1;
            if depth == 0 {
                return Some(pos + i + 1);
            }
        }
    }
    None
}

fn backward_list(text: &str, pos: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text[..pos].char_indices().rev() {
        if is_close(c) {
            depth += 1;
        } else if is_open(c) {
            if depth == 0 {
                return None;
            }
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

fn is_atom_char(c: char) -> bool {
    !(c.is_whitespace() || is_open(c) || is_close(c) || c == '"')
}

fn forward_sexp(text: &str, pos: usize) -> Option<usize> {
    let start = pos + text[pos..].find(|c: char| !c.is_whitespace())?;
    let first = text[start..].chars().next()?;
    if is_open(first) {
        return forward_list(text, start);
    }
    if is_close(first) {
        return None;
    }
    if first == '"' {
        let mut escaped = false;
        for (i, c) in text[start + 1..].char_indices() {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                return Some(start + 1 + i + 1);
            }
        }
        return None;
    }
    let len = text[start..]
        .find(|c: char| !is_atom_char(c))
        .unwrap_or(text.len() - start);
    Some(start + len)
}

fn backward_sexp(text: &str, pos: usize) -> Option<usize> {
    let end = text[..pos].trim_end().len();
    let last = text[..end].chars().next_back()?;
    if is_close(last) {
        return backward_list(text, end);
    }
    if is_open(last) {
        return None;
    }
    if last == '"' {
        return text[..end - 1].rfind('"');
    }
    let start = text[..end]
        .char_indices()
        .rev()
        .find(|(_, c)| !is_atom_char(*c))
        .map_or(0, |(i, c)| i + c.len_utf8());
    Some(start)
}

/// Top-level definitions: a block starting at column zero that runs until its
/// brackets balance and the following line is blank or starts another block.
fn defun_ranges(text: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut depth = 0usize;
    let mut current: Option<usize> = None;
    let mut pending_end: Option<usize> = None;
    let mut line_start = 0;

    for line in text.split_inclusive('\n') {
        let content = line.trim_end_matches(['\n', '\r']);
        let line_end = line_start + content.len();
        let blank = content.trim().is_empty();
        let starts_top = !blank
            && depth == 0
            && content
                .chars()
                .next()
                .is_some_and(|c| !c.is_whitespace() && !is_close(c));

        if depth == 0
            && (blank || starts_top)
            && let Some(start) = current
            && let Some(end) = pending_end
        {
            ranges.push(start..end);
            current = None;
            pending_end = None;
        }
        if current.is_none() && starts_top {
            current = Some(line_start);
        }

        for c in content.chars() {
            if is_open(c) {
                depth += 1;
            } else if is_close(c) {
                depth = depth.saturating_sub(1);
            }
        }
        if current.is_some() && !blank {
            pending_end = (depth == 0).then_some(line_end);
        }
        line_start += line.len();
    }

    if let Some(start) = current {
        let end = pending_end.unwrap_or_else(|| text.trim_end().len().max(start));
        ranges.push(start..end);
    }
    ranges
}
