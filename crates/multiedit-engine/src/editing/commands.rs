use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::editing::units::{self, Direction, UnitKind};
use crate::editing::Document;

/// Errors raised when an operation cannot be carried out at the caret
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("Beginning of buffer")]
    BeginningOfBuffer,
    #[error("End of buffer")]
    EndOfBuffer,
    #[error("No {direction:?} {kind} from offset {at}")]
    NoUnit {
        kind: UnitKind,
        direction: Direction,
        at: usize,
    },
}

/// Letter case applied by [`EditOp::ChangeCase`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Case {
    Upper,
    Lower,
    Capitalize,
}

/// Edit operations performed at the caret.
///
/// Every operation is expressed relative to the caret, never as an absolute
/// offset, so a recorded sequence means the same thing wherever the caret is
/// when it is replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum EditOp {
    InsertText { text: String },
    DeleteBackward { count: usize },
    DeleteForward { count: usize },
    MoveCaret { by: isize },
    MoveByUnit { kind: UnitKind, direction: Direction },
    DeleteByUnit { kind: UnitKind, direction: Direction },
    ChangeCase { kind: UnitKind, case: Case },
}

impl EditOp {
    pub fn insert(text: impl Into<String>) -> Self {
        EditOp::InsertText { text: text.into() }
    }

    /// Stable identifier of the operation, as written in serialized logs
    pub fn id(&self) -> &'static str {
        match self {
            EditOp::InsertText { .. } => "insert-text",
            EditOp::DeleteBackward { .. } => "delete-backward",
            EditOp::DeleteForward { .. } => "delete-forward",
            EditOp::MoveCaret { .. } => "move-caret",
            EditOp::MoveByUnit { .. } => "move-by-unit",
            EditOp::DeleteByUnit { .. } => "delete-by-unit",
            EditOp::ChangeCase { .. } => "change-case",
        }
    }
}

/// A single replacement of `range` (old coordinates) by `text`
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Change {
    pub range: Range<usize>,
    pub text: String,
}

/// The effect of an operation before it is applied to the buffer
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Compiled {
    pub change: Option<Change>,
    /// Caret after the change, in new coordinates
    pub caret: usize,
}

/// Compile an operation against the current caret
pub(crate) fn compile_op(doc: &Document, op: &EditOp) -> Result<Compiled, EditError> {
    let caret = doc.caret();
    match op {
        EditOp::InsertText { text } => Ok(Compiled {
            change: (!text.is_empty()).then(|| Change {
                range: caret..caret,
                text: text.clone(),
            }),
            caret: caret + text.len(),
        }),
        EditOp::DeleteBackward { count } => {
            let start = step_back(doc, caret, *count).ok_or(EditError::BeginningOfBuffer)?;
            Ok(deletion(start..caret, start))
        }
        EditOp::DeleteForward { count } => {
            let end = step_forward(doc, caret, *count).ok_or(EditError::EndOfBuffer)?;
            Ok(deletion(caret..end, caret))
        }
        EditOp::MoveCaret { by } => {
            let target = if *by >= 0 {
                step_forward(doc, caret, by.unsigned_abs()).ok_or(EditError::EndOfBuffer)?
            } else {
                step_back(doc, caret, by.unsigned_abs()).ok_or(EditError::BeginningOfBuffer)?
            };
            Ok(Compiled {
                change: None,
                caret: target,
            })
        }
        EditOp::MoveByUnit { kind, direction } => Ok(Compiled {
            change: None,
            caret: unit_boundary(doc, *kind, caret, *direction)?,
        }),
        EditOp::DeleteByUnit { kind, direction } => {
            let target = unit_boundary(doc, *kind, caret, *direction)?;
            let range = caret.min(target)..caret.max(target);
            let start = range.start;
            Ok(deletion(range, start))
        }
        EditOp::ChangeCase { kind, case } => {
            let end = unit_boundary(doc, *kind, caret, Direction::Forward)?;
            let original = doc.slice(caret..end);
            let text = convert_case(&original, *case);
            let caret = caret + text.len();
            let change = (text != original).then(|| Change {
                range: doc.caret()..end,
                text,
            });
            Ok(Compiled { change, caret })
        }
    }
}

fn deletion(range: Range<usize>, caret: usize) -> Compiled {
    Compiled {
        change: (!range.is_empty()).then(|| Change {
            range,
            text: String::new(),
        }),
        caret,
    }
}

fn unit_boundary(
    doc: &Document,
    kind: UnitKind,
    at: usize,
    direction: Direction,
) -> Result<usize, EditError> {
    units::locate_boundary(doc.contents(), kind, at, direction).ok_or(
        EditError::NoUnit {
            kind,
            direction,
            at,
        },
    )
}

/// Offset `count` characters after `from`, if the buffer is long enough
pub(crate) fn step_forward(doc: &Document, from: usize, count: usize) -> Option<usize> {
    let text = doc.contents().get(from..)?;
    text.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .nth(count)
        .map(|i| from + i)
}

/// Offset `count` characters before `from`, if there are that many
pub(crate) fn step_back(doc: &Document, from: usize, count: usize) -> Option<usize> {
    let text = doc.contents().get(..from)?;
    std::iter::once(text.len())
        .chain(text.char_indices().rev().map(|(i, _)| i))
        .nth(count)
}

fn convert_case(text: &str, case: Case) -> String {
    match case {
        Case::Upper => text.to_uppercase(),
        Case::Lower => text.to_lowercase(),
        Case::Capitalize => {
            let mut seen_letter = false;
            text.chars()
                .flat_map(|c| {
                    let first = c.is_alphanumeric() && !seen_letter;
                    if c.is_alphanumeric() {
                        seen_letter = true;
                    }
                    if first {
                        c.to_uppercase().collect::<Vec<_>>()
                    } else {
                        c.to_lowercase().collect::<Vec<_>>()
                    }
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::Document;
    use pretty_assertions::assert_eq;

    fn doc_at(text: &str, caret: usize) -> Document {
        let mut doc = Document::new(text);
        doc.set_caret(caret);
        doc
    }

    // ============ Insertion and deletion ============

    #[test]
    fn test_insert_text_at_caret() {
        let mut doc = doc_at("Hello World", 5);

        let patch = doc.apply(&EditOp::insert(",")).unwrap();

        assert_eq!(doc.text(), "Hello, World");
        assert_eq!(patch.caret, 6);
        assert_eq!(patch.version, 1);
        assert_eq!(patch.splices.len(), 1);
        assert_eq!(patch.splices[0].start, 5);
        assert_eq!(patch.splices[0].old_len, 0);
        assert_eq!(patch.splices[0].new_len, 1);
    }

    #[test]
    fn test_delete_backward_counts_characters_not_bytes() {
        let mut doc = doc_at("añb", 3);

        doc.apply(&EditOp::DeleteBackward { count: 1 }).unwrap();

        assert_eq!(doc.text(), "ab");
        assert_eq!(doc.caret(), 1);
    }

    #[test]
    fn test_delete_backward_at_start_fails() {
        let mut doc = doc_at("abc", 0);

        let result = doc.apply(&EditOp::DeleteBackward { count: 1 });

        assert_eq!(result.unwrap_err(), EditError::BeginningOfBuffer);
        assert_eq!(doc.text(), "abc");
        assert_eq!(doc.version(), 0);
    }

    #[test]
    fn test_delete_forward_past_end_fails() {
        let mut doc = doc_at("abc", 2);

        let result = doc.apply(&EditOp::DeleteForward { count: 2 });

        assert_eq!(result.unwrap_err(), EditError::EndOfBuffer);
        assert_eq!(doc.text(), "abc");
    }

    #[test]
    fn test_delete_forward() {
        let mut doc = doc_at("abcdef", 1);

        doc.apply(&EditOp::DeleteForward { count: 3 }).unwrap();

        assert_eq!(doc.text(), "aef");
        assert_eq!(doc.caret(), 1);
    }

    // ============ Motion ============

    #[test]
    fn test_move_caret_both_directions() {
        let mut doc = doc_at("abcdef", 2);

        let patch = doc.apply(&EditOp::MoveCaret { by: 3 }).unwrap();
        assert!(patch.splices.is_empty());
        assert_eq!(doc.caret(), 5);

        doc.apply(&EditOp::MoveCaret { by: -4 }).unwrap();
        assert_eq!(doc.caret(), 1);

        assert_eq!(
            doc.apply(&EditOp::MoveCaret { by: -2 }).unwrap_err(),
            EditError::BeginningOfBuffer
        );
        assert_eq!(doc.version(), 0);
    }

    #[test]
    fn test_move_by_unit() {
        let mut doc = doc_at("let value = other;", 0);

        doc.apply(&EditOp::MoveByUnit {
            kind: UnitKind::Word,
            direction: Direction::Forward,
        })
        .unwrap();
        assert_eq!(doc.caret(), 3);

        doc.apply(&EditOp::MoveByUnit {
            kind: UnitKind::Word,
            direction: Direction::Forward,
        })
        .unwrap();
        assert_eq!(doc.caret(), 9);
    }

    #[test]
    fn test_delete_by_unit_backward() {
        let mut doc = doc_at("foo bar baz", 7);

        doc.apply(&EditOp::DeleteByUnit {
            kind: UnitKind::Word,
            direction: Direction::Backward,
        })
        .unwrap();

        assert_eq!(doc.text(), "foo  baz");
        assert_eq!(doc.caret(), 4);
    }

    #[test]
    fn test_move_by_unit_without_unit_fails() {
        let mut doc = doc_at("word   ", 4);

        let err = doc
            .apply(&EditOp::MoveByUnit {
                kind: UnitKind::Word,
                direction: Direction::Forward,
            })
            .unwrap_err();

        assert_eq!(
            err,
            EditError::NoUnit {
                kind: UnitKind::Word,
                direction: Direction::Forward,
                at: 4
            }
        );
    }

    // ============ Case changes ============

    #[test]
    fn test_change_case_upcases_to_end_of_word() {
        let mut doc = doc_at("make it loud", 5);

        doc.apply(&EditOp::ChangeCase {
            kind: UnitKind::Word,
            case: Case::Upper,
        })
        .unwrap();

        assert_eq!(doc.text(), "make IT loud");
        assert_eq!(doc.caret(), 7);
    }

    #[test]
    fn test_change_case_capitalize() {
        assert_eq!(convert_case(" hELLO", Case::Capitalize), " Hello");
        assert_eq!(convert_case("ABC", Case::Lower), "abc");
    }

    #[test]
    fn test_change_case_noop_leaves_version() {
        let mut doc = doc_at("ALREADY", 0);

        doc.apply(&EditOp::ChangeCase {
            kind: UnitKind::Word,
            case: Case::Upper,
        })
        .unwrap();

        assert_eq!(doc.version(), 0);
        assert_eq!(doc.caret(), 7);
    }

    // ============ Operation ids ============

    #[test]
    fn test_operation_ids_are_distinct() {
        let ops = [
            EditOp::insert("x"),
            EditOp::DeleteBackward { count: 1 },
            EditOp::DeleteForward { count: 1 },
            EditOp::MoveCaret { by: 1 },
            EditOp::MoveByUnit {
                kind: UnitKind::Symbol,
                direction: Direction::Backward,
            },
            EditOp::DeleteByUnit {
                kind: UnitKind::Word,
                direction: Direction::Forward,
            },
            EditOp::ChangeCase {
                kind: UnitKind::Word,
                case: Case::Capitalize,
            },
        ];
        let mut ids: Vec<&str> = ops.iter().map(EditOp::id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), ops.len());
    }
}
