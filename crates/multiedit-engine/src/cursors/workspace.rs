use std::ops::Range;

use crate::cursors::PositionMarker;
use crate::editing::{Patch, UnitKind};

/// A bounding range cursors must live in.
///
/// Both ends are tracked, so the workspace follows edits made while
/// recording. Text inserted exactly at the end stays outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecondarySelection {
    start: PositionMarker,
    end: PositionMarker,
    /// Unit the workspace was taken from, for messages only
    kind: Option<UnitKind>,
}

impl SecondarySelection {
    pub fn new(range: Range<usize>, kind: Option<UnitKind>) -> Self {
        Self {
            start: PositionMarker::new(range.start.min(range.end)),
            end: PositionMarker::new(range.start.max(range.end)),
            kind,
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.start.offset()..self.end.offset()
    }

    pub fn kind(&self) -> Option<UnitKind> {
        self.kind
    }

    pub fn apply_patch(&mut self, patch: &Patch) {
        self.start.apply_patch(patch);
        self.end.apply_patch(patch);
    }

    /// Short description for status messages
    pub fn describe(&self) -> String {
        let range = self.range();
        match self.kind {
            Some(kind) => format!("{kind} {}..{}", range.start, range.end),
            None => format!("region {}..{}", range.start, range.end),
        }
    }
}

/// State of a repeated cycle-selection gesture.
///
/// Lives only while the gesture is repeated; any other command drops it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionCycle {
    kinds: Vec<UnitKind>,
    index: usize,
    /// Caret when the cycle began; every step selects around it
    anchor: usize,
}

impl SelectionCycle {
    pub fn new(kinds: Vec<UnitKind>, anchor: usize) -> Self {
        Self {
            kinds,
            index: 0,
            anchor,
        }
    }

    pub fn anchor(&self) -> usize {
        self.anchor
    }

    pub fn current(&self) -> Option<UnitKind> {
        self.kinds.get(self.index).copied()
    }

    /// Move to the next kind, wrapping at the end of the list
    pub fn advance(&mut self) -> Option<UnitKind> {
        if self.kinds.is_empty() {
            return None;
        }
        self.index = (self.index + 1) % self.kinds.len();
        self.current()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}
