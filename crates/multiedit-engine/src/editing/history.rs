use xi_rope::Rope;

/// Buffer state captured before an undoable change
#[derive(Clone)]
pub(crate) struct Revision {
    pub buffer: Rope,
    pub caret: usize,
    pub mark: Option<usize>,
    pub version: u64,
}

/// Undo/redo stacks of whole-buffer revisions.
///
/// Ropes share structure, so a revision costs little more than the nodes an
/// edit touched. Open transactions stack their starting revisions; only the
/// outermost one becomes an undo step when it commits.
#[derive(Clone)]
pub(crate) struct History {
    undo_stack: Vec<Revision>,
    redo_stack: Vec<Revision>,
    open: Vec<Revision>,
    max_undo_levels: usize,
}

impl History {
    pub fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            open: Vec::new(),
            max_undo_levels: 1000,
        }
    }

    pub fn in_transaction(&self) -> bool {
        !self.open.is_empty()
    }

    /// Record the state before a change made outside any transaction
    pub fn record(&mut self, before: Revision) {
        self.push_undo(before);
    }

    pub fn begin(&mut self, before: Revision) {
        self.open.push(before);
    }

    /// Close the innermost transaction. Returns true when it was the
    /// outermost one and produced an undo step.
    pub fn commit(&mut self, current_version: u64) -> bool {
        let Some(before) = self.open.pop() else {
            return false;
        };
        if self.open.is_empty() && before.version != current_version {
            self.push_undo(before);
            return true;
        }
        false
    }

    /// Close the innermost transaction, returning the state to restore
    pub fn rollback(&mut self) -> Option<Revision> {
        self.open.pop()
    }

    pub fn undo(&mut self, current: Revision) -> Option<Revision> {
        let previous = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        Some(previous)
    }

    pub fn redo(&mut self, current: Revision) -> Option<Revision> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    fn push_undo(&mut self, revision: Revision) {
        self.undo_stack.push(revision);
        if self.undo_stack.len() > self.max_undo_levels {
            self.undo_stack.remove(0);
        }
        // Clear redo stack when new changes are made
        self.redo_stack.clear();
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
