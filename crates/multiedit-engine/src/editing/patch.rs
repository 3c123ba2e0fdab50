/// A contiguous replacement, in the coordinates of the text before the edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Splice {
    pub start: usize,
    pub old_len: usize,
    pub new_len: usize,
}

/// Result of applying an operation
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    /// Replacements made, ordered by start offset
    pub splices: Vec<Splice>,
    /// Caret after the operation
    pub caret: usize,
    pub version: u64,
}

impl Patch {
    pub fn is_noop(&self) -> bool {
        self.splices.is_empty()
    }
}
