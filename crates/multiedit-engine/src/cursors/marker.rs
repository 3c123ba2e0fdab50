use crate::editing::{Patch, Splice};

/// A document offset that follows edits so it keeps denoting the same
/// logical character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PositionMarker {
    offset: usize,
}

impl PositionMarker {
    pub fn new(offset: usize) -> Self {
        Self { offset }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Adjust for `old_len` bytes at `edit_start` replaced by `new_len` bytes.
    ///
    /// Edits starting at or after the marker leave it alone, so text inserted
    /// exactly at the marker lands after it. Edits before it shift it, and an
    /// edit whose replaced range covers it collapses it to `edit_start`.
    pub fn advance_on_edit(&mut self, edit_start: usize, old_len: usize, new_len: usize) {
        if edit_start >= self.offset {
            return;
        }
        let old_end = edit_start + old_len;
        if old_end <= self.offset {
            self.offset = self.offset - old_len + new_len;
        } else {
            self.offset = edit_start;
        }
    }

    pub fn apply_splice(&mut self, splice: &Splice) {
        self.advance_on_edit(splice.start, splice.old_len, splice.new_len);
    }

    /// Follow every splice of a patch.
    ///
    /// Splices are in old coordinates, so they are applied last to first.
    pub fn apply_patch(&mut self, patch: &Patch) {
        for splice in patch.splices.iter().rev() {
            self.apply_splice(splice);
        }
    }
}

impl From<usize> for PositionMarker {
    fn from(offset: usize) -> Self {
        Self::new(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::insert_before(10, 2, 0, 3, 13)]
    #[case::delete_before(10, 2, 4, 0, 6)]
    #[case::replace_before(10, 2, 3, 1, 8)]
    #[case::delete_ending_at_marker(10, 5, 5, 0, 5)]
    #[case::delete_covering_marker(10, 8, 5, 0, 8)]
    #[case::replace_covering_marker(10, 8, 5, 9, 8)]
    #[case::insert_at_marker(10, 10, 0, 4, 10)]
    #[case::delete_at_marker(10, 10, 3, 0, 10)]
    #[case::edit_after(10, 12, 1, 5, 10)]
    fn test_advance_on_edit(
        #[case] offset: usize,
        #[case] start: usize,
        #[case] old_len: usize,
        #[case] new_len: usize,
        #[case] expected: usize,
    ) {
        let mut marker = PositionMarker::new(offset);
        marker.advance_on_edit(start, old_len, new_len);
        assert_eq!(marker.offset(), expected);
    }

    #[test]
    fn test_apply_patch_applies_splices_last_to_first() {
        // "aXbYc" -> "abc" removing both X and Y (old coordinates 1 and 3)
        let patch = Patch {
            splices: vec![
                Splice {
                    start: 1,
                    old_len: 1,
                    new_len: 0,
                },
                Splice {
                    start: 3,
                    old_len: 1,
                    new_len: 0,
                },
            ],
            caret: 0,
            version: 1,
        };

        let mut marker = PositionMarker::new(4);
        marker.apply_patch(&patch);

        assert_eq!(marker.offset(), 2);
    }

    #[test]
    fn test_markers_keep_order_through_edits() {
        let mut markers: Vec<PositionMarker> = [2, 5, 9].into_iter().map(Into::into).collect();
        for marker in &mut markers {
            marker.advance_on_edit(3, 4, 1);
        }
        let offsets: Vec<usize> = markers.iter().map(PositionMarker::offset).collect();
        assert_eq!(offsets, vec![2, 3, 6]);
    }
}
