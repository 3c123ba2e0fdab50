use std::collections::BTreeMap;

use crate::editing::UnitKind;

/// Engine settings, usually built from the user's configuration file
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Draw cursors with the same style as the matched text (rendering only)
    pub match_cursor_visual_style: bool,
    /// Unit kinds cycled through when no mode has its own list
    pub default_unit_kinds: Vec<UnitKind>,
    /// Unit kinds cycled through per mode
    pub unit_kinds_by_mode: BTreeMap<String, Vec<UnitKind>>,
}

impl Settings {
    /// Kinds to cycle through for a document with the given mode chain.
    ///
    /// The first mode (most specific first) with a non-empty list wins.
    pub fn unit_kinds_for(&self, modes: &[String]) -> &[UnitKind] {
        modes
            .iter()
            .find_map(|mode| {
                self.unit_kinds_by_mode
                    .get(mode)
                    .filter(|kinds| !kinds.is_empty())
            })
            .unwrap_or(&self.default_unit_kinds)
    }
}

impl Default for Settings {
    fn default() -> Self {
        let mut unit_kinds_by_mode = BTreeMap::new();
        unit_kinds_by_mode.insert(
            "prog".to_string(),
            vec![UnitKind::Symbol, UnitKind::List, UnitKind::Line, UnitKind::Defun],
        );
        unit_kinds_by_mode.insert(
            "text".to_string(),
            vec![UnitKind::Word, UnitKind::Sentence, UnitKind::Line],
        );
        Self {
            match_cursor_visual_style: true,
            default_unit_kinds: vec![UnitKind::Word, UnitKind::Line, UnitKind::Defun],
            unit_kinds_by_mode,
        }
    }
}
