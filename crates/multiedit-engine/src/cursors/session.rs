use std::fmt;
use std::ops::Range;

use crate::cursors::matching::{lead_at, origin_at};
use crate::cursors::{
    CompiledPattern, CursorSet, Host, InstanceDescriptor, MacroApplier, MacroRecorder, MarkOutcome,
    MatchEngine, ReplayHooks, SecondarySelection, SelectionCycle,
};
use crate::editing::{Direction, EditError, EditOp, Patch, UnitKind};
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Marking,
    Recording,
    Applying,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Marking => "marking",
            SessionState::Recording => "recording",
            SessionState::Applying => "applying",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Not recording (session is {state})")]
    InvalidState { state: SessionState },
    #[error("Replay failed at cursor {cursor}: {source}")]
    TransactionFailure { cursor: usize, source: EditError },
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// What a quit command did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOutcome {
    /// An active selection was dropped and recording restarted
    SelectionCleared,
    /// Cursors and recording were discarded
    Aborted,
    /// Nothing was going on
    Noop,
}

/// A descriptor with the occurrence it was derived from
type Derived = (InstanceDescriptor, Range<usize>, Option<usize>);

/// Multi-cursor session for one document view.
///
/// Owns the cursor set, the workspace and the recorder; the document is
/// passed to every command. Edits made while cursors exist must go through
/// [`SessionController::perform`] so the cursors follow them.
pub struct SessionController {
    state: SessionState,
    cursors: CursorSet,
    workspace: Option<SecondarySelection>,
    cycle: Option<SelectionCycle>,
    recorder: MacroRecorder,
    applier: MacroApplier,
    settings: Settings,
}

impl SessionController {
    pub fn new(settings: Settings) -> Self {
        Self::with_hooks(settings, ReplayHooks::new())
    }

    pub fn with_hooks(settings: Settings, hooks: ReplayHooks) -> Self {
        Self {
            state: SessionState::Idle,
            cursors: CursorSet::new(),
            workspace: None,
            cycle: None,
            recorder: MacroRecorder::new(),
            applier: MacroApplier::new(hooks),
            settings,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn cursors(&self) -> &CursorSet {
        &self.cursors
    }

    pub fn workspace(&self) -> Option<&SecondarySelection> {
        self.workspace.as_ref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn hooks_mut(&mut self) -> &mut ReplayHooks {
        self.applier.hooks_mut()
    }

    /// Operations recorded so far in this session
    pub fn recorded(&self) -> &[EditOp] {
        self.recorder.recorded()
    }

    pub fn is_cycling(&self) -> bool {
        self.cycle.is_some()
    }

    // ============ Marking ============

    /// Mark every occurrence of `pattern`, or of the active selection or the
    /// symbol at the caret when no pattern is given
    pub fn mark_all_instances<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        pattern: Option<CompiledPattern>,
    ) -> Result<MarkOutcome, SessionError> {
        self.cycle = None;
        let (descriptor, origin, lead) = match pattern {
            Some(pattern) => {
                let descriptor = InstanceDescriptor::Pattern(pattern);
                let (origin, lead) =
                    origin_at(&*host, &descriptor, self.bounds(&*host), host.caret()).unzip();
                (descriptor, origin, lead.flatten())
            }
            None => match self.derive_descriptor(&*host)? {
                Some((descriptor, origin, lead)) => {
                    host.deactivate_selection();
                    (descriptor, Some(origin), lead)
                }
                None => return Ok(MarkOutcome::NothingToMatch),
            },
        };
        Ok(self.mark_all_with(&*host, descriptor, origin, lead))
    }

    /// Mark every match of the regular expression `source`
    pub fn mark_all_matching<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        source: &str,
    ) -> Result<MarkOutcome, SessionError> {
        let pattern = CompiledPattern::regex(source)?;
        self.mark_all_instances(host, Some(pattern))
    }

    /// Mark every unit of `kind`, except the one at the caret
    pub fn mark_all_units<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        kind: UnitKind,
    ) -> MarkOutcome {
        self.cycle = None;
        let descriptor = InstanceDescriptor::Unit(kind);
        let (origin, lead) =
            origin_at(&*host, &descriptor, self.bounds(&*host), host.caret()).unzip();
        self.mark_all_with(&*host, descriptor, origin, lead.flatten())
    }

    pub fn mark_all_lines<H: Host + ?Sized>(&mut self, host: &mut H) -> MarkOutcome {
        self.mark_all_units(host, UnitKind::Line)
    }

    pub fn mark_next_instance<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        count: usize,
    ) -> Result<MarkOutcome, SessionError> {
        self.mark_instance(host, count, Direction::Forward)
    }

    pub fn mark_previous_instance<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        count: usize,
    ) -> Result<MarkOutcome, SessionError> {
        self.mark_instance(host, count, Direction::Backward)
    }

    pub fn mark_next_line<H: Host + ?Sized>(&mut self, host: &mut H, count: usize) -> MarkOutcome {
        self.mark_line(host, count, Direction::Forward)
    }

    pub fn mark_previous_line<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        count: usize,
    ) -> MarkOutcome {
        self.mark_line(host, count, Direction::Backward)
    }

    /// Place a cursor by hand. The session stays in marking until
    /// [`SessionController::start_session`], unless already recording.
    pub fn add_cursor_at<H: Host + ?Sized>(&mut self, host: &H, position: usize) -> bool {
        self.cycle = None;
        let position = position.min(host.len());
        let bounds = self.bounds(host);
        if position < bounds.start || position > bounds.end {
            log::debug!("Cursor at {position} is outside the workspace");
            return false;
        }
        if self.state == SessionState::Idle {
            self.transition(SessionState::Marking);
        }
        self.cursors.insert_bare(position)
    }

    /// Remove the `n` most recently added cursors
    pub fn remove_last_cursors(&mut self, n: usize) -> usize {
        self.cycle = None;
        let removed = self.cursors.remove_last(n);
        if self.cursors.is_empty() && self.state != SessionState::Idle {
            self.reset();
        }
        removed
    }

    // ============ Session lifecycle ============

    /// Start recording after placing cursors by hand
    pub fn start_session(&mut self) -> Result<(), SessionError> {
        self.cycle = None;
        if self.state != SessionState::Marking || self.cursors.is_empty() {
            return Err(SessionError::InvalidState { state: self.state });
        }
        self.start_recording();
        Ok(())
    }

    /// Stop recording and replay the log at every cursor.
    ///
    /// Returns the number of cursors replayed at. The session is idle
    /// afterwards whether the replay succeeded or was rolled back.
    pub fn end_session<H: Host + ?Sized>(&mut self, host: &mut H) -> Result<usize, SessionError> {
        self.cycle = None;
        if self.state != SessionState::Recording {
            return Err(SessionError::InvalidState { state: self.state });
        }
        self.transition(SessionState::Applying);
        let log = self.recorder.stop();
        let mut cursors = std::mem::take(&mut self.cursors);
        let result = self.applier.apply(host, log, &mut cursors);
        self.finish();
        result
    }

    /// Quit. With an active selection this only drops the selection and
    /// restarts recording; otherwise everything is discarded.
    pub fn abort_session<H: Host + ?Sized>(&mut self, host: &mut H) -> QuitOutcome {
        self.cycle = None;
        if self.state == SessionState::Idle {
            return QuitOutcome::Noop;
        }
        if host.active_selection().is_some() {
            host.deactivate_selection();
            if self.state == SessionState::Recording {
                self.recorder.start();
            }
            log::debug!("Selection cleared, recording restarted");
            return QuitOutcome::SelectionCleared;
        }
        self.finish();
        QuitOutcome::Aborted
    }

    /// Apply one operation at the caret, recording it while recording
    pub fn perform<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        op: &EditOp,
    ) -> Result<Patch, EditError> {
        self.cycle = None;
        let patch = host.apply_op(op)?;
        if self.state == SessionState::Recording {
            self.recorder.record(op);
        }
        self.cursors.apply_patch(&patch);
        if let Some(workspace) = &mut self.workspace {
            workspace.apply_patch(&patch);
        }
        Ok(patch)
    }

    // ============ Workspace ============

    /// Restrict cursors to `range`. Returns the number of cursors evicted.
    pub fn set_selection<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        range: Range<usize>,
        kind: Option<UnitKind>,
    ) -> usize {
        self.cycle = None;
        self.apply_workspace(&*host, range, kind)
    }

    /// Capture the active selection as the workspace, or step through the
    /// unit kinds configured for the document's mode around the caret
    pub fn cycle_selection<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
    ) -> Option<SecondarySelection> {
        if let Some(cycle) = self.cycle.take() {
            return self.select_from_cycle(&*host, cycle, true);
        }
        if let Some(selection) = host.active_selection() {
            host.deactivate_selection();
            self.apply_workspace(&*host, selection, None);
            return self.workspace;
        }
        let kinds = self.settings.unit_kinds_for(host.modes()).to_vec();
        let cycle = SelectionCycle::new(kinds, host.caret());
        self.select_from_cycle(&*host, cycle, false)
    }

    pub fn clear_selection(&mut self) {
        self.cycle = None;
        self.workspace = None;
    }

    // ============ Internals ============

    fn bounds<H: Host + ?Sized>(&self, host: &H) -> Range<usize> {
        self.workspace
            .map_or(0..host.len(), |workspace| workspace.range())
    }

    fn transition(&mut self, to: SessionState) {
        if self.state != to {
            log::debug!("Session {} -> {}", self.state, to);
            self.state = to;
        }
    }

    fn start_recording(&mut self) {
        self.recorder.start();
        self.transition(SessionState::Recording);
    }

    /// Drop cursors and recording, keeping the workspace
    fn reset(&mut self) {
        self.cursors.clear();
        self.recorder.stop();
        self.transition(SessionState::Idle);
    }

    /// End of a session: the workspace goes too
    fn finish(&mut self) {
        self.reset();
        self.workspace = None;
    }

    /// A literal pattern from the active selection, or a whole-symbol pattern
    /// from the symbol at the caret
    fn derive_descriptor<H: Host + ?Sized>(
        &self,
        host: &H,
    ) -> Result<Option<Derived>, SessionError> {
        let caret = host.caret();
        if let Some(selection) = host.active_selection() {
            let pattern = CompiledPattern::literal(&host.slice(selection.clone()))?;
            let lead = lead_at(host, &selection, caret);
            return Ok(Some((InstanceDescriptor::Pattern(pattern), selection, lead)));
        }
        let Some(symbol) = host
            .unit_bounds_at(UnitKind::Symbol, caret)
            .filter(|range| !range.is_empty() && range.start <= caret && caret <= range.end)
        else {
            return Ok(None);
        };
        let source = format!(r"\b{}\b", regex::escape(&host.slice(symbol.clone())));
        let pattern = CompiledPattern::regex(&source)?;
        let lead = lead_at(host, &symbol, caret);
        Ok(Some((InstanceDescriptor::Pattern(pattern), symbol, lead)))
    }

    fn mark_all_with<H: Host + ?Sized>(
        &mut self,
        host: &H,
        descriptor: InstanceDescriptor,
        origin: Option<Range<usize>>,
        lead: Option<usize>,
    ) -> MarkOutcome {
        self.cursors.begin_phase(descriptor, origin, lead);
        self.transition(SessionState::Marking);
        let placed = MatchEngine::new(host, self.bounds(host)).mark_all(&mut self.cursors);

        if self.cursors.is_empty() {
            self.reset();
            return MarkOutcome::Empty;
        }
        self.start_recording();
        if placed == 0 {
            MarkOutcome::Empty
        } else {
            MarkOutcome::Placed(placed)
        }
    }

    fn mark_instance<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        count: usize,
        direction: Direction,
    ) -> Result<MarkOutcome, SessionError> {
        self.cycle = None;
        if self.cursors.descriptor().is_none() {
            let Some((descriptor, origin, lead)) = self.derive_descriptor(&*host)? else {
                return Ok(MarkOutcome::NothingToMatch);
            };
            host.deactivate_selection();
            self.cursors.begin_phase(descriptor, Some(origin), lead);
        }
        if self.state == SessionState::Idle {
            self.transition(SessionState::Marking);
        }

        let engine = MatchEngine::new(&*host, self.bounds(&*host));
        let outcome = match direction {
            Direction::Forward => engine.mark_next(&mut self.cursors, count),
            Direction::Backward => engine.mark_previous(&mut self.cursors, count),
        };
        Ok(self.after_extension(outcome))
    }

    fn mark_line<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        count: usize,
        direction: Direction,
    ) -> MarkOutcome {
        self.cycle = None;
        if self.state == SessionState::Idle {
            self.transition(SessionState::Marking);
        }
        let engine = MatchEngine::new(&*host, self.bounds(&*host));
        let outcome = engine.mark_lines(&mut self.cursors, count, direction);
        self.after_extension(outcome)
    }

    /// Next and previous grow a recording set in place; a fresh set starts
    /// recording and an empty one goes back to idle
    fn after_extension(&mut self, outcome: MarkOutcome) -> MarkOutcome {
        if self.cursors.is_empty() {
            self.reset();
        } else if self.state != SessionState::Recording {
            self.start_recording();
        }
        outcome
    }

    fn apply_workspace<H: Host + ?Sized>(
        &mut self,
        host: &H,
        range: Range<usize>,
        kind: Option<UnitKind>,
    ) -> usize {
        let len = host.len();
        let workspace = SecondarySelection::new(range.start.min(len)..range.end.min(len), kind);
        let bounds = workspace.range();
        log::debug!("Workspace set to {}", workspace.describe());
        self.workspace = Some(workspace);

        let evicted = self.cursors.retain_within(&bounds);
        if self.state == SessionState::Idle {
            return evicted;
        }
        if self.cursors.descriptor().is_some() {
            MatchEngine::new(host, bounds).mark_all(&mut self.cursors);
        }
        if self.cursors.is_empty() {
            self.reset();
        } else if self.state == SessionState::Recording {
            log::debug!("Workspace changed, recording restarted");
            self.recorder.start();
        }
        evicted
    }

    fn select_from_cycle<H: Host + ?Sized>(
        &mut self,
        host: &H,
        mut cycle: SelectionCycle,
        advance_first: bool,
    ) -> Option<SecondarySelection> {
        for step in 0..cycle.len() {
            let kind = if advance_first || step > 0 {
                cycle.advance()
            } else {
                cycle.current()
            };
            let Some(kind) = kind else {
                break;
            };
            if let Some(range) = host.unit_bounds_at(kind, cycle.anchor())
                && !range.is_empty()
            {
                self.apply_workspace(host, range, Some(kind));
                self.cycle = Some(cycle);
                return self.workspace;
            }
        }
        log::debug!("No unit around {} to select", cycle.anchor());
        None
    }
}
