use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use multiedit_engine::{
    Case, Direction, Document, EditOp, MarkOutcome, QuitOutcome, SessionController,
    SessionState, Settings, UnitKind, io,
};
use std::path::PathBuf;

/// Numeric argument typed before a command, as in `M-3` or `M--`
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Prefix {
    digits: Option<usize>,
    negative: bool,
}

impl Prefix {
    fn push(mut self, c: char) -> Self {
        match c.to_digit(10) {
            Some(digit) => {
                self.digits = Some(self.digits.unwrap_or(0) * 10 + digit as usize);
            }
            None => self.negative = !self.negative,
        }
        self
    }

    /// Signed count; a bare `-` means -1
    fn count(self) -> Count {
        let n = self.digits.unwrap_or(1);
        if self.negative {
            Count::Remove(n)
        } else {
            Count::Add(n)
        }
    }
}

/// A prefix argument resolved for a marking command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Count {
    Add(usize),
    Remove(usize),
}

pub struct App {
    pub path: PathBuf,
    pub doc: Document,
    pub session: SessionController,
    pub message: String,
    /// Regex being typed for mark-all-matching
    pub prompt: Option<String>,
    pub dirty: bool,
    pub should_quit: bool,
    /// First visible line
    pub scroll: usize,
    prefix: Option<Prefix>,
    quit_armed: bool,
}

impl App {
    pub fn new(path: PathBuf, doc: Document, settings: Settings) -> Self {
        Self {
            path,
            doc,
            session: SessionController::new(settings),
            message: String::new(),
            prompt: None,
            dirty: false,
            should_quit: false,
            scroll: 0,
            prefix: None,
            quit_armed: false,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.prompt.is_some() {
            self.handle_prompt_key(key);
            return;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let alt = key.modifiers.contains(KeyModifiers::ALT);

        if alt
            && let KeyCode::Char(c) = key.code
            && (c.is_ascii_digit() || c == '-')
        {
            self.prefix = Some(self.prefix.unwrap_or_default().push(c));
            return;
        }
        // Escape cancels a half-typed prefix before anything else
        if key.code == KeyCode::Esc && self.prefix.take().is_some() {
            return;
        }
        let count = self.prefix.take().map_or(Count::Add(1), Prefix::count);
        if !(ctrl && key.code == KeyCode::Char('q')) {
            self.quit_armed = false;
        }

        if alt
            && let KeyCode::Char(c) = key.code
            && let Some(kind) = unit_for_key(c)
        {
            let outcome = self.session.mark_all_units(&mut self.doc, kind);
            self.report(outcome);
            return;
        }

        match key.code {
            KeyCode::Char('q') if ctrl => self.quit(),
            KeyCode::Char('s') if ctrl => self.save(),
            KeyCode::Char('z') if ctrl => self.undo(),
            KeyCode::Char('y') if ctrl => self.redo(),
            KeyCode::Char(' ') | KeyCode::Null if ctrl || key.code == KeyCode::Null => {
                self.toggle_mark()
            }

            // Marking
            KeyCode::Char('a') if alt => self.mark_all(),
            KeyCode::Char('n') if alt => self.mark_instances(count, Direction::Forward),
            KeyCode::Char('p') if alt => self.mark_instances(count, Direction::Backward),
            KeyCode::Char('l') if alt => {
                let outcome = self.session.mark_all_lines(&mut self.doc);
                self.report(outcome);
            }
            KeyCode::Down if alt => self.mark_lines(count, Direction::Forward),
            KeyCode::Up if alt => self.mark_lines(count, Direction::Backward),
            KeyCode::Char('m') if alt => self.add_cursor(),
            KeyCode::Char('%') if alt => self.prompt = Some(String::new()),

            // Session
            KeyCode::Char('r') if alt => self.start_session(),
            KeyCode::Char('e') if alt => self.end_session(),
            KeyCode::Esc => self.abort_session(),

            // Workspace
            KeyCode::Char('o') if alt => self.cycle_selection(),
            KeyCode::Char('O') if alt => {
                self.session.clear_selection();
                self.message = "Workspace cleared".to_string();
            }

            // Editing at the caret
            KeyCode::Char('d') if alt => self.perform(EditOp::DeleteByUnit {
                kind: UnitKind::Word,
                direction: Direction::Forward,
            }),
            KeyCode::Char('u') if alt => self.perform(change_case(Case::Upper)),
            KeyCode::Char('k') if alt => self.perform(change_case(Case::Lower)),
            KeyCode::Char('c') if alt => self.perform(change_case(Case::Capitalize)),
            KeyCode::Backspace if alt => self.perform(EditOp::DeleteByUnit {
                kind: UnitKind::Word,
                direction: Direction::Backward,
            }),
            KeyCode::Left if alt || ctrl => self.perform(word_motion(Direction::Backward)),
            KeyCode::Right if alt || ctrl => self.perform(word_motion(Direction::Forward)),
            KeyCode::Char(c) if !ctrl && !alt => self.perform(EditOp::insert(c.to_string())),
            KeyCode::Enter => self.perform(EditOp::insert("\n")),
            KeyCode::Tab => self.perform(EditOp::insert("\t")),
            KeyCode::Backspace => self.perform(EditOp::DeleteBackward { count: 1 }),
            KeyCode::Delete => self.perform(EditOp::DeleteForward { count: 1 }),
            KeyCode::Left => self.perform(EditOp::MoveCaret { by: -1 }),
            KeyCode::Right => self.perform(EditOp::MoveCaret { by: 1 }),
            KeyCode::Home => self.perform(line_motion(Direction::Backward)),
            KeyCode::End => self.perform(line_motion(Direction::Forward)),
            KeyCode::Up => self.move_vertically(Direction::Backward),
            KeyCode::Down => self.move_vertically(Direction::Forward),
            _ => {}
        }
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        let Some(input) = &mut self.prompt else {
            return;
        };
        match key.code {
            KeyCode::Char(c) => input.push(c),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Esc => {
                self.prompt = None;
                self.message = "Cancelled".to_string();
            }
            KeyCode::Enter => {
                let source = self.prompt.take().unwrap_or_default();
                match self.session.mark_all_matching(&mut self.doc, &source) {
                    Ok(outcome) => self.report(outcome),
                    Err(err) => self.message = err.to_string(),
                }
            }
            _ => {}
        }
    }

    fn perform(&mut self, op: EditOp) {
        match self.session.perform(&mut self.doc, &op) {
            Ok(patch) => {
                if !patch.is_noop() {
                    self.dirty = true;
                }
            }
            Err(err) => self.message = err.to_string(),
        }
    }

    fn mark_all(&mut self) {
        match self.session.mark_all_instances(&mut self.doc, None) {
            Ok(outcome) => self.report(outcome),
            Err(err) => self.message = err.to_string(),
        }
    }

    fn mark_instances(&mut self, count: Count, direction: Direction) {
        let n = match count {
            Count::Add(n) => n,
            Count::Remove(n) => return self.remove_cursors(n),
        };
        let result = match direction {
            Direction::Forward => self.session.mark_next_instance(&mut self.doc, n),
            Direction::Backward => self.session.mark_previous_instance(&mut self.doc, n),
        };
        match result {
            Ok(outcome) => self.report(outcome),
            Err(err) => self.message = err.to_string(),
        }
    }

    fn mark_lines(&mut self, count: Count, direction: Direction) {
        let n = match count {
            Count::Add(n) => n,
            Count::Remove(n) => return self.remove_cursors(n),
        };
        let outcome = match direction {
            Direction::Forward => self.session.mark_next_line(&mut self.doc, n),
            Direction::Backward => self.session.mark_previous_line(&mut self.doc, n),
        };
        self.report(outcome);
    }

    fn remove_cursors(&mut self, n: usize) {
        let removed = self.session.remove_last_cursors(n);
        self.message = format!("Removed {removed} cursors");
    }

    fn add_cursor(&mut self) {
        let caret = self.doc.caret();
        self.message = if self.session.add_cursor_at(&self.doc, caret) {
            format!("Cursor added at {caret}; M-r to start recording")
        } else {
            format!("No cursor added at {caret}")
        };
    }

    fn start_session(&mut self) {
        self.message = match self.session.start_session() {
            Ok(()) => format!("Recording at {} cursors", self.session.cursors().len()),
            Err(err) => err.to_string(),
        };
    }

    fn end_session(&mut self) {
        self.message = match self.session.end_session(&mut self.doc) {
            Ok(count) => {
                self.dirty = true;
                format!("Replayed at {count} cursors")
            }
            Err(err) => err.to_string(),
        };
    }

    fn abort_session(&mut self) {
        self.message = match self.session.abort_session(&mut self.doc) {
            QuitOutcome::SelectionCleared => "Selection cleared".to_string(),
            QuitOutcome::Aborted => "Quit".to_string(),
            QuitOutcome::Noop => String::new(),
        };
    }

    fn cycle_selection(&mut self) {
        self.message = match self.session.cycle_selection(&mut self.doc) {
            Some(workspace) => format!("Workspace: {}", workspace.describe()),
            None => "No unit around point".to_string(),
        };
    }

    fn toggle_mark(&mut self) {
        if self.doc.mark().is_some() {
            self.doc.set_mark(None);
            self.message = "Mark deactivated".to_string();
        } else {
            self.doc.set_mark(Some(self.doc.caret()));
            self.message = "Mark set".to_string();
        }
    }

    fn move_vertically(&mut self, direction: Direction) {
        // Not an operation, so it would not replay
        if self.session.state() == SessionState::Recording {
            self.message = "Use Home/End or word motion while recording".to_string();
            return;
        }
        let text = self.doc.text();
        if let Some(target) = vertical_target(&text, self.doc.caret(), direction) {
            self.doc.set_caret(target);
        }
    }

    fn undo(&mut self) {
        if self.session.state() != SessionState::Idle {
            self.message = "Finish or quit the session before undoing".to_string();
        } else if self.doc.undo() {
            self.dirty = true;
            self.message = "Undo".to_string();
        } else {
            self.message = "No further undo information".to_string();
        }
    }

    fn redo(&mut self) {
        if self.session.state() != SessionState::Idle {
            self.message = "Finish or quit the session before redoing".to_string();
        } else if self.doc.redo() {
            self.dirty = true;
            self.message = "Redo".to_string();
        } else {
            self.message = "No further redo information".to_string();
        }
    }

    fn save(&mut self) {
        match io::write_file(&self.path, &self.doc.text()) {
            Ok(()) => {
                self.dirty = false;
                self.message = format!("Wrote {}", self.path.display());
                log::info!("Saved {}", self.path.display());
            }
            Err(err) => {
                self.message = format!("Save failed: {err}");
                log::warn!("Failed to save {}: {err}", self.path.display());
            }
        }
    }

    fn quit(&mut self) {
        if self.dirty && !self.quit_armed {
            self.quit_armed = true;
            self.message = "Unsaved changes; C-q again to quit".to_string();
        } else {
            self.should_quit = true;
        }
    }

    fn report(&mut self, outcome: MarkOutcome) {
        self.message = match outcome {
            MarkOutcome::Placed(n) => format!(
                "Added {n} cursors ({} total)",
                self.session.cursors().len()
            ),
            MarkOutcome::NoMoreMatches { placed } => {
                format!("No more matches ({placed} added)")
            }
            MarkOutcome::Empty => "No new matches".to_string(),
            MarkOutcome::NothingToMatch => "Nothing at point to match".to_string(),
        };
    }
}

fn unit_for_key(c: char) -> Option<UnitKind> {
    match c {
        'w' => Some(UnitKind::Word),
        'y' => Some(UnitKind::Symbol),
        '(' => Some(UnitKind::List),
        'x' => Some(UnitKind::Sexp),
        'f' => Some(UnitKind::Defun),
        '#' => Some(UnitKind::Number),
        '.' => Some(UnitKind::Sentence),
        _ => None,
    }
}

fn change_case(case: Case) -> EditOp {
    EditOp::ChangeCase {
        kind: UnitKind::Word,
        case,
    }
}

fn word_motion(direction: Direction) -> EditOp {
    EditOp::MoveByUnit {
        kind: UnitKind::Word,
        direction,
    }
}

fn line_motion(direction: Direction) -> EditOp {
    EditOp::MoveByUnit {
        kind: UnitKind::Line,
        direction,
    }
}

/// Same column on the adjacent line, clamped to its length
fn vertical_target(text: &str, caret: usize, direction: Direction) -> Option<usize> {
    let line_start = text[..caret].rfind('\n').map_or(0, |i| i + 1);
    let column = text[line_start..caret].chars().count();
    let target_start = match direction {
        Direction::Forward => line_start + text[line_start..].find('\n')? + 1,
        Direction::Backward => {
            let previous_end = line_start.checked_sub(1)?;
            text[..previous_end].rfind('\n').map_or(0, |i| i + 1)
        }
    };
    let line_end = text[target_start..]
        .find('\n')
        .map_or(text.len(), |i| target_start + i);
    let line = &text[target_start..line_end];
    Some(target_start + line.char_indices().nth(column).map_or(line.len(), |(i, _)| i))
}
