use serde::{Deserialize, Serialize};

use crate::cursors::{CursorSet, Host, PositionMarker, SessionError};
use crate::editing::EditOp;

/// Operations recorded at the primary caret, in the order they ran
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationLog(Vec<EditOp>);

impl OperationLog {
    pub fn new(ops: Vec<EditOp>) -> Self {
        Self(ops)
    }

    pub fn ops(&self) -> &[EditOp] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<EditOp>> for OperationLog {
    fn from(ops: Vec<EditOp>) -> Self {
        Self(ops)
    }
}

/// Captures operations verbatim between `start` and `stop`
#[derive(Debug, Default)]
pub struct MacroRecorder {
    log: Option<Vec<EditOp>>,
}

impl MacroRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a fresh log, dropping anything recorded so far
    pub fn start(&mut self) {
        self.log = Some(Vec::new());
    }

    pub fn is_recording(&self) -> bool {
        self.log.is_some()
    }

    pub fn record(&mut self, op: &EditOp) {
        if let Some(log) = &mut self.log {
            log.push(op.clone());
        }
    }

    pub fn recorded(&self) -> &[EditOp] {
        self.log.as_deref().unwrap_or_default()
    }

    pub fn stop(&mut self) -> OperationLog {
        OperationLog(self.log.take().unwrap_or_default())
    }
}

/// Callbacks run around a whole replay
#[derive(Default)]
pub struct ReplayHooks {
    pre: Vec<Box<dyn FnMut()>>,
    post: Vec<Box<dyn FnMut()>>,
}

impl ReplayHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_pre(&mut self, hook: impl FnMut() + 'static) {
        self.pre.push(Box::new(hook));
    }

    pub fn add_post(&mut self, hook: impl FnMut() + 'static) {
        self.post.push(Box::new(hook));
    }

    fn run_pre(&mut self) {
        for hook in &mut self.pre {
            hook();
        }
    }

    fn run_post(&mut self) {
        for hook in &mut self.post {
            hook();
        }
    }
}

/// Replays an operation log at every cursor as one transaction.
#[derive(Default)]
pub struct MacroApplier {
    hooks: ReplayHooks,
}

impl MacroApplier {
    pub fn new(hooks: ReplayHooks) -> Self {
        Self { hooks }
    }

    pub fn hooks_mut(&mut self) -> &mut ReplayHooks {
        &mut self.hooks
    }

    /// Replay `log` at each cursor of `set`, left to right.
    ///
    /// The caret is moved to each cursor's current offset and every operation
    /// runs there; the set follows each edit, so earlier cursors never
    /// invalidate later ones. Afterwards the caret returns to where it was.
    /// On failure the whole replay is rolled back and the index of the cursor
    /// that failed is reported. Returns the number of cursors replayed at.
    pub fn apply<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        log: OperationLog,
        set: &mut CursorSet,
    ) -> Result<usize, SessionError> {
        self.hooks.run_pre();
        host.begin_transaction();

        let result = replay(host, &log, set);
        match &result {
            Ok(count) => {
                host.commit_transaction();
                log::info!("Replayed {} operations at {count} cursors", log.len());
            }
            Err(err) => {
                host.rollback_transaction();
                log::warn!("{err}; replay rolled back");
            }
        }

        self.hooks.run_post();
        result
    }
}

fn replay<H: Host + ?Sized>(
    host: &mut H,
    log: &OperationLog,
    set: &mut CursorSet,
) -> Result<usize, SessionError> {
    let mut caret = PositionMarker::new(host.caret());
    // Cursors can merge as edits collapse them, so follow them by serial
    let serials: Vec<u64> = set.cursors().iter().map(|cursor| cursor.serial()).collect();

    let mut replayed = 0;
    for (index, serial) in serials.into_iter().enumerate() {
        let Some(offset) = set.offset_of(serial) else {
            log::debug!("Cursor {index} merged into another before replay");
            continue;
        };
        host.set_caret(offset);
        for op in log.ops() {
            let patch = host
                .apply_op(op)
                .map_err(|source| SessionError::TransactionFailure {
                    cursor: index,
                    source,
                })?;
            set.apply_patch(&patch);
            caret.apply_patch(&patch);
        }
        replayed += 1;
    }

    host.set_caret(caret.offset());
    Ok(replayed)
}
