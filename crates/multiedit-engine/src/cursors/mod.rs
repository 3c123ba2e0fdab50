/*!
 * # Cursor Sets and Macro Replay
 *
 * Record an edit once at the primary caret, replay it at every cursor.
 *
 * ## Lifecycle
 *
 * 1. A mark command fills a **`CursorSet`** through the **`MatchEngine`**,
 *    from a pattern, the active selection, the symbol at the caret or a
 *    `UnitKind`. The occurrence at the caret (the origin) is never a cursor.
 * 2. The **`SessionController`** starts the **`MacroRecorder`**; the user
 *    edits at the primary caret through `SessionController::perform`, and
 *    every cursor follows each edit as a **`PositionMarker`**.
 * 3. Ending the session hands the log to the **`MacroApplier`**, which
 *    replays it at each cursor, left to right, inside one host transaction:
 *    a single undo step, or nothing at all if any operation fails.
 *
 * A **`SecondarySelection`** (the workspace) bounds where cursors may live.
 *
 * ## Module Structure
 *
 * - **`host`**: `Host` and `UnitLocator`, what the engine needs from an editor
 * - **`marker`**: offsets that follow edits
 * - **`set`**: `CursorSet`, `InstanceDescriptor`, `CompiledPattern`
 * - **`matching`**: all/next/previous placement
 * - **`workspace`**: `SecondarySelection` and selection cycling
 * - **`macros`**: recorder, operation log, applier and replay hooks
 * - **`session`**: the state machine
 */

pub mod host;
pub mod macros;
pub mod marker;
pub mod matching;
pub mod session;
pub mod set;
pub mod workspace;

pub use host::{Host, UnitLocator};
pub use macros::{MacroApplier, MacroRecorder, OperationLog, ReplayHooks};
pub use marker::PositionMarker;
pub use matching::{MarkOutcome, MatchEngine, origin_at};
pub use session::{QuitOutcome, SessionController, SessionError, SessionState};
pub use set::{CompiledPattern, Cursor, CursorSet, InstanceDescriptor, Origin};
pub use workspace::{SecondarySelection, SelectionCycle};
