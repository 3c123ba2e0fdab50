/*!
 * # Editing Host
 *
 * The document the cursor core edits, and everything it needs to act on it.
 *
 * ## Architecture Overview
 *
 * ### 1. Single Source of Truth: xi-rope Buffer
 * - The entire document is stored in a single **`xi_rope::Rope`** buffer
 * - Edits are built as xi-rope **Deltas**; the selection mark is transformed
 *   through the same delta
 * - **Lossless round-trip**: saving writes rope bytes verbatim
 *
 * ### 2. Caret-Relative Operations
 * - All edits are **operations** (`EditOp` enum) applied at the caret
 * - Operations are plain serde values, so a recorded log can be stored and
 *   replayed verbatim anywhere in the document
 * - Applying an operation returns a **`Patch`** listing the splices it made,
 *   which is all a tracked position needs to follow the edit
 *
 * ### 3. Undo via Rope Snapshots
 * - Every change outside a transaction is one undo step
 * - A **transaction** collapses any number of changes into one undo step, or
 *   rolls all of them back at once
 *
 * ### 4. Syntactic Units
 * - `UnitKind` names the units (word, symbol, list, sexp, defun, number,
 *   sentence, line) and `units` holds one recognizer per kind
 *
 * ## Module Structure
 *
 * - **`document`**: `Document` with rope buffer, caret, selection, history
 * - **`commands`**: `EditOp` enum and its compilation against the caret
 * - **`history`**: undo/redo stacks and open transactions
 * - **`patch`**: edit result metadata (splices, caret, version)
 * - **`units`**: unit boundary recognizers
 *
 * ## Usage Pattern
 *
 * ```rust
 * use multiedit_engine::editing::*;
 *
 * let mut doc = Document::from_bytes(b"let x = 1;").unwrap();
 * doc.set_caret(4);
 *
 * let patch = doc.apply(&EditOp::DeleteByUnit {
 *     kind: UnitKind::Symbol,
 *     direction: Direction::Forward,
 * }).unwrap();
 * assert_eq!(patch.splices[0], Splice { start: 4, old_len: 1, new_len: 0 });
 *
 * doc.apply(&EditOp::insert("count")).unwrap();
 * assert_eq!(doc.text(), "let count = 1;");
 * ```
 */

pub mod commands;
pub mod document;
pub(crate) mod history;
pub mod patch;
pub mod units;

pub use commands::{Case, EditError, EditOp};
pub use document::Document;
pub use patch::{Patch, Splice};
pub use units::{Direction, UnitKind};
