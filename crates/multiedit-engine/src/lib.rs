pub mod cursors;
pub mod editing;
pub mod io;
pub mod settings;

// Re-export key types for easier usage
pub use cursors::*;
pub use editing::{Case, Direction, Document, EditError, EditOp, Patch, Splice, UnitKind};
pub use io::*;
pub use settings::*;
