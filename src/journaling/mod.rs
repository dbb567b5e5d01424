pub mod autosave;

pub use autosave::{AutoSaveStatus, DraftAutosave};
