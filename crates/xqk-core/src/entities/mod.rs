//! Value types handed across the engine boundary.
//!
//! None of these hold a reference back to the engine. Records and reports are
//! rebuilt on every query; project entries are copies of registry state.

mod filesystem;
mod limits;
mod project;
mod record;
mod report;

pub use filesystem::{FilesystemInfo, QuotaAccounting};
pub use limits::QuotaLimits;
pub use project::ProjectEntry;
pub use record::QuotaRecord;
pub use report::QuotaReport;
