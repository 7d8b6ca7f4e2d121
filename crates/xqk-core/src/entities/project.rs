use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A registered project: numeric id, unique name, and the directory tree it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub id: u32,
    pub name: String,
    pub path: PathBuf,
}
