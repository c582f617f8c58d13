pub mod run;
pub mod show;

use color_eyre::eyre::{Result, WrapErr};
use std::fs;
use std::path::Path;

/// Read a workflow document from disk
pub fn read_workflow(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read workflow file {}", path.display()))
}
