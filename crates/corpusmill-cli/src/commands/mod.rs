//! CLI command implementations.

pub mod check;
pub mod inspect;

use std::path::{Path, PathBuf};

use corpusmill::CorpusSchema;
use corpusmill::schema::CONFIG_FILE;

/// Load the configuration of a corpus directory.
pub(crate) fn load_config(
    directory: &Path,
    config: Option<PathBuf>,
) -> Result<CorpusSchema, Box<dyn std::error::Error>> {
    let path = config.unwrap_or_else(|| directory.join(CONFIG_FILE));
    if !path.exists() {
        return Err(format!("Configuration file not found: {}", path.display()).into());
    }
    Ok(CorpusSchema::load(&path)?)
}
