use std::path::{Path, PathBuf};
use crate::config::PgphaseConfig;
use crate::error::Result;
use crate::output::OutputHandler;

#[derive(Debug)]
pub struct InitResult {
    pub sample_path: PathBuf,
}

/// Write `pgphase.toml.example` into `dir`
pub fn execute_init(dir: &Path, output: &dyn OutputHandler) -> Result<InitResult> {
    output.status("Generating", "sample configuration");
    let sample_path = PgphaseConfig::write_sample_config(dir)?;
    output.success(&format!(
        "Created {} - rename to pgphase.toml to use",
        sample_path.display()
    ));

    Ok(InitResult { sample_path })
}
