use std::fs;
use std::path::Path;

use anyhow::Context;
use bundler_engine::PipelineConfig;
use bundler_logging::bundler_info;

/// Read a RON config file, or fall back to defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config = ron::from_str(&content)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    bundler_info!("Loaded config from {:?}", path);
    Ok(config)
}
