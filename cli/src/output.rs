//! Output formatting for plans and parsed records.

use serde::Serialize;

/// Supported output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

/// Serializes `value` in the requested output format.
pub fn render<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        OutputFormat::Yaml => {
            serde_yaml::to_string(value).map_err(|e| format!("YAML serialization failed: {e}"))
        }
    }
}
