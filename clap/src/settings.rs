//! Parser-level settings shared by every entry point.

use std::path::Path;

/// Program-level settings for a parse.
///
/// # Examples
///
/// ```
/// use cfgschema_clap::ParserSettings;
///
/// let settings = ParserSettings::new()
///     .with_prog("tool")
///     .with_version("1.2.0");
/// assert_eq!(settings.program_name(), "tool");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserSettings {
    /// Program name used in usage and error messages.
    pub prog: Option<String>,
    /// About text; the root schema's about text when unset.
    pub about: Option<String>,
    /// Enables `-V`/`--version` when set.
    pub version: Option<String>,
}

impl ParserSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prog(mut self, prog: impl Into<String>) -> Self {
        self.prog = Some(prog.into());
        self
    }

    pub fn with_about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// The `prog` override, else the file name of the running executable.
    pub fn program_name(&self) -> String {
        if let Some(prog) = &self.prog {
            return prog.clone();
        }
        std::env::args_os()
            .next()
            .as_deref()
            .and_then(|argv0| Path::new(argv0).file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "program".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_name_falls_back_to_executable() {
        let settings = ParserSettings::default();
        assert!(!settings.program_name().is_empty());
        assert_eq!(settings.with_prog("demo").program_name(), "demo");
    }
}
