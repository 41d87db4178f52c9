//! Mutually exclusive group example.
//!
//! `--debug` and `--quiet` live in a nested group whose members exclude
//! each other; the selected one picks the tracing level.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p cfgschema-demos --example mutually_exclusive -- --debug
//! cargo run -p cfgschema-demos --example mutually_exclusive -- --debug --quiet
//! ```

use cfgschema_clap::{ParserSettings, parse_args};
use cfgschema_core::{
    ConfigSchema, Error, FieldDeclaration, Record, SchemaError, SchemaType, Validate,
};
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info};

struct LogLevel {
    debug: bool,
    quiet: bool,
}

impl LogLevel {
    fn level(&self) -> LevelFilter {
        if self.debug {
            LevelFilter::DEBUG
        } else if self.quiet {
            LevelFilter::ERROR
        } else {
            LevelFilter::INFO
        }
    }
}

impl ConfigSchema for LogLevel {
    fn schema() -> SchemaType {
        SchemaType::new("LogLevel")
            .with_about("Logging verbosity")
            .mutually_exclusive()
            .with_field(FieldDeclaration::flag("debug", "Enable debug logging"))
            .with_field(FieldDeclaration::flag("quiet", "Only output errors"))
    }

    fn from_record(mut record: Record) -> Result<Self, SchemaError> {
        Ok(Self {
            debug: record.take("debug")?,
            quiet: record.take("quiet")?,
        })
    }
}

struct Config {
    loglevel: LogLevel,
}

impl ConfigSchema for Config {
    fn schema() -> SchemaType {
        SchemaType::new("Config").with_field(FieldDeclaration::group::<LogLevel>("loglevel"))
    }

    fn from_record(mut record: Record) -> Result<Self, SchemaError> {
        Ok(Self {
            loglevel: record.take_group("loglevel")?,
        })
    }

    fn nested(&self) -> Vec<&dyn Validate> {
        vec![&self.loglevel]
    }
}

fn main() {
    let settings = ParserSettings::new().with_prog("mutually_exclusive");
    let config: Config = match parse_args(std::env::args_os().skip(1), &settings) {
        Ok(config) => config,
        Err(Error::Usage(usage)) => usage.exit(),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(config.loglevel.level())
        .init();
    debug!("Debug logging enabled");
    info!("Info logging enabled");
    error!("Error logging enabled");
}
