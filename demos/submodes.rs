//! Submode example.
//!
//! A top-level `--verbose` flag followed by exactly one of `fetch` or
//! `push`, each with its own options.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p cfgschema-demos --example submodes -- --verbose fetch https://example.org/a.tar
//! cargo run -p cfgschema-demos --example submodes -- push --dest /tmp/out --retries 3
//! ```

use std::path::PathBuf;

use cfgschema_clap::{ParserSettings, Submodes, parse_args_with_submodes};
use cfgschema_core::{
    ConfigSchema, Error, FieldDeclaration, Record, ScalarType, SchemaError, SchemaType,
    ValidationFailure, Validator,
};

struct Global {
    verbose: bool,
}

impl ConfigSchema for Global {
    fn schema() -> SchemaType {
        SchemaType::new("Global")
            .with_about("Move files around")
            .with_field(FieldDeclaration::flag("verbose", "Print progress").names(["-v", "--verbose"]))
    }

    fn from_record(mut record: Record) -> Result<Self, SchemaError> {
        Ok(Self {
            verbose: record.take("verbose")?,
        })
    }
}

struct Fetch {
    url: String,
}

impl ConfigSchema for Fetch {
    fn schema() -> SchemaType {
        SchemaType::new("Fetch")
            .with_about("Download a file")
            .with_field(FieldDeclaration::arg("url", ScalarType::String, "Source URL").positional())
    }

    fn from_record(mut record: Record) -> Result<Self, SchemaError> {
        Ok(Self {
            url: record.take("url")?,
        })
    }

    fn validators() -> Vec<Validator<Self>> {
        vec![Validator::new("scheme", |fetch: &Fetch| {
            if fetch.url.starts_with("http://") || fetch.url.starts_with("https://") {
                Ok(())
            } else {
                Err(ValidationFailure::new("url must start with http:// or https://"))
            }
        })]
    }
}

struct Push {
    dest: PathBuf,
    retries: i64,
}

impl ConfigSchema for Push {
    fn schema() -> SchemaType {
        SchemaType::new("Push")
            .with_about("Upload a file")
            .with_field(FieldDeclaration::arg("dest", ScalarType::Path, "Destination directory"))
            .with_field(
                FieldDeclaration::arg("retries", ScalarType::Integer, "Attempts before giving up")
                    .choices([1, 2, 3])
                    .default(1),
            )
    }

    fn from_record(mut record: Record) -> Result<Self, SchemaError> {
        Ok(Self {
            dest: record.take("dest")?,
            retries: record.take("retries")?,
        })
    }
}

enum Mode {
    Fetch(Fetch),
    Push(Push),
}

fn main() {
    let settings = ParserSettings::new()
        .with_prog("submodes")
        .with_version(env!("CARGO_PKG_VERSION"));
    let submodes = Submodes::new()
        .with("fetch", Mode::Fetch)
        .with("push", Mode::Push);

    let (global, mode): (Global, Mode) =
        match parse_args_with_submodes(std::env::args_os().skip(1), &submodes, &settings) {
            Ok(parsed) => parsed,
            Err(Error::Usage(usage)) => usage.exit(),
            Err(err) => {
                eprintln!("error: {err}");
                std::process::exit(1);
            }
        };

    match mode {
        Mode::Fetch(fetch) => {
            if global.verbose {
                println!("fetching over the network");
            }
            println!("fetch {}", fetch.url);
        }
        Mode::Push(push) => {
            if global.verbose {
                println!("up to {} attempt(s)", push.retries);
            }
            println!("push to {}", push.dest.display());
        }
    }
}
