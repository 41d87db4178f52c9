//! Validation example.
//!
//! Parses a single integer and rejects negative values after parsing,
//! reporting the failure the same way as any other usage error.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p cfgschema-demos --example validation -- --natural 5
//! cargo run -p cfgschema-demos --example validation -- --natural -1
//! ```

use cfgschema_clap::{ParserSettings, parse_args};
use cfgschema_core::{
    ConfigSchema, Error, FieldDeclaration, Record, ScalarType, SchemaError, SchemaType,
    ValidationFailure, Validator,
};

struct Config {
    natural: i64,
}

impl ConfigSchema for Config {
    fn schema() -> SchemaType {
        SchemaType::new("Config")
            .with_about("Example script using validation")
            .with_field(FieldDeclaration::arg(
                "natural",
                ScalarType::Integer,
                "A natural number",
            ))
    }

    fn from_record(mut record: Record) -> Result<Self, SchemaError> {
        Ok(Self {
            natural: record.take("natural")?,
        })
    }

    fn validators() -> Vec<Validator<Self>> {
        vec![Validator::new("natural", |config: &Config| {
            if config.natural < 0 {
                return Err(ValidationFailure::new("natural numbers must be >= 0"));
            }
            Ok(())
        })]
    }
}

fn main() {
    let settings = ParserSettings::new().with_prog("validation");
    let config: Config = match parse_args(std::env::args_os().skip(1), &settings) {
        Ok(config) => config,
        Err(Error::Usage(usage)) => usage.exit(),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };
    println!("validated natural number: {}", config.natural);
}
