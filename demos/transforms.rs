//! Transform example.
//!
//! Field transforms reshape parsed values before they reach the typed
//! config: a list of tags is deduplicated into a set, a port is range
//! checked, and a nested group collapses into a single URL string.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p cfgschema-demos --example transforms -- --host example.org --port 8080 --tags a b a
//! ```

use std::collections::BTreeSet;

use cfgschema_clap::{ParserSettings, parse_args};
use cfgschema_core::{
    ConfigSchema, Error, FieldDeclaration, Record, ScalarType, SchemaError, SchemaType, Transform,
    Value, ValueShape,
};

struct Endpoint {
    host: String,
    port: i64,
}

impl ConfigSchema for Endpoint {
    fn schema() -> SchemaType {
        SchemaType::new("Endpoint")
            .with_about("Server endpoint")
            .with_field(
                FieldDeclaration::arg("host", ScalarType::String, "Server host name")
                    .default("localhost"),
            )
            .with_field(
                FieldDeclaration::arg("port", ScalarType::Integer, "Server port")
                    .default(80)
                    .transform(
                        ValueShape::Scalar(ScalarType::Integer),
                        Transform::try_map(|port: i64| {
                            if (1..=65535).contains(&port) {
                                Ok(port)
                            } else {
                                Err(format!("{port} is not a valid port"))
                            }
                        }),
                    ),
            )
    }

    fn from_record(mut record: Record) -> Result<Self, SchemaError> {
        Ok(Self {
            host: record.take("host")?,
            port: record.take("port")?,
        })
    }
}

struct Config {
    url: String,
    tags: BTreeSet<String>,
}

impl ConfigSchema for Config {
    fn schema() -> SchemaType {
        SchemaType::new("Config")
            .with_field(FieldDeclaration::group_with("endpoint", |e: Endpoint| {
                format!("http://{}:{}/", e.host, e.port)
            }))
            .with_field(
                FieldDeclaration::list("tags", ScalarType::String, "Tags to attach")
                    .default(Value::List(Vec::new()))
                    .transform(
                        ValueShape::List(ScalarType::String),
                        Transform::map(|tags: Vec<String>| {
                            let unique: BTreeSet<String> = tags.into_iter().collect();
                            Value::List(unique.into_iter().map(Value::from).collect())
                        }),
                    ),
            )
    }

    fn from_record(mut record: Record) -> Result<Self, SchemaError> {
        Ok(Self {
            url: record.take("endpoint")?,
            tags: record.take("tags")?,
        })
    }
}

fn main() {
    let settings = ParserSettings::new().with_prog("transforms");
    let config: Config = match parse_args(std::env::args_os().skip(1), &settings) {
        Ok(config) => config,
        Err(Error::Usage(usage)) => usage.exit(),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };
    println!("url: {}", config.url);
    let tags: Vec<&str> = config.tags.iter().map(String::as_str).collect();
    println!("tags: {}", tags.join(", "));
}
