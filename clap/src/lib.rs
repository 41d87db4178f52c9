//! clap-backed argument engine for cfgschema.
//!
//! [`ClapEngine`] turns the group and argument declarations emitted by
//! [`cfgschema_core::register`] into a [`clap::Command`], and [`collect`]
//! reads clap's matches back into the flat value map the core constructs
//! from. Most callers only need the entry points:
//!
//! - [`parse_args`] for a single [`ConfigSchema`](cfgschema_core::ConfigSchema) type;
//! - [`parse_args_with_submodes`] for a top-level type plus one of several
//!   [`Submodes`];
//! - [`parse_dynamic`] and [`parse_dynamic_with_submodes`] for schemas built
//!   at runtime.
//!
//! Failures come back as [`cfgschema_core::Error`]. A usage error carries
//! clap's rendered message and can be turned into a process exit with
//! [`UsageError::exit`](cfgschema_core::UsageError::exit).

mod engine;
mod parse;
mod settings;

pub use engine::{ClapEngine, ScalarValueParser, collect, usage_error};
pub use parse::{
    Submodes, parse_args, parse_args_with_submodes, parse_dynamic, parse_dynamic_with_submodes,
};
pub use settings::ParserSettings;
