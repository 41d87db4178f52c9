mod document;
mod output;

use std::ffi::OsString;
use std::path::PathBuf;

use cfgschema_clap::{ClapEngine, ParserSettings, parse_dynamic, parse_dynamic_with_submodes};
use cfgschema_core::{
    ArgumentEngine, CompiledGroup, Error, Record, RegistrationPlan, compile, register,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::document::SchemaDocument;
use crate::output::{OutputFormat, render};

#[derive(Debug, Parser)]
#[command(name = "cfgschema")]
#[command(version, about = "Check, inspect and try out declarative config schemas")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compile a schema document and report any schema defects.
    Check(CheckArgs),
    /// Print the registration plan a schema document compiles to.
    Plan(PlanArgs),
    /// Parse arguments against a schema document and print the result.
    Parse(ParseArgs),
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Schema document (YAML, or JSON with a .json extension).
    #[arg(long)]
    schema: PathBuf,
}

#[derive(Debug, Args)]
struct PlanArgs {
    /// Schema document (YAML, or JSON with a .json extension).
    #[arg(long)]
    schema: PathBuf,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct ParseArgs {
    /// Schema document (YAML, or JSON with a .json extension).
    #[arg(long)]
    schema: PathBuf,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
    /// Program name shown in usage and error messages.
    #[arg(long)]
    prog: Option<String>,
    /// Arguments to parse, after `--`.
    #[arg(last = true, allow_hyphen_values = true)]
    argv: Vec<OsString>,
}

/// Parse result when the document declares submodes.
#[derive(Debug, Serialize)]
struct SubmodeOutput {
    config: Record,
    submode: String,
    options: Record,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Check(args) => run_check(args),
        Command::Plan(args) => run_plan(args),
        Command::Parse(args) => run_parse(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

fn run_check(args: CheckArgs) -> Result<(), String> {
    let document = SchemaDocument::load(&args.schema).map_err(|e| e.to_string())?;
    let (tree, submodes) = compile_document(&document)?;

    // Registering with clap catches identities only the engine reserves.
    let mut engine = ClapEngine::new(&ParserSettings::default());
    register(&tree, &mut engine).map_err(|e| e.to_string())?;
    for (name, about, submode) in &submodes {
        engine
            .declare_submode(name, about.as_deref(), submode)
            .map_err(|e| e.to_string())?;
    }
    let command = engine.finish();
    debug!(command = %command.get_name(), "Registered schema with clap");

    let arguments = tree.descriptors().len()
        + submodes
            .iter()
            .map(|(_, _, sub)| sub.descriptors().len())
            .sum::<usize>();
    if submodes.is_empty() {
        println!(
            "Schema '{}' is valid: {arguments} argument(s) in {} group(s).",
            document.name,
            tree.group_count()
        );
    } else {
        println!(
            "Schema '{}' is valid: {arguments} argument(s) in {} group(s), {} submode(s).",
            document.name,
            tree.group_count(),
            submodes.len()
        );
    }
    Ok(())
}

fn run_plan(args: PlanArgs) -> Result<(), String> {
    let document = SchemaDocument::load(&args.schema).map_err(|e| e.to_string())?;
    let (tree, submodes) = compile_document(&document)?;

    let mut plan = RegistrationPlan::of(&tree).map_err(|e| e.to_string())?;
    for (name, about, submode) in &submodes {
        plan.declare_submode(name, about.as_deref(), submode)
            .map_err(|e| e.to_string())?;
    }
    info!(steps = plan.steps.len(), "Built registration plan");
    println!("{}", render(&plan, args.format)?);
    Ok(())
}

fn run_parse(args: ParseArgs) -> Result<(), String> {
    let document = SchemaDocument::load(&args.schema).map_err(|e| e.to_string())?;
    let schema = document.to_schema().map_err(|e| e.to_string())?;
    let submodes = document.submode_schemas().map_err(|e| e.to_string())?;

    let mut settings = ParserSettings::new().with_prog(args.prog.unwrap_or(document.name.clone()));
    if let Some(about) = &document.about {
        settings = settings.with_about(about.clone());
    }

    let rendered = if submodes.is_empty() {
        let record = parse_dynamic(&schema, args.argv, &settings).map_err(exit_on_usage)?;
        render(&record, args.format)?
    } else {
        let (config, submode, options) =
            parse_dynamic_with_submodes(&schema, &submodes, args.argv, &settings)
                .map_err(exit_on_usage)?;
        render(
            &SubmodeOutput {
                config,
                submode,
                options,
            },
            args.format,
        )?
    };
    println!("{rendered}");
    Ok(())
}

type CompiledSubmodes = Vec<(String, Option<String>, CompiledGroup)>;

fn compile_document(document: &SchemaDocument) -> Result<(CompiledGroup, CompiledSubmodes), String> {
    let schema = document.to_schema().map_err(|e| e.to_string())?;
    let tree = compile(&schema).map_err(|e| e.to_string())?;
    let mut submodes: CompiledSubmodes = Vec::new();
    for (name, submode) in document.submode_schemas().map_err(|e| e.to_string())? {
        if submodes.iter().any(|(seen, _, _)| *seen == name) {
            return Err(format!("duplicate submode '{name}'"));
        }
        let compiled = compile(&submode).map_err(|e| e.to_string())?;
        submodes.push((name, submode.about.clone(), compiled));
    }
    Ok((tree, submodes))
}

/// Usage errors end the process the way a parser would; everything else is
/// reported as a schema defect.
fn exit_on_usage(err: Error) -> String {
    match err {
        Error::Usage(usage) => usage.exit(),
        Error::Schema(schema) => schema.to_string(),
    }
}
