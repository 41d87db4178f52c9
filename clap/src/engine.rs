//! [`ArgumentEngine`] implementation on top of clap's builder API.

use std::ffi::OsStr;
use std::path::PathBuf;

use cfgschema_core::{
    ArgumentDescriptor, ArgumentEngine, ArgumentKind, CompiledGroup, GroupDeclaration,
    Multiplicity, ParsedValues, ScalarType, SchemaError, TogglePolarity, UsageError, UsageKind,
    Value,
};
use clap::builder::{PossibleValue, TypedValueParser};
use clap::error::ErrorKind;
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgGroup, ArgMatches, Command};
use tracing::debug;

use crate::settings::ParserSettings;

const HELP_IDENTITIES: [&str; 2] = ["-h", "--help"];
const VERSION_IDENTITIES: [&str; 2] = ["-V", "--version"];

/// Builds a [`Command`] from group and argument declarations.
///
/// # Examples
///
/// ```
/// use cfgschema_clap::{ClapEngine, ParserSettings};
/// use cfgschema_core::*;
///
/// let schema = SchemaType::new("Config")
///     .with_field(FieldDeclaration::arg("natural", ScalarType::Integer, "A natural number"));
/// let tree = compile(&schema).unwrap();
///
/// let mut engine = ClapEngine::new(&ParserSettings::new().with_prog("demo"));
/// register(&tree, &mut engine).unwrap();
/// let command = engine.finish();
/// assert_eq!(command.get_name(), "demo");
/// assert!(command.get_arguments().any(|a| a.get_id() == "natural"));
/// ```
#[derive(Debug)]
pub struct ClapEngine {
    command: Command,
    reserved: Vec<&'static str>,
    exclusive: Vec<ExclusiveGroup>,
}

#[derive(Debug)]
struct ExclusiveGroup {
    id: String,
    members: Vec<String>,
}

impl ClapEngine {
    pub fn new(settings: &ParserSettings) -> Self {
        let mut command = Command::new(settings.program_name())
            .no_binary_name(true)
            .disable_help_subcommand(true)
            .args_override_self(true);
        let mut reserved = HELP_IDENTITIES.to_vec();
        if let Some(about) = &settings.about {
            command = command.about(about.clone());
        }
        if let Some(version) = &settings.version {
            command = command.version(version.clone());
            reserved.extend(VERSION_IDENTITIES);
        }
        Self {
            command,
            reserved,
            exclusive: Vec::new(),
        }
    }

    fn submode(name: &str, about: Option<&str>) -> Self {
        let mut command = Command::new(name.to_string()).args_override_self(true);
        if let Some(about) = about {
            command = command.about(about.to_string());
        }
        Self {
            command,
            reserved: HELP_IDENTITIES.to_vec(),
            exclusive: Vec::new(),
        }
    }

    /// Requires a subcommand to be selected. A submode name always selects
    /// the submode, even where a multi-valued argument could take it.
    pub fn require_submode(mut self) -> Self {
        self.command = self
            .command
            .subcommand_required(true)
            .subcommand_precedence_over_arg(true);
        self
    }

    /// Consumes the engine, attaching the exclusive argument groups.
    pub fn finish(self) -> Command {
        let mut command = self.command;
        for group in self.exclusive {
            if group.members.is_empty() {
                continue;
            }
            command = command.group(
                ArgGroup::new(format!("group:{}", group.id))
                    .args(group.members)
                    .multiple(false),
            );
        }
        command
    }

    /// Flag spellings and argument ids clap claims for help and version.
    fn check_reserved(&self, argument: &ArgumentDescriptor) -> Result<(), SchemaError> {
        let is_reserved = |identity: &str| self.reserved.iter().any(|r| *r == identity);
        let reserved_id = format!("--{}", argument.dest);
        let clash = argument
            .flag_names()
            .into_iter()
            .find(|name| is_reserved(name))
            .or_else(|| is_reserved(&reserved_id).then_some(reserved_id));
        match clash {
            Some(identity) => Err(SchemaError::ReservedIdentity {
                field: argument.dest.clone(),
                identity,
            }),
            None => Ok(()),
        }
    }
}

impl ArgumentEngine for ClapEngine {
    fn declare_group(&mut self, group: &GroupDeclaration) -> Result<(), SchemaError> {
        if group.is_root() && self.command.get_about().is_none() && group.title != group.id {
            self.command = std::mem::take(&mut self.command).about(group.title.clone());
        }
        if group.exclusive {
            self.exclusive.push(ExclusiveGroup {
                id: group.id.clone(),
                members: Vec::new(),
            });
        }
        Ok(())
    }

    fn declare_argument(
        &mut self,
        group: &GroupDeclaration,
        argument: &ArgumentDescriptor,
    ) -> Result<(), SchemaError> {
        self.check_reserved(argument)?;
        debug!(group = %group.id, argument = %argument.dest, kind = ?argument.kind, "Declaring argument");

        if group.exclusive {
            if let Some(exclusive) = self.exclusive.iter_mut().find(|g| g.id == group.id) {
                exclusive.members.push(argument.dest.clone());
            }
        }
        let arg = build_arg(group, argument);
        self.command = std::mem::take(&mut self.command).arg(arg);
        Ok(())
    }

    fn declare_submode(
        &mut self,
        name: &str,
        about: Option<&str>,
        tree: &CompiledGroup,
    ) -> Result<(), SchemaError> {
        let mut engine = Self::submode(name, about);
        cfgschema_core::register(tree, &mut engine)?;
        self.command = std::mem::take(&mut self.command).subcommand(engine.finish());
        Ok(())
    }
}

fn build_arg(group: &GroupDeclaration, argument: &ArgumentDescriptor) -> Arg {
    let mut arg = Arg::new(argument.dest.clone())
        .help(argument.help.clone())
        .required(argument.required);

    if !group.is_root() {
        arg = arg.help_heading(group.title.clone());
    }

    if !argument.positional {
        let (longs, shorts): (Vec<String>, Vec<String>) = argument
            .flag_names()
            .into_iter()
            .partition(|name| name.starts_with("--"));
        let mut longs = longs.into_iter().map(|name| name[2..].to_string());
        if let Some(long) = longs.next() {
            arg = arg.long(long);
        }
        for alias in longs {
            arg = arg.visible_alias(alias);
        }
        let mut shorts = shorts.into_iter().filter_map(|name| name.chars().nth(1));
        if let Some(short) = shorts.next() {
            arg = arg.short(short);
        }
        for alias in shorts {
            arg = arg.visible_short_alias(alias);
        }
    }

    if let Some(polarity) = argument.toggle {
        return arg.action(match polarity {
            TogglePolarity::BecomesTrue => ArgAction::SetTrue,
            TogglePolarity::BecomesFalse => ArgAction::SetFalse,
        });
    }

    let scalar = argument.converter.unwrap_or(ScalarType::String);
    arg = arg
        .value_name(argument.value_name())
        .value_parser(ScalarValueParser::new(scalar, argument.choices.clone()));
    if matches!(scalar, ScalarType::Integer | ScalarType::Float) {
        arg = arg.allow_negative_numbers(true);
    }

    // Repeated occurrences replace earlier ones, lists included.
    let arg = arg.action(ArgAction::Set);
    match argument.multiplicity {
        Multiplicity::Single => arg,
        Multiplicity::OneOrMore => arg.num_args(1..),
        Multiplicity::ZeroOrMore => arg.num_args(0..),
    }
}

/// Value parser converting tokens with a [`ScalarType`] and enforcing an
/// optional choice set.
#[derive(Debug, Clone)]
pub struct ScalarValueParser {
    scalar: ScalarType,
    choices: Option<Vec<Value>>,
}

impl ScalarValueParser {
    pub fn new(scalar: ScalarType, choices: Option<Vec<Value>>) -> Self {
        Self { scalar, choices }
    }
}

impl TypedValueParser for ScalarValueParser {
    type Value = Value;

    fn parse_ref(
        &self,
        cmd: &Command,
        arg: Option<&Arg>,
        value: &OsStr,
    ) -> Result<Self::Value, clap::Error> {
        let arg_name = arg.map_or_else(|| "...".to_string(), ToString::to_string);
        let parsed = if self.scalar == ScalarType::Path {
            Value::Path(PathBuf::from(value))
        } else {
            let token = value
                .to_str()
                .ok_or_else(|| clap::Error::new(ErrorKind::InvalidUtf8).with_cmd(cmd))?;
            self.scalar.convert(token).map_err(|message| {
                clap::Error::raw(
                    ErrorKind::ValueValidation,
                    format!("invalid value '{token}' for '{arg_name}': {message}\n"),
                )
                .with_cmd(cmd)
            })?
        };

        if let Some(choices) = &self.choices {
            if !choices.contains(&parsed) {
                let possible = choices
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(clap::Error::raw(
                    ErrorKind::InvalidValue,
                    format!(
                        "invalid value '{}' for '{arg_name}'\n  [possible values: {possible}]\n",
                        value.to_string_lossy()
                    ),
                )
                .with_cmd(cmd));
            }
        }
        Ok(parsed)
    }

    fn possible_values(&self) -> Option<Box<dyn Iterator<Item = PossibleValue> + '_>> {
        let choices = self.choices.as_ref()?;
        Some(Box::new(
            choices.iter().map(|choice| PossibleValue::new(choice.to_string())),
        ))
    }
}

/// Reads the values of `tree` back out of `matches`.
///
/// Only values supplied on the command line are reported; toggles are
/// always reported.
pub fn collect(tree: &CompiledGroup, matches: &ArgMatches) -> Result<ParsedValues, SchemaError> {
    let mut values = ParsedValues::new();
    for argument in tree.descriptors() {
        let id = argument.dest.as_str();
        if argument.kind == ArgumentKind::Toggle {
            if let Some(flag) = matches.try_get_one::<bool>(id).map_err(engine_error)? {
                values.insert(id, Value::Bool(*flag));
            }
            continue;
        }
        if matches.value_source(id) != Some(ValueSource::CommandLine) {
            continue;
        }
        let value = match argument.multiplicity {
            Multiplicity::Single => match matches.try_get_one::<Value>(id).map_err(engine_error)? {
                Some(value) => value.clone(),
                None => continue,
            },
            Multiplicity::OneOrMore | Multiplicity::ZeroOrMore => Value::List(
                matches
                    .try_get_many::<Value>(id)
                    .map_err(engine_error)?
                    .map(|items| items.cloned().collect())
                    .unwrap_or_default(),
            ),
        };
        values.insert(id, value);
    }
    debug!(schema = %tree.schema, values = values.len(), "Collected parsed values");
    Ok(values)
}

fn engine_error(err: clap::parser::MatchesError) -> SchemaError {
    SchemaError::Engine(err.to_string())
}

/// Converts a clap error into a usage error carrying its rendered message.
pub fn usage_error(err: &clap::Error) -> UsageError {
    let kind = match err.kind() {
        ErrorKind::DisplayHelp => UsageKind::Help,
        ErrorKind::DisplayVersion => UsageKind::Version,
        ErrorKind::MissingSubcommand => UsageKind::MissingSubmode,
        _ => UsageKind::InvalidInput,
    };
    UsageError::new(kind, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cfgschema_core::{FieldDeclaration, SchemaType, compile, register};

    fn command_for(schema: &SchemaType, settings: &ParserSettings) -> Result<Command, SchemaError> {
        let tree = compile(schema)?;
        let mut engine = ClapEngine::new(settings);
        register(&tree, &mut engine)?;
        Ok(engine.finish())
    }

    #[test]
    fn test_alt_names_become_short_and_aliases() {
        let schema = SchemaType::new("Config").with_field(
            FieldDeclaration::arg("strfield", ScalarType::String, "s")
                .names(["-c", "--custom-name", "--other"]),
        );
        let command = command_for(&schema, &ParserSettings::default()).unwrap();
        let arg = command.get_arguments().find(|a| a.get_id() == "strfield").unwrap();
        assert_eq!(arg.get_short(), Some('c'));
        assert_eq!(arg.get_long(), Some("custom-name"));
        assert_eq!(arg.get_visible_aliases(), Some(vec!["other"]));
    }

    #[test]
    fn test_reserved_identities_are_rejected() {
        let schema = SchemaType::new("Config")
            .with_field(FieldDeclaration::flag("help", "Clashes with the help flag"));
        assert_eq!(
            command_for(&schema, &ParserSettings::default()).unwrap_err(),
            SchemaError::ReservedIdentity {
                field: "help".into(),
                identity: "--help".into(),
            }
        );

        let schema = SchemaType::new("Config")
            .with_field(FieldDeclaration::flag("verbose", "Verbose").names(["-V"]));
        assert!(command_for(&schema, &ParserSettings::default()).is_ok());
        assert!(matches!(
            command_for(&schema, &ParserSettings::new().with_version("1.0")),
            Err(SchemaError::ReservedIdentity { .. })
        ));
    }

    #[test]
    fn test_only_exclusive_groups_become_arg_groups() {
        let inner = SchemaType::new("LogLevel")
            .mutually_exclusive()
            .with_field(FieldDeclaration::flag("debug", "d"))
            .with_field(FieldDeclaration::flag("quiet", "q"));
        let schema = SchemaType::new("Config")
            .with_field(FieldDeclaration::flag("dry_run", "n"))
            .with_field(FieldDeclaration::new(
                "loglevel",
                cfgschema_core::ValueShape::Group(inner.into()),
                "",
            ));
        let command = command_for(&schema, &ParserSettings::default()).unwrap();
        let groups: Vec<_> = command.get_groups().map(|g| g.get_id().as_str().to_string()).collect();
        assert_eq!(groups, vec!["group:loglevel"]);
    }

    #[test]
    fn test_scalar_parser_enforces_choices() {
        let parser = ScalarValueParser::new(
            ScalarType::Integer,
            Some(vec![Value::Int(1), Value::Int(2)]),
        );
        let cmd = Command::new("test");
        assert_eq!(
            parser.parse_ref(&cmd, None, OsStr::new("2")).unwrap(),
            Value::Int(2)
        );
        let err = parser.parse_ref(&cmd, None, OsStr::new("3")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
        let err = parser.parse_ref(&cmd, None, OsStr::new("two")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);

        let names: Vec<_> = parser
            .possible_values()
            .unwrap()
            .map(|p| p.get_name().to_string())
            .collect();
        assert_eq!(names, vec!["1", "2"]);
    }
}
