use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use tempfile::TempDir;

const CONFIG_YAML: &str = r#"name: Config
about: Example tool
fields:
  - name: natural
    type: int
    help: A natural number
  - name: name
    type: optional[str]
    help: An optional name
  - name: loglevel
    exclusive: true
    group:
      name: LogLevel
      about: Logging verbosity
      fields:
        - { name: debug, type: bool, help: Enable debug logging }
        - { name: quiet, type: bool, help: Only output errors }
"#;

const SUBMODES_YAML: &str = r#"name: Top
fields:
  - { name: debug, type: bool, help: Enable debug mode }
submodes:
  - name: a
    about: First mode
    fields:
      - { name: anum, type: int, help: A number }
  - name: b
    about: Second mode
    fields:
      - { name: bnum, type: float, help: Another number }
"#;

fn write_schema(dir: &TempDir, file: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(file);
    fs::write(&path, contents).expect("failed to write schema document");
    path
}

fn cfgschema(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_cfgschema"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run cfgschema")
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

#[test]
fn check_reports_valid_schema() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir, "config.yaml", CONFIG_YAML);

    let output = cfgschema(&["check", "--schema", schema.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Schema 'Config' is valid: 4 argument(s) in 2 group(s)."),
        "unexpected output: {stdout}"
    );
}

#[test]
fn check_counts_submodes() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir, "top.yaml", SUBMODES_YAML);

    let output = cfgschema(&["check", "--schema", schema.to_str().unwrap()]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("3 argument(s) in 1 group(s), 2 submode(s)."));
}

#[test]
fn check_rejects_duplicate_flag_spellings() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(
        &dir,
        "dup.yaml",
        r#"name: Dup
fields:
  - { name: first, type: str, names: ["-x", "--first"] }
  - { name: second, type: str, names: ["-x"] }
"#,
    );

    let output = cfgschema(&["check", "--schema", schema.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("duplicate argument '-x'"), "stderr: {stderr}");
}

#[test]
fn check_rejects_reserved_help_flag() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(
        &dir,
        "help.yaml",
        "name: H\nfields:\n  - { name: help, type: str }\n",
    );

    let output = cfgschema(&["check", "--schema", schema.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("reserved"));
}

#[test]
fn check_reports_unreadable_document() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.yaml");

    let output = cfgschema(&["check", "--schema", missing.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read"));
}

// ---------------------------------------------------------------------------
// plan
// ---------------------------------------------------------------------------

#[test]
fn plan_lists_groups_before_their_arguments() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir, "config.yaml", CONFIG_YAML);

    let output = cfgschema(&["plan", "--schema", schema.to_str().unwrap()]);
    assert!(output.status.success());
    let plan = stdout_json(&output);
    let steps = plan["steps"].as_array().unwrap();

    let summary: Vec<(String, String)> = steps
        .iter()
        .map(|step| {
            let kind = step["step"].as_str().unwrap().to_string();
            let id = match kind.as_str() {
                "group" => step["id"].as_str().unwrap().to_string(),
                _ => step["argument"]["dest"].as_str().unwrap().to_string(),
            };
            (kind, id)
        })
        .collect();
    let expected = [
        ("group", "Config"),
        ("argument", "natural"),
        ("argument", "name"),
        ("group", "loglevel"),
        ("argument", "loglevel.debug"),
        ("argument", "loglevel.quiet"),
    ];
    assert_eq!(
        summary,
        expected
            .iter()
            .map(|(k, id)| (k.to_string(), id.to_string()))
            .collect::<Vec<_>>()
    );
    assert_eq!(steps[3]["exclusive"], true);
    assert_eq!(steps[3]["parent"], "Config");
}

#[test]
fn plan_as_yaml_includes_submodes() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir, "top.yaml", SUBMODES_YAML);

    let output = cfgschema(&[
        "plan",
        "--schema",
        schema.to_str().unwrap(),
        "--format",
        "yaml",
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("step: submode"));
    assert!(stdout.contains("name: a"));
    assert!(stdout.contains("dest: bnum"));
}

// ---------------------------------------------------------------------------
// parse
// ---------------------------------------------------------------------------

#[test]
fn parse_prints_nested_record() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir, "config.yaml", CONFIG_YAML);

    let output = cfgschema(&[
        "parse",
        "--schema",
        schema.to_str().unwrap(),
        "--",
        "--natural",
        "5",
        "--debug",
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let record = stdout_json(&output);
    assert_eq!(record["natural"], 5);
    assert!(record["name"].is_null());
    assert_eq!(record["loglevel"]["debug"], true);
    assert_eq!(record["loglevel"]["quiet"], false);
}

#[test]
fn parse_accepts_json_documents() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(
        &dir,
        "config.json",
        r#"{
            "name": "Config",
            "fields": [
                {"name": "inputs", "type": "list[path]", "positional": true},
                {"name": "ratio", "type": "float", "default": 0.5}
            ]
        }"#,
    );

    let output = cfgschema(&[
        "parse",
        "--schema",
        schema.to_str().unwrap(),
        "--",
        "a.txt",
        "b.txt",
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let record = stdout_json(&output);
    assert_eq!(record["inputs"], serde_json::json!(["a.txt", "b.txt"]));
    assert_eq!(record["ratio"], 0.5);
}

#[test]
fn parse_missing_required_argument_exits_with_usage_status() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir, "config.yaml", CONFIG_YAML);

    let output = cfgschema(&["parse", "--schema", schema.to_str().unwrap(), "--", "--debug"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--natural"), "stderr: {stderr}");
}

#[test]
fn parse_rejects_conflicting_exclusive_flags() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir, "config.yaml", CONFIG_YAML);

    let output = cfgschema(&[
        "parse",
        "--schema",
        schema.to_str().unwrap(),
        "--",
        "--natural",
        "1",
        "--debug",
        "--quiet",
    ]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot be used with"));
}

#[test]
fn parse_help_uses_prog_and_exits_cleanly() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir, "config.yaml", CONFIG_YAML);

    let output = cfgschema(&[
        "parse",
        "--schema",
        schema.to_str().unwrap(),
        "--prog",
        "mytool",
        "--",
        "--help",
    ]);
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage: mytool"), "stdout: {stdout}");
    assert!(stdout.contains("Logging verbosity"));
    assert!(stdout.contains("--natural <NATURAL>"));
}

#[test]
fn parse_selects_submode() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir, "top.yaml", SUBMODES_YAML);

    let output = cfgschema(&[
        "parse",
        "--schema",
        schema.to_str().unwrap(),
        "--",
        "--debug",
        "b",
        "--bnum",
        "2.5",
    ]);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let parsed = stdout_json(&output);
    assert_eq!(parsed["config"]["debug"], true);
    assert_eq!(parsed["submode"], "b");
    assert_eq!(parsed["options"]["bnum"], 2.5);
}

#[test]
fn parse_without_submode_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    let schema = write_schema(&dir, "top.yaml", SUBMODES_YAML);

    let output = cfgschema(&["parse", "--schema", schema.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
}
