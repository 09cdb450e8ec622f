use serde_json::json;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static TEMP_FILE_COUNTER: AtomicU64 = AtomicU64::new(0);

const PARTIAL_SCHEMA: &str = r#"
name: partial
schema:
  type: { segment: ST, value: 0 }
  first_ref: { segment: REF, value: 1 }
  policy: { segment: REF, qualifier_index: 0, qualifier_value: "38", value: 1 }
  missing: { segment: N1, value: 1 }
"#;

const TILDE_SCHEMA: &str = r#"
name: tilde
loops:
  - position: 0
    segments: [INS, REF]
schema:
  type: { segment: ST, value: 0 }
  members:
    loop: 0
    fields:
      id: { segment: REF, value: 1 }
"#;

fn cargo_bin() -> PathBuf {
    if let Ok(path) = env::var("CARGO_BIN_EXE_x12map") {
        return PathBuf::from(path);
    }

    let target_dir = env::var("CARGO_TARGET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| repo_root().join("target"));
    let executable_name = format!("x12map{}", std::env::consts::EXE_SUFFIX);
    let fallback = target_dir.join("debug").join(executable_name);

    if fallback.exists() {
        return fallback;
    }

    panic!(
        "CARGO_BIN_EXE_x12map is not set and fallback binary was not found at {}",
        fallback.display()
    );
}

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

fn testdata_path(path: &str) -> PathBuf {
    repo_root().join("testdata").join(path)
}

fn unique_temp_path(name: &str, extension: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time after epoch")
        .as_nanos();
    let counter = TEMP_FILE_COUNTER.fetch_add(1, Ordering::SeqCst);
    let filename = format!(
        "x12-cli-{name}-{}-{nanos}-{counter}.{extension}",
        std::process::id()
    );
    env::temp_dir().join(filename)
}

struct TempFile {
    path: PathBuf,
}

impl TempFile {
    fn create(name: &str, extension: &str, content: &str) -> Self {
        let path = unique_temp_path(name, extension);
        fs::write(&path, content).expect("temporary file should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn run_x12map(args: &[&str]) -> Output {
    Command::new(cargo_bin())
        .args(args)
        .output()
        .expect("x12map should execute")
}

fn assert_exit_code(output: &Output, expected: i32) {
    let actual = output.status.code().unwrap_or(-1);
    assert_eq!(
        actual,
        expected,
        "unexpected exit code; stdout: {}; stderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn stdout_json(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("stdout should contain valid JSON")
}

#[test]
fn map_command_projects_enrollment_document() {
    let input = testdata_path("834_enrollment.edi");
    let schema = testdata_path("benefit_enrollment.yaml");

    let output = run_x12map(&[
        "map",
        input.to_string_lossy().as_ref(),
        "--schema",
        schema.to_string_lossy().as_ref(),
    ]);

    assert_exit_code(&output, 0);
    assert_eq!(
        stdout_json(&output),
        json!({
            "transaction_type": "834",
            "control_number": "0001",
            "master_policy": "GROUP123",
            "parties": {
                "sponsor": "ACME CORPORATION",
                "payer": "BLUE HEALTH"
            },
            "members": [
                {
                    "subscriber_indicator": "Y",
                    "relationship": "18",
                    "subscriber_number": "SUB001",
                    "group_number": "GRP77",
                    "last_name": "SMITH",
                    "first_name": "JOHN"
                },
                {
                    "subscriber_indicator": "N",
                    "relationship": "19",
                    "subscriber_number": "SUB001",
                    "group_number": "GRP77",
                    "last_name": "SMITH",
                    "first_name": "JANE"
                }
            ]
        })
    );
}

#[test]
fn map_command_pretty_prints() {
    let input = testdata_path("834_enrollment.edi");
    let schema = TempFile::create(
        "pretty-schema",
        "json",
        r#"{"name": "type", "schema": {"type": {"segment": "ST", "value": 0}}}"#,
    );

    let output = run_x12map(&[
        "map",
        input.to_string_lossy().as_ref(),
        "-s",
        schema.path().to_string_lossy().as_ref(),
        "--pretty",
    ]);

    assert_exit_code(&output, 0);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\n  \"type\": \"834\""), "stdout: {stdout}");
}

#[test]
fn map_command_omits_unresolvable_keys() {
    let input = TempFile::create("partial", "edi", "ST*834*0001\nREF*0F*A\nREF*1L*B\n");
    let schema = TempFile::create(
        "partial-schema",
        "yaml",
        PARTIAL_SCHEMA,
    );
    let output = run_x12map(&[
        "map",
        input.path().to_string_lossy().as_ref(),
        "--schema",
        schema.path().to_string_lossy().as_ref(),
    ]);

    assert_exit_code(&output, 0);
    assert_eq!(stdout_json(&output), json!({"type": "834", "first_ref": "A"}));
}

#[test]
fn map_command_rejects_undeclared_loop() {
    let input = testdata_path("834_enrollment.edi");
    let schema = TempFile::create(
        "undeclared-loop",
        "yaml",
        "name: bad\nschema:\n  members: { loop: 4, fields: {} }\n",
    );

    let output = run_x12map(&[
        "map",
        input.to_string_lossy().as_ref(),
        "--schema",
        schema.path().to_string_lossy().as_ref(),
    ]);

    assert_exit_code(&output, 3);
    assert!(output.stdout.is_empty());
}

#[test]
fn map_command_rejects_half_specified_qualifier() {
    let input = testdata_path("834_enrollment.edi");
    let schema = TempFile::create(
        "half-qualifier",
        "yaml",
        "name: bad\nschema:\n  policy: { segment: REF, qualifier_index: 0, value: 1 }\n",
    );

    let output = run_x12map(&[
        "map",
        input.to_string_lossy().as_ref(),
        "--schema",
        schema.path().to_string_lossy().as_ref(),
    ]);

    assert_exit_code(&output, 3);
    assert!(String::from_utf8_lossy(&output.stderr).contains("ERROR:"));
}

#[test]
fn map_command_honours_config_delimiters() {
    let config = TempFile::create(
        "tilde-config",
        "yaml",
        "delimiters:\n  segment: \"~\"\n  element: \"|\"\n",
    );
    let input = TempFile::create("tilde", "edi", "ST|834|0001~INS|Y|18~REF|0F|ABC~");
    let schema = TempFile::create(
        "tilde-schema",
        "yaml",
        TILDE_SCHEMA,
    );

    let output = run_x12map(&[
        "--config",
        config.path().to_string_lossy().as_ref(),
        "map",
        input.path().to_string_lossy().as_ref(),
        "--schema",
        schema.path().to_string_lossy().as_ref(),
    ]);

    assert_exit_code(&output, 0);
    assert_eq!(
        stdout_json(&output),
        json!({"type": "834", "members": [{"id": "ABC"}]})
    );
}

#[test]
fn invalid_config_returns_config_exit_code() {
    let bad_config = TempFile::create("bad-config", "yaml", "color: neon");
    let input = testdata_path("834_enrollment.edi");

    let output = run_x12map(&[
        "--config",
        bad_config.path().to_string_lossy().as_ref(),
        "segments",
        input.to_string_lossy().as_ref(),
    ]);

    assert_exit_code(&output, 3);
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("ERROR:"),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn missing_input_returns_failure_exit_code() {
    let schema = testdata_path("benefit_enrollment.yaml");
    let missing = unique_temp_path("does-not-exist", "edi");

    let output = run_x12map(&[
        "map",
        missing.to_string_lossy().as_ref(),
        "--schema",
        schema.to_string_lossy().as_ref(),
    ]);

    assert_exit_code(&output, 1);
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to read"));
}
