//! Build-time execution of `$$inline` thunks in a subprocess sandbox.
//!
//! Each call gets its own short-lived `node` child process: the extracted
//! CommonJS snippet is written to a temp file alongside a tiny harness that
//! prints `module.exports` as JSON, then executed with a wall-clock timeout.

use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::process::Stdio;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("failed to spawn the sandbox process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("sandbox exited with status {status}: {stderr}")]
    NonZeroExit { status: i32, stderr: String },
    #[error("sandbox execution exceeded its timeout")]
    Timeout,
    #[error("sandbox output was not valid JSON: {0}")]
    Json(#[source] serde_json::Error),
}

/// Executes `code` (a CommonJS snippet that assigns to `module.exports`) in
/// a `node` child process rooted at `working_dir`, returning the parsed
/// result of `module.exports`.
pub fn evaluate(code: &str, working_dir: &Path, node_binary: &Path, timeout: Duration) -> Result<Value, EvalError> {
    let script = format!("{code}\nprocess.stdout.write(JSON.stringify(module.exports));\n");

    let mut file = tempfile::Builder::new()
        .prefix("variantkit-inline-")
        .suffix(".cjs")
        .tempfile_in(working_dir)
        .map_err(EvalError::Spawn)?;
    file.write_all(script.as_bytes()).map_err(EvalError::Spawn)?;
    let script_path = file.path().to_path_buf();

    let mut child = Command::new(node_binary)
        .arg(&script_path)
        .current_dir(working_dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(EvalError::Spawn)?;

    let mut stdout_pipe = child.stdout.take().expect("child spawned with piped stdout");
    let mut stderr_pipe = child.stderr.take().expect("child spawned with piped stderr");
    let stdout_reader = thread::spawn(move || {
        let mut buf = String::new();
        let _ = stdout_pipe.read_to_string(&mut buf);
        buf
    });
    let stderr_reader = thread::spawn(move || {
        let mut buf = String::new();
        let _ = stderr_pipe.read_to_string(&mut buf);
        buf
    });

    let started = Instant::now();
    let status = loop {
        match child.try_wait().map_err(EvalError::Spawn)? {
            Some(status) => break status,
            None if started.elapsed() >= timeout => {
                let _ = child.kill();
                let _ = child.wait();
                tracing::warn!(path = %script_path.display(), "inline evaluation timed out");
                return Err(EvalError::Timeout);
            }
            None => thread::sleep(Duration::from_millis(20)),
        }
    };

    let stdout_text = stdout_reader.join().unwrap_or_default();
    let stderr_text = stderr_reader.join().unwrap_or_default();

    if !status.success() {
        return Err(EvalError::NonZeroExit { status: status.code().unwrap_or(-1), stderr: stderr_text });
    }

    serde_json::from_str(stdout_text.trim()).map_err(EvalError::Json)
}

/// Re-literalizes a JSON value as a syntactically valid JavaScript
/// expression. JSON's scalar/array/object grammar is already valid JS
/// expression syntax, so this is a straight serialization.
#[must_use]
pub fn value_to_js_literal(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "undefined".to_string())
}

fn node_on_path() -> Option<std::path::PathBuf> {
    Command::new("node").arg("--version").output().ok().filter(|o| o.status.success()).map(|_| "node".into())
}
