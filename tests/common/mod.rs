//! Shared test infrastructure for integration tests.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Replays `$1/responses/NNN.txt` in order and saves each prompt to
/// `$1/prompts/NNN.txt`.
const MOCK_LM_SCRIPT: &str = r#"#!/bin/sh
state="$1"
n=$(cat "$state/counter" 2>/dev/null || echo 0)
n=$((n + 1))
echo "$n" > "$state/counter"
id=$(printf '%03d' "$n")
mkdir -p "$state/prompts"
cat > "$state/prompts/$id.txt"
if [ ! -f "$state/responses/$id.txt" ]; then
  echo "mock-lm: no response $id" >&2
  exit 1
fi
cat "$state/responses/$id.txt"
"#;

/// Temp directory holding a workspace, input files, and mock LM state.
pub struct TestFixture {
    dir: TempDir,
}

impl TestFixture {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn workspace(&self) -> PathBuf {
        self.dir.path().join("workspace")
    }

    fn mock_state(&self) -> PathBuf {
        self.dir.path().join("mock-lm")
    }

    /// Write a file relative to the fixture root.
    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directory");
        }
        fs::write(&path, contents).expect("write file");
        path
    }

    /// Install the mock LM with `responses` and return its command line.
    pub fn mock_lm(&self, responses: &[&str]) -> String {
        let state = self.mock_state();
        for (index, response) in responses.iter().enumerate() {
            let path = state.join("responses").join(format!("{:03}.txt", index + 1));
            fs::create_dir_all(path.parent().expect("responses dir")).expect("create responses");
            fs::write(&path, response).expect("write mock response");
        }
        let script = self.dir.path().join("mock-lm.sh");
        fs::write(&script, MOCK_LM_SCRIPT).expect("write mock script");
        format!(
            "sh {} {}",
            shell_words::quote(&script.display().to_string()),
            shell_words::quote(&state.display().to_string())
        )
    }

    /// Number of LM invocations seen by the mock.
    pub fn lm_calls(&self) -> usize {
        fs::read_to_string(self.mock_state().join("counter"))
            .ok()
            .and_then(|text| text.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Prompt received by the `n`th LM invocation (1-based).
    pub fn prompt(&self, n: usize) -> String {
        let path = self.mock_state().join("prompts").join(format!("{n:03}.txt"));
        fs::read_to_string(&path).unwrap_or_else(|_| panic!("read prompt {}", path.display()))
    }

    /// Run docsift with an isolated environment.
    pub fn docsift<I, S>(&self, args: I) -> Output
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        Command::new(env!("CARGO_BIN_EXE_docsift"))
            .args(args)
            .env_remove("DOCSIFT_LM_COMMAND")
            .env_remove("DOCSIFT_WORKSPACE")
            .env_remove("RUST_LOG")
            .output()
            .expect("run docsift")
    }
}

/// The mock LM needs a POSIX shell.
pub fn sh_available() -> bool {
    Path::new("/bin/sh").exists()
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}
