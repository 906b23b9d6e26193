//! # Command Executors
//!
//! Where a text-modality command goes once it has been normalized.
//!
//! - `EngineExecutor` feeds it to a per-playthrough `GameEngine`.
//! - `ShellExecutor` runs it with `bash -c` inside a directory-tree version of
//!   the station, tracking the working directory itself so `cd` persists
//!   between turns. Every command has a hard wall-clock timeout; expiry
//!   yields a fixed narrative, never an error.

use crate::prompts;
use epsilon_error::{Error, Result};
use epsilon_game::{GameEngine, World};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

pub const TIMEOUT_NARRATIVE: &str = "ERROR: Command timed out.";

/// A backend that turns one command string into narrative text
#[allow(async_fn_in_trait)]
pub trait CommandExecutor {
    /// Short label used in logs and result records
    fn name(&self) -> &str;

    fn system_prompt(&self) -> &str;

    /// Opening narrative shown to the agent before its first turn
    fn start(&mut self) -> Result<String>;

    /// Execute one command. Failures come back as narrative.
    async fn execute(&mut self, command: &str) -> String;

    fn is_won(&self) -> bool;
}

// ============================================================================
// Engine
// ============================================================================

pub struct EngineExecutor {
    engine: GameEngine,
}

impl EngineExecutor {
    pub fn new(world: Arc<World>) -> Self {
        Self {
            engine: GameEngine::new(world),
        }
    }

    pub fn engine(&self) -> &GameEngine {
        &self.engine
    }
}

impl CommandExecutor for EngineExecutor {
    fn name(&self) -> &str {
        "engine"
    }

    fn system_prompt(&self) -> &str {
        prompts::ENGINE_SYSTEM_PROMPT
    }

    fn start(&mut self) -> Result<String> {
        Ok(self.engine.describe())
    }

    async fn execute(&mut self, command: &str) -> String {
        self.engine.execute(command)
    }

    fn is_won(&self) -> bool {
        self.engine.is_won()
    }
}

// ============================================================================
// Shell
// ============================================================================

pub struct ShellExecutor {
    station_dir: PathBuf,
    cwd: PathBuf,
    timeout: Duration,
}

impl ShellExecutor {
    /// `station_dir` must contain the `airlock` directory; its `START` file is read by `start`
    pub fn new(station_dir: impl AsRef<Path>) -> Result<Self> {
        let station_dir = std::fs::canonicalize(station_dir.as_ref()).map_err(|e| {
            Error::from(e)
                .with_operation("shell::new")
                .with_context("station_dir", station_dir.as_ref().display().to_string())
        })?;

        let cwd = station_dir.join("airlock");
        if !cwd.is_dir() {
            return Err(Error::room_not_found("airlock")
                .with_operation("shell::new")
                .with_context("station_dir", station_dir.display().to_string()));
        }

        Ok(Self {
            station_dir,
            cwd,
            timeout: DEFAULT_COMMAND_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Run the station's sibling `reset.sh`, if there is one
    pub async fn reset(&self) -> Result<()> {
        let script = match self.station_dir.parent() {
            Some(parent) => parent.join("reset.sh"),
            None => return Ok(()),
        };
        if !script.is_file() {
            return Ok(());
        }

        let status = Command::new("bash")
            .arg(&script)
            .status()
            .await
            .map_err(|e| Error::from(e).with_operation("shell::reset"))?;

        if !status.success() {
            return Err(Error::command_failed(
                script.display().to_string(),
                format!("reset script exited with {}", status),
            )
            .with_operation("shell::reset"));
        }
        Ok(())
    }

    fn change_dir(&mut self, target: &str) -> String {
        match std::fs::canonicalize(self.cwd.join(target)) {
            Ok(path) if path.is_dir() => {
                self.cwd = path;
                String::new()
            }
            _ => format!("bash: cd: {}: No such file or directory", target),
        }
    }

    async fn run(&self, command: &str) -> String {
        let child = Command::new("bash")
            .arg("-c")
            .arg(command)
            .current_dir(&self.cwd)
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.timeout, child).await {
            Ok(Ok(output)) => {
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                text.push_str(&String::from_utf8_lossy(&output.stderr));
                text.trim().to_string()
            }
            Ok(Err(e)) => {
                let err = Error::from(e)
                    .with_operation("shell::execute")
                    .with_context("command", command);
                tracing::warn!(error = %err, "command failed to start");
                format!("ERROR: {}", err.message())
            }
            Err(_) => {
                let err = Error::command_timeout(command, self.timeout.as_secs())
                    .with_operation("shell::execute");
                tracing::warn!(error = %err, "command timed out");
                TIMEOUT_NARRATIVE.to_string()
            }
        }
    }
}

impl CommandExecutor for ShellExecutor {
    fn name(&self) -> &str {
        "shell"
    }

    fn system_prompt(&self) -> &str {
        prompts::SHELL_SYSTEM_PROMPT
    }

    fn start(&mut self) -> Result<String> {
        let path = self.station_dir.join("START");
        std::fs::read_to_string(&path).map_err(|e| {
            Error::from(e)
                .with_operation("shell::start")
                .with_context("path", path.display().to_string())
        })
    }

    async fn execute(&mut self, command: &str) -> String {
        let command = command.trim();
        if command.is_empty() {
            return String::new();
        }

        match command.strip_prefix("cd ") {
            Some(target) => self.change_dir(target.trim()),
            None => self.run(command).await,
        }
    }

    fn is_won(&self) -> bool {
        self.station_dir.join(".win").exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn station() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(root.join("START"), "You wake up in the airlock.").unwrap();
        fs::create_dir_all(root.join("airlock")).unwrap();
        fs::create_dir_all(root.join("corridor")).unwrap();
        fs::write(root.join("airlock/README"), "Airlock. Exit: north.").unwrap();
        fs::write(root.join("corridor/README"), "Corridor.").unwrap();
        #[cfg(unix)]
        std::os::unix::fs::symlink(root.join("corridor"), root.join("airlock/north")).unwrap();
        dir
    }

    #[test]
    fn test_engine_executor_plays_the_station() {
        let world = Arc::new(World::station().unwrap());
        let mut exec = EngineExecutor::new(world);

        let opening = exec.start().unwrap();
        assert!(opening.contains("airlock"));
        assert_eq!(exec.engine().moves(), 0);

        let out = tokio_test::block_on(exec.execute("go north"));
        assert!(out.starts_with("You enter the Corridor."));
        assert!(!exec.is_won());
    }

    #[tokio::test]
    async fn test_shell_start_and_cd_tracking() {
        let dir = station();
        let mut exec = ShellExecutor::new(dir.path()).unwrap();

        assert_eq!(exec.start().unwrap(), "You wake up in the airlock.");
        assert_eq!(exec.execute("cat README").await, "Airlock. Exit: north.");

        assert_eq!(exec.execute("cd north").await, "");
        assert!(exec.cwd().ends_with("corridor"));
        assert_eq!(exec.execute("cat README").await, "Corridor.");

        let out = exec.execute("cd nowhere").await;
        assert_eq!(out, "bash: cd: nowhere: No such file or directory");
        assert!(exec.cwd().ends_with("corridor"));
    }

    #[tokio::test]
    async fn test_shell_stderr_is_included() {
        let dir = station();
        let mut exec = ShellExecutor::new(dir.path()).unwrap();
        let out = exec.execute("echo out; echo err >&2").await;
        assert_eq!(out, "out\nerr");
    }

    #[tokio::test]
    async fn test_shell_timeout_returns_narrative() {
        let dir = station();
        let mut exec = ShellExecutor::new(dir.path())
            .unwrap()
            .with_timeout(Duration::from_millis(100));
        assert_eq!(exec.execute("sleep 5").await, TIMEOUT_NARRATIVE);
    }

    #[tokio::test]
    async fn test_shell_win_marker() {
        let dir = station();
        let mut exec = ShellExecutor::new(dir.path()).unwrap();
        assert!(!exec.is_won());
        exec.execute("touch ../.win").await;
        assert!(exec.is_won());
    }

    #[test]
    fn test_shell_requires_start_room() {
        let dir = TempDir::new().unwrap();
        assert!(ShellExecutor::new(dir.path()).is_err());
        assert!(ShellExecutor::new(dir.path().join("missing")).is_err());
    }
}
