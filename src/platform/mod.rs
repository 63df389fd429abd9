use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};
use thiserror::Error;
use wait_timeout::ChildExt;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone, Default)]
pub struct CommandRunOptions {
    pub env: Vec<(String, String)>,
    /// Written to the child's stdin, which is then closed. `None` attaches /dev/null.
    pub stdin: Option<String>,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to start {cmd}: {source}")]
    Spawn {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed while waiting for {cmd}: {source}")]
    Wait {
        cmd: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {timeout:?}: {cmd}")]
    Timeout { cmd: String, timeout: Duration },
}

pub fn run_command_with_options(
    cmd: &str,
    args: &[&str],
    timeout: Duration,
    options: &CommandRunOptions,
) -> Result<CommandOutput, RunError> {
    let mut command = Command::new(cmd);
    command
        .args(args)
        .stdin(if options.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    for (k, v) in &options.env {
        command.env(k, v);
    }

    let mut child = command.spawn().map_err(|source| RunError::Spawn {
        cmd: cmd.to_string(),
        source,
    })?;

    // Drain both pipes while the child runs so large result sets cannot block it.
    let stdout_reader = child.stdout.take().map(spawn_reader);
    let stderr_reader = child.stderr.take().map(spawn_reader);

    if let (Some(input), Some(mut stdin)) = (options.stdin.as_deref(), child.stdin.take()) {
        // A child that exits early closes the pipe; its exit status tells the story.
        let _ = stdin.write_all(input.as_bytes());
    }

    let status = match child.wait_timeout(timeout).map_err(|source| RunError::Wait {
        cmd: cmd.to_string(),
        source,
    })? {
        Some(status) => status,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(RunError::Timeout {
                cmd: cmd.to_string(),
                timeout,
            });
        }
    };

    Ok(CommandOutput {
        exit_code: status.code().unwrap_or(-1),
        stdout: join_reader(stdout_reader),
        stderr: join_reader(stderr_reader),
    })
}

fn spawn_reader<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_reader(handle: Option<thread::JoinHandle<String>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .unwrap_or_default()
}

pub fn home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("HOME is not set"))
}
