// abc-core/src/infrastructure/exec.rs
//
// External process execution with captured output and a default timeout,
// plus the unified-diff wrapper around the host `diff`.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::AbcError;
use crate::infrastructure::error::InfrastructureError;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub struct CmdResult {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Runs a command, draining stdout/stderr on side threads so a chatty
/// child cannot deadlock the poll loop. The child is killed on timeout.
pub fn run(argv: &[&str], cwd: Option<&Path>, timeout: Duration) -> Result<CmdResult, AbcError> {
    let cmd_str = argv.join(" ");
    debug!(cmd = %cmd_str, "running command");

    let mut cmd = Command::new(argv[0]);
    cmd.args(&argv[1..])
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn().map_err(|e| {
        InfrastructureError::ConfigError(format!("failed to spawn {:?}: {}", cmd_str, e))
    })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let out_handle = thread::spawn(move || drain(stdout));
    let err_handle = thread::spawn(move || drain(stderr));

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait().map_err(InfrastructureError::Io)? {
            Some(status) => break status,
            None if Instant::now() >= deadline => {
                child.kill().ok();
                child.wait().ok();
                return Err(InfrastructureError::ProcessTimeout {
                    cmd: cmd_str,
                    secs: timeout.as_secs(),
                }
                .into());
            }
            None => thread::sleep(Duration::from_millis(10)),
        }
    };

    let stdout = join_drain(out_handle)?;
    let stderr = join_drain(err_handle)?;
    Ok(CmdResult {
        code: status.code().unwrap_or(-1),
        stdout,
        stderr,
    })
}

/// Like `run`, but a non-zero exit is an error.
pub fn run_ok(argv: &[&str], cwd: Option<&Path>, timeout: Duration) -> Result<CmdResult, AbcError> {
    let result = run(argv, cwd, timeout)?;
    if result.code != 0 {
        return Err(InfrastructureError::Process {
            cmd: argv.join(" "),
            code: result.code,
            stderr: result.stderr,
        }
        .into());
    }
    Ok(result)
}

fn drain(pipe: Option<impl Read>) -> String {
    let mut buf = String::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_string(&mut buf).ok();
    }
    buf
}

fn join_drain(handle: thread::JoinHandle<String>) -> Result<String, AbcError> {
    handle
        .join()
        .map_err(|_| AbcError::InternalError("output drain thread panicked".to_string()))
}

// --- UNIFIED DIFF ---

const DEV_NULL: &str = "/dev/null";

/// True when the host `diff` understands `--color`.
fn diff_supports_color() -> bool {
    static SUPPORTED: OnceLock<bool> = OnceLock::new();
    *SUPPORTED.get_or_init(|| {
        run(
            &["diff", "--color=always", DEV_NULL, DEV_NULL],
            None,
            Duration::from_secs(5),
        )
        .map(|r| r.code <= 1)
        .unwrap_or(false)
    })
}

/// Unified diff between two files with `a/<rel>` / `b/<rel>` labels.
/// A missing side is treated as empty; both sides missing yields "".
pub fn unified_diff(
    old: Option<&Path>,
    new: Option<&Path>,
    rel_label: &str,
    color: bool,
) -> Result<String, AbcError> {
    if old.is_none() && new.is_none() {
        return Ok(String::new());
    }

    let a_label = format!("a/{}", rel_label);
    let b_label = format!("b/{}", rel_label);
    let old_path = old.map_or(DEV_NULL.to_string(), |p| p.display().to_string());
    let new_path = new.map_or(DEV_NULL.to_string(), |p| p.display().to_string());

    let mut argv: Vec<&str> = vec!["diff", "-u", "-N"];
    if color && diff_supports_color() {
        argv.push("--color=always");
    }
    argv.extend([
        "--label",
        a_label.as_str(),
        "--label",
        b_label.as_str(),
        old_path.as_str(),
        new_path.as_str(),
    ]);

    let result = run(&argv, None, DEFAULT_TIMEOUT)?;
    match result.code {
        // 0 = identical, 1 = differ, anything else = trouble.
        0 => Ok(String::new()),
        1 => Ok(result.stdout),
        code => Err(InfrastructureError::Process {
            cmd: argv.join(" "),
            code,
            stderr: result.stderr,
        }
        .into()),
    }
}
