// SPDX-License-Identifier: GPL-3.0-only

use std::ffi::OsStr;
use std::io::Write;
use std::process::{Command, Output, Stdio};

use tracing::debug;

use crate::error::{Result, SysError};

fn describe(program: &OsStr, args: &[&OsStr]) -> String {
    let mut line = program.to_string_lossy().into_owned();
    for arg in args {
        line.push(' ');
        line.push_str(&arg.to_string_lossy());
    }
    line
}

fn check(command: String, output: Output) -> Result<String> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stderr = if stderr.is_empty() {
            output.status.to_string()
        } else {
            stderr
        };
        return Err(SysError::CommandFailed { command, stderr });
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Run to completion and return stdout. A non-zero exit is an error
/// carrying stderr.
pub fn run_command<S: AsRef<OsStr>>(program: impl AsRef<OsStr>, args: &[S]) -> Result<String> {
    let program = program.as_ref();
    let args: Vec<&OsStr> = args.iter().map(AsRef::as_ref).collect();
    let command = describe(program, &args);
    debug!("running {command}");

    let output = Command::new(program).args(&args).stdin(Stdio::null()).output()?;
    check(command, output)
}

/// Like [`run_command`], with `input` written to the child's stdin. `input`
/// never appears in logs or errors.
pub fn run_with_stdin<S: AsRef<OsStr>>(
    program: impl AsRef<OsStr>,
    args: &[S],
    input: &[&[u8]],
) -> Result<String> {
    let program = program.as_ref();
    let args: Vec<&OsStr> = args.iter().map(AsRef::as_ref).collect();
    let command = describe(program, &args);
    debug!("running {command} (with input)");

    let mut child = Command::new(program)
        .args(&args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    if let Some(mut stdin) = child.stdin.take() {
        // A child that exits early closes the pipe; its status says why.
        if let Err(error) = input.iter().try_for_each(|chunk| stdin.write_all(chunk)) {
            debug!("writing input to {command}: {error}");
        }
    }

    let output = child.wait_with_output()?;
    check(command, output)
}

/// Exit status only; output goes to the inherited streams.
pub fn run_status<S: AsRef<OsStr>>(program: impl AsRef<OsStr>, args: &[S]) -> Result<bool> {
    let program = program.as_ref();
    let args: Vec<&OsStr> = args.iter().map(AsRef::as_ref).collect();
    debug!("running {}", describe(program, &args));
    Ok(Command::new(program).args(&args).status()?.success())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_carries_stderr() {
        let error = run_command("sh", &["-c", "echo oops >&2; exit 3"]).expect_err("fails");
        match error {
            SysError::CommandFailed { command, stderr } => {
                assert!(command.starts_with("sh -c"));
                assert_eq!(stderr, "oops");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn stdin_is_fed() {
        let input = [b"abc".as_slice(), b"\n".as_slice()];
        let out = run_with_stdin("cat", &[] as &[&str], &input).expect("cat");
        assert_eq!(out, "abc\n");
    }
}
