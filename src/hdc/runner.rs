use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::error::DriverError;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

pub fn render_command(program: &str, args: &[String]) -> String {
    let mut rendered = program.to_string();
    for arg in args {
        rendered.push(' ');
        rendered.push_str(arg);
    }
    rendered
}

// POSIX single-quote escaping for text injected through `uitest uiInput text`.
pub fn quote_arg(text: &str) -> String {
    if !text.is_empty() && !text.contains(|c: char| !c.is_ascii_alphanumeric() && !"_-./".contains(c))
    {
        return text.to_string();
    }
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('\'');
    for ch in text.chars() {
        if ch == '\'' {
            quoted.push_str("'\\''");
        } else {
            quoted.push(ch);
        }
    }
    quoted.push('\'');
    quoted
}

fn spawn_drain(reader: impl Read + Send + 'static) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut reader = reader;
        let mut buffer = Vec::<u8>::new();
        let mut chunk = [0u8; 4096];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(count) => buffer.extend_from_slice(&chunk[..count]),
                Err(_) => break,
            }
        }
        buffer
    })
}

fn wait_with_timeout(
    child: &mut Child,
    timeout: Duration,
    command: &str,
    trace_id: &str,
) -> Result<Option<i32>, DriverError> {
    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status.code()),
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(DriverError::transport(
                        format!("Command timed out: {command}"),
                        trace_id,
                    ));
                }
                std::thread::sleep(Duration::from_millis(50));
            }
            Err(err) => {
                return Err(DriverError::system(
                    format!("Failed to poll command: {err}"),
                    trace_id,
                ));
            }
        }
    }
}

pub fn run_command_with_timeout(
    program: &str,
    args: &[String],
    timeout: Duration,
    trace_id: &str,
) -> Result<CommandOutput, DriverError> {
    let command = render_command(program, args);
    let mut child = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| {
            DriverError::system(format!("Failed to spawn command {command}: {err}"), trace_id)
        })?;

    // Drain stdout/stderr on dedicated threads; otherwise, a chatty child
    // can block once the pipe buffer fills, and we incorrectly hit the
    // timeout.
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| DriverError::system("Failed to capture stdout", trace_id))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| DriverError::system("Failed to capture stderr", trace_id))?;
    let stdout_handle = spawn_drain(stdout);
    let stderr_handle = spawn_drain(stderr);

    let exit_code = match wait_with_timeout(&mut child, timeout, &command, trace_id) {
        Ok(code) => code,
        Err(err) => {
            let _ = stdout_handle.join();
            let _ = stderr_handle.join();
            return Err(err);
        }
    };

    let stdout_bytes = stdout_handle.join().unwrap_or_default();
    let stderr_bytes = stderr_handle.join().unwrap_or_default();

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&stdout_bytes).to_string(),
        stderr: String::from_utf8_lossy(&stderr_bytes).to_string(),
        exit_code,
    })
}

// Like run_command_with_timeout, but a non-zero exit becomes a transport
// error carrying the failing command line and the tool's own diagnostics.
pub fn run_checked(
    program: &str,
    args: &[String],
    timeout: Duration,
    trace_id: &str,
) -> Result<String, DriverError> {
    let output = run_command_with_timeout(program, args, timeout, trace_id)?;
    let exit_code = output.exit_code.unwrap_or(-1);
    if exit_code != 0 {
        let command = render_command(program, args);
        let stderr = output.stderr.trim();
        let stdout = output.stdout.trim();
        let detail = if !stderr.is_empty() {
            stderr.to_string()
        } else if !stdout.is_empty() {
            stdout.to_string()
        } else {
            format!("exit code {exit_code}")
        };
        return Err(DriverError::transport(
            format!("{command} failed: {detail}"),
            trace_id,
        ));
    }
    Ok(output.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> (String, Vec<String>) {
        ("sh".to_string(), vec!["-c".to_string(), script.to_string()])
    }

    #[test]
    fn does_not_deadlock_on_large_stdout() {
        // Regression guard: piped but undrained stdout blocks the child once
        // the pipe buffer fills, turning a fast command into a timeout.
        let (program, args) = sh(
            "i=0; while [ $i -lt 100000 ]; do echo 1234567890; i=$((i+1)); done",
        );
        let output =
            run_command_with_timeout(&program, &args, Duration::from_secs(10), "trace-test")
                .expect("large-output command should complete");
        assert_eq!(output.exit_code, Some(0));
        assert!(output.stdout.len() >= 1_000_000);
    }

    #[test]
    fn kills_command_on_timeout() {
        let (program, args) = sh("sleep 30");
        let err = run_command_with_timeout(&program, &args, Duration::from_millis(200), "trace-test")
            .expect_err("should time out");
        assert_eq!(err.code, "ERR_TRANSPORT");
        assert!(err.error.contains("timed out"));
        assert!(err.error.contains("sleep 30"));
    }

    #[test]
    fn checked_failure_carries_command_and_stderr() {
        let (program, args) = sh("echo boom >&2; exit 3");
        let err = run_checked(&program, &args, Duration::from_secs(5), "trace-test")
            .expect_err("should fail");
        assert_eq!(err.code, "ERR_TRANSPORT");
        assert!(err.error.contains("sh -c"));
        assert!(err.error.contains("boom"));
    }

    #[test]
    fn checked_failure_without_output_reports_exit_code() {
        let (program, args) = sh("exit 7");
        let err = run_checked(&program, &args, Duration::from_secs(5), "trace-test")
            .expect_err("should fail");
        assert!(err.error.contains("exit code 7"));
    }

    #[test]
    fn quotes_shell_arguments() {
        assert_eq!(quote_arg("hello"), "hello");
        assert_eq!(quote_arg("hello world"), "'hello world'");
        assert_eq!(quote_arg("it's"), "'it'\\''s'");
        assert_eq!(quote_arg(""), "''");
        assert_eq!(quote_arg("path/to-file_1.txt"), "path/to-file_1.txt");
    }
}
