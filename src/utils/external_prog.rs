use std::ffi::OsStr;

use subprocess::{CaptureData, Exec, Redirection};

/// How much of the captured output is shown in the log
const OUTPUT_TAIL_CHARS: usize = 500;

/// Run an external program to completion and capture stdout and stderr.
pub fn run_external_program<S: AsRef<OsStr>>(program: &str, args: &[S]) -> anyhow::Result<CaptureData> {
    let capture = Exec::cmd(program)
        .args(args)
        .stdout(Redirection::Pipe)
        .stderr(Redirection::Pipe)
        .capture()?;
    Ok(capture)
}

/// Run a command, log what happened and report whether it succeeded.
///
/// Failures are logged and reported as `false`, never propagated, so the
/// caller can move on to the next step.
pub fn run_command(program: &str, args: &[String], description: &str) -> bool {
    info!("{}", "=".repeat(60));
    info!("Running: {}", description);
    info!("Command: {} {}", program, args.join(" "));
    info!("{}", "=".repeat(60));

    let capture = match run_external_program(program, args) {
        Ok(c) => c,
        Err(e) => {
            error!("Error running {}: {}", description, e);
            return false;
        }
    };

    if capture.success() {
        info!("Success!");
        let stdout = capture.stdout_str();
        if !stdout.is_empty() {
            info!("Output: {}", tail(&stdout, OUTPUT_TAIL_CHARS));
        }
        true
    } else {
        error!("Error running {}", description);
        error!("Return code: {:?}", capture.exit_status);
        let stdout = capture.stdout_str();
        if !stdout.is_empty() {
            error!("STDOUT: {}", tail(&stdout, OUTPUT_TAIL_CHARS));
        }
        let stderr = capture.stderr_str();
        if !stderr.is_empty() {
            error!("STDERR: {}", tail(&stderr, OUTPUT_TAIL_CHARS));
        }
        false
    }
}

/// Last `n` characters of `text`.
pub fn tail(text: &str, n: usize) -> &str {
    let count = text.chars().count();
    if count <= n {
        return text;
    }
    match text.char_indices().nth(count - n) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}
