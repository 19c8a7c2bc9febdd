use std::process::Command;

use anyhow::{anyhow, Context, Result};
use onekey_core::OnekeyError;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    fn status_label(&self) -> String {
        match self.code {
            Some(code) => format!("exit status: {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Every interaction with the host OS goes through this seam.
pub trait CommandRunner {
    fn run(&self, argv: &[String]) -> Result<CommandOutput>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, argv: &[String]) -> Result<CommandOutput> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| anyhow!("refusing to run an empty command"))?;
        debug!(command = ?argv, "running external command");
        let output = Command::new(program)
            .args(args)
            .output()
            .with_context(|| format!("command failed to start: {program}"))?;
        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

pub fn run_checked(
    runner: &dyn CommandRunner,
    argv: &[String],
    context_message: &str,
) -> Result<CommandOutput> {
    let output = runner
        .run(argv)
        .with_context(|| format!("{context_message}: command failed to start"))?;
    if output.success() {
        return Ok(output);
    }

    Err(OnekeyError::Command {
        context: context_message.to_string(),
        status: output.status_label(),
        stdout: output.stdout.trim().to_string(),
        stderr: output.stderr.trim().to_string(),
    }
    .into())
}

pub fn argv<I, S>(parts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts.into_iter().map(Into::into).collect()
}
