use std::fmt::{Display, Formatter};
use std::process::Command;

use anyhow::{Context, Result};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("command exited without success")]
struct CommandExitStatusError;

/// An extension trait that is intended to add a run method to the std::process::Command struct.
pub trait CommandExt {
    fn run(&mut self) -> Result<()>;
}

impl CommandExt for Command {
    fn run(&mut self) -> Result<()> {
        let output = self.output().context("failed to run command")?;

        match output.status.success() {
            true => Ok(()),
            false => {
                let stdout = std::str::from_utf8(&output.stdout)
                    .context("failed to convert stdout to UTF8")?;
                let stderr = std::str::from_utf8(&output.stderr)
                    .context("failed to convert stderr to UTF8")?;

                println!("command:\n{self:?}\n");
                println!("stdout:\n{stdout}\n");
                println!("stderr:\n{stderr}\n");
                Err(CommandExitStatusError.into())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatexCompiler {
    Lualatex,
    Pdflatex,
}

impl LatexCompiler {
    pub fn executable(&self) -> &'static str {
        match self {
            LatexCompiler::Lualatex => "lualatex",
            LatexCompiler::Pdflatex => "pdflatex",
        }
    }
}

impl Display for LatexCompiler {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.executable())
    }
}

pub fn check_latex_installed(compiler: LatexCompiler) -> Result<()> {
    Command::new(compiler.executable())
        .arg("--version")
        .run()
        .context(format!(
            "{compiler} does not appear to be in the system path; is a LaTeX suite installed?"
        ))
}
