use super::Cleaner;
use super::process::{Runner, require_output};
use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;

/// Page cleaning through unpaper. Deskew is left to the dedicated deskew step.
pub struct Unpaper {
    runner: Runner,
    program: String,
}

impl Unpaper {
    pub fn new(runner: Runner, program: &str) -> Self {
        Self {
            runner,
            program: program.to_string(),
        }
    }
}

impl Cleaner for Unpaper {
    fn clean(&self, input: &Path, output: &Path, dpi: u32) -> Result<()> {
        let mut cmd = Command::new(&self.program);
        cmd.args(["--overwrite", "--dpi"])
            .arg(dpi.to_string())
            .args([
                "--mask-scan-size",
                "100",
                "--no-deskew",
                "--no-grayfilter",
                "--no-blackfilter",
                "--no-mask-center",
                "--no-border-align",
            ])
            .arg(input)
            .arg(output);
        self.runner
            .run(cmd)
            .with_context(|| format!("cleaning {}", input.display()))?;
        require_output(output, "unpaper")
    }
}
