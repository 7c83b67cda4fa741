use super::Validator;
use super::process::Runner;
use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;

/// Format validation with JHOVE's PDF module.
pub struct Jhove {
    runner: Runner,
    program: String,
}

impl Jhove {
    pub fn new(runner: Runner, program: &str) -> Self {
        Self {
            runner,
            program: program.to_string(),
        }
    }
}

impl Validator for Jhove {
    fn validate(&self, pdf: &Path) -> Result<String> {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-m", "PDF-hul"]).arg(pdf);
        self.runner
            .stdout(cmd)
            .with_context(|| format!("jhove on {}", pdf.display()))
    }
}
