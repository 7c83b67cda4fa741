use super::OcrEngine;
use super::process::{Runner, require_output};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

pub struct Tesseract {
    runner: Runner,
    program: String,
}

impl Tesseract {
    pub fn new(runner: Runner, program: &str) -> Self {
        Self {
            runner,
            program: program.to_string(),
        }
    }
}

impl OcrEngine for Tesseract {
    fn recognize(
        &self,
        raster: &Path,
        languages: &str,
        profiles: &[String],
        dest_base: &Path,
    ) -> Result<PathBuf> {
        let mut cmd = Command::new(&self.program);
        cmd.arg(raster)
            .arg(dest_base)
            .args(["-l", languages])
            .args(profiles)
            .arg("hocr");
        self.runner
            .run(cmd)
            .with_context(|| format!("tesseract on {}", raster.display()))?;

        // tesseract appends the config's extension to the output base.
        let mut hocr = dest_base.as_os_str().to_os_string();
        hocr.push(".hocr");
        let hocr = PathBuf::from(hocr);
        require_output(&hocr, "tesseract")?;
        Ok(hocr)
    }
}
