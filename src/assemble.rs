use crate::error::{PipelineError, PipelineResult};
use crate::model::{PageResult, Verdict};
use crate::tools::{PdfaWriter, Validator};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};

const PDFA1_MARKER: &str = "PDF/A-1";

static STATUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*status:\s*(.*)$").expect("valid regex")
});

/// Merges the ordered page PDFs into the final PDF/A and certifies it.
pub struct DocumentAssembler<'a> {
    writer: &'a dyn PdfaWriter,
    validator: &'a dyn Validator,
    validate: bool,
}

impl<'a> DocumentAssembler<'a> {
    pub fn new(writer: &'a dyn PdfaWriter, validator: &'a dyn Validator, validate: bool) -> Self {
        Self {
            writer,
            validator,
            validate,
        }
    }

    /// Write `output` from `pages` (already in page order) and validate it.
    /// An invalid verdict leaves the written file in place.
    pub fn assemble(&self, pages: &[PageResult], output: &Path) -> PipelineResult<Verdict> {
        if pages.is_empty() {
            return Err(PipelineError::AssemblyFailed("no pages to assemble".into()));
        }
        let inputs: Vec<PathBuf> = pages.iter().map(|p| p.pdf.clone()).collect();

        info!("assembling {} pages into {}", inputs.len(), output.display());
        self.writer
            .write_pdfa(&inputs, output)
            .map_err(|e| PipelineError::AssemblyFailed(format!("{e:#}")))?;

        if !self.validate {
            debug!("validation disabled");
            return Ok(Verdict::NotAttempted);
        }

        let report = self
            .validator
            .validate(output)
            .map_err(|e| PipelineError::ValidationInconclusive(format!("{e:#}")))?;
        let verdict = parse_report(&report);
        match verdict {
            Verdict::Valid => info!("{} is valid PDF/A-1", output.display()),
            _ => warn!("{} is not valid PDF/A-1", output.display()),
        }
        Ok(verdict)
    }

    /// Merge the visible-text debug pages into one document next to `output`.
    pub fn assemble_debug(
        &self,
        pages: &[PageResult],
        output: &Path,
    ) -> PipelineResult<Option<PathBuf>> {
        let inputs: Vec<PathBuf> = pages.iter().filter_map(|p| p.debug_pdf.clone()).collect();
        if inputs.is_empty() {
            return Ok(None);
        }
        let dest = output.with_extension("debug.pdf");
        self.writer
            .merge(&inputs, &dest)
            .map_err(|e| PipelineError::AssemblyFailed(format!("debug document: {e:#}")))?;
        info!("debug document written to {}", dest.display());
        Ok(Some(dest))
    }
}

/// Verdict from a validator report: any error message, any "not valid" or
/// "not well-formed" status, or a missing PDF/A-1 profile makes it invalid.
pub fn parse_report(report: &str) -> Verdict {
    let mut profile_found = false;
    for line in report.lines() {
        let trimmed = line.trim();
        if trimmed.contains("ErrorMessage") {
            debug!("validator: {trimmed}");
            return Verdict::Invalid;
        }
        if let Some(caps) = STATUS_RE.captures(trimmed) {
            let status = caps[1].to_ascii_lowercase();
            if status.contains("not valid") || status.contains("not well-formed") {
                debug!("validator: {trimmed}");
                return Verdict::Invalid;
            }
        }
        if trimmed.contains(PDFA1_MARKER) {
            profile_found = true;
        }
    }
    if profile_found {
        Verdict::Valid
    } else {
        Verdict::Invalid
    }
}
