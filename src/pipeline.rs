use crate::{
    assemble::DocumentAssembler,
    error::{PipelineError, PipelineResult},
    model::{Page, PipelineConfig, RunOutcome},
    report::{PageReport, RunReport},
    schedule::PageScheduler,
    tools::{CancelToken, Toolbox},
    transform::PageTransformer,
    util::{ensure_dir, now_rfc3339},
    workspace::RunWorkspace,
};
use anyhow::anyhow;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

pub struct Pipeline<'a> {
    cfg: &'a PipelineConfig,
    tools: &'a Toolbox,
    validate: bool,
    cancel: CancelToken,
}

pub struct JobOutput {
    pub outcome: RunOutcome,
    pub report: RunReport,
}

impl<'a> Pipeline<'a> {
    /// `cancel` must be the token the toolbox's runners observe.
    pub fn new(
        cfg: &'a PipelineConfig,
        tools: &'a Toolbox,
        validate: bool,
        cancel: CancelToken,
    ) -> Self {
        Self {
            cfg,
            tools,
            validate,
            cancel,
        }
    }

    /// Process every page, then assemble and validate `output`.
    /// Nothing is written to `output` unless all pages succeed.
    pub fn run_job(
        &self,
        run_id: &str,
        inputs: &[PathBuf],
        pages: &[Page],
        workspace: &RunWorkspace,
        output: &Path,
    ) -> PipelineResult<JobOutput> {
        let started = Instant::now();
        let started_at = now_rfc3339();

        let transformer = PageTransformer::new(self.cfg, self.tools);
        let scheduler = PageScheduler::new(&transformer, workspace, self.cfg.jobs, self.cancel.clone());
        let results = scheduler.run(pages)?;

        if results.len() != pages.len() {
            return Err(PipelineError::Other(anyhow!(
                "{} results for {} pages",
                results.len(),
                pages.len()
            )));
        }
        let recognized = results.iter().filter(|r| r.ocr_performed).count();
        info!(
            "{recognized} of {} pages recognized, {} copied",
            results.len(),
            results.len() - recognized
        );

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent)?;
        }

        let assembler = DocumentAssembler::new(
            self.tools.writer.as_ref(),
            self.tools.validator.as_ref(),
            self.validate,
        );
        let verdict = assembler.assemble(&results, output)?;

        let debug_pdf = if self.cfg.debug {
            match assembler.assemble_debug(&results, output) {
                Ok(path) => path,
                Err(err) => {
                    warn!("{err}");
                    None
                }
            }
        } else {
            None
        };

        let mut ordered: Vec<&Page> = pages.iter().collect();
        ordered.sort_by_key(|p| p.number);
        let page_reports = ordered
            .iter()
            .zip(&results)
            .map(|(page, result)| PageReport::new(page, result))
            .collect();

        let report = RunReport {
            run_id: run_id.to_string(),
            inputs: inputs.to_vec(),
            output: output.to_path_buf(),
            started: started_at,
            finished: now_rfc3339(),
            elapsed_seconds: started.elapsed().as_secs_f64(),
            languages: self.cfg.languages.clone(),
            verdict,
            debug_pdf,
            pages: page_reports,
        };

        Ok(JobOutput {
            outcome: RunOutcome {
                pages: results,
                verdict,
            },
            report,
        })
    }
}
