use crate::error::{PipelineError, PipelineResult};
use crate::model::{Page, PageResult};
use crate::tools::CancelToken;
use crate::transform::PageTransformer;
use crate::workspace::RunWorkspace;
use anyhow::anyhow;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{info, warn};

/// Runs the page transformer over all pages on a fixed number of threads.
///
/// Results come back ordered by page number no matter which worker finished
/// first. The first failing page cancels the run: no new pages are started,
/// running tools are killed, and that page's error is returned.
pub struct PageScheduler<'a> {
    transformer: &'a PageTransformer<'a>,
    workspace: &'a RunWorkspace,
    jobs: usize,
    cancel: CancelToken,
}

impl<'a> PageScheduler<'a> {
    pub fn new(
        transformer: &'a PageTransformer<'a>,
        workspace: &'a RunWorkspace,
        jobs: usize,
        cancel: CancelToken,
    ) -> Self {
        Self {
            transformer,
            workspace,
            jobs,
            cancel,
        }
    }

    pub fn run(&self, pages: &[Page]) -> PipelineResult<Vec<PageResult>> {
        let mut ordered: Vec<&Page> = pages.iter().collect();
        ordered.sort_by_key(|p| p.number);
        if ordered.windows(2).any(|w| w[0].number == w[1].number) {
            return Err(PipelineError::Other(anyhow!("duplicate page numbers")));
        }

        let total = ordered.len();
        let workers = self.jobs.clamp(1, total.max(1));
        info!("processing {total} pages with {workers} workers");

        let started = Instant::now();
        let next = AtomicUsize::new(0);
        let slots: Mutex<Vec<Option<PageResult>>> = Mutex::new(vec![None; total]);
        let failure: Mutex<Option<PipelineError>> = Mutex::new(None);

        std::thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| {
                    while !self.cancel.is_cancelled() {
                        let slot = next.fetch_add(1, Ordering::SeqCst);
                        let Some(page) = ordered.get(slot) else {
                            break;
                        };
                        match self.process(page) {
                            Ok(result) => {
                                let mut slots = slots.lock().unwrap_or_else(|e| e.into_inner());
                                slots[slot] = Some(result);
                            }
                            Err(err) => {
                                let mut failure = failure.lock().unwrap_or_else(|e| e.into_inner());
                                if failure.is_none() {
                                    warn!("page {} failed; cancelling remaining pages", page.number);
                                    *failure = Some(err);
                                }
                                self.cancel.cancel();
                                break;
                            }
                        }
                    }
                });
            }
        });

        if let Some(err) = failure.into_inner().unwrap_or_else(|e| e.into_inner()) {
            return Err(err);
        }

        let results: Option<Vec<PageResult>> = slots
            .into_inner()
            .unwrap_or_else(|e| e.into_inner())
            .into_iter()
            .collect();
        let results = results.ok_or_else(|| PipelineError::Other(anyhow!("run cancelled")))?;

        info!(
            "all {total} pages processed in {:.1}s",
            started.elapsed().as_secs_f64()
        );
        Ok(results)
    }

    fn process(&self, page: &Page) -> PipelineResult<PageResult> {
        let ws = self.workspace.page(page.number)?;
        self.transformer.process(page, &ws)
    }
}
