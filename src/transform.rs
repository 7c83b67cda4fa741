use crate::error::{PageErrorKind, PipelineError, PipelineResult};
use crate::inspect::PageInspector;
use crate::model::{
    Page, PageCharacteristics, PageResult, PipelineConfig, RecognitionStatus,
    SourceKind, TextPolicy,
};
use crate::tools::Toolbox;
use crate::tools::process::require_output;
use crate::workspace::PageWorkspace;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Raise `measured` to the oversampling threshold when it falls below it.
pub fn resolve_dpi(measured: u32, oversample: Option<u32>) -> u32 {
    match oversample {
        Some(threshold) if measured < threshold => threshold,
        _ => measured,
    }
}

/// Runs one page from inspection to its single-page PDF.
pub struct PageTransformer<'a> {
    cfg: &'a PipelineConfig,
    tools: &'a Toolbox,
}

impl<'a> PageTransformer<'a> {
    pub fn new(cfg: &'a PipelineConfig, tools: &'a Toolbox) -> Self {
        Self { cfg, tools }
    }

    pub fn inspector(&self) -> PageInspector<'a> {
        PageInspector::new(
            self.tools.source.as_ref(),
            self.tools.metadata.as_ref(),
            self.cfg.default_dpi,
        )
    }

    pub fn process(&self, page: &Page, ws: &PageWorkspace) -> PipelineResult<PageResult> {
        let n = page.number;
        let fail = |kind: PageErrorKind| move |e: anyhow::Error| PipelineError::page(n, kind, e);

        let inspector = self.inspector();
        let chars = inspector
            .inspect(page, ws.dir())
            .map_err(|e| fail(PageErrorKind::ExtractionFailed)(e.context("inspect")))?;

        let chars = match chars.status {
            RecognitionStatus::NoExistingText => chars,
            RecognitionStatus::AmbiguousExtraction => {
                warn!(
                    "page {n}: could not isolate a single page image; assuming {} dpi color",
                    self.cfg.default_dpi
                );
                chars
            }
            RecognitionStatus::HasExistingText => match self.cfg.text_policy {
                TextPolicy::Skip => return self.pass_through(page, ws, chars),
                TextPolicy::Force => {
                    warn!(
                        "page {n} already has text; rasterizing and recognizing it anyway at {} dpi color",
                        self.cfg.default_dpi
                    );
                    chars
                }
                TextPolicy::Refuse => {
                    return Err(PipelineError::Page {
                        page: n,
                        kind: PageErrorKind::AlreadyHasText,
                        detail: "page already contains text; use force-ocr to recognize it anyway or skip-text to keep it as is".into(),
                    });
                }
            },
        };

        if chars.dpi < self.cfg.low_dpi_warning {
            warn!(
                "page {n}: resolution {} dpi is below {} dpi, recognition quality may suffer",
                chars.dpi, self.cfg.low_dpi_warning
            );
        }
        // An externally produced hOCR refers to the unscaled raster.
        let dpi = if page.hocr.is_some() {
            chars.dpi
        } else {
            resolve_dpi(chars.dpi, self.cfg.oversample_dpi)
        };
        if dpi != chars.dpi {
            info!("page {n}: oversampling from {} to {dpi} dpi", chars.dpi);
        }

        let raster = ws.path("page.pnm");
        let format = chars.color.pixel_format();
        let extracted = match page.kind {
            SourceKind::DocumentPage => {
                self.tools.rasterizer.render_page(page, dpi, format, &raster)
            }
            SourceKind::StandaloneImage => self.tools.rasterizer.convert_image(
                &page.source,
                chars.dpi,
                dpi,
                format,
                &raster,
            ),
        };
        extracted
            .and_then(|()| require_output(&raster, "page raster"))
            .map_err(fail(PageErrorKind::ExtractionFailed))?;

        let mut current = raster;
        if self.cfg.deskew {
            let deskewed = ws.path("page.deskewed.pnm");
            self.tools
                .deskewer
                .deskew(&current, &deskewed)
                .and_then(|()| require_output(&deskewed, "deskew"))
                .map_err(|e| fail(PageErrorKind::PreprocessFailed)(e.context("deskew")))?;
            current = deskewed;
        }

        let mut chosen = current.clone();
        if self.cfg.clean {
            let cleaned = ws.path("page.cleaned.pnm");
            self.tools
                .cleaner
                .clean(&current, &cleaned, dpi)
                .and_then(|()| require_output(&cleaned, "clean"))
                .map_err(|e| fail(PageErrorKind::PreprocessFailed)(e.context("clean")))?;
            if self.cfg.embed_cleaned {
                chosen = cleaned;
            }
        }

        let hocr: PathBuf = match &page.hocr {
            Some(existing) => {
                debug!("page {n}: using existing recognition {}", existing.display());
                existing.clone()
            }
            None => self
                .tools
                .ocr
                .recognize(
                    &chosen,
                    &self.cfg.language_arg(),
                    &self.cfg.extra_configs,
                    &ws.path("page.ocr"),
                )
                .map_err(fail(PageErrorKind::RecognitionFailed))?,
        };

        let pdf = ws.page_pdf();
        self.tools
            .composer
            .compose(&chosen, &hocr, dpi, &pdf, false)
            .map_err(fail(PageErrorKind::ComposeFailed))?;

        let debug_pdf = if self.cfg.debug {
            let path = ws.debug_pdf();
            self.tools
                .composer
                .compose(&chosen, &hocr, dpi, &path, true)
                .map_err(fail(PageErrorKind::ComposeFailed))?;
            Some(path)
        } else {
            None
        };

        self.cleanup(n, ws);
        debug!("page {n}: done at {dpi} dpi");

        Ok(PageResult {
            page: n,
            pdf,
            debug_pdf,
            dpi,
            color: chars.color,
            ocr_performed: true,
        })
    }

    fn pass_through(
        &self,
        page: &Page,
        ws: &PageWorkspace,
        chars: PageCharacteristics,
    ) -> PipelineResult<PageResult> {
        let n = page.number;
        info!("page {n} already has text; copying it unchanged");
        let pdf = ws.page_pdf();
        self.tools
            .source
            .extract_page(page, &pdf)
            .map_err(|e| PipelineError::page(n, PageErrorKind::ExtractionFailed, e))?;
        self.cleanup(n, ws);
        Ok(PageResult {
            page: n,
            pdf,
            debug_pdf: None,
            dpi: chars.dpi,
            color: chars.color,
            ocr_performed: false,
        })
    }

    fn cleanup(&self, n: u32, ws: &PageWorkspace) {
        if self.cfg.keep_temporaries {
            return;
        }
        if let Err(err) = ws.remove_intermediates() {
            warn!("page {n}: could not remove intermediates: {err:#}");
        }
    }
}
