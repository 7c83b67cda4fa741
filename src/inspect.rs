use crate::model::{
    ColorModel, Page, PageCharacteristics, RasterInfo, RecognitionStatus, Resolution,
    ResolutionUnit, SourceKind,
};
use crate::tools::{DocumentSource, MetadataReader};
use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

/// Determines resolution, color model and text status of one page.
pub struct PageInspector<'a> {
    source: &'a dyn DocumentSource,
    metadata: &'a dyn MetadataReader,
    default_dpi: u32,
}

impl<'a> PageInspector<'a> {
    pub fn new(
        source: &'a dyn DocumentSource,
        metadata: &'a dyn MetadataReader,
        default_dpi: u32,
    ) -> Self {
        Self {
            source,
            metadata,
            default_dpi,
        }
    }

    /// Characteristics assumed when the page itself can't tell us.
    pub fn fallback(&self, status: RecognitionStatus) -> PageCharacteristics {
        PageCharacteristics {
            dpi: self.default_dpi.max(1),
            color: ColorModel::Color,
            bit_depth: 8,
            status,
        }
    }

    /// Inspect `page`, using `scratch` for extracted images.
    pub fn inspect(&self, page: &Page, scratch: &Path) -> Result<PageCharacteristics> {
        let raster = match page.kind {
            SourceKind::DocumentPage => {
                let fonts = self
                    .source
                    .font_count(page)
                    .with_context(|| format!("listing fonts of page {}", page.number))?;
                if fonts > 0 {
                    debug!("page {} uses {fonts} fonts", page.number);
                    return Ok(self.fallback(RecognitionStatus::HasExistingText));
                }

                let images = self
                    .source
                    .extract_images(page, scratch)
                    .with_context(|| format!("extracting images of page {}", page.number))?;
                match images.as_slice() {
                    [only] => only.clone(),
                    other => {
                        debug!("page {} has {} embedded images", page.number, other.len());
                        return Ok(self.fallback(RecognitionStatus::AmbiguousExtraction));
                    }
                }
            }
            SourceKind::StandaloneImage => page.source.clone(),
        };

        let info = self
            .metadata
            .read(&raster)
            .with_context(|| format!("reading metadata of {}", raster.display()))?;
        let dpi = effective_dpi(&info, page.width_pt, page.height_pt)
            .unwrap_or(self.default_dpi)
            .max(1);

        debug!(
            "page {}: {}x{} px, {:?}, {} bit, {} dpi",
            page.number, info.width_px, info.height_px, info.color, info.bit_depth, dpi
        );

        Ok(PageCharacteristics {
            dpi,
            color: info.color,
            bit_depth: info.bit_depth,
            status: RecognitionStatus::NoExistingText,
        })
    }
}

/// Declared resolution converted to dots per inch.
pub fn resolution_dpi(resolution: Resolution) -> u32 {
    let per_inch = match resolution.unit {
        ResolutionUnit::PixelsPerInch => resolution.value,
        ResolutionUnit::PixelsPerCentimeter => resolution.value * 2.54,
    };
    per_inch.round().max(1.0) as u32
}

/// DPI that maps `width_px` x `height_px` onto a page of `width_pt` x `height_pt`,
/// assuming equal horizontal and vertical resolution.
pub fn analytic_dpi(width_px: u32, height_px: u32, width_pt: f64, height_pt: f64) -> Option<u32> {
    if width_pt <= 0.0 || height_pt <= 0.0 || width_px == 0 || height_px == 0 {
        return None;
    }
    let pixels = f64::from(width_px) * 72.0 * f64::from(height_px) * 72.0;
    let dpi = (pixels / width_pt / height_pt).sqrt().round();
    Some(dpi.max(1.0) as u32)
}

/// The raster's own resolution if it declares one, otherwise the analytic estimate.
pub fn effective_dpi(info: &RasterInfo, width_pt: f64, height_pt: f64) -> Option<u32> {
    match info.resolution {
        Some(res) => Some(resolution_dpi(res)),
        None => analytic_dpi(info.width_px, info.height_px, width_pt, height_pt),
    }
}
