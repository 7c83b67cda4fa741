use crate::error::{PipelineError, PipelineResult};
use crate::inspect::resolution_dpi;
use crate::model::{Page, SourceKind};
use crate::tools::{DocumentSource, MetadataReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Turn the command-line inputs into the ordered page list.
///
/// Either exactly one PDF, or any number of images which become one page each
/// in the order given. An image with a `<stem>.hocr` next to it carries that
/// recognition result along.
pub fn discover(
    inputs: &[PathBuf],
    source: &dyn DocumentSource,
    metadata: &dyn MetadataReader,
    default_dpi: u32,
) -> PipelineResult<Vec<Page>> {
    if inputs.is_empty() {
        return Err(PipelineError::BadArguments("no input given".into()));
    }
    for input in inputs {
        let s = input.display().to_string();
        if looks_like_url(&s) {
            return Err(PipelineError::BadArguments(format!(
                "URL inputs are not supported: {s}"
            )));
        }
        if !input.is_file() {
            return Err(PipelineError::BadInputFile(format!(
                "input does not exist: {s}"
            )));
        }
    }

    match inputs {
        [single] if is_pdf(single) => document_pages(single, source),
        _ if inputs.iter().any(|p| is_pdf(p)) => Err(PipelineError::BadArguments(
            "a PDF input must be given on its own".into(),
        )),
        _ => inputs
            .iter()
            .zip(1u32..)
            .map(|(path, number)| image_page(path, number, metadata, default_dpi))
            .collect(),
    }
}

fn document_pages(pdf: &Path, source: &dyn DocumentSource) -> PipelineResult<Vec<Page>> {
    let sizes = source
        .page_sizes(pdf)
        .map_err(|e| PipelineError::BadInputFile(format!("{}: {e:#}", pdf.display())))?;
    if sizes.is_empty() {
        return Err(PipelineError::BadInputFile(format!(
            "{} has no pages",
            pdf.display()
        )));
    }
    info!("{} has {} pages", pdf.display(), sizes.len());
    Ok(sizes
        .into_iter()
        .zip(1u32..)
        .map(|(size, number)| Page {
            number,
            kind: SourceKind::DocumentPage,
            source: pdf.to_path_buf(),
            width_pt: size.width_pt,
            height_pt: size.height_pt,
            hocr: None,
        })
        .collect())
}

fn image_page(
    path: &Path,
    number: u32,
    metadata: &dyn MetadataReader,
    default_dpi: u32,
) -> PipelineResult<Page> {
    let info = metadata
        .read(path)
        .map_err(|e| PipelineError::BadInputFile(format!("{}: {e:#}", path.display())))?;
    let dpi = info
        .resolution
        .map(resolution_dpi)
        .unwrap_or(default_dpi)
        .max(1) as f64;

    let sidecar = path.with_extension("hocr");
    let hocr = sidecar.is_file().then_some(sidecar);
    if let Some(h) = &hocr {
        debug!("image {} comes with {}", path.display(), h.display());
    }

    Ok(Page {
        number,
        kind: SourceKind::StandaloneImage,
        source: path.to_path_buf(),
        width_pt: info.width_px as f64 * 72.0 / dpi,
        height_pt: info.height_px as f64 * 72.0 / dpi,
        hocr,
    })
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

fn looks_like_url(s: &str) -> bool {
    let s = s.to_ascii_lowercase();
    s.starts_with("http://") || s.starts_with("https://") || s.starts_with("file://")
}
