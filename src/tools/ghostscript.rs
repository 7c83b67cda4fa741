use super::process::{Runner, require_output};
use super::{PdfaWriter, Rasterizer};
use crate::model::{Page, PixelFormat};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Page rendering and PDF/A output through Ghostscript; standalone images go through ImageMagick.
pub struct Ghostscript {
    runner: Runner,
    gs: String,
    convert: String,
    icc_profile: Option<PathBuf>,
}

impl Ghostscript {
    pub fn new(runner: Runner, gs: &str, convert: &str, icc_profile: &str) -> Self {
        Self {
            runner,
            gs: gs.to_string(),
            convert: convert.to_string(),
            icc_profile: (!icc_profile.is_empty()).then(|| PathBuf::from(icc_profile)),
        }
    }

    fn base_command(&self) -> Command {
        let mut cmd = Command::new(&self.gs);
        cmd.args(["-dSAFER", "-dBATCH", "-dNOPAUSE", "-dQUIET"]);
        cmd
    }
}

impl Rasterizer for Ghostscript {
    fn render_page(&self, page: &Page, dpi: u32, format: PixelFormat, dest: &Path) -> Result<()> {
        let device = match format {
            PixelFormat::Mono1 => "pbmraw",
            PixelFormat::Gray8 => "pgmraw",
            PixelFormat::Rgb24 => "ppmraw",
        };
        let mut cmd = self.base_command();
        cmd.arg(format!("-sDEVICE={device}"))
            .arg(format!("-r{dpi}"))
            .arg(format!("-dFirstPage={}", page.number))
            .arg(format!("-dLastPage={}", page.number))
            .arg("-o")
            .arg(dest)
            .arg(&page.source);
        self.runner
            .run(cmd)
            .with_context(|| format!("rendering page {} at {dpi} dpi", page.number))?;
        require_output(dest, "ghostscript render")
    }

    fn convert_image(
        &self,
        image: &Path,
        source_dpi: u32,
        target_dpi: u32,
        format: PixelFormat,
        dest: &Path,
    ) -> Result<()> {
        let mut source = image.as_os_str().to_os_string();
        source.push("[0]");

        let mut cmd = Command::new(&self.convert);
        cmd.args(["-units", "PixelsPerInch", "-density"])
            .arg(source_dpi.to_string())
            .arg(source);
        if target_dpi != source_dpi {
            cmd.arg("-resample").arg(target_dpi.to_string());
        }
        match format {
            PixelFormat::Mono1 => cmd.arg("-monochrome"),
            PixelFormat::Gray8 => cmd.args(["-colorspace", "Gray", "-depth", "8"]),
            PixelFormat::Rgb24 => cmd.args(["-type", "TrueColor", "-depth", "8"]),
        };
        cmd.arg(dest);
        self.runner
            .run(cmd)
            .with_context(|| format!("converting {}", image.display()))?;
        require_output(dest, "image conversion")
    }
}

impl PdfaWriter for Ghostscript {
    fn write_pdfa(&self, pages: &[PathBuf], dest: &Path) -> Result<()> {
        let def_path = dest.with_extension("pdfa_def.ps");
        let mut cmd = self.base_command();
        cmd.args([
            "-dPDFA=1",
            "-dPDFACompatibilityPolicy=1",
            "-sDEVICE=pdfwrite",
            "-sColorConversionStrategy=RGB",
            "-sProcessColorModel=DeviceRGB",
        ]);
        if let Some(icc) = &self.icc_profile {
            std::fs::write(&def_path, pdfa_definition(icc))
                .with_context(|| format!("writing {}", def_path.display()))?;
            let mut permit = std::ffi::OsString::from("--permit-file-read=");
            permit.push(icc);
            cmd.arg(permit);
        }
        cmd.arg("-o").arg(dest);
        if self.icc_profile.is_some() {
            cmd.arg(&def_path);
        }
        cmd.args(pages);

        debug!("writing PDF/A from {} pages", pages.len());
        let res = self.runner.run(cmd);
        if self.icc_profile.is_some() {
            let _ = std::fs::remove_file(&def_path);
        }
        res.with_context(|| format!("ghostscript PDF/A conversion to {}", dest.display()))?;
        require_output(dest, "ghostscript PDF/A")
    }

    fn merge(&self, pages: &[PathBuf], dest: &Path) -> Result<()> {
        let mut cmd = self.base_command();
        cmd.arg("-sDEVICE=pdfwrite").arg("-o").arg(dest).args(pages);
        self.runner
            .run(cmd)
            .with_context(|| format!("merging into {}", dest.display()))?;
        require_output(dest, "ghostscript merge")
    }
}

/// PostScript prologue declaring the sRGB output intent PDF/A-1 requires.
fn pdfa_definition(icc: &Path) -> String {
    let escaped = icc
        .display()
        .to_string()
        .replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)");
    format!(
        "%!\n\
/ICCProfile ({escaped}) def\n\
[/_objdef {{icc_PDFA}} /type /stream /OBJ pdfmark\n\
[{{icc_PDFA}} <</N 3>> /PUT pdfmark\n\
[{{icc_PDFA}} ICCProfile (r) file /PUT pdfmark\n\
[/_objdef {{OutputIntent_PDFA}} /type /dict /OBJ pdfmark\n\
[{{OutputIntent_PDFA}} <<\n\
  /Type /OutputIntent\n\
  /S /GTS_PDFA1\n\
  /DestOutputProfile {{icc_PDFA}}\n\
  /OutputConditionIdentifier (sRGB)\n\
>> /PUT pdfmark\n\
[{{Catalog}} <</OutputIntents [ {{OutputIntent_PDFA}} ]>> /PUT pdfmark\n"
    )
}
