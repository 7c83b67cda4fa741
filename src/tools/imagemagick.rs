use super::process::{Runner, require_output};
use super::{Deskewer, MetadataReader};
use crate::model::{ColorModel, RasterInfo, Resolution, ResolutionUnit};
use anyhow::{Context, Result, anyhow};
use regex::Regex;
use std::path::Path;
use std::process::Command;
use std::sync::LazyLock;

const IDENTIFY_FORMAT: &str = "%w|%h|%[colorspace]|%z|%x|%U\n";

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+(?:\.[0-9]+)?").expect("valid regex"));

pub struct Identify {
    runner: Runner,
    program: String,
}

impl Identify {
    pub fn new(runner: Runner, program: &str) -> Self {
        Self {
            runner,
            program: program.to_string(),
        }
    }
}

impl MetadataReader for Identify {
    fn read(&self, raster: &Path) -> Result<RasterInfo> {
        // [0] keeps multi-frame inputs (TIFF) to their first frame.
        let mut target = raster.as_os_str().to_os_string();
        target.push("[0]");

        let mut cmd = Command::new(&self.program);
        cmd.arg("-format").arg(IDENTIFY_FORMAT).arg(target);
        let out = self
            .runner
            .stdout(cmd)
            .with_context(|| format!("identify {}", raster.display()))?;
        parse_identify(&out)
    }
}

/// Parse one line of `identify -format "%w|%h|%[colorspace]|%z|%x|%U"`.
pub fn parse_identify(out: &str) -> Result<RasterInfo> {
    let line = out
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| anyhow!("identify printed nothing"))?;
    let fields: Vec<&str> = line.split('|').map(str::trim).collect();
    if fields.len() < 6 {
        return Err(anyhow!("unexpected identify output: {line}"));
    }

    let width_px: u32 = fields[0].parse().with_context(|| "width")?;
    let height_px: u32 = fields[1].parse().with_context(|| "height")?;
    let bit_depth: u8 = fields[3].parse().with_context(|| "depth")?;

    let color = match fields[2].to_ascii_lowercase().as_str() {
        "gray" | "grey" | "lineargray" if bit_depth == 1 => ColorModel::Monochrome,
        "gray" | "grey" | "lineargray" => ColorModel::Gray,
        _ => ColorModel::Color,
    };

    let density: f64 = NUMBER_RE
        .find(fields[4])
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.0);
    let unit = match fields[5] {
        "PixelsPerInch" => Some(ResolutionUnit::PixelsPerInch),
        "PixelsPerCentimeter" => Some(ResolutionUnit::PixelsPerCentimeter),
        _ => None,
    };
    let resolution = match unit {
        Some(unit) if density > 0.0 => Some(Resolution {
            value: density,
            unit,
        }),
        _ => None,
    };

    Ok(RasterInfo {
        width_px,
        height_px,
        color,
        bit_depth,
        resolution,
    })
}

pub struct Deskew {
    runner: Runner,
    convert: String,
    identify: String,
    threshold: String,
}

impl Deskew {
    pub fn new(runner: Runner, convert: &str, identify: &str, threshold: &str) -> Self {
        Self {
            runner,
            convert: convert.to_string(),
            identify: identify.to_string(),
            threshold: threshold.to_string(),
        }
    }
}

impl Deskewer for Deskew {
    fn deskew(&self, input: &Path, output: &Path) -> Result<()> {
        let mut size_query = Command::new(&self.identify);
        size_query.arg("-format").arg("%wx%h").arg(input);
        let geometry = self.runner.stdout(size_query)?;

        // Rotation grows the canvas; crop back to the input geometry around the center.
        let mut cmd = Command::new(&self.convert);
        cmd.arg(input)
            .args(["-background", "white", "-deskew"])
            .arg(&self.threshold)
            .args(["+repage", "-gravity", "center", "-extent"])
            .arg(geometry.trim())
            .arg(output);
        self.runner.run(cmd)?;
        require_output(output, "deskew")
    }
}
