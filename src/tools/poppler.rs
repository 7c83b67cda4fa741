use super::process::{Runner, require_output};
use super::{DocumentSource, PageSize};
use crate::model::Page;
use anyhow::{Context, Result, anyhow};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

static PAGE_SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^Page\s+(\d+)\s+size:\s+([\d.]+)\s+x\s+([\d.]+)\s+pts").expect("valid regex")
});
static DOC_SIZE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^Page size:\s+([\d.]+)\s+x\s+([\d.]+)\s+pts").expect("valid regex")
});
static PAGES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Pages:\s+(\d+)").expect("valid regex"));

pub struct Programs {
    pub pdfinfo: String,
    pub pdffonts: String,
    pub pdfimages: String,
    pub pdfseparate: String,
}

/// Document access through poppler-utils.
pub struct Poppler {
    runner: Runner,
    programs: Programs,
}

impl Poppler {
    pub fn new(runner: Runner, programs: Programs) -> Self {
        Self { runner, programs }
    }
}

impl DocumentSource for Poppler {
    fn page_sizes(&self, document: &Path) -> Result<Vec<PageSize>> {
        let mut cmd = Command::new(&self.programs.pdfinfo);
        cmd.args(["-f", "1", "-l", "1000000"]).arg(document);
        let out = self
            .runner
            .stdout(cmd)
            .with_context(|| format!("pdfinfo {}", document.display()))?;
        parse_pdfinfo(&out)
    }

    fn font_count(&self, page: &Page) -> Result<usize> {
        let mut cmd = Command::new(&self.programs.pdffonts);
        page_range(&mut cmd, page).arg(&page.source);
        let out = self.runner.stdout(cmd)?;
        Ok(parse_pdffonts(&out))
    }

    fn extract_images(&self, page: &Page, dest_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut cmd = Command::new(&self.programs.pdfimages);
        page_range(&mut cmd, page)
            .arg(&page.source)
            .arg(dest_dir.join("embedded"));
        self.runner.run(cmd)?;

        let mut images = Vec::new();
        for entry in std::fs::read_dir(dest_dir)
            .with_context(|| format!("read_dir {}", dest_dir.display()))?
        {
            let path = entry?.path();
            let is_extracted = path
                .file_name()
                .and_then(|s| s.to_str())
                .is_some_and(|s| s.starts_with("embedded-"));
            if is_extracted {
                images.push(path);
            }
        }
        images.sort();
        Ok(images)
    }

    fn extract_page(&self, page: &Page, dest: &Path) -> Result<()> {
        let mut cmd = Command::new(&self.programs.pdfseparate);
        page_range(&mut cmd, page).arg(&page.source).arg(dest);
        self.runner.run(cmd)?;
        require_output(dest, "pdfseparate")
    }
}

fn page_range<'a>(cmd: &'a mut Command, page: &Page) -> &'a mut Command {
    let n = page.number.to_string();
    cmd.arg("-f").arg(&n).arg("-l").arg(&n)
}

/// Per-page sizes from `pdfinfo -f 1 -l N`; falls back to the document-wide size line.
pub fn parse_pdfinfo(out: &str) -> Result<Vec<PageSize>> {
    let mut sizes: Vec<(u32, PageSize)> = PAGE_SIZE_RE
        .captures_iter(out)
        .filter_map(|c| {
            Some((
                c[1].parse().ok()?,
                PageSize {
                    width_pt: c[2].parse().ok()?,
                    height_pt: c[3].parse().ok()?,
                },
            ))
        })
        .collect();

    if sizes.is_empty() {
        let pages: usize = PAGES_RE
            .captures(out)
            .and_then(|c| c[1].parse().ok())
            .ok_or_else(|| anyhow!("pdfinfo reported no page count"))?;
        let c = DOC_SIZE_RE
            .captures(out)
            .ok_or_else(|| anyhow!("pdfinfo reported no page size"))?;
        let size = PageSize {
            width_pt: c[1].parse()?,
            height_pt: c[2].parse()?,
        };
        return Ok(vec![size; pages]);
    }

    sizes.sort_by_key(|(n, _)| *n);
    Ok(sizes.into_iter().map(|(_, s)| s).collect())
}

/// Count font rows in `pdffonts` output, ignoring Type 3 bitmap fonts.
pub fn parse_pdffonts(out: &str) -> usize {
    out.lines()
        .skip_while(|l| !l.starts_with("---"))
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .filter(|l| !l.contains("Type 3"))
        .count()
}
