use crate::util::ensure_dir;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

const PAGE_PDF: &str = "page.pdf";
const DEBUG_PDF: &str = "page.debug.pdf";

/// Scratch root of one run. Every page gets its own subdirectory.
#[derive(Debug)]
pub struct RunWorkspace {
    root: PathBuf,
}

impl RunWorkspace {
    pub fn create(root: &Path) -> Result<Self> {
        ensure_dir(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn page(&self, number: u32) -> Result<PageWorkspace> {
        let dir = self.root.join(format!("page-{number:05}"));
        ensure_dir(&dir)?;
        Ok(PageWorkspace { dir })
    }

    pub fn remove(self) -> Result<()> {
        debug!("removing workspace {}", self.root.display());
        std::fs::remove_dir_all(&self.root)
            .with_context(|| format!("remove_dir_all {}", self.root.display()))
    }
}

/// Directory owned by a single page job.
#[derive(Debug)]
pub struct PageWorkspace {
    dir: PathBuf,
}

impl PageWorkspace {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn page_pdf(&self) -> PathBuf {
        self.path(PAGE_PDF)
    }

    pub fn debug_pdf(&self) -> PathBuf {
        self.path(DEBUG_PDF)
    }

    /// Delete everything except the page's final PDFs.
    pub fn remove_intermediates(&self) -> Result<()> {
        for entry in std::fs::read_dir(&self.dir)
            .with_context(|| format!("read_dir {}", self.dir.display()))?
        {
            let entry = entry?;
            let name = entry.file_name();
            if name == PAGE_PDF || name == DEBUG_PDF {
                continue;
            }
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            }
            .with_context(|| format!("removing {}", path.display()))?;
        }
        Ok(())
    }
}
