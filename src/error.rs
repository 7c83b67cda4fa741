use std::fmt;
use thiserror::Error;

pub const EXIT_OK: i32 = 0;
pub const EXIT_BAD_ARGS: i32 = 1;
pub const EXIT_BAD_INPUT_FILE: i32 = 2;
pub const EXIT_MISSING_DEPENDENCY: i32 = 3;
pub const EXIT_INVALID_OUTPUT_PDFA: i32 = 4;
pub const EXIT_OTHER_ERROR: i32 = 5;

/// Which step of the page pipeline failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageErrorKind {
    AlreadyHasText,
    /// The transformer recovers from an ambiguous extraction with the default
    /// resolution and color, so it never fails a page with this kind. It is
    /// kept so the taxonomy stays complete for callers driving the inspector.
    AmbiguousExtraction,
    ExtractionFailed,
    PreprocessFailed,
    RecognitionFailed,
    ComposeFailed,
}

impl fmt::Display for PageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AlreadyHasText => "text layer present",
            Self::AmbiguousExtraction => "ambiguous image extraction",
            Self::ExtractionFailed => "extraction failed",
            Self::PreprocessFailed => "preprocessing failed",
            Self::RecognitionFailed => "recognition failed",
            Self::ComposeFailed => "compose failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("bad arguments: {0}")]
    BadArguments(String),

    #[error("missing dependency: {0}")]
    MissingDependency(String),

    #[error("bad input file: {0}")]
    BadInputFile(String),

    #[error("page {page}: {kind}: {detail}")]
    Page {
        page: u32,
        kind: PageErrorKind,
        detail: String,
    },

    #[error("assembly failed: {0}")]
    AssemblyFailed(String),

    #[error("validation inconclusive: {0}")]
    ValidationInconclusive(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Wrap a tool failure as a page error, flattening the context chain into one line.
    pub fn page(page: u32, kind: PageErrorKind, err: anyhow::Error) -> Self {
        Self::Page {
            page,
            kind,
            detail: format!("{err:#}"),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::BadArguments(_) => EXIT_BAD_ARGS,
            Self::MissingDependency(_) => EXIT_MISSING_DEPENDENCY,
            Self::BadInputFile(_) => EXIT_BAD_INPUT_FILE,
            Self::Page { .. }
            | Self::AssemblyFailed(_)
            | Self::ValidationInconclusive(_)
            | Self::Other(_) => EXIT_OTHER_ERROR,
        }
    }

    pub fn page_number(&self) -> Option<u32> {
        match self {
            Self::Page { page, .. } => Some(*page),
            _ => None,
        }
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
