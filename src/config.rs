use crate::error::PipelineError;
use crate::model::{PipelineConfig, TextPolicy};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: Global,
    #[serde(default)]
    pub paths: Paths,
    #[serde(default)]
    pub ocr: Ocr,
    #[serde(default)]
    pub policy: Policy,
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default)]
    pub preprocess: Preprocess,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub tools: Tools,
    #[serde(default)]
    pub pdfa: Pdfa,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }

    /// A stable, normalization-friendly string for hashing.
    pub fn normalized_for_hash(&self) -> String {
        toml::to_string(self).unwrap_or_default()
    }

    /// Freeze the settings every page job sees.
    pub fn pipeline(&self) -> Result<PipelineConfig, PipelineError> {
        let text_policy = match (self.policy.force_ocr, self.policy.skip_text) {
            (true, true) => {
                return Err(PipelineError::BadArguments(
                    "force_ocr and skip_text are mutually exclusive".into(),
                ));
            }
            (true, false) => TextPolicy::Force,
            (false, true) => TextPolicy::Skip,
            (false, false) => TextPolicy::Refuse,
        };

        let languages: Vec<String> = self
            .ocr
            .languages
            .iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        if languages.is_empty() {
            return Err(PipelineError::BadArguments(
                "at least one OCR language is required".into(),
            ));
        }
        if self.resolution.default_dpi == 0 {
            return Err(PipelineError::BadArguments("default_dpi must be >= 1".into()));
        }

        let jobs = if self.global.jobs == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            self.global.jobs
        };

        Ok(PipelineConfig {
            languages,
            extra_configs: self.ocr.extra_configs.clone(),
            text_policy,
            oversample_dpi: (self.resolution.oversample_dpi > 0)
                .then_some(self.resolution.oversample_dpi),
            default_dpi: self.resolution.default_dpi,
            low_dpi_warning: self.resolution.low_dpi_warning,
            deskew: self.preprocess.deskew,
            clean: self.preprocess.clean || self.preprocess.embed_cleaned,
            embed_cleaned: self.preprocess.embed_cleaned,
            debug: self.output.debug,
            keep_temporaries: self.global.keep_temporaries,
            jobs,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Global {
    pub keep_temporaries: bool,
    /// Worker count; 0 means available parallelism.
    pub jobs: usize,
    pub print_summary: bool,
}
impl Default for Global {
    fn default() -> Self {
        Self {
            keep_temporaries: false,
            jobs: 0,
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    pub work_dir: String,
}
impl Default for Paths {
    fn default() -> Self {
        Self {
            work_dir: ".scanpdfa-work".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Ocr {
    pub languages: Vec<String>,
    /// Extra tesseract config profiles appended to every invocation.
    pub extra_configs: Vec<String>,
}
impl Default for Ocr {
    fn default() -> Self {
        Self {
            languages: vec!["eng".into()],
            extra_configs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    pub force_ocr: bool,
    pub skip_text: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Resolution {
    /// 0 disables oversampling.
    pub oversample_dpi: u32,
    pub default_dpi: u32,
    pub low_dpi_warning: u32,
}
impl Default for Resolution {
    fn default() -> Self {
        Self {
            oversample_dpi: 0,
            default_dpi: 300,
            low_dpi_warning: 200,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Preprocess {
    pub deskew: bool,
    pub clean: bool,
    pub embed_cleaned: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub validate: bool,
    pub debug: bool,
    pub write_report_json: bool,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            validate: true,
            debug: false,
            write_report_json: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Tools {
    pub ghostscript: String,
    pub pdfinfo: String,
    pub pdffonts: String,
    pub pdfimages: String,
    pub pdfseparate: String,
    pub identify: String,
    pub convert: String,
    pub unpaper: String,
    pub tesseract: String,
    pub jhove: String,
    /// Per-invocation limit; 0 disables the timeout.
    pub timeout_seconds: u64,
    pub deskew_threshold: String,
}
impl Default for Tools {
    fn default() -> Self {
        Self {
            ghostscript: "gs".into(),
            pdfinfo: "pdfinfo".into(),
            pdffonts: "pdffonts".into(),
            pdfimages: "pdfimages".into(),
            pdfseparate: "pdfseparate".into(),
            identify: "identify".into(),
            convert: "convert".into(),
            unpaper: "unpaper".into(),
            tesseract: "tesseract".into(),
            jhove: "jhove".into(),
            timeout_seconds: 600,
            deskew_threshold: "40%".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Pdfa {
    /// ICC profile embedded as the PDF/A output intent. Empty skips the output intent.
    pub icc_profile: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Debug {
    pub dump_effective_config: bool,
}
