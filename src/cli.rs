use crate::{
    config::Config,
    error::{EXIT_INVALID_OUTPUT_PDFA, EXIT_MISSING_DEPENDENCY, EXIT_OK, PipelineError},
    inspect::PageInspector,
    model::Verdict,
    pipeline::Pipeline,
    source,
    tools::{CancelToken, Toolbox, all_programs, process::is_available, required_programs},
    util::{ensure_dir, sha256_hex},
    workspace::RunWorkspace,
};
use anyhow::{Context, Result, anyhow};
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "scanpdfa", version)]
#[command(about = "Turn scanned PDFs and images into searchable PDF/A")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./scanpdfa.toml if present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the external programs are installed.
    Doctor {},
    /// Print the characteristics of every input page.
    Inspect {
        #[arg(long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
    },
    /// Produce a searchable PDF/A.
    Run {
        /// One PDF, or one or more images (one page each, in order).
        #[arg(long, required = true, num_args = 1..)]
        input: Vec<PathBuf>,
        #[arg(long)]
        output: PathBuf,
        #[command(flatten)]
        overrides: RunOverrides,
    },
}

/// Command-line settings that take precedence over the config file.
#[derive(ClapArgs, Debug, Default)]
pub struct RunOverrides {
    /// Recognition language; repeat for several.
    #[arg(short = 'l', long = "language")]
    pub languages: Vec<String>,
    /// Pages processed in parallel.
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,
    #[arg(long)]
    pub deskew: bool,
    #[arg(long)]
    pub clean: bool,
    /// Put the cleaned image into the output instead of the original.
    #[arg(long)]
    pub embed_cleaned: bool,
    /// Render pages below this resolution at it.
    #[arg(long, value_name = "DPI")]
    pub oversample: Option<u32>,
    /// Recognize pages that already have text.
    #[arg(long, conflicts_with = "skip_text")]
    pub force_ocr: bool,
    /// Copy pages that already have text unchanged.
    #[arg(long)]
    pub skip_text: bool,
    /// Also write <output-stem>.debug.pdf with visible text.
    #[arg(long)]
    pub debug: bool,
    #[arg(long)]
    pub keep_temporaries: bool,
    /// Extra recognition config profile; repeat for several.
    #[arg(long = "ocr-config", value_name = "PROFILE")]
    pub ocr_configs: Vec<String>,
    #[arg(long)]
    pub no_validate: bool,
}

impl RunOverrides {
    pub fn apply(&self, cfg: &mut Config) {
        if !self.languages.is_empty() {
            cfg.ocr.languages = self.languages.clone();
        }
        if !self.ocr_configs.is_empty() {
            cfg.ocr.extra_configs = self.ocr_configs.clone();
        }
        if let Some(jobs) = self.jobs {
            cfg.global.jobs = jobs;
        }
        if let Some(dpi) = self.oversample {
            cfg.resolution.oversample_dpi = dpi;
        }
        cfg.preprocess.deskew |= self.deskew;
        cfg.preprocess.clean |= self.clean;
        cfg.preprocess.embed_cleaned |= self.embed_cleaned;
        cfg.policy.force_ocr |= self.force_ocr;
        cfg.policy.skip_text |= self.skip_text;
        cfg.output.debug |= self.debug;
        cfg.global.keep_temporaries |= self.keep_temporaries;
        if self.no_validate {
            cfg.output.validate = false;
        }
    }
}

/// Execute the command and return the process exit status.
pub fn dispatch(args: Args) -> Result<i32, PipelineError> {
    let cfg_path = resolve_config_path(args.config.as_deref());
    let mut cfg = match &cfg_path {
        Some(path) => Config::load(path).map_err(|e| PipelineError::BadArguments(format!("{e:#}")))?,
        None => Config::default(),
    };

    match &args.cmd {
        Command::Doctor {} => {
            let log_path = resolve_log_path(&cfg);
            let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
            doctor(&cfg)
        }
        Command::Inspect { input } => {
            let log_path = resolve_log_path(&cfg);
            let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
            inspect(&cfg, input)
        }
        Command::Run {
            input,
            output,
            overrides,
        } => {
            overrides.apply(&mut cfg);
            let log_path = resolve_log_path(&cfg);
            let _guard = init_logging(&args, &cfg, log_path.as_deref())?;
            if let Some(path) = &cfg_path {
                info!("config {}", path.display());
            }
            run(&cfg, input, output)
        }
    }
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    let default = PathBuf::from("scanpdfa.toml");
    default.exists().then_some(default)
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout is reserved for JSON results.
    let console_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }
    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }
    Some(PathBuf::from(&cfg.paths.work_dir).join("scanpdfa.log"))
}

fn doctor(cfg: &Config) -> Result<i32, PipelineError> {
    let required: Vec<&str> = required_programs(cfg).into_iter().map(|(role, _)| role).collect();
    let mut missing_required = false;
    let programs: Vec<serde_json::Value> = all_programs(cfg)
        .into_iter()
        .map(|(role, program)| {
            let available = is_available(&program);
            let needed = required.contains(&role);
            if needed && !available {
                missing_required = true;
            }
            serde_json::json!({
                "role": role,
                "program": program,
                "available": available,
                "required": needed,
            })
        })
        .collect();

    let out = serde_json::json!({
        "ok": !missing_required,
        "programs": programs,
    });
    println!("{}", to_pretty(&out)?);
    Ok(if missing_required {
        EXIT_MISSING_DEPENDENCY
    } else {
        EXIT_OK
    })
}

fn inspect(cfg: &Config, inputs: &[PathBuf]) -> Result<i32, PipelineError> {
    let pcfg = cfg.pipeline()?;
    let cancel = CancelToken::new();
    let tools = Toolbox::from_config(cfg, &cancel);
    let pages = source::discover(
        inputs,
        tools.source.as_ref(),
        tools.metadata.as_ref(),
        pcfg.default_dpi,
    )?;

    let scratch = PathBuf::from(&cfg.paths.work_dir).join(format!("inspect-{}", std::process::id()));
    let workspace = RunWorkspace::create(&scratch)?;
    let inspector = PageInspector::new(
        tools.source.as_ref(),
        tools.metadata.as_ref(),
        pcfg.default_dpi,
    );

    let mut rows = Vec::with_capacity(pages.len());
    let mut failure = None;
    for page in &pages {
        let inspected = workspace
            .page(page.number)
            .and_then(|ws| inspector.inspect(page, ws.dir()));
        match inspected {
            Ok(chars) => rows.push(serde_json::json!({
                "page": page.number,
                "kind": page.kind,
                "width_pt": page.width_pt,
                "height_pt": page.height_pt,
                "hocr": page.hocr,
                "characteristics": chars,
            })),
            Err(err) => {
                failure = Some(PipelineError::Other(
                    err.context(format!("inspecting page {}", page.number)),
                ));
                break;
            }
        }
    }

    if let Err(err) = workspace.remove() {
        warn!("{err:#}");
    }
    if let Some(err) = failure {
        return Err(err);
    }
    println!("{}", to_pretty(&rows)?);
    Ok(EXIT_OK)
}

fn run(cfg: &Config, inputs: &[PathBuf], output: &Path) -> Result<i32, PipelineError> {
    let pcfg = cfg.pipeline()?;
    check_output(inputs, output)?;

    let missing: Vec<String> = required_programs(cfg)
        .into_iter()
        .filter(|(_, program)| !is_available(program))
        .map(|(role, program)| format!("{role} ({program})"))
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::MissingDependency(missing.join(", ")));
    }

    let cancel = CancelToken::new();
    let tools = Toolbox::from_config(cfg, &cancel);
    let pages = source::discover(
        inputs,
        tools.source.as_ref(),
        tools.metadata.as_ref(),
        pcfg.default_dpi,
    )?;

    let run_id = run_id(cfg, inputs, output);
    let workspace = RunWorkspace::create(&PathBuf::from(&cfg.paths.work_dir).join(&run_id))?;
    info!(
        "run_id={run_id} pages={} jobs={} workspace={}",
        pages.len(),
        pcfg.jobs,
        workspace.root().display()
    );

    if cfg.debug.dump_effective_config {
        let raw = toml::to_string(cfg).unwrap_or_default();
        std::fs::write(workspace.root().join("effective-config.toml"), raw)
            .context("writing effective config")?;
    }

    let pipeline = Pipeline::new(&pcfg, &tools, cfg.output.validate, cancel);
    let result = pipeline.run_job(&run_id, inputs, &pages, &workspace, output);

    if pcfg.keep_temporaries {
        info!("temporary files kept in {}", workspace.root().display());
    } else if let Err(err) = workspace.remove() {
        warn!("{err:#}");
    }
    let job = result?;

    if cfg.output.write_report_json {
        let mut path = OsString::from(output.as_os_str());
        path.push(".report.json");
        let path = PathBuf::from(path);
        std::fs::write(&path, to_pretty(&job.report)?)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    let verdict = job.outcome.verdict;
    if cfg.global.print_summary {
        println!(
            "{}",
            to_pretty(&serde_json::json!({
                "run_id": run_id,
                "output": output,
                "pages": job.outcome.pages.len(),
                "verdict": verdict,
                "debug_pdf": job.report.debug_pdf,
            }))?
        );
    }

    Ok(match verdict {
        Verdict::Valid | Verdict::NotAttempted => EXIT_OK,
        Verdict::Invalid => EXIT_INVALID_OUTPUT_PDFA,
    })
}

fn check_output(inputs: &[PathBuf], output: &Path) -> Result<(), PipelineError> {
    if output.as_os_str().is_empty() || output.is_dir() {
        return Err(PipelineError::BadArguments(format!(
            "output must be a file path: {}",
            output.display()
        )));
    }
    if inputs.iter().any(|i| i == output) {
        return Err(PipelineError::BadArguments(
            "output must not overwrite an input".into(),
        ));
    }
    Ok(())
}

/// Workspace name: stable for the same settings and files, unique per process.
fn run_id(cfg: &Config, inputs: &[PathBuf], output: &Path) -> String {
    let mut key = cfg.normalized_for_hash();
    for input in inputs {
        key.push('\n');
        key.push_str(&input.display().to_string());
    }
    key.push('\n');
    key.push_str(&output.display().to_string());
    let hash = sha256_hex(key.as_bytes());
    format!("{}-{}", &hash[..16], std::process::id())
}

fn to_pretty<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, PipelineError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| PipelineError::Other(anyhow!("serializing JSON: {e}")))
}
