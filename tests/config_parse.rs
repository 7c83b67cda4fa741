use clap::Parser;
use scanpdfa::cli::{Args, Command};
use scanpdfa::config::Config;
use scanpdfa::error::{EXIT_BAD_ARGS, PipelineError};
use scanpdfa::model::TextPolicy;

#[test]
fn parse_example_config() {
    let raw = include_str!("../scanpdfa.example.toml");
    let cfg: Config = toml::from_str(raw).expect("parse TOML");
    assert_eq!(cfg.ocr.languages, vec!["eng".to_string()]);
    assert_eq!(cfg.resolution.default_dpi, 300);
    assert!(!cfg.paths.work_dir.is_empty());

    let pipeline = cfg.pipeline().expect("valid settings");
    assert_eq!(pipeline.text_policy, TextPolicy::Refuse);
    assert_eq!(pipeline.oversample_dpi, None);
    assert!(pipeline.jobs >= 1);
}

#[test]
fn partial_config_keeps_defaults() {
    let cfg: Config = toml::from_str("[ocr]\nlanguages = [\"deu\", \"eng\"]\n").unwrap();
    assert_eq!(cfg.tools.tesseract, "tesseract");
    assert!(cfg.output.validate);
    assert_eq!(cfg.pipeline().unwrap().language_arg(), "deu+eng");
}

#[test]
fn force_and_skip_conflict() {
    let mut cfg = Config::default();
    cfg.policy.force_ocr = true;
    cfg.policy.skip_text = true;
    let err = cfg.pipeline().unwrap_err();
    assert!(matches!(err, PipelineError::BadArguments(_)));
    assert_eq!(err.exit_code(), EXIT_BAD_ARGS);
}

#[test]
fn embed_cleaned_implies_clean() {
    let mut cfg = Config::default();
    cfg.preprocess.embed_cleaned = true;
    let pipeline = cfg.pipeline().unwrap();
    assert!(pipeline.clean);
    assert!(pipeline.embed_cleaned);
}

#[test]
fn command_line_overrides_config() {
    let args = Args::try_parse_from([
        "scanpdfa",
        "run",
        "--input",
        "scan.pdf",
        "--output",
        "out.pdf",
        "-l",
        "fra",
        "-l",
        "eng",
        "-j",
        "3",
        "--oversample",
        "300",
        "--skip-text",
        "--no-validate",
    ])
    .unwrap();
    let Command::Run { overrides, .. } = args.cmd else {
        panic!("expected run");
    };

    let mut cfg = Config::default();
    overrides.apply(&mut cfg);
    let pipeline = cfg.pipeline().unwrap();
    assert_eq!(pipeline.language_arg(), "fra+eng");
    assert_eq!(pipeline.jobs, 3);
    assert_eq!(pipeline.oversample_dpi, Some(300));
    assert_eq!(pipeline.text_policy, TextPolicy::Skip);
    assert!(!cfg.output.validate);
}

#[test]
fn force_ocr_and_skip_text_flags_conflict() {
    let res = Args::try_parse_from([
        "scanpdfa",
        "run",
        "--input",
        "scan.pdf",
        "--output",
        "out.pdf",
        "--force-ocr",
        "--skip-text",
    ]);
    assert!(res.is_err());
}
