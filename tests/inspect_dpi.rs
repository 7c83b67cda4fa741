mod common;

use common::{Fixture, scan_info};
use scanpdfa::inspect::{PageInspector, analytic_dpi, effective_dpi, resolution_dpi};
use scanpdfa::model::{
    ColorModel, RecognitionStatus, Resolution, ResolutionUnit, SourceKind,
};

#[test]
fn a4_scan_at_300_dpi() {
    let dpi = analytic_dpi(2480, 3508, 595.0, 842.0).unwrap();
    assert!((299..=301).contains(&dpi), "got {dpi}");
}

#[test]
fn analytic_dpi_rejects_degenerate_sizes() {
    assert_eq!(analytic_dpi(0, 100, 595.0, 842.0), None);
    assert_eq!(analytic_dpi(100, 100, 0.0, 842.0), None);
}

#[test]
fn centimeter_resolution_converts_to_inches() {
    let res = Resolution {
        value: 118.11,
        unit: ResolutionUnit::PixelsPerCentimeter,
    };
    assert_eq!(resolution_dpi(res), 300);

    let res = Resolution {
        value: 200.0,
        unit: ResolutionUnit::PixelsPerInch,
    };
    assert_eq!(resolution_dpi(res), 200);
}

#[test]
fn declared_resolution_wins_over_page_geometry() {
    let mut info = scan_info();
    info.resolution = Some(Resolution {
        value: 150.0,
        unit: ResolutionUnit::PixelsPerInch,
    });
    assert_eq!(effective_dpi(&info, 595.0, 842.0), Some(150));
}

#[test]
fn inspection_is_deterministic() {
    let fx = Fixture::new(1);
    let tools = fx.toolbox();
    let inspector = PageInspector::new(tools.source.as_ref(), tools.metadata.as_ref(), 300);
    let page = &fx.pages()[0];
    let dir = tempfile::tempdir().unwrap();

    let first = inspector.inspect(page, dir.path()).unwrap();
    for _ in 0..5 {
        assert_eq!(inspector.inspect(page, dir.path()).unwrap(), first);
    }
    assert_eq!(first.status, RecognitionStatus::NoExistingText);
    assert_eq!(first.color, ColorModel::Monochrome);
    assert_eq!(first.bit_depth, 1);
    assert!((299..=301).contains(&first.dpi));
}

#[test]
fn page_with_fonts_has_existing_text() {
    let mut fx = Fixture::new(1);
    fx.fonts.insert(1, 2);
    let tools = fx.toolbox();
    let inspector = PageInspector::new(tools.source.as_ref(), tools.metadata.as_ref(), 300);
    let dir = tempfile::tempdir().unwrap();

    let chars = inspector.inspect(&fx.pages()[0], dir.path()).unwrap();
    assert_eq!(chars.status, RecognitionStatus::HasExistingText);
}

#[test]
fn several_images_fall_back_to_defaults() {
    let mut fx = Fixture::new(1);
    fx.images.insert(1, 3);
    let tools = fx.toolbox();
    let inspector = PageInspector::new(tools.source.as_ref(), tools.metadata.as_ref(), 240);
    let dir = tempfile::tempdir().unwrap();

    let chars = inspector.inspect(&fx.pages()[0], dir.path()).unwrap();
    assert_eq!(chars.status, RecognitionStatus::AmbiguousExtraction);
    assert_eq!(chars.dpi, 240);
    assert_eq!(chars.color, ColorModel::Color);
    assert_eq!(chars.bit_depth, 8);
}

#[test]
fn standalone_image_without_resolution_uses_geometry() {
    let fx = Fixture::new(1);
    let tools = fx.toolbox();
    let inspector = PageInspector::new(tools.source.as_ref(), tools.metadata.as_ref(), 72);
    let mut page = fx.pages()[0].clone();
    page.kind = SourceKind::StandaloneImage;
    page.source = "scan.png".into();
    let dir = tempfile::tempdir().unwrap();

    let chars = inspector.inspect(&page, dir.path()).unwrap();
    assert!((299..=301).contains(&chars.dpi));
}
