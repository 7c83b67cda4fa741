use image::{DynamicImage, GrayImage, Luma};
use scanpdfa::compose::{build_page, clean_text, place, string_width, vertical_bounds};
use scanpdfa::hocr::{self, BBox, TextElement};

const HOCR: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
 <body>
  <div class='ocr_page' id='page_1' title='image "page.pnm"; bbox 0 0 2480 3508; ppageno 0'>
   <span class='ocr_line' id='line_1_1' title="bbox 300 400 1200 460; baseline 0 -12">
    <span class='ocrx_word' id='word_1_1' title='bbox 300 400 620 460; x_wconf 96'>Quarterly</span>
    <span class='ocrx_word' id='word_1_2' title='bbox 650 400 900 448; x_wconf 91'>report</span>
    <span class='ocrx_word' id='word_1_3' title='bbox 920 400 940 448; x_wconf 10'>  </span>
   </span>
  </div>
 </body>
</html>"#;

#[test]
fn words_with_boxes() {
    let words = hocr::parse(HOCR);
    assert_eq!(words.len(), 2);
    assert_eq!(words[0].text, "Quarterly");
    assert_eq!(
        words[0].bbox,
        BBox {
            x0: 300.0,
            y0: 400.0,
            x1: 620.0,
            y1: 460.0
        }
    );
    assert_eq!(words[1].text, "report");
}

#[test]
fn lines_when_no_words() {
    let raw = r#"<html><body><span class="ocr_line" title="bbox 10 20 110 40">two  words</span></body></html>"#;
    let words = hocr::parse(raw);
    assert_eq!(words.len(), 1);
    assert_eq!(words[0].text, "two words");
}

#[test]
fn bbox_from_title() {
    let b = hocr::parse_bbox("bbox 1 2 30 40; x_wconf 90").unwrap();
    assert_eq!(b.width(), 29.0);
    assert_eq!(b.height(), 38.0);
    assert!(hocr::parse_bbox("x_wconf 90").is_none());
}

#[test]
fn character_classes_set_vertical_extent() {
    assert_eq!(vertical_bounds("ace"), (0.0, 0.5));
    assert_eq!(vertical_bounds("Bag"), (-0.25, 0.75));
    assert_eq!(vertical_bounds("(x)"), (-0.25, 1.0));
    // nothing classified spans a full unit around the baseline
    assert_eq!(vertical_bounds("~"), (0.5, -0.5));
}

#[test]
fn ligatures_are_decomposed_and_unencodable_replaced() {
    assert_eq!(clean_text("\u{fb01}le"), "file");
    assert_eq!(clean_text("caf\u{e9}"), "café");
    assert_eq!(clean_text("\u{4e2d}"), "?");
}

#[test]
fn word_fills_its_box() {
    let word = TextElement {
        text: "area".into(),
        bbox: BBox {
            x0: 300.0,
            y0: 400.0,
            x1: 600.0,
            y1: 450.0,
        },
    };
    let p = place(&word, 300, 842.0).unwrap();

    let scale = 72.0 / 300.0;
    // x-height only word: 50 px high box holds half an em
    assert!((p.font_size - 50.0 * scale / 0.5).abs() < 1e-9);
    assert!((p.x - 300.0 * scale).abs() < 1e-9);
    assert!((p.y - (842.0 - 450.0 * scale)).abs() < 1e-9);
    let drawn = string_width("area", p.font_size) * p.horizontal_scale / 100.0;
    assert!((drawn - 300.0 * scale).abs() < 1e-6);
}

#[test]
fn empty_box_is_dropped() {
    let word = TextElement {
        text: "x".into(),
        bbox: BBox {
            x0: 10.0,
            y0: 10.0,
            x1: 10.0,
            y1: 20.0,
        },
    };
    assert!(place(&word, 300, 842.0).is_none());
}

#[test]
fn page_size_follows_raster_and_dpi() {
    let mut img = GrayImage::from_pixel(600, 300, Luma([255u8]));
    img.put_pixel(10, 10, Luma([0u8]));
    let img = DynamicImage::ImageLuma8(img);
    let words = hocr::parse(HOCR);

    let mut doc = build_page(&img, &words, 300, false).unwrap();
    assert_eq!(doc.get_pages().len(), 1);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("page.pdf");
    doc.save(&path).unwrap();

    let loaded = lopdf::Document::load(&path).unwrap();
    let (_, page_id) = loaded.get_pages().into_iter().next().unwrap();
    let page = loaded.get_dictionary(page_id).unwrap();
    let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
    let width = media_box[2].as_float().unwrap();
    let height = media_box[3].as_float().unwrap();
    assert!((width - 144.0).abs() < 0.01);
    assert!((height - 72.0).abs() < 0.01);
}

#[test]
fn zero_dpi_is_rejected() {
    let img = DynamicImage::ImageLuma8(GrayImage::new(10, 10));
    assert!(build_page(&img, &[], 0, false).is_err());
}
