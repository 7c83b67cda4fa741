//! Single-page PDF synthesis: the page raster with the recognized words laid
//! over it as invisible Helvetica text, so the page stays visually identical
//! but becomes searchable and selectable.

use crate::hocr::{self, TextElement};
use crate::tools::PageComposer;
use anyhow::{Context, Result, bail};
use image::{DynamicImage, GenericImageView};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream, StringFormat, dictionary};
use std::path::Path;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

const FONT_NAME: &str = "F1";
const IMAGE_NAME: &str = "Im0";

/// Render mode 3: neither fill nor stroke.
const RENDER_INVISIBLE: i64 = 3;
const RENDER_FILL: i64 = 0;

/// Characters grouped by how far they reach below the baseline (`low`) and
/// above it (`high`), as fractions of the font size.
struct CharClass {
    chars: &'static str,
    low: f64,
    high: f64,
}

const CHAR_CLASSES: &[CharClass] = &[
    CharClass {
        chars: "acemnorsuvwxz:",
        low: 0.0,
        high: 0.5,
    },
    CharClass {
        chars: "bdfhikltABCDEFGHIJLKMNOPQRSTUVWXYZâàéèêîôù0123456789!/%?\\ß€#",
        low: 0.0,
        high: 0.75,
    },
    CharClass {
        chars: "gpqyµ",
        low: -0.25,
        high: 0.75,
    },
    CharClass {
        chars: "j§{([)]}|@",
        low: -0.25,
        high: 1.0,
    },
    CharClass {
        chars: "üöä",
        low: 0.0,
        high: 0.7,
    },
    CharClass {
        chars: "ÉÈÊÔÎ",
        low: 0.0,
        high: 1.0,
    },
    CharClass {
        chars: ",",
        low: -0.15,
        high: 0.05,
    },
];

/// Vertical extent of `text` relative to the baseline. Text with no classified
/// characters spans one full unit.
pub fn vertical_bounds(text: &str) -> (f64, f64) {
    CHAR_CLASSES
        .iter()
        .filter(|class| class.chars.chars().any(|c| text.contains(c)))
        .fold((0.5, -0.5), |(low, high), class| {
            (low.min(class.low), high.max(class.high))
        })
}

/// Searchable form of recognized text: ligatures and other compatibility
/// characters decomposed, anything Helvetica/WinAnsi can't encode replaced.
pub fn clean_text(text: &str) -> String {
    text.nfkc()
        .map(|c| if winansi_byte(c).is_some() { c } else { '?' })
        .collect()
}

fn winansi_byte(c: char) -> Option<u8> {
    match c {
        ' '..='~' => Some(c as u8),
        '\u{a0}'..='\u{ff}' => Some(c as u32 as u8),
        '€' => Some(0x80),
        '‚' => Some(0x82),
        '„' => Some(0x84),
        '…' => Some(0x85),
        '‘' => Some(0x91),
        '’' => Some(0x92),
        '“' => Some(0x93),
        '”' => Some(0x94),
        '•' => Some(0x95),
        '–' => Some(0x96),
        '—' => Some(0x97),
        _ => None,
    }
}

fn encode_winansi(text: &str) -> Vec<u8> {
    text.chars().map(|c| winansi_byte(c).unwrap_or(b'?')).collect()
}

/// Helvetica advance widths for 0x20..=0x7e, in 1/1000 em.
const HELVETICA_ASCII: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // 'A'..'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // 'N'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // 'a'..'m'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // 'n'..'z'
    334, 260, 334, 584, // '{'..'~'
];

/// Width of `text` set in Helvetica at `size` points.
pub fn string_width(text: &str, size: f64) -> f64 {
    let units: u32 = text
        .chars()
        .map(|c| match c {
            ' '..='~' => u32::from(HELVETICA_ASCII[(c as usize) - 0x20]),
            _ => 556,
        })
        .sum();
    f64::from(units) / 1000.0 * size
}

/// Where and how large one word is drawn, in PDF user space.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub text: String,
    pub font_size: f64,
    pub x: f64,
    pub y: f64,
    /// Horizontal scaling in percent (the `Tz` operand).
    pub horizontal_scale: f64,
}

/// Fit a recognized word into its bounding box on a page `page_height_pt` tall.
pub fn place(element: &TextElement, dpi: u32, page_height_pt: f64) -> Option<Placement> {
    let text = clean_text(&element.text);
    if text.trim().is_empty() {
        return None;
    }
    let scale = 72.0 / f64::from(dpi);
    let b = element.bbox;
    let left = b.x0.min(b.x1) * scale;
    let bottom = page_height_pt - b.y0.max(b.y1) * scale;
    let width = b.width() * scale;
    let height = b.height() * scale;
    if width <= 0.0 || height <= 0.0 {
        return None;
    }

    let (low, high) = vertical_bounds(&text);
    let font_size = height / (high - low).abs();
    let natural = string_width(&text, font_size);
    if natural <= 0.0 {
        return None;
    }

    Some(Placement {
        x: left,
        y: bottom - low * font_size,
        horizontal_scale: 100.0 * width / natural,
        font_size,
        text,
    })
}

fn text_operations(placements: &[Placement], visible: bool) -> Vec<Operation> {
    let mode = if visible { RENDER_FILL } else { RENDER_INVISIBLE };
    let mut ops = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tr", vec![mode.into()]),
    ];
    for p in placements {
        ops.push(Operation::new(
            "Tf",
            vec![FONT_NAME.into(), (p.font_size as f32).into()],
        ));
        ops.push(Operation::new(
            "Tm",
            vec![
                1.into(),
                0.into(),
                0.into(),
                1.into(),
                (p.x as f32).into(),
                (p.y as f32).into(),
            ],
        ));
        ops.push(Operation::new(
            "Tz",
            vec![(p.horizontal_scale as f32).into()],
        ));
        ops.push(Operation::new(
            "Tj",
            vec![Object::String(encode_winansi(&p.text), StringFormat::Literal)],
        ));
    }
    ops.push(Operation::new("ET", vec![]));
    ops
}

/// Pixel data ready for an image XObject: (color space, bits per component, bytes).
fn image_samples(img: &DynamicImage) -> (&'static str, i64, Vec<u8>) {
    match img {
        DynamicImage::ImageLuma8(gray) => {
            if gray.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255) {
                ("DeviceGray", 1, pack_bilevel(gray.width(), gray.height(), gray.as_raw()))
            } else {
                ("DeviceGray", 8, gray.as_raw().clone())
            }
        }
        DynamicImage::ImageLuma16(_) | DynamicImage::ImageLumaA8(_) | DynamicImage::ImageLumaA16(_) => {
            ("DeviceGray", 8, img.to_luma8().into_raw())
        }
        _ => ("DeviceRGB", 8, img.to_rgb8().into_raw()),
    }
}

/// Pack 0/255 samples into 1 bit per pixel, rows padded to whole bytes; 1 is white.
fn pack_bilevel(width: u32, height: u32, samples: &[u8]) -> Vec<u8> {
    let width = width as usize;
    if width == 0 {
        return Vec::new();
    }
    let row_bytes = width.div_ceil(8);
    let mut out = vec![0u8; row_bytes * height as usize];
    for (y, row) in samples.chunks(width).enumerate() {
        for (x, &s) in row.iter().enumerate() {
            if s != 0 {
                out[y * row_bytes + x / 8] |= 0x80 >> (x % 8);
            }
        }
    }
    out
}

/// Build the page. With `visible` the text is drawn in black and the image is
/// omitted, which makes recognition mistakes easy to inspect.
pub fn build_page(
    img: &DynamicImage,
    elements: &[TextElement],
    dpi: u32,
    visible: bool,
) -> Result<Document> {
    if dpi == 0 {
        bail!("cannot compose a page at 0 dpi");
    }
    let (width_px, height_px) = img.dimensions();
    let width_pt = f64::from(width_px) * 72.0 / f64::from(dpi);
    let height_pt = f64::from(height_px) * 72.0 / f64::from(dpi);

    let placements: Vec<Placement> = elements
        .iter()
        .filter_map(|e| place(e, dpi, height_pt))
        .collect();
    debug!(
        words = placements.len(),
        width_pt, height_pt, "composing page"
    );

    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });

    let mut operations = Vec::new();
    let mut xobjects = Dictionary::new();
    if !visible {
        let (color_space, bits, samples) = image_samples(img);
        let image_id = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width_px),
                "Height" => i64::from(height_px),
                "ColorSpace" => color_space,
                "BitsPerComponent" => bits,
            },
            samples,
        ));
        xobjects.set(IMAGE_NAME, image_id);
        operations.push(Operation::new("q", vec![]));
        operations.push(Operation::new(
            "cm",
            vec![
                (width_pt as f32).into(),
                0.into(),
                0.into(),
                (height_pt as f32).into(),
                0.into(),
                0.into(),
            ],
        ));
        operations.push(Operation::new("Do", vec![IMAGE_NAME.into()]));
        operations.push(Operation::new("Q", vec![]));
    }
    operations.extend(text_operations(&placements, visible));

    let content = Content { operations }
        .encode()
        .with_context(|| "encoding page content")?;
    let content_id = doc.add_object(Stream::new(Dictionary::new(), content));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { FONT_NAME => font_id },
        "XObject" => xobjects,
    });
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), (width_pt as f32).into(), (height_pt as f32).into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    Ok(doc)
}

/// Composer used for real runs: decodes the raster with `image`, writes with `lopdf`.
pub struct HocrComposer;

impl PageComposer for HocrComposer {
    fn compose(
        &self,
        raster: &Path,
        hocr_path: &Path,
        dpi: u32,
        dest: &Path,
        visible: bool,
    ) -> Result<()> {
        let elements = hocr::parse_file(hocr_path)?;
        let img = image::open(raster)
            .with_context(|| format!("decoding raster: {}", raster.display()))?;
        let mut doc = build_page(&img, &elements, dpi, visible)?;
        doc.save(dest)
            .with_context(|| format!("writing page PDF: {}", dest.display()))?;
        Ok(())
    }
}
