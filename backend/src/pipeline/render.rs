//! # Mark-sheet rendering
//!
//! Lays out one student's marks as a PDF with `genpdf`:
//!
//! 1. institution logo, top left, fixed width;
//! 2. institution name as a centered bold heading in the same top band,
//!    which is padded so the body starts `HEADER_BAND_MM` below the margin;
//! 3. name, class and department, one per line;
//! 4. a bordered two-column table, 100mm "Subject" and 40mm "Marks";
//! 5. one table row per subject, the label wrapping inside its cell and the
//!    mark centered beside it;
//! 6. the total marks line;
//! 7. the two signature labels on one line, pushed to opposite edges.
//!
//! All student-provided text passes through [`to_plain_text`] first so the
//! fonts never see characters they cannot encode.

use crate::error::{PipelineError, Result};
use crate::pipeline::spreadsheet::format_number;
use crate::pipeline::text::{artifact_stem, to_plain_text};
use crate::pipeline::RenderedArtifact;
use common::model::student::StudentRecord;
use genpdf::elements::{Break, FrameCellDecorator, Image as PdfImage, Paragraph, TableLayout};
use genpdf::fonts::{FontData, FontFamily};
use genpdf::style::{Style, StyledString};
use genpdf::{Alignment, Document, Element, Margins, SimplePageDecorator};
use image::{load_from_memory, DynamicImage, GenericImageView};
use log::debug;
use png::{BitDepth as PngBitDepth, ColorType as PngColorType, Encoder as PngEncoder};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const LOGO_WIDTH_MM: f64 = 33.0;
const MM_PER_INCH: f64 = 25.4;
const MARGIN_MM: i32 = 10;
/// A4 width minus both margins.
const TEXT_WIDTH_MM: i32 = 210 - 2 * MARGIN_MM;
/// Height of the logo and heading band, including the gap below it.
const HEADER_BAND_MM: f64 = 60.0;
const HEADING_FONT_SIZE: u8 = 16;
const BODY_FONT_SIZE: u8 = 12;
/// Column widths of the marks table in mm; the rest of the line stays empty.
const SUBJECT_COLUMN_MM: i32 = 100;
const MARKS_COLUMN_MM: i32 = 40;
/// Logo, heading and an empty column balancing the logo.
const BAND_WEIGHTS: [usize; 3] = [1, 3, 1];

/// Turns a student record into a document on local disk.
pub trait ReportRenderer: Send + Sync {
    fn render(&self, record: &StudentRecord) -> Result<RenderedArtifact>;
}

/// Where the institution logo comes from.
#[derive(Debug, Clone)]
pub enum LogoSource {
    /// Read on every render; a missing file fails that render.
    File(PathBuf),
    Bytes(Vec<u8>),
}

impl LogoSource {
    fn load(&self) -> Result<Vec<u8>> {
        match self {
            LogoSource::File(path) => fs::read(path).map_err(|e| {
                PipelineError::Render(format!(
                    "logo asset {} is missing or unreadable: {}",
                    path.display(),
                    e
                ))
            }),
            LogoSource::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}

/// Fixed institution texts printed on every report.
#[derive(Debug, Clone)]
pub struct Branding {
    pub institution_name: String,
    pub department_name: String,
    pub hod_signature: String,
}

/// Every string printed on one report, already reduced to plain text.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLayout {
    pub heading: String,
    pub identity_lines: Vec<String>,
    /// `(subject, mark)` in column order.
    pub rows: Vec<(String, String)>,
    pub total_line: String,
    pub signatures: (String, String),
}

impl ReportLayout {
    pub fn for_record(record: &StudentRecord, branding: &Branding) -> Self {
        Self {
            heading: to_plain_text(&branding.institution_name),
            identity_lines: vec![
                format!("Name: {}", to_plain_text(&record.name)),
                format!("Class: {}", to_plain_text(&record.class_name)),
                format!("Dept: {}", to_plain_text(&branding.department_name)),
            ],
            rows: record
                .subject_marks()
                .map(|(subject, mark)| (to_plain_text(subject), format_number(mark)))
                .collect(),
            total_line: format!(
                "Total Marks scored by the student is {}",
                format_number(record.total_marks)
            ),
            signatures: (
                to_plain_text(&branding.hod_signature),
                "Signature of Principal".to_string(),
            ),
        }
    }
}

/// `genpdf` implementation writing `<output_dir>/<stem>.pdf`.
pub struct GenpdfRenderer {
    fonts: FontFamily<FontData>,
    logo: LogoSource,
    branding: Branding,
    output_dir: PathBuf,
}

impl GenpdfRenderer {
    pub fn new(
        fonts: FontFamily<FontData>,
        logo: LogoSource,
        branding: Branding,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fonts,
            logo,
            branding,
            output_dir: output_dir.into(),
        }
    }

    fn build_document(&self, layout: &ReportLayout, logo: &PreparedLogo) -> Result<Document> {
        let mut doc = Document::new(self.fonts.clone());
        doc.set_title(layout.heading.clone());
        doc.set_font_size(BODY_FONT_SIZE);
        doc.set_line_spacing(1.0f64);

        let mut decorator = SimplePageDecorator::new();
        decorator.set_margins(MARGIN_MM);
        doc.set_page_decorator(decorator);

        let mut logo_image = PdfImage::from_path(logo.file.path())?;
        logo_image.set_alignment(Alignment::Left);
        logo_image.set_dpi(logo.dpi);

        let mut band = TableLayout::new(BAND_WEIGHTS.to_vec());
        band
            .row()
            .element(logo_image)
            .element(
                Paragraph::new(StyledString::new(
                    layout.heading.clone(),
                    Style::new().bold().with_font_size(HEADING_FONT_SIZE),
                ))
                .aligned(Alignment::Center),
            )
            .element(Paragraph::new(""))
            .push()?;
        let gap = (HEADER_BAND_MM - logo.height_mm).max(0.0);
        doc.push(band.padded(Margins::trbl(0.0, 0.0, gap, 0.0)));

        for line in &layout.identity_lines {
            doc.push(Paragraph::new(line.clone()));
        }
        doc.push(Break::new(1));

        let mut table = TableLayout::new(vec![
            SUBJECT_COLUMN_MM as usize,
            MARKS_COLUMN_MM as usize,
        ]);
        table.set_cell_decorator(FrameCellDecorator::new(true, true, false));
        table
            .row()
            .element(bold_cell("Subject").padded(1))
            .element(bold_cell("Marks").aligned(Alignment::Center).padded(1))
            .push()?;
        for (subject, mark) in &layout.rows {
            table
                .row()
                .element(Paragraph::new(subject.clone()).padded(1))
                .element(Paragraph::new(mark.clone()).aligned(Alignment::Center).padded(1))
                .push()?;
        }
        let unused = TEXT_WIDTH_MM - SUBJECT_COLUMN_MM - MARKS_COLUMN_MM;
        doc.push(table.padded(Margins::trbl(0, unused, 0, 0)));

        doc.push(Break::new(1));
        doc.push(Paragraph::new(layout.total_line.clone()));
        doc.push(Break::new(2));

        let mut signatures = TableLayout::new(vec![1, 1]);
        signatures
            .row()
            .element(Paragraph::new(layout.signatures.0.clone()))
            .element(Paragraph::new(layout.signatures.1.clone()).aligned(Alignment::Right))
            .push()?;
        doc.push(signatures);

        Ok(doc)
    }
}

impl ReportRenderer for GenpdfRenderer {
    fn render(&self, record: &StudentRecord) -> Result<RenderedArtifact> {
        let logo_bytes = self.logo.load()?;
        let logo = prepare_logo(&logo_bytes)?;

        let layout = ReportLayout::for_record(record, &self.branding);
        let doc = self.build_document(&layout, &logo)?;

        fs::create_dir_all(&self.output_dir).map_err(|e| {
            PipelineError::Render(format!("cannot create {}: {}", self.output_dir.display(), e))
        })?;
        let file_name = format!("{}.pdf", artifact_stem(&record.name, &record.roll_number));
        let path = self.output_dir.join(&file_name);
        {
            let mut out_file = fs::File::create(&path)
                .map_err(|e| PipelineError::Render(format!("cannot create {}: {}", path.display(), e)))?;
            doc.render(&mut out_file)?;
        }
        debug!("Rendered {} for {}", path.display(), record.name);

        // The logo temp file is removed here, after the document no longer needs it.
        drop(logo);
        Ok(RenderedArtifact { file_name, path })
    }
}

fn bold_cell(text: &str) -> Paragraph {
    Paragraph::new(StyledString::new(text.to_string(), Style::new().bold()))
}

/// Loads the font family, preferring Arial and falling back to LiberationSans.
pub fn load_fonts(dir: &Path) -> Result<FontFamily<FontData>> {
    if let Ok(family) = genpdf::fonts::from_files(dir, "Arial", None) {
        return Ok(family);
    }
    genpdf::fonts::from_files(dir, "LiberationSans", None).map_err(|e| {
        PipelineError::Config(format!(
            "no Arial or LiberationSans fonts in {}: {}",
            dir.display(),
            e
        ))
    })
}

/// DPI at which an image `width_px` wide prints `LOGO_WIDTH_MM` wide.
fn logo_dpi(width_px: u32) -> f64 {
    width_px.max(1) as f64 / (LOGO_WIDTH_MM / MM_PER_INCH)
}

/// Logo flattened to an RGB PNG temp file, with its print size.
#[derive(Debug)]
struct PreparedLogo {
    file: NamedTempFile,
    dpi: f64,
    height_mm: f64,
}

/// Decodes the logo, flattens any alpha channel over white and writes it as
/// an RGB PNG temp file the PDF image element can embed.
fn prepare_logo(bytes: &[u8]) -> Result<PreparedLogo> {
    let img = load_from_memory(bytes)
        .map_err(|e| PipelineError::Render(format!("logo asset cannot be decoded: {}", e)))?;
    let (w, h) = img.dimensions();

    let rgba = img.to_rgba8();
    let mut background = image::RgbaImage::from_pixel(w, h, image::Rgba([255, 255, 255, 255]));
    image::imageops::overlay(&mut background, &rgba, 0, 0);
    let raw = DynamicImage::ImageRgba8(background).to_rgb8().into_raw();

    let mut tmp = tempfile::Builder::new()
        .prefix("logo")
        .suffix(".png")
        .tempfile()
        .map_err(logo_write_error)?;
    {
        let file = tmp.as_file_mut();
        let mut encoder = PngEncoder::new(file, w, h);
        encoder.set_color(PngColorType::Rgb);
        encoder.set_depth(PngBitDepth::Eight);
        let mut writer = encoder.write_header().map_err(logo_write_error)?;
        writer.write_image_data(&raw).map_err(logo_write_error)?;
    }
    Ok(PreparedLogo {
        file: tmp,
        dpi: logo_dpi(w),
        height_mm: LOGO_WIDTH_MM * h as f64 / w.max(1) as f64,
    })
}

fn logo_write_error(e: impl std::fmt::Display) -> PipelineError {
    PipelineError::Render(format!("logo temp file: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    /// Sans families searched for the rendering tests, in the file order
    /// `load_fonts` expects: regular, bold, italic, bold italic.
    const SYSTEM_FONTS: [(&str, [&str; 4]); 2] = [
        (
            "/usr/share/fonts/truetype/liberation",
            [
                "LiberationSans-Regular.ttf",
                "LiberationSans-Bold.ttf",
                "LiberationSans-Italic.ttf",
                "LiberationSans-BoldItalic.ttf",
            ],
        ),
        (
            "/usr/share/fonts/truetype/dejavu",
            [
                "DejaVuSans.ttf",
                "DejaVuSans-Bold.ttf",
                "DejaVuSans-Oblique.ttf",
                "DejaVuSans-BoldOblique.ttf",
            ],
        ),
    ];

    /// Copies the first installed sans family into a temp dir under the
    /// LiberationSans names. `None` when the machine has no such fonts.
    fn installed_fonts() -> Option<TempDir> {
        let styles = ["Regular", "Bold", "Italic", "BoldItalic"];
        for (dir, files) in SYSTEM_FONTS {
            let sources: Vec<PathBuf> = files.iter().map(|f| Path::new(dir).join(f)).collect();
            if !sources.iter().all(|p| p.is_file()) {
                continue;
            }
            let fonts = TempDir::new().unwrap();
            for (source, style) in sources.iter().zip(styles) {
                fs::copy(source, fonts.path().join(format!("LiberationSans-{}.ttf", style)))
                    .unwrap();
            }
            return Some(fonts);
        }
        None
    }

    fn renderer(fonts: &TempDir, output_dir: &Path) -> GenpdfRenderer {
        GenpdfRenderer::new(
            load_fonts(fonts.path()).unwrap(),
            LogoSource::Bytes(png_bytes()),
            branding(),
            output_dir,
        )
    }

    fn record() -> StudentRecord {
        StudentRecord {
            name: "José Núñez".into(),
            roll_number: "12".into(),
            class_name: "III AI&DS".into(),
            subjects: vec!["Data Structures \u{2013} Lab".into(), "Maths".into()],
            marks: vec![90.0, 85.5],
            total_marks: 175.5,
            contact_address: Some("+911234567890".into()),
        }
    }

    fn branding() -> Branding {
        Branding {
            institution_name: "Erode Sengunthar Engineering College".into(),
            department_name: "Artificial Intelligence and Data Science".into(),
            hod_signature: "Signature of HoD/AI&DS".into(),
        }
    }

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(66, 40, image::Rgba([10, 20, 30, 128]));
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn layout_uses_plain_text_and_precomputed_total() {
        let layout = ReportLayout::for_record(&record(), &branding());
        assert_eq!(layout.identity_lines[0], "Name: Jose Nunez");
        assert_eq!(layout.identity_lines[2], "Dept: Artificial Intelligence and Data Science");
        assert_eq!(
            layout.rows,
            vec![
                ("Data Structures - Lab".to_string(), "90".to_string()),
                ("Maths".to_string(), "85.5".to_string()),
            ]
        );
        assert_eq!(layout.total_line, "Total Marks scored by the student is 175.5");
        assert_eq!(layout.signatures.1, "Signature of Principal");
    }

    #[test]
    fn missing_logo_file_is_a_render_error() {
        let source = LogoSource::File(PathBuf::from("/nonexistent/logo.jpeg"));
        let err = source.load().unwrap_err();
        assert!(matches!(err, PipelineError::Render(_)));
        assert!(err.to_string().contains("logo.jpeg"));
    }

    #[test]
    fn undecodable_logo_is_a_render_error() {
        let err = prepare_logo(b"not an image").unwrap_err();
        assert!(matches!(err, PipelineError::Render(_)));
    }

    #[test]
    fn logo_is_flattened_to_rgb_png() {
        let logo = prepare_logo(&png_bytes()).unwrap();
        let reread = load_from_memory(&fs::read(logo.file.path()).unwrap()).unwrap();
        assert_eq!(reread.dimensions(), (66, 40));
        assert!(reread.color().channel_count() == 3);
        // 66px across 33mm is 2px per mm, i.e. 50.8 dpi and 20mm tall.
        assert!((logo.dpi - 50.8).abs() < 1e-9);
        assert!((logo.height_mm - 20.0).abs() < 1e-9);
    }

    #[test]
    fn missing_fonts_are_a_config_error() {
        let empty = TempDir::new().unwrap();
        let err = load_fonts(empty.path()).unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn renders_a_multi_page_report() {
        let Some(fonts) = installed_fonts() else {
            eprintln!("no TrueType sans fonts installed; skipping");
            return;
        };
        let out = TempDir::new().unwrap();
        let mut record = record();
        record.subjects[0] = "Laboratory practice in data structures and algorithms with \
                              a deliberately long label that has to wrap inside its cell"
            .to_string();
        for i in 0..60 {
            record.subjects.push(format!("Elective {}", i + 1));
            record.marks.push(f64::from(i % 50));
        }
        record.total_marks = record.marks.iter().sum();

        let artifact = renderer(&fonts, out.path()).render(&record).unwrap();

        assert_eq!(artifact.file_name, "José_Núñez_12.pdf");
        assert_eq!(artifact.path, out.path().join(&artifact.file_name));
        let bytes = fs::read(&artifact.path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn unwritable_output_dir_is_a_render_error() {
        let Some(fonts) = installed_fonts() else {
            eprintln!("no TrueType sans fonts installed; skipping");
            return;
        };
        let parent = TempDir::new().unwrap();
        let blocker = parent.path().join("pdfs");
        fs::write(&blocker, b"not a directory").unwrap();

        let err = renderer(&fonts, &blocker).render(&record()).unwrap_err();
        assert!(matches!(err, PipelineError::Render(_)));
    }
}
