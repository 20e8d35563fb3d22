// PDF backend: writes rendered draw operations onto a single printpdf page

use ::image::{imageops, DynamicImage, Rgba, RgbImage, RgbaImage};
use chrono::NaiveDate;
use printpdf::path::PaintMode;
use printpdf::*;
use std::fs::File;
use std::io::{BufWriter, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::AppError;
use crate::layout::{self, solve, LayoutMetrics, Orientation, PageSpec};
use crate::model::{CapacityNotice, Classroom};
use crate::render::{render_chart_with_logo, DrawOp};
use crate::theme::{RgbColor, Theme};

/// Largest logo accepted from a URL
const MAX_LOGO_BYTES: u64 = 10 * 1024 * 1024;

pub struct ExportOptions {
    pub theme: Theme,
    pub date: NaiveDate,
    pub page: PageSpec,
    pub logo: Option<Logo>,
}

#[derive(Debug)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub orientation: Orientation,
    pub seated: usize,
    pub notice: CapacityNotice,
}

/// `Sitzplan_<name>.pdf` with spaces replaced by underscores.
pub fn chart_filename(classroom_name: &str) -> String {
    format!("Sitzplan_{}.pdf", classroom_name.trim().replace(' ', "_"))
}

/// Lays out, renders and writes the classroom as a one-page PDF.
pub fn export_chart(
    classroom: &Classroom,
    options: &ExportOptions,
    output_path: impl AsRef<Path>,
) -> Result<ExportSummary, AppError> {
    let metrics = solve(
        classroom.rows(),
        classroom.columns(),
        classroom.students_per_desk(),
        &options.page,
    );
    let ops = render_chart_with_logo(
        classroom,
        &metrics,
        &options.theme.palette(),
        options.date,
        options.logo.as_ref().map(Logo::aspect_ratio),
    );
    let output_path = output_path.as_ref();

    write_pdf(
        &format!("Sitzplan {}", classroom.name),
        &metrics,
        &ops,
        options.logo.as_ref(),
        output_path,
    )?;

    let summary = ExportSummary {
        path: output_path.to_path_buf(),
        orientation: metrics.orientation,
        seated: classroom.seated_count(),
        notice: classroom.capacity_notice(),
    };
    info!(
        path = %summary.path.display(),
        ops = ops.len(),
        orientation = ?summary.orientation,
        "seating chart exported"
    );
    Ok(summary)
}

pub fn write_pdf(
    title: &str,
    metrics: &LayoutMetrics,
    ops: &[DrawOp],
    logo: Option<&Logo>,
    output_path: &Path,
) -> Result<(), AppError> {
    let page_height = metrics.page_height;
    let point = |x: f32, y: f32| Point::new(Mm(x), Mm(page_height - y));
    let (doc, page1, layer1) = PdfDocument::new(
        title,
        Mm(metrics.page_width),
        Mm(page_height),
        "Layer 1",
    );
    let layer = doc.get_page(page1).get_layer(layer1);

    let font_regular = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| AppError::PdfError(e.to_string()))?;
    let font_bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| AppError::PdfError(e.to_string()))?;

    for op in ops {
        match op {
            DrawOp::Rect {
                rect,
                fill,
                stroke,
                line_width,
            } => {
                let mode = match (fill, stroke) {
                    (Some(_), Some(_)) => PaintMode::FillStroke,
                    (Some(_), None) => PaintMode::Fill,
                    (None, _) => PaintMode::Stroke,
                };
                if let Some(fill) = fill {
                    layer.set_fill_color(pdf_color(fill));
                }
                if let Some(stroke) = stroke {
                    layer.set_outline_color(pdf_color(stroke));
                }
                layer.set_outline_thickness(*line_width);
                let shape = Rect::new(
                    Mm(rect.x),
                    Mm(page_height - rect.bottom()),
                    Mm(rect.right()),
                    Mm(page_height - rect.y),
                )
                .with_mode(mode);
                layer.add_rect(shape);
            }
            DrawOp::Line {
                x1,
                y1,
                x2,
                y2,
                color,
                line_width,
            } => {
                layer.set_outline_color(pdf_color(color));
                layer.set_outline_thickness(*line_width);
                layer.add_line(Line {
                    points: vec![(point(*x1, *y1), false), (point(*x2, *y2), false)],
                    is_closed: false,
                });
            }
            DrawOp::Text {
                x,
                y,
                text,
                font_size,
                bold,
                color,
            } => {
                layer.set_fill_color(pdf_color(color));
                let font = if *bold { &font_bold } else { &font_regular };
                layer.use_text(text, *font_size, Mm(*x), Mm(page_height - y), font);
            }
            DrawOp::Logo { rect } => match logo {
                Some(logo) => logo.place(&layer, rect, page_height),
                None => debug!("logo slot without a logo"),
            },
        }
    }

    let file = File::create(output_path)?;
    let mut writer = BufWriter::new(file);
    doc.save(&mut writer)
        .map_err(|e| AppError::PdfError(e.to_string()))?;
    debug!(path = %output_path.display(), "pdf written");

    Ok(())
}

fn pdf_color(color: &RgbColor) -> Color {
    Color::Rgb(Rgb::new(color.r, color.g, color.b, None))
}

// ============================================================================
// Logo
// ============================================================================

/// School logo for the header. PDF pages here carry no alpha channel, so
/// transparent pixels are flattened onto white when the logo is created.
#[derive(Debug, Clone)]
pub struct Logo {
    pixels: RgbImage,
}

impl Logo {
    pub fn from_image(image: &DynamicImage) -> Result<Self, AppError> {
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Err(AppError::LogoError("image has no pixels".into()));
        }
        let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        imageops::overlay(&mut canvas, &image.to_rgba8(), 0, 0);
        Ok(Self {
            pixels: DynamicImage::ImageRgba8(canvas).to_rgb8(),
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AppError> {
        let image = ::image::load_from_memory(bytes)
            .map_err(|e| AppError::LogoError(format!("Failed to decode image: {}", e)))?;
        Self::from_image(&image)
    }

    /// Reads a logo from a file path or an http(s) URL.
    pub fn load(source: &str) -> Result<Self, AppError> {
        let bytes = if source.starts_with("http://") || source.starts_with("https://") {
            download(source)?
        } else {
            std::fs::read(source).map_err(|e| AppError::LogoError(format!("{}: {}", source, e)))?
        };
        let logo = Self::from_bytes(&bytes)?;
        debug!(source, width = logo.pixels.width(), height = logo.pixels.height(), "logo loaded");
        Ok(logo)
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.pixels.width() as f32 / self.pixels.height() as f32
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.pixels.get_pixel(x, y).0
    }

    /// Draws the logo scaled into `rect` (mm, origin top-left).
    fn place(&self, layer: &PdfLayerReference, rect: &layout::Rect, page_height: f32) {
        let (width, height) = self.pixels.dimensions();
        let image = Image::from(ImageXObject {
            width: Px(width as usize),
            height: Px(height as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: true,
            image_data: self.pixels.as_raw().clone(),
            image_filter: None,
            clipping_bbox: None,
            smask: None,
        });
        // Pixels per inch that make the image exactly `rect.w` wide.
        let dpi = width as f32 * 25.4 / rect.w.max(0.1);
        image.add_to_layer(
            layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(rect.x)),
                translate_y: Some(Mm(page_height - rect.bottom())),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
    }
}

fn download(url: &str) -> Result<Vec<u8>, AppError> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| AppError::LogoError(format!("Failed to fetch URL: {}", e)))?;
    let mut bytes = Vec::new();
    response
        .into_reader()
        .take(MAX_LOGO_BYTES)
        .read_to_end(&mut bytes)
        .map_err(|e| AppError::LogoError(format!("Failed to read response: {}", e)))?;
    Ok(bytes)
}
