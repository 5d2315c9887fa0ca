//! QR render adapter.
//!
//! [`RenderAdapter`] owns one engine for the lifetime of a preview. Option
//! changes are applied to that engine in place; the engine is never rebuilt
//! for a re-render.

pub mod engine;
pub mod pdf;
mod shader;
pub mod shape;
mod svg;

use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::style::StyleConfig;
use crate::utils::color::blend;

pub use engine::{StyledEngine, StyledEngineFactory};
pub use pdf::{PdfError, PdfWriter, PngPdfWriter};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("there is no data to encode")]
    EmptyData,
    #[error("cannot encode data: {0}")]
    Encode(#[from] qrcode::types::QrError),
    #[error("cannot render a {size}px canvas with a {margin}px margin")]
    InvalidSize { size: u32, margin: u32 },
    #[error("failed to write SVG: {0}")]
    Format(#[from] fmt::Error),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing has been rendered")]
    Blank,
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("failed to encode image: {0}")]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Pdf(#[from] PdfError),
}

/// Everything the engine draws from.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub data: String,
    /// Unframed canvas edge in pixels.
    pub size: u32,
    pub margin: u32,
    pub style: StyleConfig,
    /// Decoded logo, composited in raster output.
    pub logo: Option<Arc<RgbaImage>>,
}

impl RenderOptions {
    pub fn new(data: impl Into<String>, size: u32, margin: u32, style: StyleConfig) -> Self {
        Self {
            data: data.into(),
            size,
            margin,
            style,
            logo: None,
        }
    }

    pub fn has_logo(&self) -> bool {
        self.logo.is_some() || self.style.logo_image_url.is_some()
    }
}

impl PartialEq for RenderOptions {
    fn eq(&self, other: &Self) -> bool {
        let same_logo = match (&self.logo, &other.logo) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b) || a == b,
            (None, None) => true,
            _ => false,
        };
        same_logo
            && self.data == other.data
            && self.size == other.size
            && self.margin == other.margin
            && self.style == other.style
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Png,
    Jpg,
    Svg,
    Pdf,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Png,
        ExportFormat::Jpg,
        ExportFormat::Svg,
        ExportFormat::Pdf,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpg => "jpg",
            ExportFormat::Svg => "svg",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpg => "image/jpeg",
            ExportFormat::Svg => "image/svg+xml",
            ExportFormat::Pdf => "application/pdf",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "png" => Some(ExportFormat::Png),
            "jpg" | "jpeg" => Some(ExportFormat::Jpg),
            "svg" => Some(ExportFormat::Svg),
            "pdf" => Some(ExportFormat::Pdf),
            _ => None,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A finished file, ready to hand to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Download {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Download {
    fn new(stem: &str, format: ExportFormat, bytes: Vec<u8>) -> Self {
        Self {
            file_name: format!("{}.{}", stem, format.extension()),
            content_type: format.mime(),
            bytes,
        }
    }

    pub fn format(&self) -> Option<ExportFormat> {
        self.file_name
            .rsplit_once('.')
            .and_then(|(_, ext)| ExportFormat::parse(ext))
    }
}

/// Receives exported files.
pub trait DownloadSink {
    fn deliver(&mut self, download: Download);
}

/// A styled QR renderer that can be reconfigured in place.
pub trait QrEngine: Send {
    fn update(&mut self, options: &RenderOptions) -> Result<(), RenderError>;
    fn raster(&self) -> Result<RgbaImage, RenderError>;
    fn svg(&self) -> Result<String, RenderError>;
}

pub trait EngineFactory: Send + Sync {
    fn construct(&self, options: &RenderOptions) -> Result<Box<dyn QrEngine>, RenderError>;
}

/// Base name of exported files.
pub const EXPORT_FILE_STEM: &str = "qr-code";

fn encode_raster(image: RgbaImage, format: ImageFormat) -> Result<Vec<u8>, ExportError> {
    let mut bytes = Vec::new();
    let mut cursor = Cursor::new(&mut bytes);
    match format {
        ImageFormat::Png => image.write_to(&mut cursor, ImageFormat::Png)?,
        _ => DynamicImage::ImageRgba8(flatten(image))
            .to_rgb8()
            .write_to(&mut cursor, format)?,
    }
    Ok(bytes)
}

/// Composites onto opaque white for formats without alpha.
fn flatten(mut image: RgbaImage) -> RgbaImage {
    for pixel in image.pixels_mut() {
        pixel.0 = blend([255, 255, 255, 255], pixel.0);
    }
    image
}

/// Renders one file. A PDF that cannot be assembled is delivered as the
/// PNG it was built from.
pub fn export_file(
    engine: &dyn QrEngine,
    format: ExportFormat,
    margin: u32,
    pdf: &dyn PdfWriter,
) -> Result<Download, ExportError> {
    let bytes = match format {
        ExportFormat::Svg => engine.svg()?.into_bytes(),
        ExportFormat::Png => encode_raster(engine.raster()?, ImageFormat::Png)?,
        ExportFormat::Jpg => encode_raster(engine.raster()?, ImageFormat::Jpeg)?,
        ExportFormat::Pdf => {
            let raster = engine.raster()?;
            let rgb = DynamicImage::ImageRgba8(flatten(raster.clone())).to_rgb8();
            let mut png = Vec::new();
            rgb.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

            match pdf.write(&png, margin) {
                Ok(document) => document,
                Err(e) => {
                    log::warn!("PDF export failed, delivering PNG instead: {}", e);
                    let png = encode_raster(raster, ImageFormat::Png)?;
                    return Ok(Download::new(EXPORT_FILE_STEM, ExportFormat::Png, png));
                }
            }
        }
    };
    Ok(Download::new(EXPORT_FILE_STEM, format, bytes))
}

/// Owns the engine behind one live preview.
pub struct RenderAdapter {
    factory: Box<dyn EngineFactory>,
    engine: Option<Box<dyn QrEngine>>,
    options: RenderOptions,
    surface: Option<String>,
    sink: Box<dyn DownloadSink>,
    pdf: Box<dyn PdfWriter>,
}

impl fmt::Debug for RenderAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderAdapter")
            .field("options", &self.options)
            .field("mounted", &self.engine.is_some())
            .finish()
    }
}

impl RenderAdapter {
    /// Mounts with the built-in styled engine and PDF writer.
    pub fn mount(options: RenderOptions, sink: Box<dyn DownloadSink>) -> Self {
        Self::mount_with(
            Box::new(StyledEngineFactory),
            Box::new(PngPdfWriter),
            options,
            sink,
        )
    }

    pub fn mount_with(
        factory: Box<dyn EngineFactory>,
        pdf: Box<dyn PdfWriter>,
        options: RenderOptions,
        sink: Box<dyn DownloadSink>,
    ) -> Self {
        let mut adapter = Self {
            factory,
            engine: None,
            options,
            surface: None,
            sink,
            pdf,
        };
        adapter.construct();
        adapter
    }

    fn construct(&mut self) {
        match self.factory.construct(&self.options) {
            Ok(engine) => {
                self.engine = Some(engine);
                self.refresh_surface();
            }
            Err(e) => {
                log::error!("Failed to construct QR engine: {}", e);
                self.engine = None;
                self.surface = None;
            }
        }
    }

    fn refresh_surface(&mut self) {
        self.surface = match self.engine.as_ref().map(|engine| engine.svg()) {
            Some(Ok(svg)) => Some(svg),
            Some(Err(e)) => {
                log::error!("Failed to render QR preview: {}", e);
                None
            }
            None => None,
        };
    }

    /// Applies new options to the existing engine. Identical options are a
    /// no-op; a failed update leaves the surface blank.
    pub fn set_options(&mut self, options: RenderOptions) {
        if options == self.options && self.surface.is_some() {
            return;
        }
        self.options = options;

        let Some(engine) = self.engine.as_mut() else {
            self.construct();
            return;
        };
        match engine.update(&self.options) {
            Ok(()) => self.refresh_surface(),
            Err(e) => {
                log::error!("Failed to update QR engine: {}", e);
                self.surface = None;
            }
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Current preview as SVG markup, `None` while blank.
    pub fn surface(&self) -> Option<&str> {
        self.surface.as_deref()
    }

    /// Renders `format` and delivers exactly one file to the sink. Returns
    /// the format actually delivered.
    pub fn export(&mut self, format: ExportFormat) -> Result<ExportFormat, ExportError> {
        let engine = match (&self.engine, &self.surface) {
            (Some(engine), Some(_)) => engine,
            _ => return Err(ExportError::Blank),
        };
        let download = export_file(engine.as_ref(), format, self.options.margin, self.pdf.as_ref())?;
        let delivered = download.format().unwrap_or(format);
        log::info!("Exported {} ({} bytes)", download.file_name, download.bytes.len());
        self.sink.deliver(download);
        Ok(delivered)
    }
}

/// Collects deliveries; clones share the same list.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    downloads: Arc<std::sync::Mutex<Vec<Download>>>,
}

impl CollectingSink {
    pub fn downloads(&self) -> Vec<Download> {
        self.downloads
            .lock()
            .map(|list| list.clone())
            .unwrap_or_default()
    }
}

impl DownloadSink for CollectingSink {
    fn deliver(&mut self, download: Download) {
        match self.downloads.lock() {
            Ok(mut list) => list.push(download),
            Err(e) => log::error!("Download sink lock poisoned: {}", e),
        }
    }
}
