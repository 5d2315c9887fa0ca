//! The styled QR engine: a `qrcode` matrix drawn with per-target shapes and
//! fills, an optional logo and frame.

use image::imageops::{self, FilterType};
use image::{Rgba as Pixel, RgbaImage};

use crate::models::style::{DEFAULT_BACKGROUND, DEFAULT_FOREGROUND, FillTarget, Frame, LOGO_SIZE};
use crate::render::shader::{Bounds, Shader};
use crate::render::shape::{self, FINDER, Layout, Matrix};
use crate::render::{EngineFactory, QrEngine, RenderError, RenderOptions, svg};
use crate::utils::color::{Rgba, blend, parse_hex};

/// Sub-samples per pixel axis.
const SAMPLES: usize = 2;

pub struct StyledEngine {
    options: RenderOptions,
    matrix: Matrix,
    layout: Layout,
}

impl StyledEngine {
    pub fn new(options: &RenderOptions) -> Result<Self, RenderError> {
        let matrix = Matrix::encode(&options.data, options.has_logo())?;
        let layout = Layout::new(
            options.size,
            options.margin,
            options.style.frame,
            matrix.width(),
        )?;
        Ok(Self {
            options: options.clone(),
            matrix,
            layout,
        })
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub(crate) fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    pub(crate) fn layout(&self) -> &Layout {
        &self.layout
    }

    pub(crate) fn shader(&self, target: FillTarget) -> Shader {
        let layout = &self.layout;
        let canvas = layout.canvas as f64;
        let (bounds, fallback) = match target {
            FillTarget::Background => (Bounds::square(0.0, 0.0, canvas), DEFAULT_BACKGROUND),
            _ => (
                Bounds::square(layout.symbol_x, layout.symbol_y, layout.symbol_edge),
                DEFAULT_FOREGROUND,
            ),
        };
        let fallback = parse_hex(fallback).unwrap_or([0, 0, 0, 255]);
        Shader::new(self.options.style.fill(target), bounds, fallback)
    }

    /// Which target, if any, covers the canvas point `(px, py)`.
    fn target_at(&self, px: f64, py: f64) -> Option<FillTarget> {
        let layout = &self.layout;
        let sx = (px - layout.symbol_x) / layout.module;
        let sy = (py - layout.symbol_y) / layout.module;
        let width = self.matrix.width() as f64;
        if sx < 0.0 || sy < 0.0 || sx >= width || sy >= width {
            return None;
        }
        let (x, y) = (sx as usize, sy as usize);
        let style = &self.options.style;

        if let Some((fx, fy)) = self.matrix.finder_origin(x, y) {
            let half = FINDER as f64 / 2.0;
            let dx = sx - fx as f64 - half;
            let dy = sy - fy as f64 - half;

            let outer = shape::corner_radii(style.corner_squares.shape, half);
            let inner = outer.map(|r| (r - 1.0).max(0.0));
            if shape::in_rounded_square(dx, dy, half, outer)
                && !shape::in_rounded_square(dx, dy, half - 1.0, inner)
            {
                return Some(FillTarget::CornerSquares);
            }
            let dot = shape::corner_radii(style.corner_dots.shape, 1.5);
            if shape::in_rounded_square(dx, dy, 1.5, dot) {
                return Some(FillTarget::CornerDots);
            }
            return None;
        }

        if !self.matrix.is_data_module(x, y) {
            return None;
        }
        let radii = shape::module_radii(style.dots.shape, self.matrix.neighbours(x, y));
        let dx = sx - x as f64 - 0.5;
        let dy = sy - y as f64 - 0.5;
        shape::in_rounded_square(dx, dy, 0.5, radii).then_some(FillTarget::Dots)
    }

    fn frame_coverage(&self, px: f64, py: f64) -> bool {
        let layout = &self.layout;
        let canvas = layout.canvas as f64;
        match self.options.style.frame {
            Frame::None => false,
            Frame::Plane => {
                let border = (canvas * 0.02).max(1.0);
                let gap = canvas * 0.03;
                let in_border = px < border
                    || py < border
                    || px >= canvas - border
                    || py >= canvas - border;
                let banner_top = layout.symbol_y + layout.symbol_edge + gap;
                let in_banner = py >= banner_top
                    && py < canvas - border - gap
                    && px >= layout.symbol_x
                    && px < layout.symbol_x + layout.symbol_edge;
                in_border || in_banner
            }
            Frame::CircleBadge => {
                let centre = canvas / 2.0;
                let radius = canvas * 0.47;
                let stroke = canvas * 0.025;
                ((px - centre).hypot(py - centre) - radius).abs() <= stroke / 2.0
            }
        }
    }

    fn composite_logo(&self, canvas: &mut RgbaImage) {
        let Some(logo) = &self.options.logo else {
            return;
        };
        if logo.width() == 0 || logo.height() == 0 {
            return;
        }
        let layout = &self.layout;
        let target = (layout.symbol_edge * LOGO_SIZE).floor().max(1.0);
        let scale = (target / logo.width() as f64).min(target / logo.height() as f64);
        let w = ((logo.width() as f64 * scale).round() as u32).max(1);
        let h = ((logo.height() as f64 * scale).round() as u32).max(1);
        let resized = imageops::resize(logo.as_ref(), w, h, FilterType::Lanczos3);

        let x = layout.symbol_x + (layout.symbol_edge - w as f64) / 2.0;
        let y = layout.symbol_y + (layout.symbol_edge - h as f64) / 2.0;
        imageops::overlay(canvas, &resized, x.round() as i64, y.round() as i64);
    }
}

impl QrEngine for StyledEngine {
    fn update(&mut self, options: &RenderOptions) -> Result<(), RenderError> {
        if options.data != self.options.data || options.has_logo() != self.options.has_logo() {
            self.matrix = Matrix::encode(&options.data, options.has_logo())?;
        }
        self.layout = Layout::new(
            options.size,
            options.margin,
            options.style.frame,
            self.matrix.width(),
        )?;
        self.options = options.clone();
        Ok(())
    }

    fn raster(&self) -> Result<RgbaImage, RenderError> {
        let edge = self.layout.canvas;
        let background = self.shader(FillTarget::Background);
        let dots = self.shader(FillTarget::Dots);
        let corner_squares = self.shader(FillTarget::CornerSquares);
        let corner_dots = self.shader(FillTarget::CornerDots);
        let frame_color = dots.primary();

        let samples = (SAMPLES * SAMPLES) as f64;
        let mut canvas = RgbaImage::new(edge, edge);
        for (px, py, pixel) in canvas.enumerate_pixels_mut() {
            let (cx, cy) = (px as f64 + 0.5, py as f64 + 0.5);
            let mut color = background.at(cx, cy);
            if self.frame_coverage(cx, cy) {
                color = blend(color, frame_color);
            }

            let mut hits = [0usize; 3];
            for i in 0..SAMPLES {
                for j in 0..SAMPLES {
                    let sx = px as f64 + (i as f64 + 0.5) / SAMPLES as f64;
                    let sy = py as f64 + (j as f64 + 0.5) / SAMPLES as f64;
                    match self.target_at(sx, sy) {
                        Some(FillTarget::Dots) => hits[0] += 1,
                        Some(FillTarget::CornerSquares) => hits[1] += 1,
                        Some(FillTarget::CornerDots) => hits[2] += 1,
                        _ => {}
                    }
                }
            }
            for (count, shader) in hits.iter().zip([&dots, &corner_squares, &corner_dots]) {
                if *count > 0 {
                    let mut top: Rgba = shader.at(cx, cy);
                    top[3] = (top[3] as f64 * *count as f64 / samples).round() as u8;
                    color = blend(color, top);
                }
            }
            *pixel = Pixel(color);
        }

        self.composite_logo(&mut canvas);
        Ok(canvas)
    }

    fn svg(&self) -> Result<String, RenderError> {
        svg::write(self)
    }
}

/// Builds [`StyledEngine`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct StyledEngineFactory;

impl EngineFactory for StyledEngineFactory {
    fn construct(&self, options: &RenderOptions) -> Result<Box<dyn QrEngine>, RenderError> {
        Ok(Box::new(StyledEngine::new(options)?))
    }
}
