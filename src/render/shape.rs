//! Symbol geometry shared by the raster and SVG writers.

use qrcode::{EcLevel, QrCode};

use crate::models::style::{DotShape, Frame, LOGO_SIZE};
use crate::render::RenderError;

/// Edge of a finder pattern in modules.
pub const FINDER: usize = 7;

/// Largest unframed canvas edge, in pixels.
pub const MAX_SIZE: u32 = 4096;

/// Dark/light grid of an encoded symbol.
pub struct Matrix {
    width: usize,
    dark: Vec<bool>,
    /// First hidden module and edge of the logo hole, if any.
    hole: Option<(usize, usize)>,
}

impl Matrix {
    /// Encodes `data`, reserving a centre hole when a logo will be placed.
    pub fn encode(data: &str, with_logo: bool) -> Result<Self, RenderError> {
        if data.is_empty() {
            return Err(RenderError::EmptyData);
        }
        let level = if with_logo { EcLevel::H } else { EcLevel::M };
        let code = QrCode::with_error_correction_level(data.as_bytes(), level)?;
        let width = code.width();
        let dark = code
            .to_colors()
            .into_iter()
            .map(|color| color == qrcode::Color::Dark)
            .collect();

        let hole = with_logo.then(|| {
            let mut edge = (width as f64 * LOGO_SIZE).ceil() as usize;
            if (width - edge) % 2 != 0 {
                edge += 1;
            }
            ((width - edge) / 2, edge)
        });

        Ok(Self { width, dark, hole })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_dark(&self, x: isize, y: isize) -> bool {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.width {
            return false;
        }
        self.dark[y as usize * self.width + x as usize]
    }

    /// Top-left module of the finder pattern covering `(x, y)`.
    pub fn finder_origin(&self, x: usize, y: usize) -> Option<(usize, usize)> {
        self.finder_origins()
            .into_iter()
            .find(|&(fx, fy)| x >= fx && x < fx + FINDER && y >= fy && y < fy + FINDER)
    }

    pub fn finder_origins(&self) -> [(usize, usize); 3] {
        let far = self.width - FINDER;
        [(0, 0), (far, 0), (0, far)]
    }

    /// Whether the module sits under the logo and is left undrawn.
    pub fn is_hidden(&self, x: usize, y: usize) -> bool {
        match self.hole {
            Some((start, edge)) => {
                x >= start && x < start + edge && y >= start && y < start + edge
            }
            None => false,
        }
    }

    /// Dark data module that is drawn with the dots style.
    pub fn is_data_module(&self, x: usize, y: usize) -> bool {
        self.is_dark(x as isize, y as isize)
            && self.finder_origin(x, y).is_none()
            && !self.is_hidden(x, y)
    }

    pub fn neighbours(&self, x: usize, y: usize) -> Neighbours {
        let (x, y) = (x as isize, y as isize);
        let drawn = |nx: isize, ny: isize| {
            nx >= 0 && ny >= 0 && self.is_data_module(nx as usize, ny as usize)
        };
        Neighbours {
            left: drawn(x - 1, y),
            right: drawn(x + 1, y),
            top: drawn(x, y - 1),
            bottom: drawn(x, y + 1),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Neighbours {
    pub left: bool,
    pub right: bool,
    pub top: bool,
    pub bottom: bool,
}

/// Pixel placement of the symbol on the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub canvas: u32,
    pub symbol_x: f64,
    pub symbol_y: f64,
    pub symbol_edge: f64,
    pub module: f64,
}

impl Layout {
    /// `size` is the unframed canvas edge, `margin` the quiet space kept
    /// inside it on every side.
    pub fn new(size: u32, margin: u32, frame: Frame, modules: usize) -> Result<Self, RenderError> {
        if size == 0 || size > MAX_SIZE || margin.saturating_mul(2) >= size {
            return Err(RenderError::InvalidSize { size, margin });
        }
        let canvas = (size as f64 * frame.scale()).round() as u32;
        let symbol_edge = (size - 2 * margin) as f64;
        let anchor = frame.anchor();
        Ok(Self {
            canvas,
            symbol_x: anchor.x * canvas as f64 - symbol_edge / 2.0,
            symbol_y: anchor.y * canvas as f64 - symbol_edge / 2.0,
            symbol_edge,
            module: symbol_edge / modules as f64,
        })
    }

    pub fn module_origin(&self, x: usize, y: usize) -> (f64, f64) {
        (
            self.symbol_x + x as f64 * self.module,
            self.symbol_y + y as f64 * self.module,
        )
    }
}

/// Corner radii of a data module in module units, clockwise from top-left.
///
/// A corner is only rounded where neither adjoining neighbour is drawn, so
/// connected runs stay flush.
pub fn module_radii(shape: DotShape, n: Neighbours) -> [f64; 4] {
    let free = [
        !n.left && !n.top,
        !n.right && !n.top,
        !n.right && !n.bottom,
        !n.left && !n.bottom,
    ];
    let pick = |radii: [f64; 4]| {
        let mut out = [0.0; 4];
        for i in 0..4 {
            if free[i] {
                out[i] = radii[i];
            }
        }
        out
    };
    match shape {
        DotShape::Square => [0.0; 4],
        DotShape::Dots => [0.5; 4],
        DotShape::Rounded => pick([0.3; 4]),
        DotShape::ExtraRounded => pick([0.5; 4]),
        DotShape::Classy => pick([0.5, 0.0, 0.5, 0.0]),
        DotShape::ClassyRounded => pick([0.5, 0.25, 0.5, 0.25]),
    }
}

/// Corner radii for a finder ring or centre of half-edge `half`.
pub fn corner_radii(shape: DotShape, half: f64) -> [f64; 4] {
    let r = |factor: f64| half * factor;
    match shape {
        DotShape::Square => [0.0; 4],
        DotShape::Dots => [half; 4],
        DotShape::Rounded => [r(0.3); 4],
        DotShape::ExtraRounded => [r(0.6); 4],
        DotShape::Classy => [r(0.6), 0.0, r(0.6), 0.0],
        DotShape::ClassyRounded => [r(0.6), r(0.25), r(0.6), r(0.25)],
    }
}

/// Whether `(dx, dy)`, relative to the centre, lies in the rounded square
/// of half-edge `half`.
pub fn in_rounded_square(dx: f64, dy: f64, half: f64, radii: [f64; 4]) -> bool {
    if dx.abs() > half || dy.abs() > half {
        return false;
    }
    let r = radii[quadrant(dx >= 0.0, dy >= 0.0)];
    if r <= 0.0 {
        return true;
    }
    let qx = dx.abs() - (half - r);
    let qy = dy.abs() - (half - r);
    qx <= 0.0 || qy <= 0.0 || qx * qx + qy * qy <= r * r
}

fn quadrant(right: bool, down: bool) -> usize {
    match (right, down) {
        (false, false) => 0,
        (true, false) => 1,
        (true, true) => 2,
        (false, true) => 3,
    }
}
