//! Color lookup for one fill target.

use crate::models::style::{Fill, GradientKind};
use crate::utils::color::{Rgba, mix, parse_hex};

/// Region a gradient is stretched over, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Bounds {
    pub fn square(x: f64, y: f64, edge: f64) -> Self {
        Self { x, y, w: edge, h: edge }
    }

    fn centre(&self) -> (f64, f64) {
        (self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shader {
    Solid(Rgba),
    Linear {
        stops: Vec<(f64, Rgba)>,
        bounds: Bounds,
        /// Unit direction of the gradient axis.
        dir: (f64, f64),
    },
    Radial {
        stops: Vec<(f64, Rgba)>,
        bounds: Bounds,
    },
}

impl Shader {
    /// Unparseable colors fall back to `fallback`.
    pub fn new(fill: &Fill, bounds: Bounds, fallback: Rgba) -> Self {
        match fill {
            Fill::Color(color) => Shader::Solid(parse_hex(color).unwrap_or(fallback)),
            Fill::Gradient(gradient) => {
                let stops: Vec<(f64, Rgba)> = gradient
                    .color_stops
                    .iter()
                    .map(|stop| (stop.offset, parse_hex(&stop.color).unwrap_or(fallback)))
                    .collect();
                if stops.len() < 2 {
                    return Shader::Solid(stops.first().map(|s| s.1).unwrap_or(fallback));
                }
                match gradient.kind {
                    GradientKind::Linear => {
                        let rotation = gradient.angle.to_radians();
                        Shader::Linear {
                            stops,
                            bounds,
                            dir: (rotation.cos(), rotation.sin()),
                        }
                    }
                    GradientKind::Radial => Shader::Radial { stops, bounds },
                }
            }
        }
    }

    pub fn at(&self, x: f64, y: f64) -> Rgba {
        match self {
            Shader::Solid(color) => *color,
            Shader::Linear { stops, bounds, dir } => {
                let (cx, cy) = bounds.centre();
                let extent = (dir.0.abs() * bounds.w + dir.1.abs() * bounds.h) / 2.0;
                let projected = (x - cx) * dir.0 + (y - cy) * dir.1;
                let t = if extent > 0.0 {
                    0.5 + projected / (2.0 * extent)
                } else {
                    0.0
                };
                sample(stops, t)
            }
            Shader::Radial { stops, bounds } => {
                let (cx, cy) = bounds.centre();
                let radius = bounds.w.hypot(bounds.h) / 2.0;
                let t = if radius > 0.0 {
                    (x - cx).hypot(y - cy) / radius
                } else {
                    0.0
                };
                sample(stops, t)
            }
        }
    }

    /// A representative color, used for frame strokes.
    pub fn primary(&self) -> Rgba {
        match self {
            Shader::Solid(color) => *color,
            Shader::Linear { stops, .. } | Shader::Radial { stops, .. } => stops[0].1,
        }
    }
}

fn sample(stops: &[(f64, Rgba)], t: f64) -> Rgba {
    let t = t.clamp(0.0, 1.0);
    let (first, last) = (stops[0], stops[stops.len() - 1]);
    if t <= first.0 {
        return first.1;
    }
    if t >= last.0 {
        return last.1;
    }
    for pair in stops.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if t >= a.0 && t <= b.0 {
            let span = b.0 - a.0;
            let local = if span > 0.0 { (t - a.0) / span } else { 0.0 };
            return mix(a.1, b.1, local);
        }
    }
    last.1
}
