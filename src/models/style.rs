use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::utils::color::is_hex_color;

pub const DEFAULT_FOREGROUND: &str = "#000000";
pub const DEFAULT_BACKGROUND: &str = "#ffffff";

/// Fraction of the symbol edge covered by an embedded logo.
pub const LOGO_SIZE: f64 = 0.3;

/// Module shape, shared by dots, corner squares and corner dots.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DotShape {
    #[default]
    Square,
    Dots,
    Rounded,
    Classy,
    ClassyRounded,
    ExtraRounded,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GradientKind {
    #[default]
    Linear,
    Radial,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ColorStop {
    pub offset: f64,
    pub color: String,
}

impl ColorStop {
    pub fn new(offset: f64, color: impl Into<String>) -> Self {
        Self {
            offset,
            color: color.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Gradient {
    #[serde(rename = "type", default)]
    pub kind: GradientKind,
    /// Degrees, clockwise from the positive x axis.
    #[serde(default)]
    pub angle: f64,
    pub color_stops: Vec<ColorStop>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GradientEditError {
    #[error("offset {0} must lie strictly between 0 and 1")]
    OffsetOutOfRange(f64),
    #[error("a color stop already exists at offset {0}")]
    DuplicateOffset(f64),
    #[error("the first and last color stops cannot be removed")]
    EndStop,
    #[error("no color stop at index {0}")]
    NoSuchStop(usize),
}

impl Gradient {
    pub fn new(kind: GradientKind, angle: f64, from: &str, to: &str) -> Self {
        Self {
            kind,
            angle,
            color_stops: vec![ColorStop::new(0.0, from), ColorStop::new(1.0, to)],
        }
    }

    /// Two-stop linear gradient starting and ending at `color`.
    pub fn seeded(color: &str) -> Self {
        Self::new(GradientKind::Linear, 0.0, color, color)
    }

    pub fn first_color(&self) -> Option<&str> {
        self.color_stops.first().map(|stop| stop.color.as_str())
    }

    /// Inserts an interior stop at its sorted position.
    pub fn insert_stop(&mut self, offset: f64, color: &str) -> Result<usize, GradientEditError> {
        if !(offset > 0.0 && offset < 1.0) {
            return Err(GradientEditError::OffsetOutOfRange(offset));
        }
        if self.color_stops.iter().any(|stop| stop.offset == offset) {
            return Err(GradientEditError::DuplicateOffset(offset));
        }
        let index = self
            .color_stops
            .iter()
            .position(|stop| stop.offset > offset)
            .unwrap_or(self.color_stops.len());
        self.color_stops.insert(index, ColorStop::new(offset, color));
        Ok(index)
    }

    /// Removes an interior stop; the 0 and 1 end stops are fixed.
    pub fn remove_stop(&mut self, index: usize) -> Result<ColorStop, GradientEditError> {
        if index >= self.color_stops.len() {
            return Err(GradientEditError::NoSuchStop(index));
        }
        if index == 0 || index == self.color_stops.len() - 1 {
            return Err(GradientEditError::EndStop);
        }
        Ok(self.color_stops.remove(index))
    }

    fn collect_violations(&self, target: FillTarget, out: &mut Vec<StyleViolation>) {
        if !self.angle.is_finite() {
            out.push(StyleViolation::InvalidAngle { target });
        }
        if self.color_stops.len() < 2 {
            out.push(StyleViolation::TooFewStops {
                target,
                count: self.color_stops.len(),
            });
        }
        for stop in &self.color_stops {
            if !is_hex_color(&stop.color) {
                out.push(StyleViolation::InvalidColor {
                    target,
                    value: stop.color.clone(),
                });
            }
            if !(0.0..=1.0).contains(&stop.offset) {
                out.push(StyleViolation::OffsetOutOfRange {
                    target,
                    offset: stop.offset,
                });
            }
        }
        if self
            .color_stops
            .windows(2)
            .any(|pair| pair[0].offset.partial_cmp(&pair[1].offset) != Some(std::cmp::Ordering::Less))
        {
            out.push(StyleViolation::UnsortedStops { target });
        }
        if let (Some(first), Some(last)) = (self.color_stops.first(), self.color_stops.last()) {
            if self.color_stops.len() >= 2 && (first.offset != 0.0 || last.offset != 1.0) {
                out.push(StyleViolation::IncompleteRange { target });
            }
        }
    }
}

/// Paint for one fill target: a solid color or a gradient, never both.
///
/// On the wire this is `{"color": "#000000"}` or `{"gradient": {..}}`; an
/// object with both keys or neither does not parse.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub enum Fill {
    Color(String),
    Gradient(Gradient),
}

impl Fill {
    pub fn solid(color: impl Into<String>) -> Self {
        Fill::Color(color.into())
    }

    pub fn is_gradient(&self) -> bool {
        matches!(self, Fill::Gradient(_))
    }

    pub fn color(&self) -> Option<&str> {
        match self {
            Fill::Color(color) => Some(color),
            Fill::Gradient(_) => None,
        }
    }

    pub fn gradient(&self) -> Option<&Gradient> {
        match self {
            Fill::Color(_) => None,
            Fill::Gradient(gradient) => Some(gradient),
        }
    }

    fn collect_violations(&self, target: FillTarget, out: &mut Vec<StyleViolation>) {
        match self {
            Fill::Color(color) => {
                if !is_hex_color(color) {
                    out.push(StyleViolation::InvalidColor {
                        target,
                        value: color.clone(),
                    });
                }
            }
            Fill::Gradient(gradient) => gradient.collect_violations(target, out),
        }
    }

    fn to_props(&self) -> FillProps {
        match self {
            Fill::Color(color) => FillProps {
                color: Some(color.clone()),
                gradient: None,
            },
            Fill::Gradient(gradient) => FillProps {
                color: None,
                gradient: Some(GradientProps {
                    kind: gradient.kind,
                    rotation: gradient.angle.to_radians(),
                    color_stops: gradient.color_stops.clone(),
                }),
            },
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ShapeStyle {
    #[serde(default)]
    pub shape: DotShape,
    pub fill: Fill,
}

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            shape: DotShape::Square,
            fill: Fill::solid(DEFAULT_FOREGROUND),
        }
    }
}

impl ShapeStyle {
    fn to_props(&self) -> TargetProps {
        TargetProps {
            shape: self.shape,
            fill: self.fill.to_props(),
        }
    }
}

/// The four independently colored regions of a symbol.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum FillTarget {
    Background,
    Dots,
    CornerSquares,
    CornerDots,
}

impl FillTarget {
    pub const ALL: [FillTarget; 4] = [
        FillTarget::Background,
        FillTarget::Dots,
        FillTarget::CornerSquares,
        FillTarget::CornerDots,
    ];

    fn default_color(self) -> &'static str {
        match self {
            FillTarget::Background => DEFAULT_BACKGROUND,
            _ => DEFAULT_FOREGROUND,
        }
    }
}

impl fmt::Display for FillTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillTarget::Background => write!(f, "background"),
            FillTarget::Dots => write!(f, "dots"),
            FillTarget::CornerSquares => write!(f, "corner squares"),
            FillTarget::CornerDots => write!(f, "corner dots"),
        }
    }
}

/// Decorative border catalog.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Frame {
    #[default]
    None,
    Plane,
    CircleBadge,
}

/// Position of the symbol centre inside the framed canvas, both axes 0..1.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct FrameAnchor {
    pub x: f64,
    pub y: f64,
}

impl Frame {
    pub const CATALOG: [Frame; 3] = [Frame::None, Frame::Plane, Frame::CircleBadge];

    pub fn anchor(self) -> FrameAnchor {
        match self {
            Frame::None | Frame::CircleBadge => FrameAnchor { x: 0.5, y: 0.5 },
            // Leaves a banner below the symbol.
            Frame::Plane => FrameAnchor { x: 0.5, y: 0.42 },
        }
    }

    /// Framed canvas edge relative to the symbol edge.
    pub fn scale(self) -> f64 {
        match self {
            Frame::None => 1.0,
            Frame::Plane => 1.3,
            Frame::CircleBadge => 1.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StyleViolation {
    #[error("{target}: invalid color {value:?}")]
    InvalidColor { target: FillTarget, value: String },
    #[error("{target}: a gradient needs at least two color stops, found {count}")]
    TooFewStops { target: FillTarget, count: usize },
    #[error("{target}: color stop offset {offset} is outside 0..1")]
    OffsetOutOfRange { target: FillTarget, offset: f64 },
    #[error("{target}: color stop offsets must be strictly increasing")]
    UnsortedStops { target: FillTarget },
    #[error("{target}: color stops must start at 0 and end at 1")]
    IncompleteRange { target: FillTarget },
    #[error("{target}: gradient angle must be a finite number")]
    InvalidAngle { target: FillTarget },
    #[error("logo image reference is empty")]
    EmptyLogoUrl,
}

/// Visual description of one QR code.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StyleConfig {
    #[serde(default = "default_background")]
    pub background: Fill,
    #[serde(default)]
    pub dots: ShapeStyle,
    #[serde(default)]
    pub corner_squares: ShapeStyle,
    #[serde(default)]
    pub corner_dots: ShapeStyle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_image_url: Option<String>,
    #[serde(default)]
    pub frame: Frame,
}

fn default_background() -> Fill {
    Fill::solid(DEFAULT_BACKGROUND)
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            background: default_background(),
            dots: ShapeStyle::default(),
            corner_squares: ShapeStyle::default(),
            corner_dots: ShapeStyle::default(),
            logo_image_url: None,
            frame: Frame::None,
        }
    }
}

impl StyleConfig {
    pub fn fill(&self, target: FillTarget) -> &Fill {
        match target {
            FillTarget::Background => &self.background,
            FillTarget::Dots => &self.dots.fill,
            FillTarget::CornerSquares => &self.corner_squares.fill,
            FillTarget::CornerDots => &self.corner_dots.fill,
        }
    }

    fn fill_mut(&mut self, target: FillTarget) -> &mut Fill {
        match target {
            FillTarget::Background => &mut self.background,
            FillTarget::Dots => &mut self.dots.fill,
            FillTarget::CornerSquares => &mut self.corner_squares.fill,
            FillTarget::CornerDots => &mut self.corner_dots.fill,
        }
    }

    pub fn set_solid(&mut self, target: FillTarget, color: impl Into<String>) {
        *self.fill_mut(target) = Fill::Color(color.into());
    }

    pub fn set_gradient(&mut self, target: FillTarget, gradient: Gradient) {
        *self.fill_mut(target) = Fill::Gradient(gradient);
    }

    /// Switches one target between solid and gradient mode.
    ///
    /// The old representation is replaced, not kept aside: solid becomes a
    /// two-stop gradient of the current color, gradient becomes its first
    /// stop's color.
    pub fn toggle_gradient(&mut self, target: FillTarget) {
        let next = match self.fill(target) {
            Fill::Color(color) => Fill::Gradient(Gradient::seeded(color)),
            Fill::Gradient(gradient) => Fill::Color(
                gradient
                    .first_color()
                    .unwrap_or(target.default_color())
                    .to_string(),
            ),
        };
        *self.fill_mut(target) = next;
    }

    /// Sets the module shape of a shaped target. The background has no
    /// shape; returns `false` and changes nothing for it.
    pub fn set_shape(&mut self, target: FillTarget, shape: DotShape) -> bool {
        let style = match target {
            FillTarget::Background => return false,
            FillTarget::Dots => &mut self.dots,
            FillTarget::CornerSquares => &mut self.corner_squares,
            FillTarget::CornerDots => &mut self.corner_dots,
        };
        style.shape = shape;
        true
    }

    /// Gradient of `target` for in-place stop editing, if in gradient mode.
    pub fn gradient_mut(&mut self, target: FillTarget) -> Option<&mut Gradient> {
        match self.fill_mut(target) {
            Fill::Gradient(gradient) => Some(gradient),
            Fill::Color(_) => None,
        }
    }

    pub fn validate(&self) -> Vec<StyleViolation> {
        let mut violations = Vec::new();
        for target in FillTarget::ALL {
            self.fill(target).collect_violations(target, &mut violations);
        }
        if let Some(url) = &self.logo_image_url {
            if url.trim().is_empty() {
                violations.push(StyleViolation::EmptyLogoUrl);
            }
        }
        violations
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Flat per-target props consumed by the render engine.
    pub fn to_render_props(&self) -> StyleProps {
        StyleProps {
            background_options: self.background.to_props(),
            dots_options: self.dots.to_props(),
            corners_square_options: self.corner_squares.to_props(),
            corners_dot_options: self.corner_dots.to_props(),
            image: self.logo_image_url.clone(),
            image_options: ImageProps {
                hide_background_dots: true,
                image_size: LOGO_SIZE,
                margin: 0,
            },
            frame: match self.frame {
                Frame::None => None,
                frame => Some(FrameProps {
                    kind: frame,
                    anchor: frame.anchor(),
                    scale: frame.scale(),
                }),
            },
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GradientProps {
    #[serde(rename = "type")]
    pub kind: GradientKind,
    /// Radians.
    pub rotation: f64,
    pub color_stops: Vec<ColorStop>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FillProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gradient: Option<GradientProps>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TargetProps {
    #[serde(rename = "type")]
    pub shape: DotShape,
    #[serde(flatten)]
    pub fill: FillProps,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageProps {
    pub hide_background_dots: bool,
    pub image_size: f64,
    pub margin: u32,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FrameProps {
    pub kind: Frame,
    pub anchor: FrameAnchor,
    pub scale: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StyleProps {
    pub background_options: FillProps,
    pub dots_options: TargetProps,
    pub corners_square_options: TargetProps,
    pub corners_dot_options: TargetProps,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub image_options: ImageProps,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<FrameProps>,
}
