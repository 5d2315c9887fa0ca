//! SVG output for [`StyledEngine`].

use std::fmt::Write;

use crate::models::style::{Fill, FillTarget, Frame, GradientKind, LOGO_SIZE};
use crate::render::engine::StyledEngine;
use crate::render::shader::Bounds;
use crate::render::shape::{self, FINDER};
use crate::render::RenderError;
use crate::utils::color::{parse_hex, to_svg};

pub fn write(engine: &StyledEngine) -> Result<String, RenderError> {
    let layout = engine.layout();
    let matrix = engine.matrix();
    let style = &engine.options().style;
    let canvas = layout.canvas as f64;
    let m = layout.module;

    let mut out = String::new();
    write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{c}" height="{c}" viewBox="0 0 {c} {c}">"#,
        c = layout.canvas
    )?;

    let symbol = Bounds::square(layout.symbol_x, layout.symbol_y, layout.symbol_edge);
    let mut defs = String::new();
    let mut paint = |target: FillTarget| -> Result<String, RenderError> {
        let bounds = match target {
            FillTarget::Background => Bounds::square(0.0, 0.0, canvas),
            _ => symbol,
        };
        fill_attrs(&mut defs, target, style.fill(target), bounds)
    };
    let background = paint(FillTarget::Background)?;
    let dots = paint(FillTarget::Dots)?;
    let corner_squares = paint(FillTarget::CornerSquares)?;
    let corner_dots = paint(FillTarget::CornerDots)?;
    if !defs.is_empty() {
        write!(out, "<defs>{}</defs>", defs)?;
    }

    write!(out, r#"<rect width="{c}" height="{c}" {}/>"#, background, c = layout.canvas)?;
    write_frame(&mut out, engine, &frame_color(style.fill(FillTarget::Dots)))?;

    write!(out, "<path {} d=\"", dots)?;
    for y in 0..matrix.width() {
        for x in 0..matrix.width() {
            if !matrix.is_data_module(x, y) {
                continue;
            }
            let radii = shape::module_radii(style.dots.shape, matrix.neighbours(x, y));
            let (ox, oy) = layout.module_origin(x, y);
            rounded_rect(&mut out, ox, oy, m, m, radii.map(|r| r * m))?;
        }
    }
    out.push_str("\"/>");

    let half = FINDER as f64 / 2.0;
    let outer = shape::corner_radii(style.corner_squares.shape, half);
    let inner = outer.map(|r| (r - 1.0).max(0.0));
    let dot = shape::corner_radii(style.corner_dots.shape, 1.5);
    for (fx, fy) in matrix.finder_origins() {
        let (ox, oy) = layout.module_origin(fx, fy);
        write!(out, "<path {} fill-rule=\"evenodd\" d=\"", corner_squares)?;
        rounded_rect(&mut out, ox, oy, 7.0 * m, 7.0 * m, outer.map(|r| r * m))?;
        rounded_rect(&mut out, ox + m, oy + m, 5.0 * m, 5.0 * m, inner.map(|r| r * m))?;
        out.push_str("\"/>");

        write!(out, "<path {} d=\"", corner_dots)?;
        rounded_rect(&mut out, ox + 2.0 * m, oy + 2.0 * m, 3.0 * m, 3.0 * m, dot.map(|r| r * m))?;
        out.push_str("\"/>");
    }

    if let Some(url) = &style.logo_image_url {
        let edge = layout.symbol_edge * LOGO_SIZE;
        let offset = (layout.symbol_edge - edge) / 2.0;
        write!(
            out,
            r#"<image href="{}" x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" preserveAspectRatio="xMidYMid meet"/>"#,
            escape(url),
            layout.symbol_x + offset,
            layout.symbol_y + offset,
            edge,
            edge
        )?;
    }

    out.push_str("</svg>");
    Ok(out)
}

/// `fill` attributes for one target; gradients are appended to `defs`.
fn fill_attrs(
    defs: &mut String,
    target: FillTarget,
    fill: &Fill,
    bounds: Bounds,
) -> Result<String, RenderError> {
    let gradient = match fill {
        Fill::Color(color) => return Ok(solid(color)),
        Fill::Gradient(gradient) => gradient,
    };
    let id = format!("fill-{}", target.to_string().replace(' ', "-"));
    let (cx, cy) = (bounds.x + bounds.w / 2.0, bounds.y + bounds.h / 2.0);

    match gradient.kind {
        GradientKind::Linear => {
            let rotation = gradient.angle.to_radians();
            let (c, s) = (rotation.cos(), rotation.sin());
            let extent = (c.abs() * bounds.w + s.abs() * bounds.h) / 2.0;
            write!(
                defs,
                r#"<linearGradient id="{}" gradientUnits="userSpaceOnUse" x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}">"#,
                id,
                cx - c * extent,
                cy - s * extent,
                cx + c * extent,
                cy + s * extent
            )?;
        }
        GradientKind::Radial => {
            write!(
                defs,
                r#"<radialGradient id="{}" gradientUnits="userSpaceOnUse" cx="{:.2}" cy="{:.2}" r="{:.2}">"#,
                id,
                cx,
                cy,
                bounds.w.hypot(bounds.h) / 2.0
            )?;
        }
    }
    for stop in &gradient.color_stops {
        let (hex, opacity) = to_svg(parse_hex(&stop.color).unwrap_or([0, 0, 0, 255]));
        write!(
            defs,
            r#"<stop offset="{}" stop-color="{}" stop-opacity="{}"/>"#,
            stop.offset, hex, opacity
        )?;
    }
    defs.push_str(match gradient.kind {
        GradientKind::Linear => "</linearGradient>",
        GradientKind::Radial => "</radialGradient>",
    });
    Ok(format!("fill=\"url(#{})\"", id))
}

fn solid(color: &str) -> String {
    let (hex, opacity) = to_svg(parse_hex(color).unwrap_or([0, 0, 0, 255]));
    if opacity < 1.0 {
        format!("fill=\"{}\" fill-opacity=\"{}\"", hex, opacity)
    } else {
        format!("fill=\"{}\"", hex)
    }
}

fn frame_color(fill: &Fill) -> String {
    let color = match fill {
        Fill::Color(color) => Some(color.as_str()),
        Fill::Gradient(gradient) => gradient.first_color(),
    };
    to_svg(color.and_then(parse_hex).unwrap_or([0, 0, 0, 255])).0
}

fn write_frame(out: &mut String, engine: &StyledEngine, color: &str) -> Result<(), RenderError> {
    let layout = engine.layout();
    let canvas = layout.canvas as f64;
    match engine.options().style.frame {
        Frame::None => {}
        Frame::Plane => {
            let border = (canvas * 0.02).max(1.0);
            let gap = canvas * 0.03;
            write!(
                out,
                r#"<rect x="{b:.2}" y="{b:.2}" width="{w:.2}" height="{w:.2}" fill="none" stroke="{color}" stroke-width="{s:.2}"/>"#,
                b = border / 2.0,
                w = canvas - border,
                s = border,
            )?;
            let top = layout.symbol_y + layout.symbol_edge + gap;
            let height = (canvas - border - gap - top).max(0.0);
            write!(
                out,
                r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"/>"#,
                layout.symbol_x, top, layout.symbol_edge, height, color
            )?;
        }
        Frame::CircleBadge => {
            write!(
                out,
                r#"<circle cx="{c:.2}" cy="{c:.2}" r="{r:.2}" fill="none" stroke="{color}" stroke-width="{s:.2}"/>"#,
                c = canvas / 2.0,
                r = canvas * 0.47,
                s = canvas * 0.025,
            )?;
        }
    }
    Ok(())
}

/// Appends a closed rounded-rectangle subpath; radii clockwise from top-left.
fn rounded_rect(
    out: &mut String,
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    [tl, tr, br, bl]: [f64; 4],
) -> Result<(), RenderError> {
    write!(out, "M{:.2} {:.2}H{:.2}", x + tl, y, x + w - tr)?;
    if tr > 0.0 {
        write!(out, "A{r:.2} {r:.2} 0 0 1 {:.2} {:.2}", x + w, y + tr, r = tr)?;
    }
    write!(out, "V{:.2}", y + h - br)?;
    if br > 0.0 {
        write!(out, "A{r:.2} {r:.2} 0 0 1 {:.2} {:.2}", x + w - br, y + h, r = br)?;
    }
    write!(out, "H{:.2}", x + bl)?;
    if bl > 0.0 {
        write!(out, "A{r:.2} {r:.2} 0 0 1 {:.2} {:.2}", x, y + h - bl, r = bl)?;
    }
    write!(out, "V{:.2}", y + tl)?;
    if tl > 0.0 {
        write!(out, "A{r:.2} {r:.2} 0 0 1 {:.2} {:.2}", x + tl, y, r = tl)?;
    }
    out.push('Z');
    Ok(())
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
