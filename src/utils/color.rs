/// RGBA channels parsed from a `#RGB`, `#RRGGBB` or `#RRGGBBAA` string.
pub type Rgba = [u8; 4];

pub fn parse_hex(value: &str) -> Option<Rgba> {
    let hex = value.strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();

    match hex.len() {
        3 => {
            let mut out = [0, 0, 0, 255];
            for (i, c) in hex.chars().enumerate() {
                out[i] = c.to_digit(16)? as u8 * 17;
            }
            Some(out)
        }
        6 => Some([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            255,
        ]),
        8 => Some([
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
            channel(&hex[6..8])?,
        ]),
        _ => None,
    }
}

pub fn is_hex_color(value: &str) -> bool {
    parse_hex(value).is_some()
}

/// Linear interpolation between two colors, `t` clamped to 0..1.
pub fn mix(a: Rgba, b: Rgba, t: f64) -> Rgba {
    let t = t.clamp(0.0, 1.0);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = (a[i] as f64 + (b[i] as f64 - a[i] as f64) * t).round() as u8;
    }
    out
}

/// Source-over compositing of `top` onto an opaque-or-not `bottom`.
pub fn blend(bottom: Rgba, top: Rgba) -> Rgba {
    let alpha = top[3] as f64 / 255.0;
    if alpha >= 1.0 {
        return top;
    }
    let base_alpha = bottom[3] as f64 / 255.0;
    let out_alpha = alpha + base_alpha * (1.0 - alpha);
    if out_alpha <= 0.0 {
        return [0, 0, 0, 0];
    }
    let mut out = [0u8; 4];
    for i in 0..3 {
        let c = (top[i] as f64 * alpha + bottom[i] as f64 * base_alpha * (1.0 - alpha)) / out_alpha;
        out[i] = c.round() as u8;
    }
    out[3] = (out_alpha * 255.0).round() as u8;
    out
}

/// Hex color and opacity for SVG `fill` / `fill-opacity` attributes.
pub fn to_svg(color: Rgba) -> (String, f64) {
    (
        format!("#{:02x}{:02x}{:02x}", color[0], color[1], color[2]),
        color[3] as f64 / 255.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_long_and_alpha_forms() {
        assert_eq!(parse_hex("#fff"), Some([255, 255, 255, 255]));
        assert_eq!(parse_hex("#102030"), Some([16, 32, 48, 255]));
        assert_eq!(parse_hex("#10203080"), Some([16, 32, 48, 128]));
    }

    #[test]
    fn rejects_malformed_colors() {
        assert_eq!(parse_hex("fff"), None);
        assert_eq!(parse_hex("#ggg"), None);
        assert_eq!(parse_hex("#12345"), None);
        assert_eq!(parse_hex("#ééé"), None);
    }

    #[test]
    fn mix_hits_both_ends() {
        let black = [0, 0, 0, 255];
        let white = [255, 255, 255, 255];
        assert_eq!(mix(black, white, 0.0), black);
        assert_eq!(mix(black, white, 1.0), white);
        assert_eq!(mix(black, white, 0.5), [128, 128, 128, 255]);
    }

    #[test]
    fn opaque_top_replaces_bottom() {
        assert_eq!(blend([1, 2, 3, 255], [9, 9, 9, 255]), [9, 9, 9, 255]);
    }
}
