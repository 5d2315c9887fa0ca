//! Single-page PDF around a PNG.
//!
//! The PNG's compressed image data is embedded as-is: PDF's FlateDecode
//! with PNG predictors reads IDAT streams directly, so no re-encoding is
//! needed. Only 8-bit RGB, non-interlaced PNGs are accepted.

use std::io::Write;

use thiserror::Error;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("not a PNG image")]
    NotPng,
    #[error("PNG data is truncated")]
    Truncated,
    #[error("unsupported PNG layout (color type {color_type}, bit depth {bit_depth}, interlace {interlace})")]
    Unsupported {
        color_type: u8,
        bit_depth: u8,
        interlace: u8,
    },
    #[error("PNG has no image data")]
    MissingImageData,
    #[error("failed to write PDF: {0}")]
    Io(#[from] std::io::Error),
}

/// Wraps a rendered PNG in a document.
pub trait PdfWriter: Send + Sync {
    fn write(&self, png: &[u8], margin: u32) -> Result<Vec<u8>, PdfError>;
}

/// Writes one page of `image + 2 * margin` points with the image centred.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngPdfWriter;

struct PngImage {
    width: u32,
    height: u32,
    idat: Vec<u8>,
}

fn read_png(png: &[u8]) -> Result<PngImage, PdfError> {
    if png.len() < 8 || png[..8] != PNG_SIGNATURE {
        return Err(PdfError::NotPng);
    }
    let mut pos = 8;
    let mut header = None;
    let mut idat = Vec::new();

    while pos + 8 <= png.len() {
        let len = u32::from_be_bytes([png[pos], png[pos + 1], png[pos + 2], png[pos + 3]]) as usize;
        let kind = &png[pos + 4..pos + 8];
        let start = pos + 8;
        let end = start.checked_add(len).ok_or(PdfError::Truncated)?;
        if end + 4 > png.len() {
            return Err(PdfError::Truncated);
        }
        let data = &png[start..end];

        match kind {
            b"IHDR" => {
                if data.len() < 13 {
                    return Err(PdfError::Truncated);
                }
                let width = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
                let height = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
                let (bit_depth, color_type, interlace) = (data[8], data[9], data[12]);
                if bit_depth != 8 || color_type != 2 || interlace != 0 {
                    return Err(PdfError::Unsupported {
                        color_type,
                        bit_depth,
                        interlace,
                    });
                }
                header = Some((width, height));
            }
            b"IDAT" => idat.extend_from_slice(data),
            b"IEND" => break,
            _ => {}
        }
        pos = end + 4; // skip CRC
    }

    let (width, height) = header.ok_or(PdfError::NotPng)?;
    if idat.is_empty() {
        return Err(PdfError::MissingImageData);
    }
    Ok(PngImage {
        width,
        height,
        idat,
    })
}

impl PdfWriter for PngPdfWriter {
    fn write(&self, png: &[u8], margin: u32) -> Result<Vec<u8>, PdfError> {
        let image = read_png(png)?;
        let page_w = image.width + 2 * margin;
        let page_h = image.height + 2 * margin;

        let mut out: Vec<u8> = Vec::with_capacity(image.idat.len() + 1024);
        let mut offsets = Vec::with_capacity(5);
        out.write_all(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n")?;

        offsets.push(out.len());
        out.write_all(b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n")?;

        offsets.push(out.len());
        out.write_all(b"2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n")?;

        offsets.push(out.len());
        write!(
            out,
            "3 0 obj\n<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
             /Resources << /XObject << /Im0 4 0 R >> >> /Contents 5 0 R >>\nendobj\n",
            page_w, page_h
        )?;

        offsets.push(out.len());
        write!(
            out,
            "4 0 obj\n<< /Type /XObject /Subtype /Image /Width {w} /Height {h} \
             /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode \
             /DecodeParms << /Predictor 15 /Colors 3 /BitsPerComponent 8 /Columns {w} >> \
             /Length {len} >>\nstream\n",
            w = image.width,
            h = image.height,
            len = image.idat.len()
        )?;
        out.write_all(&image.idat)?;
        out.write_all(b"\nendstream\nendobj\n")?;

        let content = format!(
            "q {} 0 0 {} {} {} cm /Im0 Do Q",
            image.width, image.height, margin, margin
        );
        offsets.push(out.len());
        write!(
            out,
            "5 0 obj\n<< /Length {} >>\nstream\n{}\nendstream\nendobj\n",
            content.len(),
            content
        )?;

        let xref = out.len();
        write!(out, "xref\n0 {}\n0000000000 65535 f \n", offsets.len() + 1)?;
        for offset in &offsets {
            write!(out, "{:010} 00000 n \n", offset)?;
        }
        write!(
            out,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            offsets.len() + 1,
            xref
        )?;
        Ok(out)
    }
}
