use anyhow::{anyhow, Result};

/// Capture formats a camera may hand back instead of RGB.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PixelFormat {
    Rgb24,
    Yuyv,
    Nv12,
}

impl PixelFormat {
    pub(crate) fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"RGB3" => Some(Self::Rgb24),
            b"YUYV" => Some(Self::Yuyv),
            b"NV12" => Some(Self::Nv12),
            _ => None,
        }
    }
}

/// Convert one captured buffer to packed RGB8.
///
/// `stride` is the driver's bytes-per-line for the first plane; 0 means rows
/// are tightly packed. Row padding is dropped. NV12 chroma rows share the
/// luma stride.
pub(crate) fn normalize_to_rgb(
    pixels: &[u8],
    width: u32,
    height: u32,
    stride: usize,
    format: PixelFormat,
) -> Result<Vec<u8>> {
    let w = width as usize;
    let h = height as usize;
    w.checked_mul(h)
        .and_then(|plane| plane.checked_mul(3))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
    match format {
        PixelFormat::Rgb24 => {
            let rows = packed_rows(pixels, w * 3, h, stride, "RGB")?;
            Ok(rows.flatten().copied().collect())
        }
        PixelFormat::Yuyv => yuyv_to_rgb(pixels, w, h, stride),
        PixelFormat::Nv12 => nv12_to_rgb(pixels, w, h, stride),
    }
}

/// The `row_len` payload bytes of each of `rows` rows laid out at `stride`.
fn packed_rows<'a>(
    pixels: &'a [u8],
    row_len: usize,
    rows: usize,
    stride: usize,
    label: &str,
) -> Result<impl Iterator<Item = &'a [u8]>> {
    let stride = if stride == 0 { row_len } else { stride };
    if stride < row_len {
        return Err(anyhow!(
            "{} stride {} is shorter than a {}-byte row",
            label,
            stride,
            row_len
        ));
    }
    // The last row may omit its padding.
    let expected = match rows {
        0 => 0,
        n => stride * (n - 1) + row_len,
    };
    if pixels.len() < expected {
        return Err(anyhow!(
            "{} frame length mismatch: expected at least {}, got {}",
            label,
            expected,
            pixels.len()
        ));
    }
    Ok((0..rows).map(move |row| &pixels[row * stride..row * stride + row_len]))
}

fn yuyv_to_rgb(pixels: &[u8], w: usize, h: usize, stride: usize) -> Result<Vec<u8>> {
    if w % 2 != 0 {
        return Err(anyhow!("YUYV frames need an even width, got {}", w));
    }

    let mut rgb = Vec::with_capacity(w * h * 3);
    for row in packed_rows(pixels, w * 2, h, stride, "YUYV")? {
        for quad in row.chunks_exact(4) {
            let (y0, u, y1, v) = (quad[0], quad[1], quad[2], quad[3]);
            rgb.extend_from_slice(&yuv_to_rgb(y0, u, v));
            rgb.extend_from_slice(&yuv_to_rgb(y1, u, v));
        }
    }
    Ok(rgb)
}

fn nv12_to_rgb(pixels: &[u8], w: usize, h: usize, stride: usize) -> Result<Vec<u8>> {
    if w % 2 != 0 || h % 2 != 0 {
        return Err(anyhow!("NV12 frames need even dimensions, got {}x{}", w, h));
    }
    let stride = if stride == 0 { w } else { stride };
    let luma: Vec<&[u8]> = packed_rows(pixels, w, h, stride, "NV12 luma")?.collect();
    let chroma_start = stride * h;
    let chroma: Vec<&[u8]> = packed_rows(
        pixels.get(chroma_start..).unwrap_or(&[]),
        w,
        h / 2,
        stride,
        "NV12 chroma",
    )?
    .collect();

    let mut rgb = Vec::with_capacity(w * h * 3);
    for (j, luma_row) in luma.iter().enumerate() {
        let chroma_row = chroma[j / 2];
        for (i, &y) in luma_row.iter().enumerate() {
            let uv = (i / 2) * 2;
            rgb.extend_from_slice(&yuv_to_rgb(y, chroma_row[uv], chroma_row[uv + 1]));
        }
    }
    Ok(rgb)
}

fn yuv_to_rgb(y: u8, u: u8, v: u8) -> [u8; 3] {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;
    [
        clamp_to_u8(y + 1.402_f32 * v),
        clamp_to_u8(y - 0.344_136_f32 * u - 0.714_136_f32 * v),
        clamp_to_u8(y + 1.772_f32 * u),
    ]
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nv12_conversion_produces_gray() -> Result<()> {
        let nv12 = [vec![128u8; 4], vec![128u8; 2]].concat();
        let rgb = normalize_to_rgb(&nv12, 2, 2, 0, PixelFormat::Nv12)?;
        assert_eq!(rgb, vec![128u8; 12]);
        Ok(())
    }

    #[test]
    fn nv12_odd_dimensions_are_rejected() {
        assert!(normalize_to_rgb(&[128u8; 9], 3, 2, 0, PixelFormat::Nv12).is_err());
        assert!(normalize_to_rgb(&[128u8; 9], 2, 3, 0, PixelFormat::Nv12).is_err());
    }

    #[test]
    fn nv12_short_buffer_is_an_error() {
        assert!(normalize_to_rgb(&[128u8; 5], 2, 2, 0, PixelFormat::Nv12).is_err());
    }

    #[test]
    fn nv12_padded_rows_use_stride() -> Result<()> {
        // Luma rows of 2 bytes at stride 4, then one chroma row.
        let nv12 = [0u8, 255, 0xEE, 0xEE, 255, 0, 0xEE, 0xEE, 128, 128];
        let rgb = normalize_to_rgb(&nv12, 2, 2, 4, PixelFormat::Nv12)?;
        assert_eq!(
            rgb,
            vec![0, 0, 0, 255, 255, 255, 255, 255, 255, 0, 0, 0]
        );
        Ok(())
    }

    #[test]
    fn yuyv_conversion_shares_chroma() -> Result<()> {
        let yuyv = [0u8, 128, 255, 128];
        let rgb = normalize_to_rgb(&yuyv, 2, 1, 0, PixelFormat::Yuyv)?;
        assert_eq!(rgb, vec![0, 0, 0, 255, 255, 255]);
        Ok(())
    }

    #[test]
    fn yuyv_padded_rows_use_stride() -> Result<()> {
        let yuyv = [0u8, 128, 255, 128, 0xEE, 0xEE, 255, 128, 0, 128, 0xEE, 0xEE];
        let rgb = normalize_to_rgb(&yuyv, 2, 2, 6, PixelFormat::Yuyv)?;
        assert_eq!(
            rgb,
            vec![0, 0, 0, 255, 255, 255, 255, 255, 255, 0, 0, 0]
        );
        Ok(())
    }

    #[test]
    fn rgb_padded_rows_use_stride() -> Result<()> {
        let pixels = [
            10u8, 10, 10, 20, 20, 20, 0xEE, 0xEE, //
            30, 30, 30, 40, 40, 40, 0xEE, 0xEE,
        ];
        let rgb = normalize_to_rgb(&pixels, 2, 2, 8, PixelFormat::Rgb24)?;
        assert_eq!(rgb, vec![10, 10, 10, 20, 20, 20, 30, 30, 30, 40, 40, 40]);
        Ok(())
    }

    #[test]
    fn rgb_packed_rows_pass_through() -> Result<()> {
        let pixels: Vec<u8> = (0..12).collect();
        let rgb = normalize_to_rgb(&pixels, 2, 2, 0, PixelFormat::Rgb24)?;
        assert_eq!(rgb, pixels);
        Ok(())
    }

    #[test]
    fn stride_shorter_than_row_is_rejected() {
        assert!(normalize_to_rgb(&[0u8; 12], 2, 2, 4, PixelFormat::Rgb24).is_err());
        assert!(normalize_to_rgb(&[0u8; 10], 2, 2, 0, PixelFormat::Rgb24).is_err());
    }

    #[test]
    fn fourcc_lookup() {
        assert_eq!(PixelFormat::from_fourcc(b"YUYV"), Some(PixelFormat::Yuyv));
        assert_eq!(PixelFormat::from_fourcc(b"MJPG"), None);
    }
}
