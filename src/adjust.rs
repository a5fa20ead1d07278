//! Lookup-table adjustments for 8, 24 and 32-bit standard bitmaps.

use crate::bitmap::PixelBufferMut;
use crate::error::ImageError;
use crate::math::{floor, powf};
use crate::pixel::{
    CHANNEL_ALPHA, CHANNEL_BLUE, CHANNEL_GREEN, CHANNEL_RED, ColorChannel, ColorType, ImageType,
};

/// 256-entry table mapping an 8-bit sample to its replacement.
pub type Lut = [u8; 256];

fn identity_lut() -> Lut {
    core::array::from_fn(|i| i as u8)
}

#[inline]
fn round_byte(v: f64) -> u8 {
    floor(v + 0.5) as u8
}

fn check_curve_input<B: PixelBufferMut + ?Sized>(buf: &B) -> Result<(), ImageError> {
    if !buf.has_pixels() {
        return Err(ImageError::NoPixels);
    }
    let bpp = buf.bpp();
    if buf.image_type() != ImageType::Bitmap || !matches!(bpp, 8 | 24 | 32) {
        return Err(ImageError::unsupported_pixels(buf.image_type(), bpp));
    }
    Ok(())
}

/// Apply `lut` to an image.
///
/// 8-bit palettised images have their palette remapped; other 8-bit images
/// their samples. 24 and 32-bit images remap the byte channels named by
/// `channel`; alpha is only touched on 32-bit images when selected
/// explicitly, and [`ColorChannel::Black`] leaves colour images unchanged.
pub fn adjust_curve<B: PixelBufferMut + ?Sized>(
    buf: &mut B,
    lut: &Lut,
    channel: ColorChannel,
) -> Result<(), ImageError> {
    check_curve_input(buf)?;
    let width = buf.width() as usize;

    if buf.bpp() == 8 {
        if buf.color_type() == ColorType::Palette {
            if let Some(palette) = buf.palette_mut() {
                for c in palette {
                    c.r = lut[usize::from(c.r)];
                    c.g = lut[usize::from(c.g)];
                    c.b = lut[usize::from(c.b)];
                }
            }
        } else {
            for y in 0..buf.height() {
                let row = buf.scanline_mut(y).ok_or(ImageError::NoPixels)?;
                for v in &mut row[..width] {
                    *v = lut[usize::from(*v)];
                }
            }
        }
        return Ok(());
    }

    let bytespp = buf.bpp() as usize / 8;
    let offsets: &[usize] = match channel {
        ColorChannel::Rgb => &[CHANNEL_BLUE, CHANNEL_GREEN, CHANNEL_RED],
        ColorChannel::Blue => &[CHANNEL_BLUE],
        ColorChannel::Green => &[CHANNEL_GREEN],
        ColorChannel::Red => &[CHANNEL_RED],
        ColorChannel::Alpha if bytespp == 4 => &[CHANNEL_ALPHA],
        ColorChannel::Alpha | ColorChannel::Black => &[],
    };
    if offsets.is_empty() {
        return Ok(());
    }
    for y in 0..buf.height() {
        let row = buf.scanline_mut(y).ok_or(ImageError::NoPixels)?;
        for px in row[..width * bytespp].chunks_exact_mut(bytespp) {
            for &o in offsets {
                px[o] = lut[usize::from(px[o])];
            }
        }
    }
    Ok(())
}

/// Build one table combining the four adjustments, and the number of stages
/// that are not neutral.
///
/// Stages run in a fixed order on unrounded values: contrast, brightness,
/// gamma, invert. Rounding happens once at the end. `brightness` and
/// `contrast` are percentages in -100..=100; `gamma` is ignored unless it is
/// positive and not 1.
pub fn adjust_colors_lut(brightness: f64, contrast: f64, gamma: f64, invert: bool) -> (Lut, u32) {
    if brightness == 0.0 && contrast == 0.0 && gamma == 1.0 && !invert {
        return (identity_lut(), 0);
    }

    let mut table: [f64; 256] = core::array::from_fn(|i| i as f64);
    let mut stages = 0;

    if contrast != 0.0 {
        let v = (100.0 + contrast) / 100.0;
        for x in &mut table {
            *x = (128.0 + (*x - 128.0) * v).clamp(0.0, 255.0);
        }
        stages += 1;
    }

    if brightness != 0.0 {
        let v = (100.0 + brightness) / 100.0;
        for x in &mut table {
            *x = (*x * v).clamp(0.0, 255.0);
        }
        stages += 1;
    }

    if gamma > 0.0 && gamma != 1.0 {
        let exponent = 1.0 / gamma;
        let v = 255.0 * powf(255.0, -exponent);
        for x in &mut table {
            *x = (powf(*x, exponent) * v).clamp(0.0, 255.0);
        }
        stages += 1;
    }

    let lut = if invert {
        stages += 1;
        table.map(|x| 255 - round_byte(x))
    } else {
        table.map(round_byte)
    };
    (lut, stages)
}

/// Gamma-correct R, G and B. Values above 1 lighten, below 1 darken.
pub fn adjust_gamma<B: PixelBufferMut + ?Sized>(buf: &mut B, gamma: f64) -> Result<(), ImageError> {
    if gamma <= 0.0 {
        return Err(ImageError::InvalidParameter(alloc::format!(
            "gamma must be positive, got {gamma}"
        )));
    }
    let exponent = 1.0 / gamma;
    let v = 255.0 * powf(255.0, -exponent);
    let lut: Lut = core::array::from_fn(|i| round_byte((powf(i as f64, exponent) * v).min(255.0)));
    adjust_curve(buf, &lut, ColorChannel::Rgb)
}

/// Scale R, G and B by `(100 + percentage) / 100`.
pub fn adjust_brightness<B: PixelBufferMut + ?Sized>(
    buf: &mut B,
    percentage: f64,
) -> Result<(), ImageError> {
    let scale = (100.0 + percentage) / 100.0;
    let lut: Lut = core::array::from_fn(|i| round_byte((i as f64 * scale).clamp(0.0, 255.0)));
    adjust_curve(buf, &lut, ColorChannel::Rgb)
}

/// Stretch R, G and B around mid-grey by `(100 + percentage) / 100`.
pub fn adjust_contrast<B: PixelBufferMut + ?Sized>(
    buf: &mut B,
    percentage: f64,
) -> Result<(), ImageError> {
    let scale = (100.0 + percentage) / 100.0;
    let lut: Lut = core::array::from_fn(|i| {
        round_byte((128.0 + (i as f64 - 128.0) * scale).clamp(0.0, 255.0))
    });
    adjust_curve(buf, &lut, ColorChannel::Rgb)
}

/// Apply brightness, contrast, gamma and inversion in one pass.
///
/// Returns the number of stages applied. With all parameters neutral the
/// image is not touched and 0 is returned.
pub fn adjust_colors<B: PixelBufferMut + ?Sized>(
    buf: &mut B,
    brightness: f64,
    contrast: f64,
    gamma: f64,
    invert: bool,
) -> Result<u32, ImageError> {
    check_curve_input(buf)?;
    let (lut, stages) = adjust_colors_lut(brightness, contrast, gamma, invert);
    if stages > 0 {
        adjust_curve(buf, &lut, ColorChannel::Rgb)?;
    }
    Ok(stages)
}

/// Invert every sample.
///
/// Palettised 1, 4 and 8-bit images have their palette inverted instead.
/// 24 and 32-bit standard bitmaps invert every byte, alpha included, as do
/// 16-bit unsigned greyscale and RGB(A) images.
pub fn invert<B: PixelBufferMut + ?Sized>(buf: &mut B) -> Result<(), ImageError> {
    if !buf.has_pixels() {
        return Err(ImageError::NoPixels);
    }
    let image_type = buf.image_type();
    let bpp = buf.bpp();
    match (image_type, bpp) {
        (ImageType::Bitmap, 1 | 4 | 8) if buf.color_type() == ColorType::Palette => {
            if let Some(palette) = buf.palette_mut() {
                for c in palette {
                    c.r = 255 - c.r;
                    c.g = 255 - c.g;
                    c.b = 255 - c.b;
                }
            }
            return Ok(());
        }
        (ImageType::Bitmap, 1 | 4 | 8 | 24 | 32)
        | (ImageType::Uint16 | ImageType::Rgb16 | ImageType::Rgba16, _) => {}
        _ => return Err(ImageError::unsupported_pixels(image_type, bpp)),
    }

    let line = buf.line_bytes();
    for y in 0..buf.height() {
        let row = buf.scanline_mut(y).ok_or(ImageError::NoPixels)?;
        for v in &mut row[..line] {
            *v = !*v;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::{Bitmap, PixelBuffer};

    #[test]
    fn neutral_parameters_give_identity() {
        let (lut, n) = adjust_colors_lut(0.0, 0.0, 1.0, false);
        assert_eq!(n, 0);
        assert_eq!(lut, identity_lut());
    }

    #[test]
    fn non_positive_gamma_is_skipped() {
        let (lut, n) = adjust_colors_lut(0.0, 0.0, -2.0, false);
        assert_eq!(n, 0);
        assert_eq!(lut, identity_lut());
    }

    #[test]
    fn invert_stage_counts() {
        let (lut, n) = adjust_colors_lut(0.0, 0.0, 1.0, true);
        assert_eq!(n, 1);
        assert_eq!(lut[0], 255);
        assert_eq!(lut[255], 0);
        assert_eq!(lut[100], 155);
    }

    #[test]
    fn gamma_keeps_endpoints() {
        let (lut, n) = adjust_colors_lut(0.0, 0.0, 2.2, false);
        assert_eq!(n, 1);
        assert_eq!(lut[0], 0);
        assert_eq!(lut[255], 255);
        assert!(lut[64] > 64);
    }

    #[test]
    fn curve_on_selected_channel_only() {
        let mut bmp = Bitmap::new(1, 1, 32).unwrap();
        bmp.scanline_mut(0).unwrap()[..4].copy_from_slice(&[1, 2, 3, 4]);
        let lut = identity_lut().map(|v| v.wrapping_add(10));
        adjust_curve(&mut bmp, &lut, ColorChannel::Red).unwrap();
        assert_eq!(&bmp.scanline(0).unwrap()[..4], &[1, 2, 13, 4]);
        adjust_curve(&mut bmp, &lut, ColorChannel::Alpha).unwrap();
        assert_eq!(&bmp.scanline(0).unwrap()[..4], &[1, 2, 13, 14]);
        adjust_curve(&mut bmp, &lut, ColorChannel::Black).unwrap();
        assert_eq!(&bmp.scanline(0).unwrap()[..4], &[1, 2, 13, 14]);
    }

    #[test]
    fn curve_on_palette() {
        let mut bmp = Bitmap::new(1, 1, 8).unwrap();
        bmp.palette_mut().unwrap()[1].g = 0;
        assert_eq!(bmp.color_type(), ColorType::Palette);
        bmp.scanline_mut(0).unwrap()[0] = 1;
        let lut = identity_lut().map(|v| 255 - v);
        adjust_curve(&mut bmp, &lut, ColorChannel::Rgb).unwrap();
        assert_eq!(bmp.scanline(0).unwrap()[0], 1);
        assert_eq!(bmp.palette().unwrap()[1].g, 255);
        assert_eq!(bmp.palette().unwrap()[1].r, 254);
    }

    #[test]
    fn curve_rejects_other_depths() {
        let mut bmp = Bitmap::new(2, 2, 4).unwrap();
        assert!(adjust_curve(&mut bmp, &identity_lut(), ColorChannel::Rgb).is_err());
        let mut bmp = Bitmap::new_typed(ImageType::Uint16, 2, 2).unwrap();
        assert!(adjust_curve(&mut bmp, &identity_lut(), ColorChannel::Rgb).is_err());
        assert!(adjust_gamma(&mut Bitmap::new(1, 1, 8).unwrap(), 0.0).is_err());
    }

    #[test]
    fn neutral_adjust_colors_leaves_pixels() {
        let mut bmp = Bitmap::new(1, 1, 24).unwrap();
        bmp.scanline_mut(0).unwrap()[..3].copy_from_slice(&[5, 6, 7]);
        assert_eq!(adjust_colors(&mut bmp, 0.0, 0.0, 1.0, false).unwrap(), 0);
        assert_eq!(&bmp.scanline(0).unwrap()[..3], &[5, 6, 7]);
        assert_eq!(adjust_colors(&mut bmp, 0.0, 0.0, 1.0, true).unwrap(), 1);
        assert_eq!(&bmp.scanline(0).unwrap()[..3], &[250, 249, 248]);
    }

    #[test]
    fn invert_greyscale_samples_and_words() {
        let mut bmp = Bitmap::new(2, 1, 8).unwrap();
        bmp.scanline_mut(0).unwrap()[..2].copy_from_slice(&[0, 200]);
        invert(&mut bmp).unwrap();
        assert_eq!(&bmp.scanline(0).unwrap()[..2], &[255, 55]);

        let mut words = Bitmap::new_typed(ImageType::Uint16, 1, 1).unwrap();
        words.scanline_mut(0).unwrap()[..2].copy_from_slice(&1000u16.to_ne_bytes());
        invert(&mut words).unwrap();
        let v = u16::from_ne_bytes([words.scanline(0).unwrap()[0], words.scanline(0).unwrap()[1]]);
        assert_eq!(v, !1000u16);

        let mut float = Bitmap::new_typed(ImageType::Float, 1, 1).unwrap();
        assert!(invert(&mut float).is_err());
    }

    #[test]
    fn invert_palette_leaves_indices() {
        let mut bmp = Bitmap::new(1, 1, 4).unwrap();
        bmp.palette_mut().unwrap()[3].b = 1;
        bmp.scanline_mut(0).unwrap()[0] = 0x30;
        invert(&mut bmp).unwrap();
        assert_eq!(bmp.scanline(0).unwrap()[0], 0x30);
        assert_eq!(bmp.palette().unwrap()[0].r, 255);
        assert_eq!(bmp.palette().unwrap()[3].b, 254);
    }
}
