//! Colour and palette-index remapping.
//!
//! Colour mapping rewrites the palette of palettised images and the pixels
//! of 24/32-bit images. Index mapping rewrites the pixel indices of
//! palettised images and leaves the palette alone.

use alloc::vec::Vec;

use rgb::Bgra;

use crate::bitmap::PixelBufferMut;
use crate::error::ImageError;
use crate::pixel::{CHANNEL_ALPHA, CHANNEL_BLUE, CHANNEL_GREEN, CHANNEL_RED, ImageType};

/// Replacement for `v`: the first `src[j]` it equals maps to `dst[j]`, and
/// with `swap` the first `dst[j]` maps back to `src[j]`.
fn lookup<T: Copy>(v: T, src: &[T], dst: &[T], swap: bool, eq: impl Fn(T, T) -> bool) -> Option<T> {
    for (&s, &d) in src.iter().zip(dst) {
        if eq(v, s) {
            return Some(d);
        }
        if swap && eq(v, d) {
            return Some(s);
        }
    }
    None
}

fn check_mapping_input<B, T>(buf: &B, src: &[T], dst: &[T]) -> Result<(), ImageError>
where
    B: PixelBufferMut + ?Sized,
{
    if !buf.has_pixels() {
        return Err(ImageError::NoPixels);
    }
    if buf.image_type() != ImageType::Bitmap {
        return Err(ImageError::unsupported_pixels(buf.image_type(), buf.bpp()));
    }
    if src.len() != dst.len() {
        return Err(ImageError::InvalidParameter(alloc::format!(
            "mapping needs equal-length lists, got {} and {}",
            src.len(),
            dst.len()
        )));
    }
    Ok(())
}

/// Replace each colour in `src` by the colour at the same position in `dst`.
///
/// Palettised images change their palette (alpha is never compared there);
/// 16, 24 and 32-bit images change their pixels. On 16-bit images colours
/// are packed to the image's [`Rgb16Packing`](crate::Rgb16Packing) first,
/// so they match on the retained high bits only. On 32-bit images alpha takes
/// part in the comparison and is written, unless `ignore_alpha`. With `swap`
/// colours in `dst` are also mapped back to `src`.
///
/// Returns the number of palette entries or pixels changed.
pub fn apply_color_mapping<B: PixelBufferMut + ?Sized>(
    buf: &mut B,
    src: &[Bgra<u8>],
    dst: &[Bgra<u8>],
    ignore_alpha: bool,
    swap: bool,
) -> Result<u32, ImageError> {
    check_mapping_input(buf, src, dst)?;
    if src.is_empty() {
        return Ok(0);
    }
    let same_rgb = |a: Bgra<u8>, b: Bgra<u8>| a.r == b.r && a.g == b.g && a.b == b.b;
    let mut changed = 0;

    match buf.bpp() {
        1 | 4 | 8 => {
            if let Some(palette) = buf.palette_mut() {
                for c in palette {
                    if let Some(to) = lookup(*c, src, dst, swap, same_rgb) {
                        c.r = to.r;
                        c.g = to.g;
                        c.b = to.b;
                        changed += 1;
                    }
                }
            }
        }
        16 => {
            let packing = buf.rgb16_packing().unwrap_or_default();
            let pack = |c: &Bgra<u8>| packing.pack(c.r, c.g, c.b);
            let src16: Vec<u16> = src.iter().map(pack).collect();
            let dst16: Vec<u16> = dst.iter().map(pack).collect();
            let width = buf.width() as usize;
            for y in 0..buf.height() {
                let row = buf.scanline_mut(y).ok_or(ImageError::NoPixels)?;
                for px in row[..width * 2].chunks_exact_mut(2) {
                    let current = u16::from_ne_bytes([px[0], px[1]]);
                    if let Some(to) = lookup(current, &src16, &dst16, swap, |a, b| a == b) {
                        px.copy_from_slice(&to.to_ne_bytes());
                        changed += 1;
                    }
                }
            }
        }
        bpp @ (24 | 32) => {
            let bytespp = bpp as usize / 8;
            let with_alpha = bpp == 32 && !ignore_alpha;
            let width = buf.width() as usize;
            for y in 0..buf.height() {
                let row = buf.scanline_mut(y).ok_or(ImageError::NoPixels)?;
                for px in row[..width * bytespp].chunks_exact_mut(bytespp) {
                    let current = Bgra {
                        b: px[CHANNEL_BLUE],
                        g: px[CHANNEL_GREEN],
                        r: px[CHANNEL_RED],
                        a: if with_alpha { px[CHANNEL_ALPHA] } else { 0 },
                    };
                    let hit = lookup(current, src, dst, swap, |a, b| {
                        same_rgb(a, b) && (!with_alpha || a.a == b.a)
                    });
                    if let Some(to) = hit {
                        px[CHANNEL_BLUE] = to.b;
                        px[CHANNEL_GREEN] = to.g;
                        px[CHANNEL_RED] = to.r;
                        if with_alpha {
                            px[CHANNEL_ALPHA] = to.a;
                        }
                        changed += 1;
                    }
                }
            }
        }
        bpp => return Err(ImageError::unsupported_pixels(ImageType::Bitmap, bpp)),
    }
    Ok(changed)
}

/// Swap two colours. See [`apply_color_mapping`].
pub fn swap_colors<B: PixelBufferMut + ?Sized>(
    buf: &mut B,
    a: Bgra<u8>,
    b: Bgra<u8>,
    ignore_alpha: bool,
) -> Result<u32, ImageError> {
    apply_color_mapping(buf, &[a], &[b], ignore_alpha, true)
}

/// Replace palette indices in the pixel data of a 4 or 8-bit image.
///
/// 4-bit indices compare on their low nibble. 1-bit images are accepted but
/// never changed. Returns the number of pixels changed.
pub fn apply_palette_index_mapping<B: PixelBufferMut + ?Sized>(
    buf: &mut B,
    src: &[u8],
    dst: &[u8],
    swap: bool,
) -> Result<u32, ImageError> {
    check_mapping_input(buf, src, dst)?;
    if src.is_empty() {
        return Ok(0);
    }
    let width = buf.width() as usize;
    let line = buf.line_bytes();
    let mut changed = 0;

    match buf.bpp() {
        1 => {}
        4 => {
            let nibble_eq = |a: u8, b: u8| a == b & 0x0F;
            for y in 0..buf.height() {
                let row = buf.scanline_mut(y).ok_or(ImageError::NoPixels)?;
                for (x, byte) in row[..line].iter_mut().enumerate() {
                    // High nibble is the first pixel of each byte.
                    let pixels_here = (width - 2 * x).min(2);
                    for shift in [4u8, 0].into_iter().take(pixels_here) {
                        let index = (*byte >> shift) & 0x0F;
                        if let Some(to) = lookup(index, src, dst, swap, nibble_eq) {
                            *byte = (*byte & !(0x0F << shift)) | ((to & 0x0F) << shift);
                            changed += 1;
                        }
                    }
                }
            }
        }
        8 => {
            for y in 0..buf.height() {
                let row = buf.scanline_mut(y).ok_or(ImageError::NoPixels)?;
                for v in &mut row[..width] {
                    if let Some(to) = lookup(*v, src, dst, swap, |a, b| a == b) {
                        *v = to;
                        changed += 1;
                    }
                }
            }
        }
        bpp => return Err(ImageError::unsupported_pixels(ImageType::Bitmap, bpp)),
    }
    Ok(changed)
}

/// Swap two palette indices in the pixel data. See
/// [`apply_palette_index_mapping`].
pub fn swap_palette_indices<B: PixelBufferMut + ?Sized>(
    buf: &mut B,
    a: u8,
    b: u8,
) -> Result<u32, ImageError> {
    apply_palette_index_mapping(buf, &[a], &[b], true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::{Bitmap, PixelBuffer};

    fn bgra(b: u8, g: u8, r: u8, a: u8) -> Bgra<u8> {
        Bgra { b, g, r, a }
    }

    #[test]
    fn swap_colors_on_24_bit() {
        let mut bmp = Bitmap::new(3, 1, 24).unwrap();
        bmp.scanline_mut(0).unwrap()[..9].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        let n = swap_colors(&mut bmp, bgra(1, 2, 3, 0), bgra(4, 5, 6, 0), false).unwrap();
        assert_eq!(n, 2);
        assert_eq!(&bmp.scanline(0).unwrap()[..9], &[4, 5, 6, 1, 2, 3, 7, 8, 9]);
    }

    #[test]
    fn alpha_participates_unless_ignored() {
        let mut bmp = Bitmap::new(1, 1, 32).unwrap();
        bmp.scanline_mut(0).unwrap()[..4].copy_from_slice(&[1, 2, 3, 200]);
        let src = [bgra(1, 2, 3, 0)];
        let dst = [bgra(9, 9, 9, 9)];
        assert_eq!(apply_color_mapping(&mut bmp, &src, &dst, false, false).unwrap(), 0);
        assert_eq!(apply_color_mapping(&mut bmp, &src, &dst, true, false).unwrap(), 1);
        assert_eq!(&bmp.scanline(0).unwrap()[..4], &[9, 9, 9, 200]);
    }

    #[test]
    fn palettised_mapping_touches_palette_only() {
        let mut bmp = Bitmap::new(2, 1, 8).unwrap();
        bmp.scanline_mut(0).unwrap()[..2].copy_from_slice(&[0, 255]);
        let n = apply_color_mapping(
            &mut bmp,
            &[bgra(0, 0, 0, 0)],
            &[bgra(0, 0, 255, 0)],
            true,
            false,
        )
        .unwrap();
        assert_eq!(n, 1);
        assert_eq!(bmp.palette().unwrap()[0].r, 255);
        assert_eq!(&bmp.scanline(0).unwrap()[..2], &[0, 255]);
    }

    #[test]
    fn four_bit_index_swap_skips_padding_nibble() {
        let mut bmp = Bitmap::new(3, 1, 4).unwrap();
        // Pixels 1, 2, 1 and a padding nibble of 2.
        bmp.scanline_mut(0).unwrap()[..2].copy_from_slice(&[0x12, 0x12]);
        let n = swap_palette_indices(&mut bmp, 1, 2).unwrap();
        assert_eq!(n, 3);
        assert_eq!(&bmp.scanline(0).unwrap()[..2], &[0x21, 0x22]);
    }

    #[test]
    fn one_bit_index_mapping_changes_nothing() {
        let mut bmp = Bitmap::new(8, 1, 1).unwrap();
        bmp.scanline_mut(0).unwrap()[0] = 0xF0;
        assert_eq!(swap_palette_indices(&mut bmp, 0, 1).unwrap(), 0);
        assert_eq!(bmp.scanline(0).unwrap()[0], 0xF0);
    }

    #[test]
    fn mismatched_lists_rejected() {
        let mut bmp = Bitmap::new(1, 1, 8).unwrap();
        assert!(apply_palette_index_mapping(&mut bmp, &[1, 2], &[3], false).is_err());
    }
}
