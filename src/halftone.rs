//! Greyscale conversion, thresholding and halftoning to 1-bit images.

use alloc::vec;
use alloc::vec::Vec;

use crate::bitmap::{Bitmap, PixelBuffer, PixelBufferMut};
use crate::error::ImageError;
use crate::pixel::{CHANNEL_BLUE, CHANNEL_GREEN, CHANNEL_RED, ColorType, ImageType, grey};

const WHITE: u8 = 255;
const BLACK: u8 = 0;

/// Halftoning method for [`dither`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DitherAlgorithm {
    /// Floyd and Steinberg error diffusion.
    FloydSteinberg,
    /// Ordered dispersed dot, 4x4 Bayer matrix.
    Bayer4x4,
    /// Ordered dispersed dot, 8x8 Bayer matrix.
    Bayer8x8,
    /// Ordered dispersed dot, 16x16 Bayer matrix.
    Bayer16x16,
    /// Ordered clustered dot, 6x6 matrix.
    Cluster6x6,
    /// Ordered clustered dot, 8x8 matrix.
    Cluster8x8,
    /// Ordered clustered dot, 16x16 matrix.
    Cluster16x16,
}

/// Tightly packed 8-bit plane used between conversion steps.
struct GreyPlane {
    width: usize,
    height: usize,
    px: Vec<u8>,
}

impl GreyPlane {
    fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            px: vec![0; width * height],
        }
    }

    fn row(&self, y: usize) -> &[u8] {
        &self.px[y * self.width..(y + 1) * self.width]
    }

    fn row_mut(&mut self, y: usize) -> &mut [u8] {
        &mut self.px[y * self.width..(y + 1) * self.width]
    }

    fn into_bitmap(self) -> Result<Bitmap, ImageError> {
        Bitmap::from_packed(
            ImageType::Bitmap,
            self.width as u32,
            self.height as u32,
            8,
            &self.px,
        )
    }
}

fn grey_plane<B: PixelBuffer + ?Sized>(buf: &B) -> Result<GreyPlane, ImageError> {
    if !buf.has_pixels() {
        return Err(ImageError::NoPixels);
    }
    let bpp = buf.bpp();
    if buf.image_type() != ImageType::Bitmap {
        return Err(ImageError::unsupported_pixels(buf.image_type(), bpp));
    }
    let (width, height) = (buf.width() as usize, buf.height() as usize);
    let mut plane = GreyPlane::new(width, height);
    let palette_grey: Vec<u8> = buf
        .palette()
        .unwrap_or_default()
        .iter()
        .map(|c| grey(c.r, c.g, c.b))
        .collect();
    let lookup = |index: u8| palette_grey.get(usize::from(index)).copied().unwrap_or(BLACK);

    for y in 0..height {
        let src = buf.scanline(y as u32).ok_or(ImageError::NoPixels)?;
        let dst = plane.row_mut(y);
        match bpp {
            1 => {
                for (x, v) in dst.iter_mut().enumerate() {
                    *v = lookup((src[x >> 3] >> (7 - (x & 7))) & 1);
                }
            }
            4 => {
                for (x, v) in dst.iter_mut().enumerate() {
                    let shift = if x & 1 == 0 { 4 } else { 0 };
                    *v = lookup((src[x >> 1] >> shift) & 0x0F);
                }
            }
            8 if buf.color_type() == ColorType::MinIsBlack => dst.copy_from_slice(&src[..width]),
            8 => {
                for (v, &index) in dst.iter_mut().zip(src) {
                    *v = lookup(index);
                }
            }
            16 => {
                let packing = buf.rgb16_packing().unwrap_or_default();
                for (v, px) in dst.iter_mut().zip(src.chunks_exact(2)) {
                    let [r, g, b] = packing.unpack(u16::from_ne_bytes([px[0], px[1]]));
                    *v = grey(r, g, b);
                }
            }
            24 | 32 => {
                let bytespp = bpp as usize / 8;
                for (v, px) in dst.iter_mut().zip(src.chunks_exact(bytespp)) {
                    *v = grey(px[CHANNEL_RED], px[CHANNEL_GREEN], px[CHANNEL_BLUE]);
                }
            }
            _ => return Err(ImageError::unsupported_pixels(ImageType::Bitmap, bpp)),
        }
    }
    Ok(plane)
}

/// Convert a 1, 4, 8, 16, 24 or 32-bit standard bitmap to 8-bit greyscale.
///
/// Palettised images take the Rec. 709 luma of each palette entry; 8-bit
/// images that are already black-to-white greyscale are copied. 16-bit
/// pixels are expanded to 8 bits per channel through their packing first.
pub fn convert_to_greyscale<B: PixelBuffer + ?Sized>(buf: &B) -> Result<Bitmap, ImageError> {
    grey_plane(buf)?.into_bitmap()
}

/// Copy of a 1-bit image whose palette is forced to black and white when it
/// is not already a greyscale ramp.
fn clone_one_bit<B: PixelBuffer + ?Sized>(buf: &B) -> Result<Bitmap, ImageError> {
    let mut out = Bitmap::new(buf.width(), buf.height(), 1)?;
    let line = buf.line_bytes();
    for y in 0..buf.height() {
        let src = buf.scanline(y).ok_or(ImageError::NoPixels)?;
        let dst = out.scanline_mut(y).ok_or(ImageError::NoPixels)?;
        dst[..line].copy_from_slice(&src[..line]);
    }
    if let (Some(src), Some(dst)) = (buf.palette(), out.palette_mut()) {
        for (d, s) in dst.iter_mut().zip(src) {
            *d = *s;
        }
    }
    if out.color_type() == ColorType::Palette {
        if let Some(palette) = out.palette_mut() {
            for (entry, v) in palette.iter_mut().zip([BLACK, WHITE]) {
                entry.r = v;
                entry.g = v;
                entry.b = v;
            }
        }
    }
    Ok(out)
}

fn threshold_plane(plane: &GreyPlane, t: u8) -> Result<Bitmap, ImageError> {
    let mut out = Bitmap::new(plane.width as u32, plane.height as u32, 1)?;
    for y in 0..plane.height {
        let dst = out.scanline_mut(y as u32).ok_or(ImageError::NoPixels)?;
        for (x, &v) in plane.row(y).iter().enumerate() {
            if v >= t {
                dst[x >> 3] |= 0x80 >> (x & 7);
            }
        }
    }
    Ok(out)
}

/// Binarise to a 1-bit black/white image: samples at or above `t` become
/// white.
///
/// 1-bit input is copied, with its palette forced to black and white if it
/// was a colour palette.
pub fn threshold<B: PixelBuffer + ?Sized>(buf: &B, t: u8) -> Result<Bitmap, ImageError> {
    if !buf.has_pixels() {
        return Err(ImageError::NoPixels);
    }
    if buf.image_type() == ImageType::Bitmap && buf.bpp() == 1 {
        return clone_one_bit(buf);
    }
    threshold_plane(&grey_plane(buf)?, t)
}

/// Halftone to a 1-bit black/white image.
///
/// The input is converted to 8-bit greyscale, dithered to black and white
/// samples, then thresholded at 128. Results are deterministic; Floyd and
/// Steinberg uses a fixed-seed generator for its border thresholds.
pub fn dither<B: PixelBuffer + ?Sized>(
    buf: &B,
    algorithm: DitherAlgorithm,
) -> Result<Bitmap, ImageError> {
    if !buf.has_pixels() {
        return Err(ImageError::NoPixels);
    }
    if buf.image_type() == ImageType::Bitmap && buf.bpp() == 1 {
        return clone_one_bit(buf);
    }
    let input = grey_plane(buf)?;
    let dithered = match algorithm {
        DitherAlgorithm::FloydSteinberg => floyd_steinberg(&input),
        DitherAlgorithm::Bayer4x4 => ordered_dispersed(&input, 2),
        DitherAlgorithm::Bayer8x8 => ordered_dispersed(&input, 3),
        DitherAlgorithm::Bayer16x16 => ordered_dispersed(&input, 4),
        DitherAlgorithm::Cluster6x6 => ordered_clustered(&input, &CLUSTER_6X6, 3),
        DitherAlgorithm::Cluster8x8 => ordered_clustered(&input, &CLUSTER_8X8, 4),
        DitherAlgorithm::Cluster16x16 => ordered_clustered(&input, &CLUSTER_16X16, 8),
    };
    threshold_plane(&dithered, 128)
}

/// Linear congruential generator with 32-bit signed wrap-around.
struct Lcg(i32);

impl Lcg {
    /// Next value in `(-rn, rn)`.
    fn next(&mut self, rn: i32) -> i32 {
        self.0 = self.0.wrapping_mul(1_103_515_245).wrapping_add(12345);
        (self.0 >> 12) % rn
    }

    fn border_threshold(&mut self) -> i32 {
        i32::from(WHITE / 2) + self.next(129) - 64
    }
}

/// Border pixel against a randomised threshold, carrying `error` along.
fn quantise(sample: u8, error: &mut i32, rng: &mut Lcg) -> u8 {
    let pixel = i32::from(sample) + *error;
    let p = if pixel > rng.border_threshold() { WHITE } else { BLACK };
    *error = pixel - i32::from(p);
    p
}

fn init_error(sample: u8, out: u8) -> i32 {
    let x = i32::from(sample);
    x - i32::from(out) + (i32::from(WHITE / 2) - x) / 2
}

// Filter weights, in sixteenths:
//        *  7
//     3  5  1
fn floyd_steinberg(input: &GreyPlane) -> GreyPlane {
    let (width, height) = (input.width, input.height);
    let mut out = GreyPlane::new(width, height);
    let mut lerr = vec![0i32; width];
    let mut cerr = vec![0i32; width];
    let mut rng = Lcg(0);
    if width == 0 || height == 0 {
        return out;
    }

    // Left and right borders run down the columns, then the top row.
    for column in [0, width - 1] {
        let mut error = 0;
        for y in 0..height {
            out.row_mut(y)[column] = quantise(input.row(y)[column], &mut error, &mut rng);
        }
    }
    let mut error = 0;
    for x in 0..width {
        let sample = input.row(0)[x];
        let p = quantise(sample, &mut error, &mut rng);
        out.row_mut(0)[x] = p;
        lerr[x] = init_error(sample, p);
    }

    for y in 1..height {
        let src = input.row(y);
        let dst = out.row_mut(y);
        cerr[0] = init_error(src[0], dst[0]);
        for x in 1..width.saturating_sub(1) {
            let error = (lerr[x - 1] + 5 * lerr[x] + 3 * lerr[x + 1] + 7 * cerr[x - 1]) / 16;
            let pixel = i32::from(src[x]) + error;
            let p = if pixel > i32::from(WHITE / 2) { WHITE } else { BLACK };
            dst[x] = p;
            cerr[x] = pixel - i32::from(p);
        }
        cerr[0] = init_error(src[0], dst[0]);
        cerr[width - 1] = init_error(src[width - 1], dst[width - 1]);
        core::mem::swap(&mut lerr, &mut cerr);
    }
    out
}

/// Bayer matrix value at `(x, y)` for a `2^order` square matrix.
fn bayer_value(mut x: usize, mut y: usize, order: u32) -> usize {
    let mut d = 0;
    for _ in 0..order {
        d = (((d << 1) | ((x & 1) ^ (y & 1))) << 1) | (y & 1);
        x >>= 1;
        y >>= 1;
    }
    d
}

fn ordered_dispersed(input: &GreyPlane, order: u32) -> GreyPlane {
    let l = 1usize << order;
    let cells = (l * l) as f64;
    let matrix: Vec<u8> = (0..l * l)
        .map(|i| (255.0 * ((bayer_value(i / l, i % l, order) as f64 + 0.5) / cells)) as u8)
        .collect();

    let mut out = GreyPlane::new(input.width, input.height);
    for y in 0..input.height {
        let dst = out.row_mut(y);
        for (x, (&v, o)) in input.row(y).iter().zip(dst).enumerate() {
            *o = if v > matrix[(x % l) + l * (y % l)] { WHITE } else { BLACK };
        }
    }
    out
}

#[rustfmt::skip]
const CLUSTER_6X6: [u8; 36] = [
     9, 11, 10,  8,  6,  7,
    12, 17, 16,  5,  0,  1,
    13, 14, 15,  4,  3,  2,
     8,  6,  7,  9, 11, 10,
     5,  0,  1, 12, 17, 16,
     4,  3,  2, 13, 14, 15,
];

#[rustfmt::skip]
const CLUSTER_8X8: [u8; 64] = [
    18, 20, 19, 16, 13, 11, 12, 15,
    27, 28, 29, 22,  4,  3,  2,  9,
    26, 31, 30, 21,  5,  0,  1, 10,
    23, 25, 24, 17,  8,  6,  7, 14,
    13, 11, 12, 15, 18, 20, 19, 16,
     4,  3,  2,  9, 27, 28, 29, 22,
     5,  0,  1, 10, 26, 31, 30, 21,
     8,  6,  7, 14, 23, 25, 24, 17,
];

#[rustfmt::skip]
const CLUSTER_16X16: [u8; 256] = [
     64,  69,  77,  87,  86,  76,  68,  67,  63,  58,  50,  40,  41,  51,  59,  60,
     70,  94, 100, 109, 108,  99,  93,  75,  57,  33,  27,  18,  19,  28,  34,  52,
     78, 101, 114, 116, 115, 112,  98,  83,  49,  26,  13,  11,  12,  15,  29,  44,
     88, 110, 123, 124, 125, 118, 107,  85,  39,  17,   4,   3,   2,   9,  20,  42,
     89, 111, 122, 127, 126, 117, 106,  84,  38,  16,   5,   0,   1,  10,  21,  43,
     79, 102, 119, 121, 120, 113,  97,  82,  48,  25,   8,   6,   7,  14,  30,  45,
     71,  95, 103, 104, 105,  96,  92,  74,  56,  32,  24,  23,  22,  31,  35,  53,
     65,  72,  80,  90,  91,  81,  73,  66,  62,  55,  47,  37,  36,  46,  54,  61,
     63,  58,  50,  40,  41,  51,  59,  60,  64,  69,  77,  87,  86,  76,  68,  67,
     57,  33,  27,  18,  19,  28,  34,  52,  70,  94, 100, 109, 108,  99,  93,  75,
     49,  26,  13,  11,  12,  15,  29,  44,  78, 101, 114, 116, 115, 112,  98,  83,
     39,  17,   4,   3,   2,   9,  20,  42,  88, 110, 123, 124, 125, 118, 107,  85,
     38,  16,   5,   0,   1,  10,  21,  43,  89, 111, 122, 127, 126, 117, 106,  84,
     48,  25,   8,   6,   7,  14,  30,  45,  79, 102, 119, 121, 120, 113,  97,  82,
     56,  32,  24,  23,  22,  31,  35,  53,  71,  95, 103, 104, 105,  96,  92,  74,
     62,  55,  47,  37,  36,  46,  54,  61,  65,  72,  80,  90,  91,  81,  73,  66,
];

/// `base` is a `2 * order` square matrix; it is scaled into a local table.
fn ordered_clustered(input: &GreyPlane, base: &[u8], order: usize) -> GreyPlane {
    let l = 2 * order;
    let scale = 256 / (l * order) as u16;
    let matrix: Vec<u16> = base.iter().map(|&m| u16::from(m) * scale).collect();

    let mut out = GreyPlane::new(input.width, input.height);
    for y in 0..input.height {
        let dst = out.row_mut(y);
        for (x, (&v, o)) in input.row(y).iter().zip(dst).enumerate() {
            *o = if u16::from(v) >= matrix[(y % l) + l * (x % l)] {
                WHITE
            } else {
                BLACK
            };
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(width: u32, height: u32, v: u8) -> Bitmap {
        let mut bmp = Bitmap::new(width, height, 8).unwrap();
        for y in 0..height {
            bmp.scanline_mut(y).unwrap()[..width as usize].fill(v);
        }
        bmp
    }

    fn ones(bmp: &Bitmap) -> u32 {
        (0..bmp.height())
            .map(|y| {
                let row = bmp.scanline(y).unwrap();
                (0..bmp.width() as usize)
                    .filter(|&x| row[x >> 3] & (0x80 >> (x & 7)) != 0)
                    .count() as u32
            })
            .sum()
    }

    #[test]
    fn bayer_4x4_matrix() {
        let values: Vec<usize> = (0..16).map(|i| bayer_value(i / 4, i % 4, 2)).collect();
        let mut sorted = values.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..16).collect::<Vec<_>>());
        assert_eq!(&values[..4], &[0, 12, 3, 15]);
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let mut bmp = Bitmap::new(3, 1, 8).unwrap();
        bmp.scanline_mut(0).unwrap()[..3].copy_from_slice(&[99, 100, 101]);
        let out = threshold(&bmp, 100).unwrap();
        assert_eq!(out.bpp(), 1);
        assert_eq!(out.scanline(0).unwrap()[0], 0b0110_0000);
        assert_eq!(out.color_type(), ColorType::MinIsBlack);
    }

    #[test]
    fn threshold_one_bit_forces_black_white_palette() {
        let mut bmp = Bitmap::new(8, 1, 1).unwrap();
        bmp.scanline_mut(0).unwrap()[0] = 0xA5;
        bmp.palette_mut().unwrap()[0].r = 200;
        let out = threshold(&bmp, 1).unwrap();
        assert_eq!(out.scanline(0).unwrap()[0], 0xA5);
        assert_eq!(out.color_type(), ColorType::MinIsBlack);
    }

    #[test]
    fn greyscale_of_bgr() {
        let mut bmp = Bitmap::new(2, 1, 24).unwrap();
        bmp.scanline_mut(0).unwrap()[..6].copy_from_slice(&[0, 0, 255, 0, 255, 0]);
        let grey = convert_to_greyscale(&bmp).unwrap();
        assert_eq!(grey.bpp(), 8);
        assert_eq!(&grey.scanline(0).unwrap()[..2], &[54, 182]);
    }

    #[test]
    fn greyscale_of_four_bit_reads_high_nibble_first() {
        let mut bmp = Bitmap::new(2, 1, 4).unwrap();
        bmp.scanline_mut(0).unwrap()[0] = 0xF0;
        let out = convert_to_greyscale(&bmp).unwrap();
        assert_eq!(&out.scanline(0).unwrap()[..2], &[grey(255, 255, 255), 0]);
    }

    #[test]
    fn white_stays_white() {
        use DitherAlgorithm::*;
        for algo in [Bayer4x4, Bayer8x8, Bayer16x16, Cluster6x6, Cluster8x8, Cluster16x16] {
            assert_eq!(ones(&dither(&filled(16, 16, 255), algo).unwrap()), 256, "{algo:?}");
        }
        for algo in [Bayer4x4, Bayer8x8, Bayer16x16] {
            assert_eq!(ones(&dither(&filled(16, 16, 0), algo).unwrap()), 0, "{algo:?}");
        }
    }

    #[test]
    fn clustered_black_keeps_zero_cells_lit() {
        // Cells with threshold 0 pass the inclusive comparison.
        let out = dither(&filled(6, 6, 0), DitherAlgorithm::Cluster6x6).unwrap();
        assert_eq!(ones(&out), 2);
    }

    #[test]
    fn mid_grey_bayer_is_half_white() {
        let out = dither(&filled(16, 16, 128), DitherAlgorithm::Bayer4x4).unwrap();
        assert_eq!(ones(&out), 128);
    }

    #[test]
    fn floyd_steinberg_is_deterministic_and_tracks_density() {
        let input = filled(32, 32, 64);
        let a = dither(&input, DitherAlgorithm::FloydSteinberg).unwrap();
        let b = dither(&input, DitherAlgorithm::FloydSteinberg).unwrap();
        assert_eq!(a, b);
        let white = ones(&a);
        assert!((128..=384).contains(&white), "{white}");
    }

    #[test]
    fn floyd_steinberg_handles_single_column() {
        let out = dither(&filled(1, 4, 200), DitherAlgorithm::FloydSteinberg).unwrap();
        assert_eq!(out.width(), 1);
    }

    #[test]
    fn greyscale_of_sixteen_bit_555() {
        let data: Vec<u8> = [0x7C00u16, 0x001F, 0x8000]
            .iter()
            .flat_map(|v| v.to_ne_bytes())
            .collect();
        let bmp = Bitmap::from_packed(ImageType::Bitmap, 3, 1, 16, &data).unwrap();
        let grey = convert_to_greyscale(&bmp).unwrap();
        // The unused top bit does not count towards red.
        assert_eq!(&grey.scanline(0).unwrap()[..3], &[54, 18, 0]);
    }

    #[test]
    fn rejects_non_bitmap_types() {
        let bmp = Bitmap::new_typed(ImageType::Float, 2, 2).unwrap();
        assert!(threshold(&bmp, 128).is_err());
        assert!(dither(&bmp, DitherAlgorithm::Bayer4x4).is_err());
    }
}
