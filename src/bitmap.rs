//! Pixel buffer accessors and the owned [`Bitmap`] that implements them.

use alloc::vec;
use alloc::vec::Vec;

use rgb::Bgra;

use crate::error::ImageError;
use crate::pixel::{ColorType, ImageType, PixelLayout, Rgb16Packing};

/// Read access to a 2D pixel buffer.
///
/// Rows are `pitch` bytes apart; only the first [`line_bytes`](Self::line_bytes)
/// of each scanline carry pixel data.
pub trait PixelBuffer {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Bits per pixel.
    fn bpp(&self) -> u32;
    /// Bytes between the starts of consecutive rows.
    fn pitch(&self) -> usize;
    fn image_type(&self) -> ImageType;
    /// Colour table for 1, 4 and 8-bit standard bitmaps.
    fn palette(&self) -> Option<&[Bgra<u8>]>;
    /// Row `y`, or `None` when out of range or the buffer is header-only.
    fn scanline(&self, y: u32) -> Option<&[u8]>;
    /// `false` for header-only buffers.
    fn has_pixels(&self) -> bool;

    /// Packed bytes of pixel data per row, excluding pitch padding.
    fn line_bytes(&self) -> usize {
        (self.width() as usize * self.bpp() as usize).div_ceil(8)
    }

    /// Colour classification, derived from the type tag, depth and palette.
    fn color_type(&self) -> ColorType {
        classify(self.image_type(), self.bpp(), self.palette())
    }

    /// Channel packing of a 16-bit standard bitmap; `None` for any other
    /// depth or type. Defaults to 5-5-5.
    fn rgb16_packing(&self) -> Option<Rgb16Packing> {
        (self.image_type() == ImageType::Bitmap && self.bpp() == 16)
            .then_some(Rgb16Packing::Rgb555)
    }

    /// Concrete sample representation of this buffer.
    fn pixel_layout(&self) -> Result<PixelLayout, ImageError> {
        PixelLayout::resolve(self.image_type(), self.bpp(), self.color_type())
    }
}

/// Write access to a 2D pixel buffer.
pub trait PixelBufferMut: PixelBuffer {
    fn scanline_mut(&mut self, y: u32) -> Option<&mut [u8]>;
    fn palette_mut(&mut self) -> Option<&mut [Bgra<u8>]>;
}

fn classify(image_type: ImageType, bpp: u32, palette: Option<&[Bgra<u8>]>) -> ColorType {
    match image_type {
        ImageType::Bitmap => match bpp {
            1 | 4 | 8 => palette.map_or(ColorType::MinIsBlack, classify_palette),
            32 => ColorType::RgbAlpha,
            _ => ColorType::Rgb,
        },
        ImageType::Complex | ImageType::ComplexF => ColorType::Complex,
        ImageType::Rgb16 | ImageType::Rgb32 | ImageType::RgbF => ColorType::Rgb,
        ImageType::Rgba16 | ImageType::Rgba32 | ImageType::RgbaF => ColorType::RgbAlpha,
        ImageType::Uint16
        | ImageType::Int16
        | ImageType::Uint32
        | ImageType::Int32
        | ImageType::Float
        | ImageType::Double
        | ImageType::Unknown => ColorType::MinIsBlack,
    }
}

/// A palette is greyscale when it is a linear ramp, in either direction.
fn classify_palette(palette: &[Bgra<u8>]) -> ColorType {
    let n = palette.len();
    if n < 2 {
        return ColorType::Palette;
    }
    let mut min_is_black = true;
    let mut min_is_white = true;
    for (i, c) in palette.iter().enumerate() {
        if c.r != c.g || c.r != c.b {
            return ColorType::Palette;
        }
        let ramp = (i * 255 / (n - 1)) as u8;
        min_is_black &= c.r == ramp;
        min_is_white &= c.r == 255 - ramp;
    }
    if min_is_black {
        ColorType::MinIsBlack
    } else if min_is_white {
        ColorType::MinIsWhite
    } else {
        ColorType::Palette
    }
}

fn grey_ramp(entries: usize) -> Vec<Bgra<u8>> {
    (0..entries)
        .map(|i| {
            let v = (i * 255 / (entries - 1)) as u8;
            Bgra { b: v, g: v, r: v, a: 0 }
        })
        .collect()
}

/// Owned pixel buffer with 4-byte aligned rows.
///
/// 24 and 32-bit standard bitmaps store samples as B, G, R(, A), see
/// [`crate::CHANNEL_RED`] and friends. Higher-precision types store their
/// channels in R, G, B(, A) order, native endian.
#[derive(Clone, Debug, PartialEq)]
pub struct Bitmap {
    image_type: ImageType,
    width: u32,
    height: u32,
    bpp: u32,
    pitch: usize,
    palette: Vec<Bgra<u8>>,
    packing: Rgb16Packing,
    pixels: Option<Vec<u8>>,
}

impl Bitmap {
    /// Allocate a zeroed standard bitmap of 1, 4, 8, 16, 24 or 32 bits per pixel.
    ///
    /// Palettised depths get a default greyscale palette.
    pub fn new(width: u32, height: u32, bpp: u32) -> Result<Self, ImageError> {
        Self::allocate(ImageType::Bitmap, width, height, bpp, true)
    }

    /// Allocate a zeroed bitmap of a non-standard type. Depth follows the type.
    pub fn new_typed(image_type: ImageType, width: u32, height: u32) -> Result<Self, ImageError> {
        let bpp = image_type
            .fixed_bpp()
            .ok_or(ImageError::unsupported_pixels(image_type, 0))?;
        Self::allocate(image_type, width, height, bpp, true)
    }

    /// Allocate a bitmap carrying only header information, no pixel storage.
    ///
    /// `bpp` is ignored for types whose depth is fixed.
    pub fn header_only(
        image_type: ImageType,
        width: u32,
        height: u32,
        bpp: u32,
    ) -> Result<Self, ImageError> {
        let bpp = image_type.fixed_bpp().unwrap_or(bpp);
        Self::allocate(image_type, width, height, bpp, false)
    }

    /// Build a bitmap from tightly packed rows (no padding between rows).
    pub fn from_packed(
        image_type: ImageType,
        width: u32,
        height: u32,
        bpp: u32,
        data: &[u8],
    ) -> Result<Self, ImageError> {
        let bpp = image_type.fixed_bpp().unwrap_or(bpp);
        let mut bitmap = Self::allocate(image_type, width, height, bpp, true)?;
        let line = bitmap.line_bytes();
        let needed = line * height as usize;
        if data.len() < needed {
            return Err(ImageError::BufferTooSmall {
                needed,
                actual: data.len(),
            });
        }
        for (y, src) in data.chunks_exact(line).take(height as usize).enumerate() {
            if let Some(dst) = bitmap.scanline_mut(y as u32) {
                dst[..line].copy_from_slice(src);
            }
        }
        Ok(bitmap)
    }

    fn allocate(
        image_type: ImageType,
        width: u32,
        height: u32,
        bpp: u32,
        with_pixels: bool,
    ) -> Result<Self, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidParameter(alloc::format!(
                "cannot allocate a {width}x{height} bitmap"
            )));
        }
        match image_type {
            ImageType::Unknown => return Err(ImageError::unsupported_pixels(image_type, bpp)),
            ImageType::Bitmap => {
                if !matches!(bpp, 1 | 4 | 8 | 16 | 24 | 32) {
                    return Err(ImageError::unsupported_pixels(image_type, bpp));
                }
            }
            _ => {
                if image_type.fixed_bpp() != Some(bpp) {
                    return Err(ImageError::unsupported_pixels(image_type, bpp));
                }
            }
        }

        let too_large = || ImageError::DimensionsTooLarge { width, height };
        let pitch = u64::from(width)
            .checked_mul(u64::from(bpp))
            .map(|bits| bits.div_ceil(32) * 4)
            .and_then(|p| usize::try_from(p).ok())
            .ok_or_else(too_large)?;
        let size = pitch
            .checked_mul(height as usize)
            .ok_or_else(too_large)?;

        let palette = if image_type == ImageType::Bitmap && bpp <= 8 {
            grey_ramp(1 << bpp)
        } else {
            Vec::new()
        };

        Ok(Self {
            image_type,
            width,
            height,
            bpp,
            pitch,
            palette,
            packing: Rgb16Packing::default(),
            pixels: with_pixels.then(|| vec![0u8; size]),
        })
    }

    /// Switch a 16-bit standard bitmap to another channel packing. Pixel
    /// bytes are kept as they are.
    pub fn with_rgb16_packing(mut self, packing: Rgb16Packing) -> Result<Self, ImageError> {
        if self.image_type != ImageType::Bitmap || self.bpp != 16 {
            return Err(ImageError::InvalidParameter(alloc::format!(
                "{}-bit {:?} image has no 16-bit channel packing",
                self.bpp,
                self.image_type
            )));
        }
        self.packing = packing;
        Ok(self)
    }

    /// Whole pixel storage including pitch padding.
    pub fn pixels(&self) -> Option<&[u8]> {
        self.pixels.as_deref()
    }

    /// Mutable pixel storage including pitch padding.
    pub fn pixels_mut(&mut self) -> Option<&mut [u8]> {
        self.pixels.as_deref_mut()
    }

    /// Copy pixels out as a typed [`imgref::ImgVec`].
    ///
    /// `P` must be exactly one pixel wide in memory, e.g. `rgb::Rgb<u16>` for
    /// [`ImageType::Rgb16`].
    #[cfg(feature = "imgref")]
    pub fn to_imgvec<P: bytemuck::Pod>(&self) -> Result<imgref::ImgVec<P>, ImageError> {
        let size = core::mem::size_of::<P>();
        if size * 8 != self.bpp as usize {
            return Err(ImageError::unsupported_pixels(self.image_type, self.bpp));
        }
        let line = self.line_bytes();
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize);
        for y in 0..self.height {
            let row = self.scanline(y).ok_or(ImageError::NoPixels)?;
            out.extend(
                row[..line]
                    .chunks_exact(size)
                    .map(bytemuck::pod_read_unaligned::<P>),
            );
        }
        Ok(imgref::ImgVec::new(
            out,
            self.width as usize,
            self.height as usize,
        ))
    }
}

impl PixelBuffer for Bitmap {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn bpp(&self) -> u32 {
        self.bpp
    }

    fn pitch(&self) -> usize {
        self.pitch
    }

    fn image_type(&self) -> ImageType {
        self.image_type
    }

    fn palette(&self) -> Option<&[Bgra<u8>]> {
        (!self.palette.is_empty()).then_some(self.palette.as_slice())
    }

    fn scanline(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let start = y as usize * self.pitch;
        self.pixels.as_ref()?.get(start..start + self.pitch)
    }

    fn has_pixels(&self) -> bool {
        self.pixels.is_some()
    }

    fn rgb16_packing(&self) -> Option<Rgb16Packing> {
        (self.image_type == ImageType::Bitmap && self.bpp == 16).then_some(self.packing)
    }
}

impl PixelBufferMut for Bitmap {
    fn scanline_mut(&mut self, y: u32) -> Option<&mut [u8]> {
        if y >= self.height {
            return None;
        }
        let start = y as usize * self.pitch;
        let pitch = self.pitch;
        self.pixels.as_mut()?.get_mut(start..start + pitch)
    }

    fn palette_mut(&mut self) -> Option<&mut [Bgra<u8>]> {
        (!self.palette.is_empty()).then_some(self.palette.as_mut_slice())
    }
}
