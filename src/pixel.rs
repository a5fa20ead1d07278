//! Pixel type tags, colour classes and concrete sample layouts.

use crate::error::ImageError;
use crate::math::{sqrt, sqrtf};

/// Byte offset of the blue sample within a 24/32-bit standard bitmap pixel.
pub const CHANNEL_BLUE: usize = 0;
/// Byte offset of the green sample within a 24/32-bit standard bitmap pixel.
pub const CHANNEL_GREEN: usize = 1;
/// Byte offset of the red sample within a 24/32-bit standard bitmap pixel.
pub const CHANNEL_RED: usize = 2;
/// Byte offset of the alpha sample within a 32-bit standard bitmap pixel.
pub const CHANNEL_ALPHA: usize = 3;

/// Channel selector for curve adjustment and the 256-bin histogram.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorChannel {
    /// Red, green and blue together.
    Rgb,
    Red,
    Green,
    Blue,
    Alpha,
    /// Greyscale intensity.
    Black,
}

/// Logical pixel-type tag carried by every pixel buffer.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageType {
    /// Unknown or unset type. Never maps to a pixel representation.
    Unknown,
    /// Standard bitmap: 1, 4, 8, 16, 24 or 32 bits per pixel.
    Bitmap,
    /// Unsigned 16-bit scalar.
    Uint16,
    /// Signed 16-bit scalar.
    Int16,
    /// Unsigned 32-bit scalar.
    Uint32,
    /// Signed 32-bit scalar.
    Int32,
    /// 32-bit float scalar.
    Float,
    /// 64-bit float scalar.
    Double,
    /// Two 64-bit floats: real and imaginary parts.
    Complex,
    /// Two 32-bit floats: real and imaginary parts.
    ComplexF,
    /// 3 x 16-bit unsigned RGB.
    Rgb16,
    /// 4 x 16-bit unsigned RGBA.
    Rgba16,
    /// 3 x 32-bit unsigned RGB.
    Rgb32,
    /// 4 x 32-bit unsigned RGBA.
    Rgba32,
    /// 3 x 32-bit float RGB.
    RgbF,
    /// 4 x 32-bit float RGBA.
    RgbaF,
}

impl ImageType {
    /// Every tag, in declaration order.
    pub const ALL: [ImageType; 16] = [
        ImageType::Unknown,
        ImageType::Bitmap,
        ImageType::Uint16,
        ImageType::Int16,
        ImageType::Uint32,
        ImageType::Int32,
        ImageType::Float,
        ImageType::Double,
        ImageType::Complex,
        ImageType::ComplexF,
        ImageType::Rgb16,
        ImageType::Rgba16,
        ImageType::Rgb32,
        ImageType::Rgba32,
        ImageType::RgbF,
        ImageType::RgbaF,
    ];

    /// Bits per pixel for types whose depth is implied by the tag.
    ///
    /// Returns `None` for [`ImageType::Bitmap`] (depth chosen at allocation)
    /// and [`ImageType::Unknown`].
    pub fn fixed_bpp(self) -> Option<u32> {
        match self {
            Self::Unknown | Self::Bitmap => None,
            Self::Uint16 | Self::Int16 => Some(16),
            Self::Uint32 | Self::Int32 | Self::Float => Some(32),
            Self::Double | Self::ComplexF => Some(64),
            Self::Complex => Some(128),
            Self::Rgb16 => Some(48),
            Self::Rgba16 => Some(64),
            Self::Rgb32 | Self::RgbF => Some(96),
            Self::Rgba32 | Self::RgbaF => Some(128),
        }
    }
}

/// Colour classification of a pixel buffer.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorType {
    /// Greyscale ramp from white (index 0) to black.
    MinIsWhite,
    /// Greyscale ramp from black (index 0) to white, or a scalar image.
    MinIsBlack,
    /// Direct RGB colour.
    Rgb,
    /// Palette indices into an arbitrary colour table.
    Palette,
    /// Direct RGB colour with alpha.
    RgbAlpha,
    /// Complex-valued samples.
    Complex,
}

/// Concrete in-memory pixel representation.
///
/// Every supported ([`ImageType`], bpp, [`ColorType`]) combination resolves to
/// exactly one of these through [`PixelLayout::resolve`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PixelLayout {
    /// 8-bit greyscale sample.
    Gray8,
    /// 8-bit B, G, R.
    Bgr8,
    /// 8-bit B, G, R, A.
    Bgra8,
    /// Unsigned 16-bit scalar (native endian).
    Gray16,
    /// Signed 16-bit scalar (native endian).
    GrayI16,
    /// Unsigned 32-bit scalar (native endian).
    Gray32,
    /// Signed 32-bit scalar (native endian).
    GrayI32,
    /// 32-bit float scalar.
    GrayF32,
    /// 64-bit float scalar.
    GrayF64,
    /// 16-bit R, G, B.
    Rgb16,
    /// 16-bit R, G, B, A.
    Rgba16,
    /// 32-bit unsigned R, G, B.
    Rgb32,
    /// 32-bit unsigned R, G, B, A.
    Rgba32,
    /// 32-bit float R, G, B.
    RgbF32,
    /// 32-bit float R, G, B, A.
    RgbaF32,
    /// Real and imaginary 64-bit floats.
    ComplexF64,
    /// Real and imaginary 32-bit floats.
    ComplexF32,
}

impl PixelLayout {
    /// Map a buffer's tag, depth and colour classification to its representation.
    ///
    /// Standard bitmaps only resolve for 8-bit greyscale, 24-bit RGB and
    /// 32-bit RGBA; palettised and packed 16-bit data have no sample layout.
    pub fn resolve(
        image_type: ImageType,
        bpp: u32,
        color_type: ColorType,
    ) -> Result<Self, ImageError> {
        let layout = match image_type {
            ImageType::Bitmap => match (bpp, color_type) {
                (8, ColorType::MinIsBlack) => Some(Self::Gray8),
                (24, ColorType::Rgb) => Some(Self::Bgr8),
                (32, ColorType::RgbAlpha) => Some(Self::Bgra8),
                _ => None,
            },
            ImageType::Uint16 => Some(Self::Gray16),
            ImageType::Int16 => Some(Self::GrayI16),
            ImageType::Uint32 => Some(Self::Gray32),
            ImageType::Int32 => Some(Self::GrayI32),
            ImageType::Float => Some(Self::GrayF32),
            ImageType::Double => Some(Self::GrayF64),
            ImageType::Complex => Some(Self::ComplexF64),
            ImageType::ComplexF => Some(Self::ComplexF32),
            ImageType::Rgb16 => Some(Self::Rgb16),
            ImageType::Rgba16 => Some(Self::Rgba16),
            ImageType::Rgb32 => Some(Self::Rgb32),
            ImageType::Rgba32 => Some(Self::Rgba32),
            ImageType::RgbF => Some(Self::RgbF32),
            ImageType::RgbaF => Some(Self::RgbaF32),
            ImageType::Unknown => None,
        };
        layout.ok_or_else(|| ImageError::unsupported_pixels(image_type, bpp))
    }

    /// Bytes per pixel for this layout.
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Gray8 => 1,
            Self::Gray16 | Self::GrayI16 => 2,
            Self::Bgr8 => 3,
            Self::Bgra8 | Self::Gray32 | Self::GrayI32 | Self::GrayF32 => 4,
            Self::Rgb16 => 6,
            Self::Rgba16 | Self::GrayF64 | Self::ComplexF32 => 8,
            Self::Rgb32 | Self::RgbF32 => 12,
            Self::Rgba32 | Self::RgbaF32 | Self::ComplexF64 => 16,
        }
    }

    /// Number of channels.
    pub fn channels(&self) -> usize {
        match self {
            Self::Gray8
            | Self::Gray16
            | Self::GrayI16
            | Self::Gray32
            | Self::GrayI32
            | Self::GrayF32
            | Self::GrayF64 => 1,
            Self::ComplexF64 | Self::ComplexF32 => 2,
            Self::Bgr8 | Self::Rgb16 | Self::Rgb32 | Self::RgbF32 => 3,
            Self::Bgra8 | Self::Rgba16 | Self::Rgba32 | Self::RgbaF32 => 4,
        }
    }

    /// Whether samples are floating point.
    pub fn is_float(&self) -> bool {
        matches!(
            self,
            Self::GrayF32
                | Self::GrayF64
                | Self::RgbF32
                | Self::RgbaF32
                | Self::ComplexF64
                | Self::ComplexF32
        )
    }
}

/// Channel packing of a 16-bit standard bitmap pixel, stored as a native
/// endian `u16` with blue in the low bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Rgb16Packing {
    /// 5 bits per channel, top bit unused.
    #[default]
    Rgb555,
    /// 5 bits red, 6 bits green, 5 bits blue.
    Rgb565,
}

impl Rgb16Packing {
    /// Red, green and blue bit masks.
    pub const fn masks(self) -> [u16; 3] {
        match self {
            Self::Rgb555 => [0x7C00, 0x03E0, 0x001F],
            Self::Rgb565 => [0xF800, 0x07E0, 0x001F],
        }
    }

    const fn green_bits(self) -> u32 {
        match self {
            Self::Rgb555 => 5,
            Self::Rgb565 => 6,
        }
    }

    /// Pack an 8-bit colour, dropping the low bits of each channel.
    pub fn pack(self, r: u8, g: u8, b: u8) -> u16 {
        let gb = self.green_bits();
        (u16::from(r >> 3) << (5 + gb)) | (u16::from(g >> (8 - gb)) << 5) | u16::from(b >> 3)
    }

    /// Expand a packed pixel to 8-bit `[r, g, b]`, scaling each field's
    /// maximum to 255.
    pub fn unpack(self, v: u16) -> [u8; 3] {
        let gb = self.green_bits();
        let gmax = (1u32 << gb) - 1;
        let scale = |field: u32, max: u32| (field * 255 / max) as u8;
        let v = u32::from(v);
        [
            scale((v >> (5 + gb)) & 0x1F, 0x1F),
            scale((v >> 5) & gmax, gmax),
            scale(v & 0x1F, 0x1F),
        ]
    }
}

/// Complex sample with 64-bit float parts.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ComplexF64 {
    pub re: f64,
    pub im: f64,
}

/// Complex sample with 32-bit float parts.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ComplexF32 {
    pub re: f32,
    pub im: f32,
}

impl ComplexF64 {
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }

    /// Magnitude, `sqrt(re² + im²)`.
    pub fn norm(&self) -> f64 {
        sqrt(self.re * self.re + self.im * self.im)
    }
}

impl ComplexF32 {
    pub fn new(re: f32, im: f32) -> Self {
        Self { re, im }
    }

    /// Magnitude, `sqrt(re² + im²)`.
    pub fn norm(&self) -> f32 {
        sqrtf(self.re * self.re + self.im * self.im)
    }
}

/// Rec. 709 luma of an 8-bit RGB triple, truncated.
#[inline]
pub(crate) fn grey(r: u8, g: u8, b: u8) -> u8 {
    (0.2126 * f64::from(r) + 0.7152 * f64::from(g) + 0.0722 * f64::from(b)) as u8
}
