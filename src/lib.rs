//! # zenplugins
//!
//! Format plugin registry with load/save dispatch, plus a pixel toolkit that
//! works across every pixel representation a bitmap can carry.
//!
//! ## Plugins
//!
//! A format is a [`Plugin`]: a set of optional entry points described by its
//! [`Capabilities`]. [`PluginRegistry`] hands out sequential [`FormatId`]s,
//! resolves formats by name, MIME type or file extension, and dispatches
//! load, save, validate and page queries through the plugin's
//! open / operate / close cycle. With the `std` feature a reference-counted
//! process-wide registry is available through [`initialise`] and
//! [`with_registry`].
//!
//! ## Pixel toolkit
//!
//! - [`make_histogram`]: up to four histograms in one pass over 8-bit,
//!   16/32-bit integral, float, RGB(A) and complex images.
//! - [`get_histogram`], [`adjust_curve`], [`adjust_colors`] and friends:
//!   256-entry lookup tables over standard bitmaps.
//! - [`apply_color_mapping`] and [`apply_palette_index_mapping`]: colour
//!   and index substitution.
//! - [`threshold`] and [`dither`]: conversion to 1-bit black and white.
//!
//! ## Non-Goals
//!
//! - Codec bitstreams. Formats are supplied by callers as plugins.
//! - Loading shared libraries. [`PluginModule`] stands in for one.
//!
//! ## Usage
//!
//! ```
//! use zenplugins::{Bitmap, HistogramRequest, PixelBufferMut, make_histogram};
//!
//! let mut bmp = Bitmap::new(4, 1, 8)?;
//! bmp.scanline_mut(0).unwrap()[..4].copy_from_slice(&[0, 64, 128, 255]);
//!
//! let mut bins = [0u32; 4];
//! make_histogram(&bmp, HistogramRequest::new(4).with_red(&mut bins, 1))?;
//! assert_eq!(bins, [1, 1, 1, 1]);
//! # Ok::<(), zenplugins::ImageError>(())
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

mod adjust;
mod bitmap;
mod dispatch;
mod error;
mod flags;
mod halftone;
mod histogram;
mod io;
mod mapping;
mod math;
mod pixel;
mod plugin;
mod registry;

#[cfg(feature = "std")]
mod global;

// Re-exports
pub use adjust::{
    Lut, adjust_brightness, adjust_colors, adjust_colors_lut, adjust_contrast, adjust_curve,
    adjust_gamma, invert,
};
pub use bitmap::{Bitmap, PixelBuffer, PixelBufferMut};
pub use error::ImageError;
pub use flags::{LoadFlags, SaveFlags};
#[cfg(feature = "std")]
pub use global::{
    deinitialise, initialise, initialise_with, is_initialised, with_registry, with_registry_mut,
};
pub use halftone::{DitherAlgorithm, convert_to_greyscale, dither, threshold};
pub use histogram::{
    HistogramChannel, HistogramDomain, HistogramRequest, HistogramTarget, get_histogram,
    make_histogram,
};
#[cfg(feature = "std")]
pub use io::StreamIo;
pub use io::{ImageIo, MemoryIo, SeekFrom};
pub use mapping::{
    apply_color_mapping, apply_palette_index_mapping, swap_colors, swap_palette_indices,
};
pub use pixel::{
    CHANNEL_ALPHA, CHANNEL_BLUE, CHANNEL_GREEN, CHANNEL_RED, ColorChannel, ColorType, ComplexF32,
    ComplexF64, ImageType, PixelLayout, Rgb16Packing,
};
pub use plugin::{Capabilities, InitProc, Plugin, PluginModule, Session};
pub use registry::{FormatId, PluginNode, PluginRegistry, RegistrationOverrides};
