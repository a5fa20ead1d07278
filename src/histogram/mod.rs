//! Histograms over every supported pixel representation.
//!
//! [`make_histogram`] bins one to four channels in a single pass. Integral
//! samples map linearly from their full type range onto the bins; floating
//! samples map from a domain that is either supplied or found by scanning
//! the image. [`get_histogram`] is the fixed 256-bin form for 8, 24 and
//! 32-bit standard bitmaps.

mod engine;
mod select;

use crate::bitmap::PixelBuffer;
use crate::error::ImageError;
use crate::pixel::{CHANNEL_BLUE, CHANNEL_GREEN, CHANNEL_RED, ColorChannel, ImageType, grey};

/// Which value a histogram target receives.
///
/// For scalar images only [`Red`](Self::Red) is filled, with the sample
/// itself. For complex images red, green and blue receive the real part,
/// the imaginary part and the magnitude.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HistogramChannel {
    Red,
    Green,
    Blue,
    /// Rec. 709 weighted brightness of R, G and B.
    Luminance,
}

impl HistogramChannel {
    pub const ALL: [HistogramChannel; 4] = [
        HistogramChannel::Red,
        HistogramChannel::Green,
        HistogramChannel::Blue,
        HistogramChannel::Luminance,
    ];
}

/// Caller-owned bin array. Bin `i` lives at `counts[i * stride]`, so several
/// histograms can share one interleaved array.
#[derive(Debug)]
pub struct HistogramTarget<'a> {
    counts: &'a mut [u32],
    stride: usize,
}

impl<'a> HistogramTarget<'a> {
    pub fn new(counts: &'a mut [u32], stride: usize) -> Self {
        Self { counts, stride }
    }

    /// Bins stored back to back.
    pub fn contiguous(counts: &'a mut [u32]) -> Self {
        Self::new(counts, 1)
    }
}

/// Value range the bins were spread over.
///
/// Integral images report the limits of their sample type, floating images
/// the domain actually used.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HistogramDomain {
    pub min: f64,
    pub max: f64,
}

/// Parameters for [`make_histogram`].
#[derive(Debug)]
pub struct HistogramRequest<'a> {
    bins: u32,
    domain: Option<(f64, f64)>,
    targets: [Option<HistogramTarget<'a>>; 4],
}

impl<'a> HistogramRequest<'a> {
    /// Request with `bins` bins and no targets.
    pub fn new(bins: u32) -> Self {
        Self {
            bins,
            domain: None,
            targets: [None, None, None, None],
        }
    }

    pub fn with_target(mut self, channel: HistogramChannel, target: HistogramTarget<'a>) -> Self {
        self.targets[channel as usize] = Some(target);
        self
    }

    pub fn with_red(self, counts: &'a mut [u32], stride: usize) -> Self {
        self.with_target(HistogramChannel::Red, HistogramTarget::new(counts, stride))
    }

    pub fn with_green(self, counts: &'a mut [u32], stride: usize) -> Self {
        self.with_target(HistogramChannel::Green, HistogramTarget::new(counts, stride))
    }

    pub fn with_blue(self, counts: &'a mut [u32], stride: usize) -> Self {
        self.with_target(HistogramChannel::Blue, HistogramTarget::new(counts, stride))
    }

    pub fn with_luminance(self, counts: &'a mut [u32], stride: usize) -> Self {
        self.with_target(
            HistogramChannel::Luminance,
            HistogramTarget::new(counts, stride),
        )
    }

    /// Fixed domain for floating images instead of a min/max scan.
    /// Ignored for integral images.
    pub fn with_domain(mut self, min: f64, max: f64) -> Self {
        self.domain = Some((min, max));
        self
    }
}

/// Fill the requested histograms from `buf`.
///
/// Returns `Ok(None)` when the request has no targets. Every target is
/// cleared before binning; when the pixel format turns out to be
/// unsupported the targets are left cleared.
///
/// A floating image whose domain is a single value puts every pixel in bin 0.
pub fn make_histogram<B: PixelBuffer + ?Sized>(
    buf: &B,
    mut request: HistogramRequest<'_>,
) -> Result<Option<HistogramDomain>, ImageError> {
    if !buf.has_pixels() {
        return Err(ImageError::NoPixels);
    }
    if request.bins < 1 {
        return Err(ImageError::InvalidParameter(
            "histogram needs at least one bin".into(),
        ));
    }
    let last = request.bins as usize - 1;
    for target in request.targets.iter().flatten() {
        if target.stride == 0 {
            return Err(ImageError::InvalidParameter(
                "histogram stride must be positive".into(),
            ));
        }
        let needed = last
            .checked_mul(target.stride)
            .and_then(|n| n.checked_add(1))
            .ok_or_else(|| ImageError::InvalidParameter("histogram size overflow".into()))?;
        if target.counts.len() < needed {
            return Err(ImageError::BufferTooSmall {
                needed,
                actual: target.counts.len(),
            });
        }
    }
    if request.targets.iter().all(Option::is_none) {
        return Ok(None);
    }

    for target in request.targets.iter_mut().flatten() {
        for bin in target.counts.iter_mut().step_by(target.stride).take(last + 1) {
            *bin = 0;
        }
    }

    let layout = buf.pixel_layout()?;
    engine::run(buf, layout, request.bins, request.domain, &mut request.targets).map(Some)
}

/// 256-bin histogram of an 8, 24 or 32-bit standard bitmap.
///
/// 8-bit images bin their raw sample (palette index) whatever `channel` is.
/// For 24 and 32-bit images [`ColorChannel::Black`] and [`ColorChannel::Rgb`]
/// bin the Rec. 709 grey value; [`ColorChannel::Alpha`] is rejected after
/// `histo` has been cleared. Other depths fail with `histo` untouched.
pub fn get_histogram<B: PixelBuffer + ?Sized>(
    buf: &B,
    histo: &mut [u32; 256],
    channel: ColorChannel,
) -> Result<(), ImageError> {
    if !buf.has_pixels() {
        return Err(ImageError::NoPixels);
    }
    let width = buf.width() as usize;
    let bpp = buf.bpp();
    let bytespp = match bpp {
        8 | 24 | 32 if buf.image_type() == ImageType::Bitmap => bpp as usize / 8,
        _ => return Err(ImageError::unsupported_pixels(buf.image_type(), bpp)),
    };

    histo.fill(0);
    let pick: fn(&[u8]) -> u8 = match (bytespp, channel) {
        (1, _) => |px| px[0],
        (_, ColorChannel::Red) => |px| px[CHANNEL_RED],
        (_, ColorChannel::Green) => |px| px[CHANNEL_GREEN],
        (_, ColorChannel::Blue) => |px| px[CHANNEL_BLUE],
        (_, ColorChannel::Black | ColorChannel::Rgb) => {
            |px| grey(px[CHANNEL_RED], px[CHANNEL_GREEN], px[CHANNEL_BLUE])
        }
        (_, ColorChannel::Alpha) => {
            return Err(ImageError::InvalidParameter(
                "alpha histogram is not supported".into(),
            ));
        }
    };

    for y in 0..buf.height() {
        let row = buf.scanline(y).ok_or(ImageError::NoPixels)?;
        let row = row.get(..width * bytespp).ok_or(ImageError::BufferTooSmall {
            needed: width * bytespp,
            actual: row.len(),
        })?;
        for px in row.chunks_exact(bytespp) {
            histo[usize::from(pick(px))] += 1;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitmap::{Bitmap, PixelBufferMut};
    use alloc::vec::Vec;

    #[test]
    fn no_targets_is_a_no_op() {
        let bmp = Bitmap::new(2, 2, 8).unwrap();
        assert_eq!(make_histogram(&bmp, HistogramRequest::new(16)).unwrap(), None);
    }

    #[test]
    fn parameter_checks_precede_clearing() {
        let bmp = Bitmap::new(2, 2, 8).unwrap();
        let mut bins = [7u32; 4];
        let err = make_histogram(&bmp, HistogramRequest::new(4).with_red(&mut bins, 0));
        assert!(matches!(err, Err(ImageError::InvalidParameter(_))));
        assert_eq!(bins, [7; 4]);
        let err = make_histogram(&bmp, HistogramRequest::new(4).with_red(&mut bins, 2));
        assert!(matches!(
            err,
            Err(ImageError::BufferTooSmall { needed: 7, actual: 4 })
        ));
        let err = make_histogram(&bmp, HistogramRequest::new(0).with_red(&mut bins, 1));
        assert!(err.is_err());
        assert_eq!(bins, [7; 4]);
    }

    #[test]
    fn strided_targets_share_storage() {
        let mut bmp = Bitmap::new(2, 1, 24).unwrap();
        bmp.scanline_mut(0).unwrap()[..6].copy_from_slice(&[0, 0, 255, 255, 0, 0]);
        let mut interleaved = [9u32; 4];
        let (reds, blues) = interleaved.split_at_mut(1);
        make_histogram(
            &bmp,
            HistogramRequest::new(2)
                .with_red(reds, 2)
                .with_blue(blues, 2),
        )
        .unwrap_err();
        // Target slices too short for stride 2 are rejected before clearing.
        assert_eq!(interleaved, [9; 4]);

        let mut reds = [9u32; 3];
        let mut blues = [9u32; 3];
        make_histogram(
            &bmp,
            HistogramRequest::new(2)
                .with_red(&mut reds, 2)
                .with_blue(&mut blues, 2),
        )
        .unwrap();
        // Bin 0 at index 0, bin 1 at index 2; index 1 is not ours.
        assert_eq!(reds, [1, 9, 1]);
        assert_eq!(blues, [1, 9, 1]);
    }

    #[test]
    fn contiguous_target_for_any_channel() {
        let mut bmp = Bitmap::new(2, 1, 24).unwrap();
        bmp.scanline_mut(0).unwrap()[..6].copy_from_slice(&[0, 0, 255, 255, 0, 0]);
        let mut bins = [9u32; 2];
        make_histogram(
            &bmp,
            HistogramRequest::new(2)
                .with_target(HistogramChannel::Red, HistogramTarget::contiguous(&mut bins)),
        )
        .unwrap();
        assert_eq!(bins, [1, 1]);
    }

    #[test]
    fn float_domain_override() {
        let data: Vec<u8> = [0.0f32, 0.5, 1.0, 2.0]
            .iter()
            .flat_map(|v| v.to_ne_bytes())
            .collect();
        let bmp = Bitmap::from_packed(ImageType::Float, 4, 1, 0, &data).unwrap();
        let mut bins = [0u32; 2];
        let domain = make_histogram(
            &bmp,
            HistogramRequest::new(2)
                .with_red(&mut bins, 1)
                .with_domain(0.0, 1.0),
        )
        .unwrap()
        .unwrap();
        assert_eq!(domain, HistogramDomain { min: 0.0, max: 1.0 });
        // 2.0 lies above the domain and clamps into the last bin.
        assert_eq!(bins, [1, 3]);
    }

    #[test]
    fn legacy_rejects_unsupported_depth_untouched() {
        let bmp = Bitmap::new(2, 2, 4).unwrap();
        let mut histo = [5u32; 256];
        assert!(get_histogram(&bmp, &mut histo, ColorChannel::Black).is_err());
        assert!(histo.iter().all(|&c| c == 5));
    }

    #[test]
    fn legacy_alpha_clears_then_fails() {
        let bmp = Bitmap::new(2, 2, 32).unwrap();
        let mut histo = [5u32; 256];
        assert!(get_histogram(&bmp, &mut histo, ColorChannel::Alpha).is_err());
        assert!(histo.iter().all(|&c| c == 0));
    }

    #[test]
    fn legacy_channels_on_bgr() {
        let mut bmp = Bitmap::new(2, 1, 24).unwrap();
        bmp.scanline_mut(0).unwrap()[..6].copy_from_slice(&[10, 20, 30, 10, 20, 40]);
        let mut histo = [0u32; 256];
        get_histogram(&bmp, &mut histo, ColorChannel::Red).unwrap();
        assert_eq!((histo[30], histo[40]), (1, 1));
        get_histogram(&bmp, &mut histo, ColorChannel::Blue).unwrap();
        assert_eq!(histo[10], 2);
    }
}
