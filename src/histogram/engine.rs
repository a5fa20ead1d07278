//! Monomorphic histogram loops, one instantiation per pixel representation.

use alloc::vec::Vec;

use super::select::{FloatPixel, FloatSample, HistPixel, IntSample};
use super::{HistogramChannel, HistogramDomain, HistogramTarget};
use crate::bitmap::PixelBuffer;
use crate::error::ImageError;
use crate::pixel::{ComplexF32, ComplexF64, PixelLayout};
use rgb::{Bgr, Bgra, Rgb, Rgba};

/// Destination for one selector.
struct Sink<'t, P: HistPixel> {
    select: fn(&P) -> P::Value,
    counts: &'t mut [u32],
    stride: usize,
}

/// Pair each requested target with its selector, dropping targets the
/// representation has no selector for. Built once per call.
fn active_sinks<'t, P: HistPixel>(
    targets: &'t mut [Option<HistogramTarget<'_>>; 4],
) -> Vec<Sink<'t, P>> {
    targets
        .iter_mut()
        .zip(HistogramChannel::ALL)
        .filter_map(|(target, channel)| {
            let target = target.as_mut()?;
            let select = P::selector(channel)?;
            Some(Sink {
                select,
                counts: &mut *target.counts,
                stride: target.stride,
            })
        })
        .collect()
}

fn for_each_pixel<P, B>(buf: &B, mut f: impl FnMut(&P)) -> Result<(), ImageError>
where
    P: bytemuck::Pod,
    B: PixelBuffer + ?Sized,
{
    let size = core::mem::size_of::<P>();
    let line = buf.width() as usize * size;
    for y in 0..buf.height() {
        let row = buf.scanline(y).ok_or(ImageError::NoPixels)?;
        let row = row.get(..line).ok_or(ImageError::BufferTooSmall {
            needed: line,
            actual: row.len(),
        })?;
        for chunk in row.chunks_exact(size) {
            f(&bytemuck::pod_read_unaligned(chunk));
        }
    }
    Ok(())
}

fn accumulate<P, B>(
    buf: &B,
    sinks: &mut [Sink<'_, P>],
    index: impl Fn(P::Value) -> usize,
) -> Result<(), ImageError>
where
    P: HistPixel,
    B: PixelBuffer + ?Sized,
{
    for_each_pixel::<P, B>(buf, |px| {
        for sink in sinks.iter_mut() {
            let i = index((sink.select)(px));
            sink.counts[i * sink.stride] += 1;
        }
    })
}

fn integral<P, B>(
    buf: &B,
    bins: u32,
    targets: &mut [Option<HistogramTarget<'_>>; 4],
) -> Result<HistogramDomain, ImageError>
where
    P: HistPixel,
    P::Value: IntSample,
    B: PixelBuffer + ?Sized,
{
    let mut sinks = active_sinks::<P>(targets);
    let bits = <P::Value as IntSample>::BITS;
    let last = bins as usize - 1;
    let full_range = !<P::Value as IntSample>::SIGNED && u64::from(bins) == 1u64 << bits;
    if full_range {
        accumulate(buf, &mut sinks, |v: P::Value| (v.biased() as usize).min(last))?;
    } else {
        let scale = u64::from(bins);
        accumulate(buf, &mut sinks, |v: P::Value| {
            (((v.biased() * scale) >> bits) as usize).min(last)
        })?;
    }
    Ok(HistogramDomain {
        min: <P::Value as IntSample>::MIN,
        max: <P::Value as IntSample>::MAX,
    })
}

fn bounds<P, B>(buf: &B) -> Result<(f64, f64), ImageError>
where
    P: HistPixel + FloatPixel,
    B: PixelBuffer + ?Sized,
{
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for_each_pixel::<P, B>(buf, |px| {
        let (a, b) = px.channel_bounds();
        lo = lo.min(a);
        hi = hi.max(b);
    })?;
    Ok((lo, hi))
}

fn float<P, B>(
    buf: &B,
    bins: u32,
    domain: Option<(f64, f64)>,
    targets: &mut [Option<HistogramTarget<'_>>; 4],
) -> Result<HistogramDomain, ImageError>
where
    P: HistPixel + FloatPixel,
    P::Value: FloatSample,
    B: PixelBuffer + ?Sized,
{
    let (min, max) = match domain {
        Some(d) => d,
        None => bounds::<P, B>(buf)?,
    };
    if min > max || min.is_nan() || max.is_nan() {
        return Err(ImageError::InvalidParameter(alloc::format!(
            "empty histogram domain [{min}, {max}]"
        )));
    }

    let mut sinks = active_sinks::<P>(targets);
    if min == max {
        let pixels = u64::from(buf.width()) * u64::from(buf.height());
        let pixels = u32::try_from(pixels).unwrap_or(u32::MAX);
        for sink in &mut sinks {
            sink.counts[0] = pixels;
        }
    } else {
        let div = f64::from(bins) / (max - min);
        let last = bins as usize - 1;
        accumulate(buf, &mut sinks, |v: P::Value| {
            (((v.to_f64() - min) * div).max(0.0) as usize).min(last)
        })?;
    }
    Ok(HistogramDomain { min, max })
}

/// Route to the instantiation for `layout`.
pub(super) fn run<B: PixelBuffer + ?Sized>(
    buf: &B,
    layout: PixelLayout,
    bins: u32,
    domain: Option<(f64, f64)>,
    targets: &mut [Option<HistogramTarget<'_>>; 4],
) -> Result<HistogramDomain, ImageError> {
    match layout {
        PixelLayout::Gray8 => integral::<u8, B>(buf, bins, targets),
        PixelLayout::Bgr8 => integral::<Bgr<u8>, B>(buf, bins, targets),
        PixelLayout::Bgra8 => integral::<Bgra<u8>, B>(buf, bins, targets),
        PixelLayout::Gray16 => integral::<u16, B>(buf, bins, targets),
        PixelLayout::GrayI16 => integral::<i16, B>(buf, bins, targets),
        PixelLayout::Gray32 => integral::<u32, B>(buf, bins, targets),
        PixelLayout::GrayI32 => integral::<i32, B>(buf, bins, targets),
        PixelLayout::Rgb16 => integral::<Rgb<u16>, B>(buf, bins, targets),
        PixelLayout::Rgba16 => integral::<Rgba<u16>, B>(buf, bins, targets),
        PixelLayout::Rgb32 => integral::<Rgb<u32>, B>(buf, bins, targets),
        PixelLayout::Rgba32 => integral::<Rgba<u32>, B>(buf, bins, targets),
        PixelLayout::GrayF32 => float::<f32, B>(buf, bins, domain, targets),
        PixelLayout::GrayF64 => float::<f64, B>(buf, bins, domain, targets),
        PixelLayout::RgbF32 => float::<Rgb<f32>, B>(buf, bins, domain, targets),
        PixelLayout::RgbaF32 => float::<Rgba<f32>, B>(buf, bins, domain, targets),
        PixelLayout::ComplexF64 => float::<ComplexF64, B>(buf, bins, domain, targets),
        PixelLayout::ComplexF32 => float::<ComplexF32, B>(buf, bins, domain, targets),
    }
}
