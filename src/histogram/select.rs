//! Per-representation value selectors and sample domains.

use rgb::{Bgr, Bgra, Rgb, Rgba};

use super::HistogramChannel;
use crate::pixel::{ComplexF32, ComplexF64};

/// A concrete pixel representation the histogram engine can walk.
///
/// `selector` maps each histogram channel to the extractor that produces the
/// value binned for that channel, or `None` when the channel has no meaning
/// for this representation.
pub(crate) trait HistPixel: bytemuck::Pod {
    type Value: Copy;

    fn selector(channel: HistogramChannel) -> Option<fn(&Self) -> Self::Value>;
}

/// Integral sample with a fixed bit width.
pub(crate) trait IntSample: Copy {
    const BITS: u32;
    const SIGNED: bool;
    const MIN: f64;
    const MAX: f64;

    /// Value shifted so the type minimum maps to 0.
    fn biased(self) -> u64;
}

pub(crate) trait FloatSample: Copy {
    fn to_f64(self) -> f64;
}

/// Floating representations report the extent of their colour channels.
pub(crate) trait FloatPixel {
    /// Smallest and largest non-alpha channel value of this pixel.
    fn channel_bounds(&self) -> (f64, f64);
}

macro_rules! unsigned_sample {
    ($($t:ty),*) => {$(
        impl IntSample for $t {
            const BITS: u32 = <$t>::BITS;
            const SIGNED: bool = false;
            const MIN: f64 = 0.0;
            const MAX: f64 = <$t>::MAX as f64;

            #[inline]
            fn biased(self) -> u64 {
                u64::from(self)
            }
        }
    )*};
}

macro_rules! signed_sample {
    ($($t:ty),*) => {$(
        impl IntSample for $t {
            const BITS: u32 = <$t>::BITS;
            const SIGNED: bool = true;
            const MIN: f64 = <$t>::MIN as f64;
            const MAX: f64 = <$t>::MAX as f64;

            #[inline]
            fn biased(self) -> u64 {
                (i64::from(self) - i64::from(<$t>::MIN)) as u64
            }
        }
    )*};
}

unsigned_sample!(u8, u16, u32);
signed_sample!(i16, i32);

impl FloatSample for f32 {
    #[inline]
    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl FloatSample for f64 {
    #[inline]
    fn to_f64(self) -> f64 {
        self
    }
}

macro_rules! scalar_pixel {
    ($($t:ty),*) => {$(
        impl HistPixel for $t {
            type Value = $t;

            fn selector(channel: HistogramChannel) -> Option<fn(&Self) -> $t> {
                fn identity(p: &$t) -> $t {
                    *p
                }
                match channel {
                    HistogramChannel::Red => Some(identity as fn(&Self) -> $t),
                    _ => None,
                }
            }
        }
    )*};
}

scalar_pixel!(u8, u16, i16, u32, i32, f32, f64);

impl FloatPixel for f32 {
    fn channel_bounds(&self) -> (f64, f64) {
        (f64::from(*self), f64::from(*self))
    }
}

impl FloatPixel for f64 {
    fn channel_bounds(&self) -> (f64, f64) {
        (*self, *self)
    }
}

#[inline]
fn luma(r: f64, g: f64, b: f64) -> f64 {
    0.2126 * r + 0.7152 * g + 0.0722 * b
}

// Brightness is cast back to the channel type, truncating for integers.
macro_rules! rgb_pixel {
    ($($px:ty => $v:ty),* $(,)?) => {$(
        impl HistPixel for $px {
            type Value = $v;

            fn selector(channel: HistogramChannel) -> Option<fn(&Self) -> $v> {
                type Select = fn(&$px) -> $v;
                fn red(p: &$px) -> $v {
                    p.r
                }
                fn green(p: &$px) -> $v {
                    p.g
                }
                fn blue(p: &$px) -> $v {
                    p.b
                }
                fn luminance(p: &$px) -> $v {
                    luma(p.r.into(), p.g.into(), p.b.into()) as $v
                }
                Some(match channel {
                    HistogramChannel::Red => red as Select,
                    HistogramChannel::Green => green as Select,
                    HistogramChannel::Blue => blue as Select,
                    HistogramChannel::Luminance => luminance as Select,
                })
            }
        }
    )*};
}

rgb_pixel!(
    Bgr<u8> => u8,
    Bgra<u8> => u8,
    Rgb<u16> => u16,
    Rgba<u16> => u16,
    Rgb<u32> => u32,
    Rgba<u32> => u32,
    Rgb<f32> => f32,
    Rgba<f32> => f32,
);

impl FloatPixel for Rgb<f32> {
    fn channel_bounds(&self) -> (f64, f64) {
        let (r, g, b) = (f64::from(self.r), f64::from(self.g), f64::from(self.b));
        (r.min(g).min(b), r.max(g).max(b))
    }
}

impl FloatPixel for Rgba<f32> {
    fn channel_bounds(&self) -> (f64, f64) {
        Rgb {
            r: self.r,
            g: self.g,
            b: self.b,
        }
        .channel_bounds()
    }
}

macro_rules! complex_pixel {
    ($($px:ty => $v:ty),*) => {$(
        impl HistPixel for $px {
            type Value = $v;

            fn selector(channel: HistogramChannel) -> Option<fn(&Self) -> $v> {
                type Select = fn(&$px) -> $v;
                fn real(p: &$px) -> $v {
                    p.re
                }
                fn imaginary(p: &$px) -> $v {
                    p.im
                }
                fn magnitude(p: &$px) -> $v {
                    p.norm()
                }
                match channel {
                    HistogramChannel::Red => Some(real as Select),
                    HistogramChannel::Green => Some(imaginary as Select),
                    HistogramChannel::Blue => Some(magnitude as Select),
                    HistogramChannel::Luminance => None,
                }
            }
        }

        impl FloatPixel for $px {
            fn channel_bounds(&self) -> (f64, f64) {
                let (re, im) = (f64::from(self.re), f64::from(self.im));
                (re.min(im), re.max(im))
            }
        }
    )*};
}

complex_pixel!(ComplexF64 => f64, ComplexF32 => f32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_bias_maps_min_to_zero() {
        assert_eq!(i16::MIN.biased(), 0);
        assert_eq!(i16::MAX.biased(), 65535);
        assert_eq!(0i32.biased(), 1 << 31);
        assert_eq!(u8::MAX.biased(), 255);
    }

    #[test]
    fn scalar_types_only_fill_first_channel() {
        assert!(<u16 as HistPixel>::selector(HistogramChannel::Red).is_some());
        assert!(<u16 as HistPixel>::selector(HistogramChannel::Green).is_none());
        assert!(<f64 as HistPixel>::selector(HistogramChannel::Luminance).is_none());
    }

    #[test]
    fn bgr_selectors_read_named_channels() {
        let px = Bgr { b: 1u8, g: 2, r: 3 };
        let red = <Bgr<u8> as HistPixel>::selector(HistogramChannel::Red).unwrap();
        let blue = <Bgr<u8> as HistPixel>::selector(HistogramChannel::Blue).unwrap();
        assert_eq!(red(&px), 3);
        assert_eq!(blue(&px), 1);
        let luma = <Bgr<u8> as HistPixel>::selector(HistogramChannel::Luminance).unwrap();
        assert_eq!(luma(&Bgr { b: 0, g: 255, r: 0 }), 182);
    }

    #[test]
    fn complex_selectors() {
        let px = ComplexF64::new(3.0, -4.0);
        let abs = <ComplexF64 as HistPixel>::selector(HistogramChannel::Blue).unwrap();
        let im = <ComplexF64 as HistPixel>::selector(HistogramChannel::Green).unwrap();
        assert_eq!(abs(&px), 5.0);
        assert_eq!(im(&px), -4.0);
        assert_eq!(px.channel_bounds(), (-4.0, 3.0));
        assert!(<ComplexF32 as HistPixel>::selector(HistogramChannel::Luminance).is_none());
    }

    #[test]
    fn rgba_bounds_ignore_alpha() {
        let px = Rgba {
            r: 0.5f32,
            g: -1.0,
            b: 2.0,
            a: 100.0,
        };
        assert_eq!(px.channel_bounds(), (-1.0, 2.0));
    }
}
