#![no_main]
use libfuzzer_sys::fuzz_target;
use zenplugins::{Bitmap, HistogramRequest, ImageType, get_histogram, make_histogram};

fuzz_target!(|data: &[u8]| {
    // Header: type tag, bpp for standard bitmaps, width, height, bin count.
    if data.len() < 6 {
        return;
    }
    let image_type = ImageType::ALL[usize::from(data[0]) % ImageType::ALL.len()];
    let bpp = [1, 4, 8, 16, 24, 32][usize::from(data[1]) % 6];
    let width = u32::from(data[2] % 64) + 1;
    let height = u32::from(data[3] % 64) + 1;
    let bins = u32::from(u16::from_le_bytes([data[4], data[5]]));
    let Ok(bmp) = Bitmap::from_packed(image_type, width, height, bpp, &data[6..]) else {
        return;
    };

    // Arbitrary samples include NaN and infinities; must never panic.
    let len = bins.max(1) as usize;
    let (mut red, mut green, mut blue, mut luma) =
        (vec![0u32; len], vec![0u32; len], vec![0u32; len], vec![0u32; len]);
    let _ = make_histogram(
        &bmp,
        HistogramRequest::new(bins)
            .with_red(&mut red, 1)
            .with_green(&mut green, 1)
            .with_blue(&mut blue, 1)
            .with_luminance(&mut luma, 1),
    );

    let mut histo = [0u32; 256];
    for channel in [zenplugins::ColorChannel::Black, zenplugins::ColorChannel::Red] {
        let _ = get_histogram(&bmp, &mut histo, channel);
    }
});
