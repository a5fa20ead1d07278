#![no_main]
use libfuzzer_sys::fuzz_target;
use zenplugins::{
    Bitmap, DitherAlgorithm, ImageType, PixelBuffer, Rgb16Packing, dither, threshold,
};

const ALGORITHMS: [DitherAlgorithm; 7] = [
    DitherAlgorithm::FloydSteinberg,
    DitherAlgorithm::Bayer4x4,
    DitherAlgorithm::Bayer8x8,
    DitherAlgorithm::Bayer16x16,
    DitherAlgorithm::Cluster6x6,
    DitherAlgorithm::Cluster8x8,
    DitherAlgorithm::Cluster16x16,
];

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let bpp = [1, 4, 8, 16, 24, 32][usize::from(data[0] & 0x7F) % 6];
    let width = u32::from(data[1] % 48) + 1;
    let height = u32::from(data[2] % 48) + 1;
    let algorithm = ALGORITHMS[usize::from(data[3]) % ALGORITHMS.len()];
    let Ok(mut bmp) = Bitmap::from_packed(ImageType::Bitmap, width, height, bpp, &data[4..]) else {
        return;
    };
    if bpp == 16 && data[0] & 0x80 != 0 {
        bmp = bmp
            .with_rgb16_packing(Rgb16Packing::Rgb565)
            .expect("16-bit bitmaps accept any packing");
    }

    let out = dither(&bmp, algorithm).expect("standard bitmaps always dither");
    assert_eq!((out.width(), out.height()), (width, height));
    let _ = threshold(&bmp, data[3]);
});
