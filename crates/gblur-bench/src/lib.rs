//! Benchmark inputs shared by the criterion benches.

use gblur_core::SourceImage;

/// RGB test card: horizontal gradient with a hard vertical edge.
pub fn test_card(width: u32, height: u32) -> gblur_core::Result<SourceImage> {
    let data = (0..width * height)
        .flat_map(|i| {
            let x = i % width;
            let v = (x * 255 / width.max(1)) as u8;
            if x < width / 2 { [v, v / 2, 32] } else { [255 - v, 200, v] }
        })
        .collect();
    SourceImage::new(width, height, 3, data)
}
