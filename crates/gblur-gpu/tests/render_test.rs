//! End-to-end pipeline tests on the CPU reference backend.

use gblur_core::{AdjustmentState, BlurConfig, KernelLayout, SourceImage};
use gblur_gpu::backend::CPU_MAX_DIMENSION;
use gblur_gpu::{Backend, GpuError, render_image};

fn render(image: &SourceImage, config: &BlurConfig) -> Vec<u8> {
    render_image(image, config, Backend::Cpu, None).unwrap().into_data()
}

fn assert_close(actual: &[u8], expected: &[u8], tol: u8) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(a.abs_diff(*e) <= tol, "byte {}: {} vs {}", i, a, e);
    }
}

#[test]
fn test_solid_image_is_unchanged() {
    let image = SourceImage::solid(100, 100, [73, 140, 201, 255], 3).unwrap();
    let config = BlurConfig { radius: 5, rounds: 1, ..Default::default() };
    let out = render_image(&image, &config, Backend::Cpu, None).unwrap();

    assert_eq!((out.width(), out.height(), out.channels()), (100, 100, 3));
    assert_close(out.data(), image.data(), 1);
}

#[test]
fn test_solid_identity_every_layout_and_rounds() {
    let image = SourceImage::solid(37, 23, [10, 250, 128, 255], 3).unwrap();
    for layout in [KernelLayout::Flat41, KernelLayout::Flat101, KernelLayout::Block] {
        for rounds in [1, 3] {
            let config = BlurConfig { radius: 49, rounds, layout, ..Default::default() };
            assert_close(&render(&image, &config), image.data(), 1);
        }
    }
}

#[test]
fn test_step_edge_is_softened_monotonically() {
    let (w, h) = (64u32, 16u32);
    let data: Vec<u8> = (0..w * h)
        .flat_map(|i| if i % w < w / 2 { [0u8; 3] } else { [255u8; 3] })
        .collect();
    let image = SourceImage::new(w, h, 3, data).unwrap();
    let config = BlurConfig { radius: 7, ..Default::default() };
    let out = render(&image, &config);

    let row: Vec<u8> = out[..(w * 3) as usize].chunks_exact(3).map(|p| p[0]).collect();
    assert!(row.windows(2).all(|p| p[0] <= p[1]), "row not monotonic: {:?}", row);
    assert!(row.iter().any(|&v| v > 20 && v < 235), "edge not softened: {:?}", row);
    assert!(row[0] < 10 && row[row.len() - 1] > 245);
}

#[test]
fn test_brightness_darkens_bright_image() {
    let image = SourceImage::solid(40, 40, [240, 240, 240, 255], 3).unwrap();
    let config = BlurConfig {
        adjust: AdjustmentState::default().with_brightness(true),
        ..Default::default()
    };
    let out = render(&image, &config);
    assert!(out.iter().all(|&v| v.abs_diff(192) <= 1), "first {:?}", &out[..3]);

    // flag off: untouched
    let out = render(&image, &BlurConfig::default());
    assert!(out.iter().all(|&v| v == 240));
}

#[test]
fn test_brightness_leaves_dim_image() {
    let image = SourceImage::solid(40, 40, [60, 60, 60, 255], 3).unwrap();
    let config = BlurConfig {
        adjust: AdjustmentState::default().with_brightness(true),
        ..Default::default()
    };
    assert!(render(&image, &config).iter().all(|&v| v == 60));
}

#[test]
fn test_hsl_zero_saturation_greys_out() {
    let image = SourceImage::solid(24, 24, [200, 50, 50, 255], 3).unwrap();
    let config = BlurConfig {
        adjust: AdjustmentState::default().with_saturation(0.0),
        ..Default::default()
    };
    let out = render(&image, &config);
    assert!(out.chunks_exact(3).all(|p| p.iter().all(|&v| v.abs_diff(125) <= 1)), "{:?}", &out[..3]);
}

#[test]
fn test_hsl_lightness_zero_is_black() {
    let image = SourceImage::solid(24, 24, [30, 160, 90, 255], 3).unwrap();
    let config = BlurConfig {
        adjust: AdjustmentState::default().with_lightness(0.0),
        ..Default::default()
    };
    assert!(render(&image, &config).iter().all(|&v| v == 0));
}

#[test]
fn test_rgba_output_is_opaque() {
    let image = SourceImage::solid(20, 20, [10, 20, 30, 128], 4).unwrap();
    let out = render_image(&image, &BlurConfig::default(), Backend::Cpu, None).unwrap();
    assert_eq!(out.channels(), 4);
    assert!(out.data().chunks_exact(4).all(|p| p == [10, 20, 30, 255]));
}

/// Asymmetric RGB ramp; `transpose` swaps the axes.
fn ramp(w: u32, h: u32, transpose: bool) -> SourceImage {
    let data = (0..w * h)
        .flat_map(|i| {
            let (x, y) = (i % w, i / w);
            let t = if transpose { y } else { x };
            let v = (t * t * 255 / ((w.max(h) - 1) * (w.max(h) - 1))) as u8;
            [v, 255 - v / 2, (t * 37 % 256) as u8]
        })
        .collect();
    SourceImage::new(w, h, 3, data).unwrap()
}

fn mirror(data: &[u8], w: u32, h: u32, horizontal: bool) -> Vec<u8> {
    let (w, h) = (w as usize, h as usize);
    (0..w * h)
        .flat_map(|i| {
            let (x, y) = (i % w, i / w);
            let src = if horizontal { y * w + (w - 1 - x) } else { (h - 1 - y) * w + x };
            data[src * 3..src * 3 + 3].to_vec()
        })
        .collect()
}

#[test]
fn test_taps_apply_equally_on_both_sides() {
    let config = BlurConfig { radius: 9, ..Default::default() };
    for (w, h, horizontal) in [(64u32, 8u32, true), (8, 64, false)] {
        let image = ramp(w, h, !horizontal);
        let flipped = SourceImage::new(w, h, 3, mirror(image.data(), w, h, horizontal)).unwrap();

        let out = render(&image, &config);
        let out_flipped = render(&flipped, &config);
        assert_close(&mirror(&out_flipped, w, h, horizontal), &out, 1);
    }
}

#[test]
fn test_tiny_image_renders() {
    let image = SourceImage::solid(1, 1, [1, 2, 3, 255], 3).unwrap();
    assert_eq!(render(&image, &BlurConfig::default()), vec![1, 2, 3]);
}

#[test]
fn test_oversized_image_rejected() {
    let image = SourceImage::solid(CPU_MAX_DIMENSION + 1, 1, [0, 0, 0, 255], 3).unwrap();
    let err = render_image(&image, &BlurConfig::default(), Backend::Cpu, None).unwrap_err();
    assert!(matches!(err, GpuError::ImageTooLarge { .. }));
}
