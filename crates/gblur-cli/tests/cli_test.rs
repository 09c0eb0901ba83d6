//! Runs the `gblur` binary on small files with the CPU backend.

use std::path::Path;
use std::process::{Command, Output};

use gblur_core::RenderedImage;

fn gblur(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_gblur"))
        .args(args)
        .env("GBLUR_BACKEND", "cpu")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn write_gradient(path: &Path, w: u32, h: u32) {
    let rgba: Vec<u8> = (0..w * h)
        .flat_map(|i| {
            let v = ((i % w) * 255 / (w - 1)) as u8;
            [v, 255 - v, 128, 255]
        })
        .collect();
    let image = RenderedImage::from_rgba8(w, h, rgba, 3).unwrap();
    gblur_io::write(path, &image).unwrap();
}

fn one_line(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr).into_owned();
    assert_eq!(text.trim_end().lines().count(), 1, "stderr: {text:?}");
    text
}

#[test]
fn test_blur_png_to_png() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.png");
    let output = dir.path().join("out.png");
    write_gradient(&input, 64, 32);

    let out = gblur(&[input.to_str().unwrap(), "-o", output.to_str().unwrap(), "-r", "7", "-p", "2"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let result = gblur_io::read(&output).unwrap();
    assert_eq!((result.width(), result.height()), (64, 32));
}

#[test]
fn test_unknown_extension_writes_jpeg() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in.png");
    let output = dir.path().join("out");
    write_gradient(&input, 40, 40);

    let out = gblur(&[input.to_str().unwrap(), "-o", output.to_str().unwrap(), "-b", "-s", "0.5"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let bytes = std::fs::read(&output).unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
}

#[test]
fn test_missing_input_fails_with_one_line() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("missing.png");
    let output = dir.path().join("out.png");

    let out = gblur(&[input.to_str().unwrap(), "-o", output.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    assert!(one_line(&out.stderr).starts_with("gblur: cannot read"));
    assert!(!output.exists());
}

#[test]
fn test_missing_output_flag_fails_with_one_line() {
    let out = gblur(&["in.png"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(one_line(&out.stderr).starts_with("gblur:"));
}

#[test]
fn test_help_succeeds() {
    let out = gblur(&["--help"]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stdout).contains("--output"));
}
