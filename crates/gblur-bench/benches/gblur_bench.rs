//! Benchmarks for kernel construction, packing and the CPU renderer.
//!
//! Run with: `cargo bench -p gblur-bench`

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use gblur_bench::test_card;
use gblur_core::{BlurConfig, GaussianKernel, KernelLayout, KernelPacker};
use gblur_gpu::{Backend, render_image};

/// Kernel weights and offsets for the supported radii.
fn bench_kernel_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel_build");
    for radius in [3, 19, 49] {
        group.bench_with_input(BenchmarkId::from_parameter(radius), &radius, |b, &r| {
            b.iter(|| GaussianKernel::build(black_box(r), black_box(1.0)))
        });
    }
    group.finish();
}

/// Flat and std140 packing of the largest kernel each layout takes.
fn bench_kernel_pack(c: &mut Criterion) {
    let mut group = c.benchmark_group("kernel_pack");
    for layout in [KernelLayout::Flat41, KernelLayout::Flat101, KernelLayout::Block] {
        let kernel = GaussianKernel::build(layout.max_radius(), 1.0);
        let packer = layout.packer();
        group.bench_function(layout.name(), |b| b.iter(|| packer.pack(black_box(&kernel), [256.0, 256.0])));
    }
    group.finish();
}

/// Full CPU render: downsample, blur rounds, composite.
fn bench_cpu_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("cpu_render");
    group.sample_size(10);

    for size in [256u32, 1024] {
        let image = test_card(size, size).unwrap();
        group.throughput(Throughput::Elements((size * size) as u64));
        for rounds in [1u32, 3] {
            let config = BlurConfig { rounds, ..Default::default() };
            let id = BenchmarkId::new(format!("rounds{rounds}"), size);
            group.bench_with_input(id, &image, |b, img| {
                b.iter(|| render_image(black_box(img), &config, Backend::Cpu, None))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_kernel_build, bench_kernel_pack, bench_cpu_render);
criterion_main!(benches);
