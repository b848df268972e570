//! Benchmarks for dataset operations.
//!
//! Run with: cargo bench -p mesh-dataset
//!
//! To compare against baseline:
//! 1. First run: cargo bench -p mesh-dataset -- --save-baseline main
//! 2. After changes: cargo bench -p mesh-dataset -- --baseline main

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use mesh_dataset::{
    AlignParams, Field, Mesh, SampleParams, align_to_principal_axes, extract_edges, label_regions,
    sample_field,
};
use nalgebra::Point3;

// =============================================================================
// Test Mesh Generation
// =============================================================================

/// A flat `n` x `n` quad plate split into triangles, spanning [0, 4] x [0, 1].
fn create_plate(n: usize) -> Mesh {
    let mut vertices = Vec::with_capacity((n + 1) * (n + 1));
    for j in 0..=n {
        for i in 0..=n {
            vertices.push(Point3::new(
                4.0 * i as f64 / n as f64,
                j as f64 / n as f64,
                0.0,
            ));
        }
    }

    let stride = (n + 1) as u32;
    let mut triangles = Vec::with_capacity(2 * n * n);
    for j in 0..n as u32 {
        for i in 0..n as u32 {
            let v00 = j * stride + i;
            let v10 = v00 + 1;
            let v01 = v00 + stride;
            let v11 = v01 + 1;
            triangles.push([v00, v10, v11]);
            triangles.push([v00, v11, v01]);
        }
    }

    Mesh::from_triangles(vertices, &triangles)
}

/// A plate carrying a pressure field equal to x.
fn create_source(n: usize) -> Mesh {
    let mut mesh = create_plate(n);
    let p = mesh.vertices.iter().map(|v| v.x).collect();
    mesh.set_point_field(Field::scalar("p", p));
    mesh
}

/// A plate with its vertices nudged off the source surface.
fn create_target(n: usize) -> Mesh {
    let mut mesh = create_plate(n);
    for (i, v) in mesh.vertices.iter_mut().enumerate() {
        v.z = if i % 2 == 0 { 0.01 } else { -0.01 };
    }
    mesh
}

// =============================================================================
// Sampling Benchmarks
// =============================================================================

fn bench_sampling(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampling");

    for &n in &[16usize, 64, 128] {
        let source = create_source(n);
        let target = create_target(n / 2);
        let params = SampleParams::with_tolerance(0.1);

        group.throughput(Throughput::Elements(target.vertex_count() as u64));
        group.bench_with_input(
            BenchmarkId::new("sample_field", source.face_count()),
            &(source, target),
            |b, (source, target)| {
                b.iter(|| sample_field(black_box(source), black_box(target), black_box(&params)))
            },
        );
    }

    group.finish();
}

// =============================================================================
// Graph Benchmarks
// =============================================================================

fn bench_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph");

    for &n in &[16usize, 64, 256] {
        let mesh = create_plate(n);
        group.throughput(Throughput::Elements(mesh.face_count() as u64));

        group.bench_with_input(
            BenchmarkId::new("extract_edges", mesh.face_count()),
            &mesh,
            |b, mesh| b.iter(|| extract_edges(black_box(mesh))),
        );
        group.bench_with_input(
            BenchmarkId::new("label_regions", mesh.face_count()),
            &mesh,
            |b, mesh| b.iter(|| label_regions(black_box(mesh))),
        );
    }

    group.finish();
}

// =============================================================================
// Alignment Benchmarks
// =============================================================================

fn bench_alignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("alignment");
    let params = AlignParams::wind_tunnel();

    for &n in &[16usize, 128] {
        let mut mesh = create_plate(n);
        // Lift the far edge so the plate has a third principal extent.
        for v in &mut mesh.vertices {
            v.z = 0.5 * v.y * v.y;
        }

        group.throughput(Throughput::Elements(mesh.vertex_count() as u64));
        group.bench_with_input(
            BenchmarkId::new("align_to_principal_axes", mesh.vertex_count()),
            &mesh,
            |b, mesh| b.iter(|| align_to_principal_axes(black_box(mesh), black_box(&params))),
        );
    }

    group.finish();
}

// =============================================================================
// Criterion Setup
// =============================================================================

criterion_group!(benches, bench_sampling, bench_graph, bench_alignment);

criterion_main!(benches);
