//! Benchmarks for mesh operations.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use halfmesh::algo::AabbTreeOptions;
use halfmesh::prelude::*;
use nalgebra::Point3;

fn bench_construction(c: &mut Criterion) {
    let sphere = make_sphere(&SphereParams::new(1.0, 10_000)).unwrap();
    let (points, triangles) = to_triangles(&sphere);

    c.bench_function("from_triangles_sphere_10k", |b| {
        b.iter(|| from_triangles(&points, &triangles).unwrap());
    });

    let mut group = c.benchmark_group("make_sphere");
    for n in [1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| make_sphere(&SphereParams::new(1.0, n)).unwrap());
        });
    }
    group.finish();
}

fn bench_traversal(c: &mut Criterion) {
    let mesh = make_sphere(&SphereParams::new(1.0, 10_000)).unwrap();
    let topology = mesh.topology();

    c.bench_function("vertex_neighbors_all", |b| {
        b.iter(|| {
            let mut count = 0;
            for v in topology.vert_ids() {
                count += topology.vertex_neighbors(v).count();
            }
            count
        });
    });

    c.bench_function("volume_sphere_10k", |b| {
        b.iter(|| volume(&mesh, None).unwrap());
    });
}

fn bench_projection(c: &mut Criterion) {
    let mesh = make_sphere(&SphereParams::new(1.0, 10_000)).unwrap();
    let part = MeshPart::new(&mesh);
    let options = ProjectionOptions::default();
    let p = Point3::new(1.0, 2.0, 3.0);

    c.bench_function("find_projection_cached", |b| {
        find_projection(&p, &part, &options).unwrap();
        b.iter(|| find_projection(&p, &part, &options).unwrap());
    });

    let mut group = c.benchmark_group("tree_build");
    for (name, tree) in [
        ("sequential", AabbTreeOptions::default().sequential()),
        ("parallel", AabbTreeOptions::default()),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                halfmesh::algo::AabbTree::build(
                    mesh.points(),
                    mesh.topology(),
                    mesh.valid_faces(),
                    &tree,
                )
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_construction, bench_traversal, bench_projection);
criterion_main!(benches);
