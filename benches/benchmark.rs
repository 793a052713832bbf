//! Benchmarks for the zine store and its projections.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use zinedoc::{
    codec, CompressionConfig, FieldCompressor, NoCompression, SequentialIdGenerator,
    StoryboardOptions, Value, ZineData, ZineStoryboard,
};

/// Storyboard with `panels` panels of 3 layers, each carrying a depth map.
fn populated(panels: usize, depth_len: usize) -> ZineStoryboard {
    let storyboard = ZineStoryboard::with_options(
        StoryboardOptions::new().with_id_generator(SequentialIdGenerator::new("id")),
    );
    for _ in 0..panels {
        let panel = storyboard.add_panel().unwrap();
        for _ in 0..3 {
            let layer = panel.add_layer().unwrap();
            layer.set_data("name", "layer").unwrap();
            layer
                .set_data("depthField", vec![0.25f32; depth_len])
                .unwrap();
        }
    }
    storyboard
}

fn bench_new(c: &mut Criterion) {
    c.bench_function("new", |b| b.iter(|| black_box(ZineStoryboard::new())));
}

fn bench_store_set(c: &mut Criterion) {
    c.bench_function("store_set_field", |b| {
        let store = ZineData::new();
        store.set(&["p", "l"], Value::empty_document()).unwrap();
        let mut i = 0i64;
        b.iter(|| {
            store.set(&["p", "l", "counter"], i).unwrap();
            i += 1;
        })
    });
}

fn bench_add_panel(c: &mut Criterion) {
    c.bench_function("add_panel_with_layer", |b| {
        let storyboard = ZineStoryboard::with_options(
            StoryboardOptions::new().with_id_generator(SequentialIdGenerator::new("id")),
        );
        b.iter(|| {
            let panel = storyboard.add_panel().unwrap();
            black_box(panel.add_layer().unwrap())
        })
    });
}

fn bench_set_data(c: &mut Criterion) {
    c.bench_function("layer_set_data", |b| {
        let storyboard = populated(1, 16);
        let layer = storyboard.panel(0).unwrap().layer(0).unwrap();
        b.iter(|| layer.set_data("name", black_box("sky")).unwrap())
    });
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    for num_panels in [10, 50].iter() {
        let doc = populated(*num_panels, 64).store().snapshot();
        let bytes = codec::encode(&doc).unwrap();

        group.bench_with_input(BenchmarkId::new("encode", num_panels), &doc, |b, doc| {
            b.iter(|| black_box(codec::encode(doc).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("decode", num_panels), &bytes, |b, bytes| {
            b.iter(|| black_box(codec::decode(bytes).unwrap()))
        });
    }

    group.finish();
}

fn bench_clone(c: &mut Criterion) {
    let mut group = c.benchmark_group("clone_storyboard");

    for num_panels in [10, 50].iter() {
        let storyboard = populated(*num_panels, 64);
        group.bench_with_input(BenchmarkId::new("panels", num_panels), num_panels, |b, _| {
            b.iter(|| {
                let copy = storyboard.clone_storyboard().unwrap();
                copy.destroy();
            })
        });
    }

    group.finish();
}

fn bench_export(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let mut group = c.benchmark_group("export");

    let packed = populated(10, 4096);
    group.bench_function("field_compressor", |b| {
        b.iter(|| black_box(runtime.block_on(packed.export()).unwrap()))
    });

    let plain = ZineStoryboard::with_options(
        StoryboardOptions::new().with_compressor(NoCompression),
    );
    plain
        .load_uncompressed(&packed.export_uncompressed().unwrap())
        .unwrap();
    group.bench_function("no_compression", |b| {
        b.iter(|| black_box(runtime.block_on(plain.export()).unwrap()))
    });

    group.finish();
}

fn bench_pack_floats(c: &mut Criterion) {
    let compressor = FieldCompressor::from_config(CompressionConfig::new().with_level(1)).unwrap();
    let values = vec![0.5f32; 4096];
    c.bench_function("pack_floats_4096", |b| {
        b.iter(|| black_box(compressor.pack_floats(&values).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_new,
    bench_store_set,
    bench_add_panel,
    bench_set_data,
    bench_codec,
    bench_clone,
    bench_export,
    bench_pack_floats,
);

criterion_main!(benches);
