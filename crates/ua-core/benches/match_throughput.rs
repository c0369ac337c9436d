//! Criterion benchmarks for the matching hot path.
//!
//! Uses the checked-in fixture definitions so results are reproducible
//! without a production database.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::path::{Path, PathBuf};
use ua_config::{EngineConfig, MatchMode};
use ua_core::handlers::Chain;
use ua_core::{Manager, RepositoryBuilder};
use ua_normalize::{Pipeline, Stage};
use ua_store::Provider;

const AGENTS: &[(&str, &str)] = &[
    (
        "nokia",
        "Nokia3220/2.0 (03.30) Profile/MIDP-1.0 Configuration/CLDC-1.0 UP.Browser/6.2.3.3.c.1.101 (GUI) MMP/2.0",
    ),
    (
        "android",
        "Mozilla/5.0 (Linux; U; Android 2.1-update1; en-us; HTC Hero Build/ERD79) AppleWebKit/530.17 (KHTML, like Gecko) Version/4.0 Mobile Safari/530.17",
    ),
    (
        "chrome",
        "Mozilla/5.0 (Windows NT 6.1) AppleWebKit/535.7 (KHTML, like Gecko) Chrome/16.0.912.63 Safari/535.7",
    ),
    ("motorola", "MOT-V3r/0E.41.C3R MIB/2.2.1 Profile/MIDP-2.0 Configuration/CLDC-1.1"),
    ("unknown", "SomethingNobodyShips/0.1 (unknown; device)"),
];

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../test/fixtures/devices")
        .join(name)
}

fn bench_build(c: &mut Criterion) {
    c.bench_function("repository_build", |b| {
        b.iter(|| {
            RepositoryBuilder::new(fixture("wurfl.xml"))
                .patch(fixture("patch_web_browsers.xml"))
                .build()
                .map(|built| black_box(built.repository.len()))
        })
    });
}

fn bench_normalize(c: &mut Criterion) {
    let generic = Pipeline::generic();
    let android = generic.with_stage(Stage::Android);

    let mut group = c.benchmark_group("normalize");
    for (name, ua) in AGENTS {
        group.bench_with_input(BenchmarkId::new("generic", name), ua, |b, ua| {
            b.iter(|| generic.normalize(black_box(ua)))
        });
    }
    group.bench_function("android_stage", |b| {
        b.iter(|| android.normalize(black_box(AGENTS[1].1)))
    });
    group.finish();
}

fn bench_resolve(c: &mut Criterion) {
    let Ok(built) = RepositoryBuilder::new(fixture("wurfl.xml"))
        .patch(fixture("patch_web_browsers.xml"))
        .build()
    else {
        return;
    };
    let chain = Chain::standard();

    let mut group = c.benchmark_group("resolve");
    for mode in [MatchMode::Accuracy, MatchMode::Performance] {
        for (name, ua) in AGENTS {
            group.bench_with_input(
                BenchmarkId::new(mode.as_str(), name),
                ua,
                |b, ua| b.iter(|| chain.resolve(&built.repository, mode, black_box(ua))),
            );
        }
    }
    group.finish();
}

fn bench_cached_lookup(c: &mut Criterion) {
    let mut config = EngineConfig::default();
    config.database.main = Some(fixture("wurfl.xml"));
    config.database.patches = vec![fixture("patch_web_browsers.xml")];
    config.persistence.provider = Provider::Memory;
    config.cache.provider = Provider::Memory;
    let Ok(manager) = Manager::new(&config) else {
        return;
    };

    c.bench_function("manager_lookup_cached", |b| {
        b.iter(|| black_box(manager.get_device_for_user_agent(AGENTS[0].1).id.len()))
    });
}

criterion_group!(
    benches,
    bench_build,
    bench_normalize,
    bench_resolve,
    bench_cached_lookup
);
criterion_main!(benches);
