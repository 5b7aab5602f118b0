//! Cache engine and key derivation benchmarks
//!
//! Run with: cargo bench --features=benchmarks

use std::sync::Arc;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use tokio::runtime::Runtime;

use authcache::auth::{
    AuthCacheService, BasicAuthCacheKeyProvider, CertificateCacheKeyProvider, Credential,
    Principal, Subject,
};
use authcache::cache::{Cache, CacheConfig};
use authcache::config::AuthCacheConfig;
use authcache::lifecycle::ProcessLifecycle;

fn engine(max_entries: usize) -> Cache<String, u64> {
    Cache::new(CacheConfig {
        name: "bench".to_string(),
        initial_size: 50,
        max_entries,
        timeout: Duration::ZERO,
    })
}

fn bench_engine_operations(c: &mut Criterion) {
    let cache = engine(25_000);
    for i in 0..10_000u64 {
        cache.insert(format!("key{i}"), i);
    }

    c.bench_function("engine_insert", |b| {
        let mut counter = 0u64;
        b.iter(|| {
            counter += 1;
            cache.insert(format!("key{}", counter % 20_000), counter);
        })
    });

    c.bench_function("engine_get_hit", |b| {
        let mut counter = 0u64;
        b.iter(|| {
            counter += 1;
            black_box(cache.get(&format!("key{}", counter % 10_000)))
        })
    });
}

fn bench_rotation_under_pressure(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_size_pressure");

    for max_entries in [100usize, 1_000, 10_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(max_entries),
            &max_entries,
            |b, &max_entries| {
                let cache = engine(max_entries);
                let mut counter = 0u64;
                b.iter(|| {
                    counter += 1;
                    cache.insert(format!("key{counter}"), counter);
                })
            },
        );
    }

    group.finish();
}

fn bench_key_derivation(c: &mut Criterion) {
    c.bench_function("basic_auth_key", |b| {
        b.iter(|| {
            black_box(BasicAuthCacheKeyProvider::key_for(
                "defaultRealm",
                black_box("alice"),
                black_box("correct horse battery staple"),
            ))
        })
    });

    let chain = vec![vec![0x30u8; 1200], vec![0x31u8; 900]];
    c.bench_function("certificate_key", |b| {
        b.iter(|| black_box(CertificateCacheKeyProvider::key_for(black_box(&chain))))
    });
}

fn bench_service_round_trip(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let service = rt.block_on(async {
        AuthCacheService::new(
            AuthCacheConfig::new(50, 25_000, Duration::ZERO, true),
            Arc::new(ProcessLifecycle::ready()),
        )
        .with_default_providers()
    });

    c.bench_function("service_insert_then_get", |b| {
        let mut counter = 0u64;
        b.iter(|| {
            counter += 1;
            let key = format!("user{}", counter % 1_000);
            let subject = Subject::new()
                .with_principal(Principal::new("alice"))
                .with_credential(Credential::CustomCacheKey(key.clone()));
            rt.block_on(async {
                service.insert(subject).await;
                black_box(service.get_subject(&key).await)
            })
        })
    });
}

criterion_group!(
    benches,
    bench_engine_operations,
    bench_rotation_under_pressure,
    bench_key_derivation,
    bench_service_round_trip
);
criterion_main!(benches);
