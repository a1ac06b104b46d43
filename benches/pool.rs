use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use http::HeaderMap;
use rawhttp::http::httpcache::{CacheEntry, HttpCache};
use rawhttp::socket::pool::{ClientSocketPool, Origin};
use tokio::net::TcpListener;
use url::Url;

/// In-memory pool and cache operations.
fn benchmark_pool_operations(c: &mut Criterion) {
    c.bench_function("pool_new", |b| b.iter(|| black_box(ClientSocketPool::new())));

    let url = Url::parse("https://example.com:8443/a/b?c=d").unwrap();
    c.bench_function("origin_from_url", |b| {
        b.iter(|| black_box(Origin::from_url(black_box(&url)).unwrap()))
    });

    let pool = ClientSocketPool::new();
    c.bench_function("pool_idle_socket_count", |b| {
        b.iter(|| black_box(pool.idle_socket_count()))
    });

    let cache = HttpCache::new();
    let entry = CacheEntry::from_response(&HeaderMap::new(), Bytes::from_static(b"cached body"));
    c.bench_function("cache_put_get", |b| {
        b.iter(|| {
            cache.put("https://example.com/page", entry.clone());
            black_box(cache.get("https://example.com/page"))
        })
    });
}

/// Checkout/return cycle against a local listener (idle hit path).
fn benchmark_pool_reuse(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let origin = rt.block_on(async {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        Origin::new("http", "127.0.0.1", port)
    });

    let pool = ClientSocketPool::new();
    c.bench_function("pool_acquire_release_idle", |b| {
        b.to_async(&rt).iter(|| async {
            let socket = pool.acquire(&origin).await.unwrap();
            pool.release(socket);
        })
    });
}

criterion_group!(benches, benchmark_pool_operations, benchmark_pool_reuse);
criterion_main!(benches);
