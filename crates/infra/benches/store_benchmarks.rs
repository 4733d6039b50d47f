use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use storefront_catalog::{LocalizedText, NewProduct, Pagination, Product, ProductFilter};
use storefront_core::ProductId;
use storefront_infra::ProductStore;
use storefront_infra::store::InMemoryProductStore;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

fn product(i: usize, qty: i64) -> Product {
    Product::create(
        ProductId::new(),
        NewProduct::new(
            "mug",
            format!("MUG-{i}"),
            LocalizedText::new("en", format!("Mug {i}")),
        )
        .priced(20.0, 0.1)
        .stocked(qty),
    )
    .unwrap()
}

fn bench_reservation_latency(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("reservation_latency");

    group.bench_function("reserve_and_release", |b| {
        let store = InMemoryProductStore::new();
        let mug = product(0, 1_000);
        rt.block_on(store.insert(&mug)).unwrap();

        b.iter(|| {
            rt.block_on(async {
                black_box(store.apply_if_stock(mug.id, 0, black_box(3)).await.unwrap());
                black_box(store.apply_if_stock(mug.id, 0, -3).await.unwrap());
            })
        });
    });

    group.bench_function("rejected_reservation", |b| {
        let store = InMemoryProductStore::new();
        let mug = product(0, 1);
        rt.block_on(store.insert(&mug)).unwrap();

        b.iter(|| black_box(rt.block_on(store.apply_if_stock(mug.id, 0, 5)).unwrap()));
    });

    group.finish();
}

fn bench_listing_pages(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("listing_pages");

    for catalog_size in [100usize, 1_000, 10_000] {
        let store = InMemoryProductStore::new();
        for i in 0..catalog_size {
            rt.block_on(store.insert(&product(i, 1))).unwrap();
        }
        let filter = ProductFilter::of_type("mug").active_only();

        group.throughput(Throughput::Elements(50));
        group.bench_with_input(
            BenchmarkId::new("last_page_of_50", catalog_size),
            &catalog_size,
            |b, &size| {
                let page = Pagination {
                    offset: size.saturating_sub(50),
                    limit: 50,
                };
                b.iter(|| black_box(rt.block_on(store.list(&filter, page)).unwrap()));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_reservation_latency, bench_listing_pages);
criterion_main!(benches);
