//! Benchmarks for the bean container

use bean_context::{
    qualifier, Application, BeanDefinition, BeanSet, Catalog, Container, HookEntry, HookResult,
    MapPropertySource, Qualified, Result,
};
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

#[allow(dead_code)]
struct SmallService {
    value: i32,
}

#[allow(dead_code)]
struct MediumService {
    name: String,
    values: Vec<i32>,
}

#[allow(dead_code)]
struct Consumer {
    small: Arc<SmallService>,
    medium: Arc<MediumService>,
}

trait Handler: Send + Sync {
    fn id(&self) -> usize;
}

struct NumberedHandler(usize);

impl Handler for NumberedHandler {
    fn id(&self) -> usize {
        self.0
    }
}

qualifier!(Third = "handler-3");

#[derive(Default)]
struct NoopHooks;

fn handlers(container: &Container, count: usize) {
    for i in 0..count {
        container
            .register(
                BeanDefinition::from_fn(move || NumberedHandler(i))
                    .named(format!("handler-{i}"))
                    .implements::<dyn Handler>(|h| h as Arc<dyn Handler>),
            )
            .unwrap();
    }
}

fn populated() -> Container {
    let container = Container::new();
    container.register_instance(SmallService { value: 42 }).unwrap();
    container
        .register(BeanDefinition::from_fn(|| MediumService {
            name: "medium".into(),
            values: vec![1, 2, 3],
        }))
        .unwrap();
    container
        .register(BeanDefinition::constructor(
            |(small, medium): (Arc<SmallService>, Arc<MediumService>)| Consumer { small, medium },
        ))
        .unwrap();
    container
}

fn bench_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration");

    group.bench_function("instance", |b| {
        b.iter(|| {
            let container = Container::new();
            container.register_instance(SmallService { value: 42 }).unwrap();
            black_box(container)
        })
    });

    group.bench_function("constructor", |b| {
        b.iter(|| {
            let container = Container::new();
            container
                .register(BeanDefinition::from_fn(|| SmallService { value: 42 }))
                .unwrap();
            black_box(container)
        })
    });

    group.throughput(Throughput::Elements(16));
    group.bench_function("named_contracts_16", |b| {
        b.iter(|| {
            let container = Container::new();
            handlers(&container, 16);
            black_box(container)
        })
    });

    group.finish();
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");

    let container = populated();
    // Warm the singleton cache
    container.get::<Consumer>().unwrap();

    group.bench_function("singleton_cached", |b| {
        b.iter(|| black_box(container.get::<SmallService>().unwrap()))
    });

    group.bench_function("singleton_with_dependencies", |b| {
        b.iter(|| black_box(container.get::<Consumer>().unwrap()))
    });

    group.bench_function("try_get_missing", |b| {
        b.iter(|| black_box(container.try_get::<NoopHooks>()))
    });

    group.bench_function("contains", |b| {
        b.iter(|| black_box(container.contains::<MediumService>()))
    });

    group.finish();
}

fn bench_prototype_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("prototype_resolution");

    let container = Container::new();
    container.register_instance(SmallService { value: 7 }).unwrap();
    container
        .register(
            BeanDefinition::from_fn(|| MediumService {
                name: "request".into(),
                values: Vec::new(),
            })
            .prototype(),
        )
        .unwrap();
    container
        .register(
            BeanDefinition::constructor(
                |(small, medium): (Arc<SmallService>, Arc<MediumService>)| Consumer {
                    small,
                    medium,
                },
            )
            .prototype(),
        )
        .unwrap();

    group.bench_function("prototype_leaf", |b| {
        b.iter(|| black_box(container.get::<MediumService>().unwrap()))
    });

    group.bench_function("prototype_graph", |b| {
        b.iter(|| black_box(container.get::<Consumer>().unwrap()))
    });

    group.finish();
}

fn bench_candidates(c: &mut Criterion) {
    let mut group = c.benchmark_group("candidates");

    let container = Container::new();
    handlers(&container, 8);

    group.bench_function("named", |b| {
        b.iter(|| black_box(container.get_named::<dyn Handler>("handler-3").unwrap().id()))
    });

    group.bench_function("qualified", |b| {
        b.iter(|| {
            let handler = container
                .resolve::<Qualified<dyn Handler, Third>>()
                .unwrap();
            black_box(handler.id())
        })
    });

    group.throughput(Throughput::Elements(8));
    group.bench_function("get_all_8", |b| {
        b.iter(|| black_box(container.get_all::<dyn Handler>().unwrap()))
    });

    group.bench_function("bean_set_8", |b| {
        b.iter(|| black_box(container.resolve::<BeanSet<dyn Handler>>().unwrap()))
    });

    group.finish();
}

fn bench_startup(c: &mut Criterion) {
    let mut group = c.benchmark_group("startup");

    group.bench_function("initialize_small_application", |b| {
        b.iter(|| {
            let app = Application::new("bench").module(|catalog: &mut Catalog| -> Result<()> {
                catalog
                    .bean(BeanDefinition::from_fn(|| SmallService { value: 1 }))
                    .bean(BeanDefinition::from_fn(|| MediumService {
                        name: "m".into(),
                        values: vec![1],
                    }))
                    .bean(BeanDefinition::constructor(
                        |(small, medium): (Arc<SmallService>, Arc<MediumService>)| Consumer {
                            small,
                            medium,
                        },
                    ));
                catalog.hook(HookEntry::after(
                    "touch",
                    |_: &NoopHooks, consumer: Arc<Consumer>| -> HookResult {
                        black_box(consumer);
                        Ok(())
                    },
                ))?;
                Ok(())
            });

            let container = Container::builder()
                .properties(MapPropertySource::new().with("bench.enabled", "true"))
                .build();
            container.initialize(&app).unwrap();
            black_box(container)
        })
    });

    group.finish();
}

fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");

    group.bench_function("concurrent_reads_4", |b| {
        let container = populated();
        container.get::<Consumer>().unwrap();

        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let c = container.clone();
                    thread::spawn(move || {
                        for _ in 0..100 {
                            let _ = c.get::<Consumer>().unwrap();
                        }
                    })
                })
                .collect();

            for h in handles {
                h.join().unwrap();
            }
        })
    });

    group.bench_function("first_request_race_4", |b| {
        b.iter(|| {
            let container = populated();
            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let c = container.clone();
                    thread::spawn(move || black_box(c.get::<Consumer>().unwrap()))
                })
                .collect();

            for h in handles {
                h.join().unwrap();
            }
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_registration,
    bench_resolution,
    bench_prototype_resolution,
    bench_candidates,
    bench_startup,
    bench_concurrent,
);

criterion_main!(benches);
