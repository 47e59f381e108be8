//! vm_hotpath.rs — micro-benchs « hot path » de la VM GNBS
//!
//! Deux groupes :
//!   • run-only : compile une fois, puis mesure `Vm::execute` seul
//!   • pipeline : `Vm::interpret` complet (scan + compile + exécution)
//!
//! La sortie de `print` part dans `io::sink()`.

use std::{io, time::Duration};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gnbs_benches::MICROS;
use gnbs_vm::Vm;

fn quiet_vm() -> Vm { Vm::new().with_output(io::sink()) }

fn bench_vm_run_only(c: &mut Criterion) {
    let mut group = c.benchmark_group("vm/hotpath/run-only");
    group.sample_size(30);
    group.warm_up_time(Duration::from_millis(400));
    group.measurement_time(Duration::from_secs(6));

    for m in MICROS {
        let mut vm = quiet_vm();
        let Ok(script) = vm.compile(m.src) else {
            panic!("compilation échouée pour {}", m.name);
        };
        let bytes = vm.heap().function(script).chunk.len();
        group.throughput(Throughput::Bytes(bytes as u64));
        group.bench_with_input(BenchmarkId::from_parameter(m.name), &script, |b, &script| {
            b.iter(|| vm.execute(black_box(script)).unwrap());
        });
    }

    group.finish();
}

fn bench_vm_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("vm/hotpath/pipeline");
    group.sample_size(30);
    group.warm_up_time(Duration::from_millis(300));
    group.measurement_time(Duration::from_secs(6));

    for m in MICROS {
        group.throughput(Throughput::Bytes(m.src.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(m.name), &m.src, |b, src| {
            b.iter(|| {
                let mut vm = quiet_vm();
                vm.interpret(black_box(src)).unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_vm_run_only, bench_vm_pipeline);
criterion_main!(benches);
