//! Benchmarks for the Sable VM.
//!
//! Run with: `cargo bench -p sable-vm`
//!
//! Benchmark groups:
//! 1. run: execution of precompiled programs
//! 2. compile: parse and compile of the same programs

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sable_types::sync::Arc;
use sable_types::Value;
use sable_vm::{compile_str, Vm};

const FIB: &str = r#"
function fib(n) {
    if (n < 2) { return n }
    return fib(n - 1) + fib(n - 2)
}
"#;

const LOOP: &str = r#"
function sum(n) {
    let total = 0
    for (let i = 0; i < n; i++) {
        total += i % 7
    }
    return total
}
"#;

const TAIL: &str = r#"
function count(n, acc) {
    if (n == 0) { return acc }
    return count(n - 1, acc + 1)
}
"#;

const OBJECTS: &str = r#"
class Point {
    x = 0
    y = 0
    constructor(x, y) {
        this.x = x
        this.y = y
    }
}
function build(n) {
    let items = []
    for (let i = 0; i < n; i++) {
        items.push(new Point(i, i * 2))
    }
    let m = {}
    for (let p of items) {
        m[p.x] = p.y
    }
    return m.length
}
"#;

fn bench_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("run");

    let cases: [(&str, &str, &str, i64); 4] = [
        ("fib", FIB, "fib", 20),
        ("loop", LOOP, "sum", 10_000),
        ("tail_call", TAIL, "count", 10_000),
        ("objects", OBJECTS, "build", 1_000),
    ];

    for (name, source, func, arg) in cases {
        let program = Arc::new(compile_str(source).expect("compile"));
        group.bench_with_input(BenchmarkId::new(name, arg), &arg, |b, &arg| {
            let mut vm = Vm::new(Arc::clone(&program));
            vm.initialize().expect("initialize");
            b.iter(|| {
                vm.reset_steps();
                let args = [Value::Int(arg), Value::Int(0)];
                let argc = if func == "count" { 2 } else { 1 };
                black_box(vm.run_func(func, &args[..argc]).expect("run"))
            });
        });
    }

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");
    for (name, source) in [("fib", FIB), ("loop", LOOP), ("objects", OBJECTS)] {
        group.bench_function(name, |b| b.iter(|| black_box(compile_str(black_box(source)).expect("compile"))));
    }
    group.finish();
}

criterion_group!(benches, bench_run, bench_compile);
criterion_main!(benches);
