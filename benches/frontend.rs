use criterion::{Criterion, black_box, criterion_group, criterion_main};
use indoc::indoc;

use smolpy::interpreter::Interpreter;
use smolpy::{lexer, parser};

const FIB: &str = indoc! {"
    def fib(n):
        if n < 2:
            return n
        return fib(n - 1) + fib(n - 2)
    print(fib(15))
"};

const LOOPS: &str = indoc! {"
    total = 0
    for i in range(200):
        for j in range(20):
            if (i + j) % 3 == 0:
                total += i * j
    print(total)
"};

const CLASSES: &str = indoc! {"
    class Point:
        def __init__(self, x, y):
            self.x = x
            self.y = y
        def shifted(self, dx, dy):
            return Point(self.x + dx, self.y + dy)
    p = Point(0, 0)
    for i in range(100):
        p = p.shifted(1, 2)
    print(p.x, p.y)
"};

fn bench_frontend(c: &mut Criterion) {
    for (label, source) in [("fib", FIB), ("loops", LOOPS), ("classes", CLASSES)] {
        let program = parser::parse(source).expect("parse");

        c.bench_function(&format!("frontend_tokenize_{label}"), |b| {
            b.iter(|| {
                let out = lexer::tokenize(black_box(source)).expect("tokenize");
                black_box(out);
            })
        });

        c.bench_function(&format!("frontend_parse_{label}"), |b| {
            b.iter(|| {
                let out = parser::parse(black_box(source)).expect("parse");
                black_box(out);
            })
        });

        c.bench_function(&format!("interpreter_run_{label}"), |b| {
            b.iter(|| {
                let mut interpreter = Interpreter::new();
                let out = interpreter.run(black_box(&program)).expect("run");
                black_box(out);
            })
        });
    }
}

criterion_group!(benches, bench_frontend);
criterion_main!(benches);
