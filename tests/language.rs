//! End-to-end runs: parse a program, execute it, and compare the
//! collected print output.

use indoc::indoc;

use smolpy::interpreter::Interpreter;
use smolpy::parser;

fn run(source: &str) -> String {
    let suite = parser::parse(source).expect("parse failed");
    Interpreter::new().run(&suite).expect("run failed")
}

#[test]
fn fizzbuzz() {
    let source = indoc! {"
        for n in range(1, 16):
            if n % 15 == 0:
                print('fizzbuzz')
            elif n % 3 == 0:
                print('fizz')
            elif n % 5 == 0:
                print('buzz')
            else:
                print(n)
    "};
    assert_eq!(
        run(source),
        "1\n2\nfizz\n4\nbuzz\nfizz\n7\n8\nfizz\nbuzz\n11\nfizz\n13\n14\nfizzbuzz"
    );
}

#[test]
fn recursive_fibonacci() {
    let source = indoc! {"
        def fib(n):
            if n < 2:
                return n
            return fib(n - 1) + fib(n - 2)
        print(fib(10))
    "};
    assert_eq!(run(source), "55");
}

#[test]
fn mutual_recursion() {
    let source = indoc! {"
        def even(n):
            if n == 0:
                return 1
            return odd(n - 1)
        def odd(n):
            if n == 0:
                return 0
            return even(n - 1)
        print(even(10), odd(10))
    "};
    assert_eq!(run(source), "1 0");
}

#[test]
fn method_override_through_inheritance() {
    let source = indoc! {"
        class Animal:
            def name(self):
                return 'animal'
            def greet(self):
                return 'hello ' + self.name()
        class Dog(Animal):
            def name(self):
                return 'dog'
        print(Animal().greet())
        print(Dog().greet())
    "};
    assert_eq!(run(source), "hello animal\nhello dog");
}

#[test]
fn class_attributes_are_shared() {
    let source = indoc! {"
        class Counter:
            count = 0
        Counter.count = Counter.count + 1
        print(Counter.count)
        c = Counter()
        print(c.count)
        c.count = 10
        print(c.count, Counter.count)
    "};
    assert_eq!(run(source), "1\n1\n10 1");
}

#[test]
fn user_exception_hierarchy() {
    let source = indoc! {"
        class AppError(Exception):
            pass
        class ConfigError(AppError):
            pass
        def load(name):
            if name == 'bad':
                raise ConfigError(name)
            return name
        for name in ['ok', 'bad']:
            try:
                print(load(name))
            except AppError as e:
                print('failed')
    "};
    assert_eq!(run(source), "ok\nfailed");
}

#[test]
fn tuple_clause_matches_any_listed_type() {
    let source = indoc! {"
        for n in [0, 1]:
            try:
                if n == 0:
                    x = 1 // 0
                else:
                    x = [][5]
            except (ZeroDivisionError, IndexError):
                print('caught', n)
    "};
    assert_eq!(run(source), "caught 0\ncaught 1");
}

#[test]
fn nested_loops_with_accumulator() {
    let source = indoc! {"
        table = []
        for i in range(1, 4):
            row = []
            for j in range(1, 4):
                row = row + [i * j]
            table = table + [row]
        print(table)
    "};
    assert_eq!(run(source), "[[1, 2, 3], [2, 4, 6], [3, 6, 9]]");
}

#[test]
fn nested_comprehension() {
    assert_eq!(
        run("print([i * j for i in range(1, 3) for j in range(1, 3)])\n"),
        "[1, 2, 2, 4]"
    );
}

#[test]
fn dictionary_driven_dispatch() {
    let source = indoc! {"
        def double(n):
            return n * 2
        def square(n):
            return n * n
        ops = {'double': double, 'square': square}
        for name in ['double', 'square']:
            print(name, ops[name](6))
    "};
    assert_eq!(run(source), "double 12\nsquare 36");
}

#[test]
fn string_building_and_repr() {
    let source = indoc! {"
        parts = ''
        for word in ['a', 'b', 'c']:
            parts = parts + word + '-'
        print(parts)
        print(repr(parts))
        print('ab' * 3)
    "};
    assert_eq!(run(source), "a-b-c-\n'a-b-c-'\nababab");
}

#[test]
fn eval_returns_a_value() {
    let mut interpreter = Interpreter::new();
    let program = parser::parse("x = 6\n").expect("parse");
    interpreter.run(&program).expect("run");
    let exprs = parser::parse_eval("x * 7").expect("parse_eval");
    let value = interpreter.eval(&exprs).expect("eval");
    assert_eq!(value.repr(), "42");
}

#[test]
fn errors_name_their_exception_type() {
    let cases = [
        ("missing\n", "NameError"),
        ("1 + 'a'\n", "TypeError"),
        ("[][0]\n", "IndexError"),
        ("{}['k']\n", "KeyError"),
        ("1 // 0\n", "ZeroDivisionError"),
        ("yield 1\n", "RuntimeError"),
        ("assert 0\n", "AssertionError"),
    ];
    for (source, expected) in cases {
        let suite = parser::parse(source).expect("parse failed");
        let error = Interpreter::new()
            .run(&suite)
            .expect_err("expected a failure");
        assert_eq!(error.exception_type(), expected, "for {source:?}");
    }
}

#[test]
fn output_survives_a_failing_run() {
    let source = indoc! {"
        print('before')
        missing
    "};
    let suite = parser::parse(source).expect("parse failed");
    let mut interpreter = Interpreter::new();
    assert!(interpreter.run(&suite).is_err());
    assert_eq!(interpreter.output(), "before");
}
