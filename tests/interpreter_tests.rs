// Integration tests for the script interpreter

use serde_json::Map;
use stepwise::config::EngineConfig;
use stepwise::errors::ExecutionError;
use stepwise::interpreter::RuntimeError;
use stepwise::session::Session;

fn session(source: &str) -> Session {
    Session::create(source, &Map::new(), &EngineConfig::default())
        .expect("session creation failed")
}

fn run(source: &str) -> Vec<String> {
    let mut session = session(source);
    session.run().expect("execution failed");
    session.console_output()
}

fn run_err(source: &str) -> RuntimeError {
    let mut session = session(source);
    match session.run() {
        Err(ExecutionError::Runtime(err)) => err,
        other => panic!("expected a runtime error, got {other:?}"),
    }
}

#[test]
fn test_arithmetic_and_precedence() {
    let output = run(r#"
        var a = 2 + 3 * 4;
        var b = (2 + 3) * 4;
        var c = 2 ** 3 ** 2;
        var d = 7 % 3;
        console.log(a, b, c, d, 10 / 4);
    "#);
    assert_eq!(output, vec!["14 20 512 1 2.5"]);
}

#[test]
fn test_string_concatenation_and_coercion() {
    let output = run(r#"
        console.log("n=" + 1 + 2);
        console.log(1 + 2 + "px");
        console.log(Number("12") + 1, String(12) + 1);
        console.log("5" * "2", 1 == "1", 1 === "1", null == undefined);
    "#);
    assert_eq!(output, vec!["n=12", "3px", "13 121", "10 true false true"]);
}

#[test]
fn test_closures_keep_their_scope() {
    let output = run(r#"
        function makeCounter() {
            var count = 0;
            return function () {
                count += 1;
                return count;
            };
        }
        var next = makeCounter();
        next();
        next();
        var square = x => x * x;
        console.log(next(), square(7));
    "#);
    assert_eq!(output, vec!["3 49"]);
}

#[test]
fn test_loops_break_and_continue() {
    let output = run(r#"
        var evens = 0;
        for (let i = 0; i < 10; i++) {
            if (i % 2 === 1) continue;
            if (i > 6) break;
            evens += 1;
        }
        var n = 0;
        while (n < 5) { n++; }
        var m = 10;
        do { m--; } while (m > 100);
        console.log(evens, n, m);
    "#);
    assert_eq!(output, vec!["4 5 9"]);
}

#[test]
fn test_switch_falls_through() {
    let output = run(r#"
        function label(x) {
            var out = "";
            switch (x) {
                case 1:
                    out += "one ";
                case 2:
                    out += "two";
                    break;
                default:
                    out = "other";
            }
            return out;
        }
        console.log(label(1));
        console.log(label(2));
        console.log(label(9));
    "#);
    assert_eq!(output, vec!["one two", "two", "other"]);
}

#[test]
fn test_block_scoping() {
    let output = run(r#"
        let x = 1;
        {
            let x = 2;
            var y = x;
        }
        console.log(x, y);
    "#);
    assert_eq!(output, vec!["1 2"]);
}

#[test]
fn test_array_methods() {
    let output = run(r#"
        var xs = [3, 1, 4];
        xs.push(1, 5);
        var last = xs.pop();
        console.log(xs.length, last, xs.indexOf(4), xs.includes(9));
        console.log(xs.slice(1, 3).join("-"), xs.concat([9]).length);
        xs[6] = 2;
        console.log(xs.length, xs[5]);
    "#);
    assert_eq!(output, vec!["4 5 2 false", "1-4 5", "7 undefined"]);
}

#[test]
fn test_string_methods() {
    let output = run(r#"
        var s = "  Hello World  ".trim();
        console.log(s.length, s.charAt(4), s.indexOf("World"));
        console.log(s.toUpperCase(), s.toLowerCase());
        console.log(s.split(" ").length, s.slice(-5), s.includes("lo W"));
    "#);
    assert_eq!(
        output,
        vec!["11 o 6", "HELLO WORLD hello world", "2 World true"]
    );
}

#[test]
fn test_math_and_number_builtins() {
    let output = run(r#"
        console.log(Math.max(1, 5, 3), Math.min(2, -1), Math.floor(2.7), Math.abs(-4));
        console.log(Math.sqrt(16), Math.round(2.5), Math.PI > 3);
        console.log(parseInt("42px"), parseFloat("3.5"), isNaN("abc"), isFinite(1 / 0));
        console.log((3.14159).toFixed(2), (5).toString(2));
    "#);
    assert_eq!(
        output,
        vec!["5 -1 2 4", "4 3 true", "42 3.5 true false", "3.14 101"]
    );
}

#[test]
fn test_json_round_trip() {
    let output = run(r#"
        var text = JSON.stringify({ a: [1, 2], b: "x", c: null });
        var back = JSON.parse(text);
        console.log(text);
        console.log(back.a[1], back.b, Object.keys(back).join(","));
        console.log(Array.isArray(back.a), Array.isArray(back));
    "#);
    assert_eq!(
        output,
        vec![r#"{"a":[1,2],"b":"x","c":null}"#, "2 x a,b,c", "true false"]
    );
}

#[test]
fn test_console_log_inspects_values() {
    let output = run(r#"
        function f() {}
        console.log([1, "a"], { k: [1] }, f, "plain");
    "#);
    assert_eq!(output, vec!["[ 1, 'a' ] { k: [ 1 ] } [Function: f] plain"]);
}

#[test]
fn test_typeof_and_update_operators() {
    let output = run(r#"
        var i = 5;
        var a = i++;
        var b = ++i;
        var t = typeof missing;
        console.log(a, b, i, t, typeof "s", typeof {}, typeof f, i > 6 ? "big" : "small");
        function f() {}
    "#);
    assert_eq!(output, vec!["5 7 7 undefined string object function big"]);
}

#[test]
fn test_uncaught_throw() {
    let err = run_err("var a = 1;\nthrow \"boom\";");
    match err {
        RuntimeError::Uncaught { message, location } => {
            assert_eq!(message, "boom");
            assert_eq!(location.line, 2);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_const_assignment_fails() {
    let err = run_err("const k = 1;\nk = 2;");
    assert!(matches!(err, RuntimeError::ConstAssignment { ref name, .. } if name == "k"));
}

#[test]
fn test_undefined_variable_and_not_callable() {
    assert!(matches!(
        run_err("var a = b + 1;"),
        RuntimeError::UndefinedVariable { .. }
    ));
    assert!(matches!(
        run_err("var o = {};\no.missing();"),
        RuntimeError::NotCallable { .. }
    ));
    assert!(matches!(
        run_err("var o;\no.x;"),
        RuntimeError::TypeError { .. }
    ));
}

#[test]
fn test_call_depth_is_bounded() {
    let err = run_err("function f(n) { return f(n + 1); }\nf(0);");
    assert!(matches!(err, RuntimeError::CallDepthExceeded { .. }));
}
