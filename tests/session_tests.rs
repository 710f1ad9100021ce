// Integration tests for sessions and the host bridge

use serde_json::{json, Map};
use stepwise::config::{BridgeConfig, EngineConfig};
use stepwise::errors::{ExecutionError, SessionError};
use stepwise::interpreter::RuntimeError;
use stepwise::session::Session;
use stepwise::source::ProgramSource;

fn bindings(value: serde_json::Value) -> Map<String, serde_json::Value> {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

fn wrapped_session(body: &str, input: serde_json::Value) -> Session {
    let source = ProgramSource::from_body(body, "bindings");
    Session::create(&source.wrapped, &bindings(input), &EngineConfig::default())
        .expect("session creation failed")
}

#[test]
fn test_wrapped_body_reads_bindings_and_returns() {
    let mut session = wrapped_session(
        "var total = 0;\n\
         for (var i = 0; i < bindings.xs.length; i++) {\n\
           total += bindings.xs[i];\n\
         }\n\
         console.log(total);\n\
         return total;",
        json!({ "xs": [1, 2, 3] }),
    );
    session.run().expect("execution failed");
    assert!(session.is_done());
    assert_eq!(session.console_output(), vec!["6"]);
}

#[test]
fn test_bindings_json_and_inert_hooks() {
    let mut session = wrapped_session(
        "plot(1, 2);\nrecord(\"x\");\nconsole.log(bindingsJson());",
        json!({ "n": 3 }),
    );
    session.run().expect("execution failed");
    assert_eq!(session.console_output(), vec![r#"{"n":3}"#]);
}

#[test]
fn test_bindings_cannot_be_modified() {
    let mut session = wrapped_session("bindings.n = 4;", json!({ "n": 3 }));
    let err = session.run().unwrap_err();
    assert!(matches!(
        err,
        ExecutionError::Runtime(RuntimeError::ReadOnlyProperty { ref property, .. })
            if property == "n"
    ));
}

#[test]
fn test_checkpoint_is_captured_once() {
    let mut session = wrapped_session(
        "var m = 5;\ncheckpoint({ description: \"half\", values: [[\"m\", m]] });\nvar after = 1;",
        json!({}),
    );

    assert!(session.step().unwrap());
    assert!(session.take_checkpoint().is_none());

    session.step().unwrap();
    let payload = session.take_checkpoint().expect("checkpoint missing");
    let target = payload.target("").unwrap();
    assert_eq!(target.description, "half");
    assert_eq!(target.values, Some(vec![("m".to_string(), json!(5))]));
    assert!(session.take_checkpoint().is_none());
}

#[test]
fn test_checkpoint_targets_and_id() {
    let mut session = wrapped_session(
        "checkpoint({\
         left: { description: \"L\" },\
         right: { description: \"R\", expression: \"a < b\" } }, \"split\");\n\
         var a = 1;",
        json!({}),
    );
    session.step().unwrap();
    let payload = session.take_checkpoint().expect("checkpoint missing");
    assert_eq!(payload.id.as_deref(), Some("split"));
    assert_eq!(payload.targets.len(), 2);
    assert_eq!(payload.target("left").unwrap().description, "L");
    assert_eq!(
        payload.target("right").unwrap().expression.as_deref(),
        Some("a < b")
    );
    assert!(payload.target("other").is_none());
}

#[test]
fn test_malformed_checkpoint_is_dropped() {
    let mut session = wrapped_session("checkpoint(5);\nvar a = 1;", json!({}));
    assert!(session.step().unwrap());
    assert!(session.take_checkpoint().is_none());
    session.run().expect("stepping continues after a bad checkpoint");
}

#[test]
fn test_renamed_bridge_functions() {
    let config = EngineConfig {
        bridge: BridgeConfig {
            checkpoint_function: "mark".to_string(),
            bindings_name: "input".to_string(),
            ..BridgeConfig::default()
        },
        ..EngineConfig::default()
    };
    let source = ProgramSource::from_body("mark({ description: input.label });", "input");
    let mut session =
        Session::create(&source.wrapped, &bindings(json!({ "label": "hi" })), &config).unwrap();
    session.step().unwrap();
    let payload = session.take_checkpoint().unwrap();
    assert_eq!(payload.target("").unwrap().description, "hi");
}

#[test]
fn test_conflicting_bridge_names() {
    let config = EngineConfig {
        bridge: BridgeConfig {
            inert_functions: vec!["checkpoint".to_string()],
            ..BridgeConfig::default()
        },
        ..EngineConfig::default()
    };
    let err = Session::create("var a = 1;", &Map::new(), &config).err().unwrap();
    assert!(matches!(err, SessionError::Bridge(_)));
}

#[test]
fn test_snapshot_values_convert_to_json() {
    let session_source =
        "var o = { a: [1, 2.5], s: \"x\", n: null, f: function g() {} };\nvar z = 0;";
    let mut session =
        Session::create(session_source, &Map::new(), &EngineConfig::default()).unwrap();
    session.step().unwrap();

    let snapshot = stepwise::snapshot::extract(&session, &["o".to_string(), "z".to_string()]);
    assert_eq!(
        snapshot.get("o"),
        Some(&json!({ "a": [1, 2.5], "s": "x", "n": null, "f": "[Function g]" }))
    );
    // Hoisted but not yet assigned
    assert_eq!(snapshot.get("z"), Some(&json!(null)));
}
