//! Host bridge installed into every session before execution
//!
//! - a frozen `bindings` object built from the caller's input map
//! - the checkpoint function
//! - inert stand-ins for plotting/recording hooks
//! - a function returning the bindings as JSON text

use crate::config::BridgeConfig;
use crate::errors::SessionError;
use crate::interpreter::{HostFn, Interpreter, RuntimeError};
use crate::memory::value::Value;
use crate::session::checkpoint::{self, CheckpointPayload};
use rustc_hash::FxHashSet;
use serde_json::Map;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

/// Checkpoint captured during the current advance, shared with the host function
pub(crate) type PendingCheckpoint = Rc<RefCell<Option<CheckpointPayload>>>;

pub(crate) fn install(
    interp: &mut Interpreter,
    bindings: &Map<String, serde_json::Value>,
    config: &BridgeConfig,
    pending: PendingCheckpoint,
) -> Result<(), SessionError> {
    check_names(config)?;

    let object = interp.from_native(&serde_json::Value::Object(bindings.clone()));
    interp.deep_freeze(&object);
    interp.define_global(&config.bindings_name, object);

    let capture: HostFn = Rc::new(
        move |interp: &mut Interpreter, args: &[Value]| -> Result<Value, RuntimeError> {
            match checkpoint::parse_call(interp, args) {
                Ok(payload) => *pending.borrow_mut() = Some(payload),
                Err(err) => debug!(%err, "dropping malformed checkpoint"),
            }
            Ok(Value::Undefined)
        },
    );
    interp.define_host_function(&config.checkpoint_function, capture);

    let inert: HostFn = Rc::new(
        |_: &mut Interpreter, _: &[Value]| -> Result<Value, RuntimeError> { Ok(Value::Undefined) },
    );
    for name in &config.inert_functions {
        interp.define_host_function(name, Rc::clone(&inert));
    }

    let text = serde_json::to_string(bindings)
        .map_err(|err| SessionError::Bridge(format!("cannot serialize bindings: {err}")))?;
    interp.define_host_function(
        &config.bindings_json_function,
        Rc::new(move |_: &mut Interpreter, _: &[Value]| -> Result<Value, RuntimeError> {
            Ok(Value::String(text.clone()))
        }),
    );

    Ok(())
}

/// Every injected name must be unique
fn check_names(config: &BridgeConfig) -> Result<(), SessionError> {
    let mut seen = FxHashSet::default();
    let names = [
        &config.bindings_name,
        &config.checkpoint_function,
        &config.bindings_json_function,
    ]
    .into_iter()
    .chain(config.inert_functions.iter());

    for name in names {
        if name.trim().is_empty() {
            return Err(SessionError::Bridge("empty bridge name".to_string()));
        }
        if !seen.insert(name.as_str()) {
            return Err(SessionError::Bridge(format!(
                "bridge name `{name}` is used twice"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::scope::Scopes;
    use serde_json::json;

    fn bindings() -> Map<String, serde_json::Value> {
        match json!({ "n": 3, "xs": [1, 2] }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn setup(source: &str) -> (Interpreter, PendingCheckpoint) {
        let mut interp = Interpreter::from_source(source).unwrap();
        let pending = PendingCheckpoint::default();
        install(&mut interp, &bindings(), &BridgeConfig::default(), pending.clone()).unwrap();
        (interp, pending)
    }

    fn run(interp: &mut Interpreter) -> Result<(), RuntimeError> {
        while !interp.step()?.finished {}
        Ok(())
    }

    #[test]
    fn test_bindings_are_read_only() {
        let (mut interp, _) = setup("var n = bindings.n;\nbindings.xs.push(3);");
        let err = run(&mut interp).unwrap_err();
        assert!(matches!(err, RuntimeError::ReadOnlyProperty { .. }));
        assert_eq!(
            interp.scopes().lookup(Scopes::GLOBAL, "n"),
            Ok(Value::Number(3.0))
        );
    }

    #[test]
    fn test_bindings_json_round_trips() {
        let (mut interp, _) =
            setup("var copy = JSON.parse(bindingsJson());\ncopy.n = 4;\nvar n = copy.n;");
        run(&mut interp).unwrap();
        assert_eq!(
            interp.scopes().lookup(Scopes::GLOBAL, "n"),
            Ok(Value::Number(4.0))
        );
    }

    #[test]
    fn test_checkpoint_is_stashed() {
        let (mut interp, pending) =
            setup("checkpoint({ description: \"d\" }, \"c1\");\nplot(1, 2);\nrecord();");
        run(&mut interp).unwrap();
        let payload = pending.borrow_mut().take().unwrap();
        assert_eq!(payload.id.as_deref(), Some("c1"));
    }

    #[test]
    fn test_malformed_checkpoint_continues() {
        let (mut interp, pending) = setup("checkpoint(5);\nvar after = 1;");
        run(&mut interp).unwrap();
        assert!(pending.borrow().is_none());
        assert_eq!(
            interp.scopes().lookup(Scopes::GLOBAL, "after"),
            Ok(Value::Number(1.0))
        );
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut interp = Interpreter::from_source("").unwrap();
        let config = BridgeConfig {
            inert_functions: vec!["checkpoint".to_string()],
            ..BridgeConfig::default()
        };
        let err = install(&mut interp, &Map::new(), &config, PendingCheckpoint::default())
            .unwrap_err();
        assert!(matches!(err, SessionError::Bridge(_)));
    }

    #[test]
    fn test_json_bindings_keep_key_order() {
        let (interp, _) = setup("");
        let bindings = interp.scopes().lookup(Scopes::GLOBAL, "bindings").unwrap();
        assert_eq!(interp.to_native(&bindings).unwrap(), json!({ "n": 3, "xs": [1, 2] }));
    }
}
