//! # Command processor
//!
//! Translates a [`CommandRequest`] into a [`CommandResponse`] by validating
//! arity and argument format, invoking the matching [`Store`] method, and
//! encoding the result as text. Grounded on
//! `original_source/goodies/processor.go`'s `goodiesCommandProcessor`: one
//! handler function per command, registered into a name → handler table at
//! construction, case-sensitive and 1:1 with the engine's operations.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use goodies_common::{CommandRequest, CommandResponse, GoodiesError};

use crate::store::Store;
use crate::value::Ttl;

type Handler = fn(&Store, &[String]) -> Result<String, GoodiesError>;

/// Dispatches named commands to the storage engine.
///
/// The handler table is built once at construction and never mutated
/// afterward, matching the teacher's and the Go source's "fixed at
/// construction" dispatch table. The store is held behind an `Arc` so a
/// [`crate::persist::Persister`] can be spawned against the same instance
/// the processor dispatches against.
pub struct CommandProcessor {
    store: Arc<Store>,
    handlers: Vec<(&'static str, Handler)>,
}

impl CommandProcessor {
    pub fn new(store: Arc<Store>) -> Self {
        let handlers: Vec<(&'static str, Handler)> = vec![
            ("Set", handle_set),
            ("Get", handle_get),
            ("Update", handle_update),
            ("Remove", handle_remove),
            ("Keys", handle_keys),
            ("ListPush", handle_list_push),
            ("ListLen", handle_list_len),
            ("ListGetByIndex", handle_list_get_by_index),
            ("ListRemoveIndex", handle_list_remove_index),
            ("ListRemoveValue", handle_list_remove_value),
            ("DictSet", handle_dict_set),
            ("DictGet", handle_dict_get),
            ("DictRemove", handle_dict_remove),
            ("DictHasKey", handle_dict_has_key),
            ("SetExpiry", handle_set_expiry),
        ];
        CommandProcessor { store, handlers }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Processes one request end to end, never panicking: a panic inside a
    /// handler is caught at this boundary and converted to
    /// [`GoodiesError::Internal`] (SPEC_FULL.md §4.4/§9).
    pub fn process(&self, req: &CommandRequest) -> CommandResponse {
        let Some((_, handler)) = self.handlers.iter().find(|(name, _)| *name == req.name) else {
            return CommandResponse::err(GoodiesError::UnknownCommand(req.name.clone()));
        };

        let store: &Store = &self.store;
        let params = &req.parameters;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(store, params)));

        match outcome {
            Ok(Ok(result)) => CommandResponse::ok(result),
            Ok(Err(err)) => CommandResponse::err(err),
            Err(_) => {
                tracing::error!(command = %req.name, "handler panicked");
                CommandResponse::err(GoodiesError::Internal(
                    "command handler panicked".to_string(),
                ))
            }
        }
    }
}

fn arity_error(command: &str, expected: &str) -> GoodiesError {
    GoodiesError::ArgumentsMismatch(format!(
        "{command} command is expected to have {expected}"
    ))
}

fn require_arity(command: &str, params: &[String], n: usize, expected: &str) -> Result<(), GoodiesError> {
    if params.len() != n {
        Err(arity_error(command, expected))
    } else {
        Ok(())
    }
}

fn parse_ttl(command: &str, text: &str) -> Result<Ttl, GoodiesError> {
    Ttl::parse(text).ok_or_else(|| {
        GoodiesError::ArgumentsMismatch(format!(
            "{command} command expects ttl as an integer number of seconds (-1 never, -2 default)"
        ))
    })
}

fn parse_index(command: &str, text: &str) -> Result<i64, GoodiesError> {
    text.parse::<i64>().map_err(|_| {
        GoodiesError::ArgumentsMismatch(format!(
            "{command} command expects index as an integer"
        ))
    })
}

fn handle_set(store: &Store, params: &[String]) -> Result<String, GoodiesError> {
    require_arity("Set", params, 3, "3 arguments (key, value, ttl)")?;
    let ttl = parse_ttl("Set", &params[2])?;
    store.set(&params[0], params[1].clone(), ttl);
    Ok(params[1].clone())
}

fn handle_get(store: &Store, params: &[String]) -> Result<String, GoodiesError> {
    require_arity("Get", params, 1, "1 argument (key)")?;
    store.get(&params[0])
}

fn handle_update(store: &Store, params: &[String]) -> Result<String, GoodiesError> {
    require_arity("Update", params, 3, "3 arguments (key, value, ttl)")?;
    let ttl = parse_ttl("Update", &params[2])?;
    store.update(&params[0], params[1].clone(), ttl)?;
    Ok(String::new())
}

fn handle_remove(store: &Store, params: &[String]) -> Result<String, GoodiesError> {
    require_arity("Remove", params, 1, "1 argument (key)")?;
    store.remove(&params[0]);
    Ok(String::new())
}

fn handle_keys(store: &Store, params: &[String]) -> Result<String, GoodiesError> {
    require_arity("Keys", params, 0, "0 arguments")?;
    Ok(store.keys().join(":"))
}

fn handle_list_push(store: &Store, params: &[String]) -> Result<String, GoodiesError> {
    require_arity("ListPush", params, 2, "2 arguments (key, value)")?;
    store.list_push(&params[0], params[1].clone())?;
    Ok(String::new())
}

fn handle_list_len(store: &Store, params: &[String]) -> Result<String, GoodiesError> {
    require_arity("ListLen", params, 1, "1 argument (key)")?;
    Ok(store.list_len(&params[0])?.to_string())
}

fn handle_list_get_by_index(store: &Store, params: &[String]) -> Result<String, GoodiesError> {
    require_arity("ListGetByIndex", params, 2, "2 arguments (key, index)")?;
    let index = parse_index("ListGetByIndex", &params[1])?;
    store.list_get_by_index(&params[0], index)
}

fn handle_list_remove_index(store: &Store, params: &[String]) -> Result<String, GoodiesError> {
    require_arity("ListRemoveIndex", params, 2, "2 arguments (key, index)")?;
    let index = parse_index("ListRemoveIndex", &params[1])?;
    store.list_remove_index(&params[0], index)?;
    Ok(String::new())
}

fn handle_list_remove_value(store: &Store, params: &[String]) -> Result<String, GoodiesError> {
    require_arity("ListRemoveValue", params, 2, "2 arguments (key, value)")?;
    store.list_remove_value(&params[0], &params[1])?;
    Ok(String::new())
}

fn handle_dict_set(store: &Store, params: &[String]) -> Result<String, GoodiesError> {
    require_arity("DictSet", params, 3, "3 arguments (key, dictKey, value)")?;
    store.dict_set(&params[0], &params[1], params[2].clone())?;
    Ok(String::new())
}

fn handle_dict_get(store: &Store, params: &[String]) -> Result<String, GoodiesError> {
    require_arity("DictGet", params, 2, "2 arguments (key, dictKey)")?;
    store.dict_get(&params[0], &params[1])
}

fn handle_dict_remove(store: &Store, params: &[String]) -> Result<String, GoodiesError> {
    require_arity("DictRemove", params, 2, "2 arguments (key, dictKey)")?;
    store.dict_remove(&params[0], &params[1])?;
    Ok(String::new())
}

fn handle_dict_has_key(store: &Store, params: &[String]) -> Result<String, GoodiesError> {
    require_arity("DictHasKey", params, 2, "2 arguments (key, dictKey)")?;
    let has = store.dict_has_key(&params[0], &params[1])?;
    Ok(if has { "1".to_string() } else { "0".to_string() })
}

fn handle_set_expiry(store: &Store, params: &[String]) -> Result<String, GoodiesError> {
    require_arity("SetExpiry", params, 2, "2 arguments (key, ttl)")?;
    let ttl = parse_ttl("SetExpiry", &params[1])?;
    store.set_expiry(&params[0], ttl)?;
    Ok(String::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn processor() -> CommandProcessor {
        CommandProcessor::new(Arc::new(Store::new(Duration::from_secs(30))))
    }

    fn req(name: &str, params: &[&str]) -> CommandRequest {
        CommandRequest::new(name, params.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn unknown_command_is_reported() {
        let p = processor();
        let res = p.process(&req("Frobnicate", &[]));
        assert!(!res.success);
        assert_eq!(res.error(), Some(GoodiesError::UnknownCommand("Frobnicate".into())));
    }

    #[test]
    fn set_then_get_end_to_end() {
        let p = processor();
        let res = p.process(&req("Set", &["test", "expected", "-1"]));
        assert!(res.success);
        let res = p.process(&req("Get", &["test"]));
        assert_eq!(res.result, "expected");
        let res = p.process(&req("Get", &["missing"]));
        assert_eq!(res.error(), Some(GoodiesError::NotFound("missing".into())));
    }

    #[test]
    fn set_wrong_arity_is_arguments_mismatch() {
        let p = processor();
        let res = p.process(&req("Set", &["only-one"]));
        assert!(matches!(res.error(), Some(GoodiesError::ArgumentsMismatch(_))));
    }

    #[test]
    fn list_index_must_be_integer() {
        let p = processor();
        p.process(&req("ListPush", &["L", "a"]));
        let res = p.process(&req("ListGetByIndex", &["L", "not-a-number"]));
        assert!(matches!(res.error(), Some(GoodiesError::ArgumentsMismatch(_))));
    }

    #[test]
    fn list_flow_matches_spec_scenario() {
        let p = processor();
        for v in ["a", "b", "c", "d"] {
            p.process(&req("ListPush", &["L", v]));
        }
        assert_eq!(p.process(&req("ListLen", &["L"])).result, "4");
        p.process(&req("ListRemoveIndex", &["L", "0"]));
        assert_eq!(p.process(&req("ListLen", &["L"])).result, "3");
        assert_eq!(p.process(&req("ListGetByIndex", &["L", "0"])).result, "b");
    }

    #[test]
    fn scalar_then_list_push_is_type_mismatch() {
        let p = processor();
        p.process(&req("Set", &["v", "s", "-1"]));
        let res = p.process(&req("ListPush", &["v", "x"]));
        assert!(matches!(res.error(), Some(GoodiesError::TypeMismatch(_))));
    }

    #[test]
    fn dict_flow_matches_spec_scenario() {
        let p = processor();
        p.process(&req("DictSet", &["d", "x", "1"]));
        assert_eq!(p.process(&req("DictHasKey", &["d", "x"])).result, "1");
        let res = p.process(&req("DictGet", &["d", "y"]));
        assert_eq!(res.error(), Some(GoodiesError::DictKeyNotFound("y".into())));

        p.process(&req("Set", &["d", "s", "-1"]));
        let res = p.process(&req("DictGet", &["d", "x"]));
        assert!(matches!(res.error(), Some(GoodiesError::TypeMismatch(_))));
    }

    #[test]
    fn keys_are_colon_joined() {
        let p = processor();
        p.process(&req("Set", &["a", "1", "-1"]));
        p.process(&req("Set", &["b", "2", "-1"]));
        let res = p.process(&req("Keys", &[]));
        let mut keys: Vec<&str> = res.result.split(':').collect();
        keys.sort();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn set_expiry_on_absent_key_is_not_found() {
        let p = processor();
        let res = p.process(&req("SetExpiry", &["missing", "5"]));
        assert_eq!(res.error(), Some(GoodiesError::NotFound("missing".into())));
    }

    #[test]
    fn invalid_ttl_sentinel_is_arguments_mismatch() {
        let p = processor();
        let res = p.process(&req("Set", &["k", "v", "-3"]));
        assert!(matches!(res.error(), Some(GoodiesError::ArgumentsMismatch(_))));
    }
}
