use std::io::Write;
use std::time::Duration;

use peerlink::script::ScriptOptions;
use peerlink_cli::{load_objects, run_script, CliError};
use serde_json::json;

fn file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn objects_default_to_an_empty_tree() {
    assert_eq!(load_objects(None).unwrap(), json!({}));
}

#[test]
fn objects_are_read_from_json() {
    let tree = file(r#"{"settings": {"volume": 3}}"#);
    assert_eq!(
        load_objects(Some(tree.path())).unwrap(),
        json!({"settings": {"volume": 3}})
    );
}

#[test]
fn malformed_objects_are_rejected() {
    let tree = file("{ nope");
    assert!(matches!(
        load_objects(Some(tree.path())),
        Err(CliError::Json(_))
    ));
}

#[test]
fn missing_script_is_a_read_error() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let result = runtime.block_on(run_script(
        std::path::Path::new("/definitely/not/here.lua"),
        json!({}),
        ScriptOptions::default(),
        Duration::ZERO,
    ));
    assert!(matches!(result, Err(CliError::Read { .. })));
}

#[test]
fn script_outcome_sets_the_result() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let ok = file(r#"log(call("echo", get("name")))"#);
    let failing = file(r#"call("no.such.function")"#);

    let run = |path| {
        runtime.block_on(run_script(
            path,
            json!({"name": "demo"}),
            ScriptOptions::default(),
            Duration::ZERO,
        ))
    };
    assert!(run(ok.path()).is_ok());
    assert!(matches!(run(failing.path()), Err(CliError::ScriptFailed)));
}
