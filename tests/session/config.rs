//! Connection properties loaded from files

use crate::common::*;
use std::io::Write;
use strata_thenable::prelude::*;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_properties_file() {
    let file = write_config(
        r#"
        implementation = "memory"
        host = "db.internal"
        port = 3307
        user = "strata_test"
        password = "strata_pw"
        database = "agents"
        "#,
    );

    let props = ConnectionProperties::load(file.path()).unwrap();
    assert_eq!(props.address(), "db.internal:3307");
    assert_eq!(props.database, "agents");
}

#[test]
fn test_builder_defaults_from_file() {
    init_tracing();
    let file = write_config(
        r#"
        user = "strata_test"
        password = "strata_pw"
        "#,
    );

    let strata = Strata::builder()
        .factory(test_factory())
        .queue(TaskQueue::new())
        .properties_file(file.path())
        .unwrap()
        .build();

    let promise = strata.open_default_session();
    let session = promise.outcome().unwrap().unwrap().into_session().unwrap();
    assert_eq!(session.user(), "strata_test");
    assert_eq!(session.database(), "test");
}

#[test]
fn test_malformed_file_is_config_error() {
    let file = write_config("port = [");
    let err = ConnectionProperties::load(file.path()).unwrap_err();
    assert!(matches!(err, Error::Config(_)));

    let err = Strata::builder().properties_file(file.path()).err().unwrap();
    assert!(matches!(err, Error::Config(_)));
}
