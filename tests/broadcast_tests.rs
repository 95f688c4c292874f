//! Output fan-out from running steps to observers.

use std::sync::Arc;

use tofuhub::application::LogBroadcaster;
use tofuhub::domain::{InputValues, ResourceKind};
use tofuhub::port::LogSink;
use tofuhub::testkit::backend::{RecordingSink, ScriptedBackend};
use tofuhub::testkit::catalog::StaticCatalog;
use tofuhub::testkit::domain::{access_token, input, package};
use tofuhub::testkit::provider::FakeProvider;
use tofuhub::testkit::service::ServiceBuilder;

use serde_json::json;

fn catalog() -> StaticCatalog {
    StaticCatalog::new()
        .with_package("first", package("first", &[("token", access_token())]))
        .with_package("second", package("second", &[("db", input("database"))]))
}

#[tokio::test]
async fn observers_see_step_output_in_order_with_exit_notices() {
    let dir = tempfile::tempdir().unwrap();
    let backend = ScriptedBackend::new()
        .with_output("first", &["planning...\n", "apply complete\n"])
        .with_output("second", &["db ready\n"]);
    let (service, _) = ServiceBuilder::new(dir.path())
        .catalog(catalog())
        .backend(backend)
        .build();
    service
        .init_session(&["first".into(), "second".into()])
        .await
        .unwrap();
    service
        .set_inputs(InputValues::from([("token".to_string(), json!("t"))]))
        .unwrap();

    let mut observer = service.broadcaster().attach();
    let sink = Arc::new(RecordingSink::new());
    service.broadcaster().attach_sink(sink.clone());

    service.run().await.unwrap();

    let expected = [
        "planning...\n",
        "apply complete\n",
        "[container exited with code 0]\n",
        "db ready\n",
        "[container exited with code 0]\n",
    ];
    assert_eq!(observer.drain(), expected);
    assert_eq!(sink.chunks(), expected);
}

#[tokio::test]
async fn aborted_run_is_announced() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _) = ServiceBuilder::new(dir.path())
        .catalog(catalog())
        .provider(FakeProvider::new().with_existing(ResourceKind::Database, "main"))
        .build();
    service
        .init_session(&["first".into(), "second".into()])
        .await
        .unwrap();
    service
        .set_inputs(InputValues::from([
            ("token".to_string(), json!("t")),
            ("db".to_string(), json!("main")),
        ]))
        .unwrap();

    let mut observer = service.broadcaster().attach();
    assert!(service.run().await.is_err());

    let chunks = observer.drain();
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].starts_with("[run aborted:"));
    assert!(chunks[0].contains("db: Resource already exists: main"));
}

#[tokio::test]
async fn dropped_observer_is_pruned_and_others_keep_receiving() {
    let broadcaster = LogBroadcaster::new();
    let mut kept = broadcaster.attach();
    let dropped = broadcaster.attach();
    assert_eq!(broadcaster.observer_count(), 2);

    drop(dropped);
    broadcaster.broadcast("hello\n");

    assert_eq!(broadcaster.observer_count(), 1);
    assert_eq!(kept.recv().await.as_deref(), Some("hello\n"));
}

struct Panicking;

impl LogSink for Panicking {
    fn emit(&self, _chunk: &str) {
        panic!("observer bug");
    }
}

#[test]
fn panicking_sink_does_not_starve_others() {
    let broadcaster = LogBroadcaster::new();
    broadcaster.attach_sink(Arc::new(Panicking));
    let sink = Arc::new(RecordingSink::new());
    broadcaster.attach_sink(sink.clone());

    broadcaster.broadcast("a");
    broadcaster.broadcast("b");

    assert_eq!(sink.text(), "ab");
    assert_eq!(broadcaster.observer_count(), 2);
}

#[test]
fn detached_sink_receives_nothing_more() {
    let broadcaster = LogBroadcaster::new();
    let sink = Arc::new(RecordingSink::new());
    let id = broadcaster.attach_sink(sink.clone());

    broadcaster.broadcast("before");
    assert!(broadcaster.detach(id));
    assert!(!broadcaster.detach(id));
    broadcaster.broadcast("after");

    assert_eq!(sink.chunks(), ["before"]);
}

#[test]
fn broadcasting_without_observers_is_a_no_op() {
    let broadcaster = LogBroadcaster::new();
    broadcaster.broadcast("nobody listens");
    assert_eq!(broadcaster.observer_count(), 0);
}
