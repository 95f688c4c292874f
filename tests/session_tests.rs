//! Session lifecycle through the service surface.

use tofuhub::domain::InputValues;
use tofuhub::error::Error;
use tofuhub::testkit::catalog::StaticCatalog;
use tofuhub::testkit::domain::{access_token, agent, input, package};
use tofuhub::testkit::service::ServiceBuilder;

use serde_json::json;

fn catalog() -> StaticCatalog {
    StaticCatalog::new()
        .with_package(
            "do-network",
            package(
                "do-network",
                &[("do_token", access_token()), ("vpc_name", input("vpc"))],
            ),
        )
        .with_package(
            "do-cluster",
            agent("do-cluster", &[("droplet_name", input("droplet"))]),
        )
}

#[tokio::test]
async fn init_keeps_package_order_and_merges_variables() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _) = ServiceBuilder::new(dir.path()).catalog(catalog()).build();

    let session = service
        .init_session(&["do-cluster".into(), "do-network".into()])
        .await
        .unwrap();

    let names: Vec<_> = session.steps.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["do-cluster", "do-network"]);
    assert_eq!(
        session.variables.keys().collect::<Vec<_>>(),
        ["do_token", "droplet_name", "vpc_name"]
    );
    assert_eq!(service.get_state(), session);
}

#[tokio::test]
async fn duplicate_variable_rejects_the_whole_session() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = catalog().with_package(
        "do-network-copy",
        package("do-network-copy", &[("vpc_name", input("vpc"))]),
    );
    let (service, _) = ServiceBuilder::new(dir.path()).catalog(catalog).build();

    let err = service
        .init_session(&["do-network".into(), "do-network-copy".into()])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Conflict { ref key } if key == "vpc_name"));
    assert!(err.to_string().contains("\"vpc_name\""));
    assert!(service.get_state().is_empty());
}

#[tokio::test]
async fn failed_lookup_leaves_no_partial_session() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _) = ServiceBuilder::new(dir.path())
        .catalog(catalog().with_failure("do-cluster"))
        .build();

    let err = service
        .init_session(&["do-network".into(), "do-cluster".into()])
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Lookup { ref target, .. } if target == "do-cluster"));
    assert!(service.get_state().steps.is_empty());
}

#[tokio::test]
async fn inputs_are_replaced_and_cleared_by_reset() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _) = ServiceBuilder::new(dir.path()).catalog(catalog()).build();
    service.init_session(&["do-network".into()]).await.unwrap();

    service
        .set_inputs(InputValues::from([("vpc_name".to_string(), json!("a"))]))
        .unwrap();
    let state = service
        .set_inputs(InputValues::from([("do_token".to_string(), json!("t"))]))
        .unwrap();
    assert_eq!(state.inputs.len(), 1);
    assert_eq!(state.inputs["do_token"], "t");

    let state = service.reset_session().unwrap();
    assert!(state.is_empty());
    assert!(service.get_state().inputs.is_empty());
}

#[tokio::test]
async fn reinit_replaces_previous_session() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _) = ServiceBuilder::new(dir.path()).catalog(catalog()).build();

    service.init_session(&["do-network".into()]).await.unwrap();
    service
        .set_inputs(InputValues::from([("vpc_name".to_string(), json!("a"))]))
        .unwrap();
    let session = service.init_session(&["do-cluster".into()]).await.unwrap();

    assert_eq!(session.steps.len(), 1);
    assert!(session.inputs.is_empty());
    assert!(!session.variables.contains_key("vpc_name"));
}
