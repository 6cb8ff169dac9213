use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use duet_core::{Configuration, Status};
use duet_endpoint::local::LocalEndpoint;
use duet_endpoint::test_support::LocalConnector;
use tempfile::tempdir;
use tokio::time::timeout;

use super::*;

fn config(dir: &std::path::Path) -> ManagerConfig {
    ManagerConfig {
        sessions_dir: dir.join("sessions"),
        archives_dir: dir.join("archives"),
    }
}

async fn wait_until<F: Fn(&State) -> bool>(manager: &Manager, selector: &Selector, predicate: F) -> State {
    timeout(Duration::from_secs(5), async {
        loop {
            let states = manager.list(selector).unwrap();
            if let Some(state) = states.into_iter().find(|s| predicate(s)) {
                return state;
            }
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("timed out waiting for expected state")
}

#[tokio::test(flavor = "multi_thread")]
async fn create_persists_session_and_starts_the_controller() {
    let tmp = tempdir().unwrap();
    let connector = Arc::new(LocalConnector::new());
    connector.register("alpha", LocalEndpoint::empty(true));
    connector.register("beta", LocalEndpoint::empty(true));

    let manager = Manager::new(config(tmp.path()), connector);
    let id = manager
        .create("alpha", "beta", Configuration::default(), "demo", BTreeMap::new(), 1_000)
        .await
        .unwrap();

    assert!(duet_storage::read_session(&manager.config.session_path(&id))
        .unwrap()
        .is_some());

    let selector = Selector::names([id.as_str().to_string()]);
    wait_until(&manager, &selector, |s| s.successful_cycles >= 1).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn list_all_returns_every_created_session() {
    let tmp = tempdir().unwrap();
    let connector = Arc::new(LocalConnector::new());
    connector.register("alpha-a", LocalEndpoint::empty(true));
    connector.register("beta-a", LocalEndpoint::empty(true));
    connector.register("alpha-b", LocalEndpoint::empty(true));
    connector.register("beta-b", LocalEndpoint::empty(true));

    let manager = Manager::new(config(tmp.path()), connector);
    manager
        .create("alpha-a", "beta-a", Configuration::default(), "a", BTreeMap::new(), 1_000)
        .await
        .unwrap();
    manager
        .create("alpha-b", "beta-b", Configuration::default(), "b", BTreeMap::new(), 1_000)
        .await
        .unwrap();

    assert_eq!(manager.list(&Selector::All).unwrap().len(), 2);
    assert_eq!(manager.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn label_selector_matches_only_sessions_with_the_label() {
    let tmp = tempdir().unwrap();
    let connector = Arc::new(LocalConnector::new());
    connector.register("alpha-a", LocalEndpoint::empty(true));
    connector.register("beta-a", LocalEndpoint::empty(true));
    connector.register("alpha-b", LocalEndpoint::empty(true));
    connector.register("beta-b", LocalEndpoint::empty(true));

    let manager = Manager::new(config(tmp.path()), connector);
    let mut prod_labels = BTreeMap::new();
    prod_labels.insert("env".to_string(), "prod".to_string());
    manager
        .create("alpha-a", "beta-a", Configuration::default(), "a", prod_labels, 1_000)
        .await
        .unwrap();
    manager
        .create("alpha-b", "beta-b", Configuration::default(), "b", BTreeMap::new(), 1_000)
        .await
        .unwrap();

    let selector = Selector::parse_labels("env=prod").unwrap();
    let matched = manager.list(&selector).unwrap();
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].session.name, "a");
}

#[tokio::test(flavor = "multi_thread")]
async fn selecting_an_unknown_name_errors() {
    let tmp = tempdir().unwrap();
    let connector = Arc::new(LocalConnector::new());
    let manager = Manager::new(config(tmp.path()), connector);

    let result = manager.list(&Selector::names(["nonexistent"]));
    assert!(matches!(result, Err(ManagerError::NoMatch(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn selecting_by_label_with_no_matches_errors() {
    let tmp = tempdir().unwrap();
    let connector = Arc::new(LocalConnector::new());
    let manager = Manager::new(config(tmp.path()), connector);

    let selector = Selector::parse_labels("env=prod").unwrap();
    assert!(matches!(manager.list(&selector), Err(ManagerError::NoMatch(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn pause_then_resume_round_trips_through_disk() {
    let tmp = tempdir().unwrap();
    let connector = Arc::new(LocalConnector::new());
    connector.register("alpha", LocalEndpoint::empty(true));
    connector.register("beta", LocalEndpoint::empty(true));

    let manager = Manager::new(config(tmp.path()), connector);
    let id = manager
        .create("alpha", "beta", Configuration::default(), "demo", BTreeMap::new(), 1_000)
        .await
        .unwrap();
    let selector = Selector::names([id.as_str().to_string()]);
    wait_until(&manager, &selector, |s| s.successful_cycles >= 1).await;

    manager.pause(&selector).await.unwrap();
    let persisted = duet_storage::read_session(&manager.config.session_path(&id))
        .unwrap()
        .unwrap();
    assert!(persisted.paused);

    manager.resume(&selector).await.unwrap();
    let persisted = duet_storage::read_session(&manager.config.session_path(&id))
        .unwrap()
        .unwrap();
    assert!(!persisted.paused);
}

#[tokio::test(flavor = "multi_thread")]
async fn terminate_removes_session_from_registry_and_deletes_files() {
    let tmp = tempdir().unwrap();
    let connector = Arc::new(LocalConnector::new());
    connector.register("alpha", LocalEndpoint::empty(true));
    connector.register("beta", LocalEndpoint::empty(true));

    let manager = Manager::new(config(tmp.path()), connector);
    let id = manager
        .create("alpha", "beta", Configuration::default(), "demo", BTreeMap::new(), 1_000)
        .await
        .unwrap();
    let selector = Selector::names([id.as_str().to_string()]);
    wait_until(&manager, &selector, |s| s.successful_cycles >= 1).await;

    manager.terminate(&Selector::All).await.unwrap();

    assert!(manager.is_empty());
    assert!(!manager.config.session_path(&id).exists());
    assert!(!manager.config.archive_path(&id).exists());
    assert!(matches!(manager.list(&Selector::All), Err(ManagerError::NoMatch(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn load_resumes_sessions_not_left_paused() {
    let tmp = tempdir().unwrap();
    let cfg = config(tmp.path());
    let connector = Arc::new(LocalConnector::new());
    connector.register("alpha", LocalEndpoint::empty(true));
    connector.register("beta", LocalEndpoint::empty(true));

    {
        let manager = Manager::new(cfg.clone(), Arc::clone(&connector));
        manager
            .create("alpha", "beta", Configuration::default(), "demo", BTreeMap::new(), 1_000)
            .await
            .unwrap();
    }

    let manager = Manager::load(cfg, connector).await.unwrap();
    assert_eq!(manager.len(), 1);
    wait_until(&manager, &Selector::All, |s| s.status == Status::Watching).await;
}
