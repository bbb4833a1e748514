mod common;

use classtrackd::models::{GlobalData, Role};
use common::*;
use std::collections::HashSet;
use std::time::Duration;

fn two_classes() -> GlobalData {
    let admin = teacher("t-admin", "Anna Admin", Role::Admin);
    let mut c1 = class("c1", "5А", Some("t-admin"));
    c1.students.push(student("s1", "Иванов Иван"));
    let c2 = class("c2", "6Б", None);
    GlobalData {
        teachers: vec![admin],
        classes: vec![c1, c2],
        matches: Vec::new(),
        attendance: Vec::new(),
    }
}

#[tokio::test]
async fn a_local_delete_is_never_resurrected_by_the_merge() {
    let h = harness(two_classes(), Duration::from_secs(30));
    let admin = two_classes().teachers[0].clone();
    h.engine.login(admin).await.expect("login");

    let kept: Vec<_> = h
        .engine
        .view()
        .await
        .classes
        .into_iter()
        .filter(|c| c.id != "c2")
        .collect();
    h.engine.set_classes(kept).await.expect("set classes");
    h.engine.run_sync_cycle().await;

    let remote = h.remote.data();
    assert_eq!(remote.classes.len(), 1);
    assert_eq!(remote.classes[0].id, "c1");

    // A later unrelated edit must not bring c2 back.
    let mut classes = h.engine.view().await.classes;
    classes[0].name = "5А*".to_string();
    h.engine.set_classes(classes).await.expect("set classes");
    h.engine.run_sync_cycle().await;

    let remote = h.remote.data();
    assert_eq!(remote.classes.len(), 1);
    assert_eq!(remote.classes[0].name, "5А*");
}

#[tokio::test]
async fn merged_output_has_no_duplicate_ids() {
    let h = harness(two_classes(), Duration::from_secs(30));
    let admin = two_classes().teachers[0].clone();
    h.engine.login(admin).await.expect("login");

    for suffix in ["a", "b", "c"] {
        let mut classes = h.engine.view().await.classes;
        classes[0].name = format!("5А-{}", suffix);
        h.engine.set_classes(classes).await.expect("set classes");
        h.engine.run_sync_cycle().await;
    }

    let remote = h.remote.data();
    let ids: HashSet<_> = remote.classes.iter().map(|c| c.id.clone()).collect();
    assert_eq!(ids.len(), remote.classes.len());
    assert_eq!(remote.classes.len(), 2);
}

#[tokio::test]
async fn an_unchanged_dataset_is_not_pushed() {
    let h = harness(two_classes(), Duration::from_secs(30));
    let admin = two_classes().teachers[0].clone();
    h.engine.login(admin).await.expect("login");

    // Re-setting identical collections dirties the engine but produces a
    // merged dataset equal to the held global data.
    let classes = h.engine.view().await.classes;
    h.engine.set_classes(classes).await.expect("set classes");
    h.engine.run_sync_cycle().await;

    assert_eq!(h.remote.push_count(), 0);
    assert_eq!(h.engine.view().await.phase, "idle");
}

#[tokio::test]
async fn a_failed_push_is_retried_on_the_next_cycle() {
    let h = harness(two_classes(), Duration::from_secs(30));
    let admin = two_classes().teachers[0].clone();
    h.engine.login(admin).await.expect("login");

    h.remote.set_fail_push(true);
    let mut classes = h.engine.view().await.classes;
    classes[0].name = "5А*".to_string();
    h.engine.set_classes(classes).await.expect("set classes");
    h.engine.run_sync_cycle().await;

    assert!(h.engine.view().await.last_sync_error.is_some());
    assert_eq!(h.remote.data().classes[0].name, "5А");

    h.remote.set_fail_push(false);
    let classes = h.engine.view().await.classes;
    h.engine.set_classes(classes).await.expect("set classes");
    h.engine.run_sync_cycle().await;

    assert_eq!(h.remote.data().classes[0].name, "5А*");
    assert!(h.engine.view().await.last_sync_error.is_none());
}
