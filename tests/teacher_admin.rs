mod common;

use classtrackd::error::EngineError;
use classtrackd::models::{GlobalData, Role};
use common::*;
use std::time::Duration;

fn school() -> GlobalData {
    GlobalData {
        teachers: vec![teacher("t-admin", "Anna Admin", Role::Admin)],
        classes: Vec::new(),
        matches: Vec::new(),
        attendance: Vec::new(),
    }
}

#[tokio::test]
async fn creating_a_teacher_writes_through_immediately() {
    let h = harness(school(), Duration::from_secs(3600));
    let admin = school().teachers[0].clone();
    h.engine.login(admin).await.expect("login");

    let new_teacher = teacher("t-new", "Boris Teacher", Role::Teacher);
    h.engine
        .create_teacher(new_teacher.clone())
        .await
        .expect("create teacher");

    let pushes = h.remote.pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(
        pushes[0].teacher.as_ref().map(|t| t.id.as_str()),
        Some("t-new")
    );
    assert!(pushes[0].classes.is_none(), "only the teacher is sent");

    assert!(h.remote.data().teachers.iter().any(|t| t.id == "t-new"));
    assert!(h
        .engine
        .view()
        .await
        .global
        .teachers
        .iter()
        .any(|t| t.id == "t-new"));
}

#[tokio::test]
async fn a_duplicate_teacher_id_is_rejected_before_any_push() {
    let h = harness(school(), Duration::from_secs(3600));
    let admin = school().teachers[0].clone();
    h.engine.login(admin.clone()).await.expect("login");

    let duplicate = teacher("t-admin", "Impostor", Role::Teacher);
    assert!(matches!(
        h.engine.create_teacher(duplicate).await,
        Err(EngineError::Validation(_))
    ));
    assert_eq!(h.remote.push_count(), 0);
}

#[tokio::test]
async fn updating_the_logged_in_teacher_refreshes_the_session_profile() {
    let h = harness(school(), Duration::from_secs(3600));
    let admin = school().teachers[0].clone();
    h.engine.login(admin.clone()).await.expect("login");

    let mut updated = admin;
    updated.email = "new@school.test".to_string();
    h.engine.update_teacher(updated).await.expect("update");

    let view = h.engine.view().await;
    assert_eq!(
        view.teacher.as_ref().map(|t| t.email.as_str()),
        Some("new@school.test")
    );
}

#[tokio::test]
async fn deleting_a_teacher_uses_the_dedicated_remote_call() {
    let mut data = school();
    data.teachers.push(teacher("t-old", "Old Teacher", Role::Teacher));
    let h = harness(data, Duration::from_secs(3600));
    let admin = school().teachers[0].clone();
    h.engine.login(admin).await.expect("login");

    h.engine.delete_teacher("t-old").await.expect("delete");

    assert_eq!(h.remote.deleted_teacher_ids(), vec!["t-old".to_string()]);
    assert!(h.remote.data().teachers.iter().all(|t| t.id != "t-old"));
    assert!(h
        .engine
        .view()
        .await
        .global
        .teachers
        .iter()
        .all(|t| t.id != "t-old"));
}
