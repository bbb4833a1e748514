mod common;

use classtrackd::auth::Sha256Verifier;
use classtrackd::error::EngineError;
use classtrackd::models::{GlobalData, Role};
use common::*;
use std::time::Duration;

fn school() -> GlobalData {
    let admin = teacher("t-admin", "Anna Admin", Role::Admin);
    let mut no_password = teacher("t-ghost", "Ghost Account", Role::Teacher);
    no_password.password = None;
    let c1 = class("c1", "5А", Some("t-admin"));
    GlobalData {
        teachers: vec![admin, no_password],
        classes: vec![c1],
        matches: Vec::new(),
        attendance: Vec::new(),
    }
}

#[tokio::test]
async fn valid_credentials_start_a_session() {
    let h = harness(school(), Duration::from_secs(30));
    let logged_in = h
        .engine
        .login_with_credentials("t-admin", "secret", &Sha256Verifier)
        .await
        .expect("login");
    assert_eq!(logged_in.name, "Anna Admin");

    let view = h.engine.view().await;
    assert_eq!(view.teacher.as_ref().map(|t| t.id.as_str()), Some("t-admin"));
    assert_eq!(view.classes.len(), 1);
}

#[tokio::test]
async fn a_wrong_password_is_rejected() {
    let h = harness(school(), Duration::from_secs(30));
    let result = h
        .engine
        .login_with_credentials("t-admin", "nope", &Sha256Verifier)
        .await;
    assert!(matches!(result, Err(EngineError::AuthFailure(_))));
    assert!(h.engine.view().await.teacher.is_none());
}

#[tokio::test]
async fn an_account_without_a_password_cannot_log_in() {
    let h = harness(school(), Duration::from_secs(30));
    let result = h
        .engine
        .login_with_credentials("t-ghost", "", &Sha256Verifier)
        .await;
    assert!(matches!(result, Err(EngineError::AuthFailure(_))));
}

#[tokio::test]
async fn an_unknown_username_is_rejected() {
    let h = harness(school(), Duration::from_secs(30));
    let result = h
        .engine
        .login_with_credentials("nobody", "secret", &Sha256Verifier)
        .await;
    assert!(matches!(result, Err(EngineError::AuthFailure(_))));
}

#[tokio::test]
async fn an_unreachable_remote_fails_the_login() {
    let h = harness(school(), Duration::from_secs(30));
    h.remote.set_fail_fetch(true);
    let result = h
        .engine
        .login_with_credentials("t-admin", "secret", &Sha256Verifier)
        .await;
    assert!(matches!(result, Err(EngineError::RemoteUnavailable(_))));
}

#[tokio::test]
async fn a_session_resumes_with_its_saved_view() {
    let h = harness(school(), Duration::from_secs(30));
    let admin = school().teachers[0].clone();
    h.engine.login(admin).await.expect("login");
    h.engine
        .set_ui_state(Some("classes".to_string()), Some("overview".to_string()))
        .await
        .expect("ui state");
    h.engine.logout().await;
    assert!(h.engine.view().await.teacher.is_none());

    let resumed = h.engine.resume().await.expect("resume");
    assert_eq!(resumed.map(|t| t.id), Some("t-admin".to_string()));

    let view = h.engine.view().await;
    assert_eq!(view.current_view.as_deref(), Some("classes"));
    assert_eq!(view.active_tab.as_deref(), Some("overview"));
}

#[tokio::test]
async fn resuming_a_deleted_account_clears_the_saved_session() {
    let h = harness(school(), Duration::from_secs(30));
    let admin = school().teachers[0].clone();
    h.engine.login(admin).await.expect("login");
    h.engine.logout().await;

    let mut data = h.remote.data();
    data.teachers.retain(|t| t.id != "t-admin");
    h.remote.set_data(data);

    let result = h.engine.resume().await;
    assert!(matches!(result, Err(EngineError::StaleAccount)));

    // The blob is gone; a second resume finds nothing to restore.
    assert!(h.engine.resume().await.expect("resume").is_none());
}

#[tokio::test]
async fn resume_without_a_saved_session_is_a_clean_no() {
    let h = harness(school(), Duration::from_secs(30));
    assert!(h.engine.resume().await.expect("resume").is_none());
}
