mod common;

use classtrackd::error::EngineError;
use classtrackd::models::{DisciplineCounter, GameType, GlobalData, MemberRole, Role};
use common::*;
use std::collections::HashMap;
use std::time::Duration;

fn school_with_booked_match() -> GlobalData {
    let admin = teacher("t-admin", "Anna Admin", Role::Admin);
    let mut c1 = class("c1", "5А", Some("t-admin"));
    c1.students.push(student("s1", "Иванов Иван"));
    c1.students.push(student("s2", "Петров Петр"));
    c1.students.push(student("s3", "Сидоров Сидор"));

    let s1 = c1.students[0].clone();
    let s2 = c1.students[1].clone();
    let mut m1 = game_match(
        "m1",
        GameType::Sport,
        team("tm1", "Орлы", vec![member(&s1, "5А", MemberRole::Captain)]),
        team("tm2", "Соколы", vec![member(&s2, "5А", MemberRole::Player)]),
        "Anna Admin",
    );
    m1.scheduled_dates.push(scheduled("d1", "2024-03-15", "14:00"));

    GlobalData {
        teachers: vec![admin],
        classes: vec![c1],
        matches: vec![m1],
        attendance: Vec::new(),
    }
}

#[tokio::test]
async fn an_identical_slot_with_a_shared_student_is_rejected() {
    let h = harness(school_with_booked_match(), Duration::from_secs(30));
    let admin = school_with_booked_match().teachers[0].clone();
    h.engine.login(admin).await.expect("login");

    let s2 = student("s2", "Петров Петр");
    let s3 = student("s3", "Сидоров Сидор");
    let mut m2 = game_match(
        "m2",
        GameType::Valheim,
        team("tm3", "Волки", vec![member(&s2, "5А", MemberRole::Captain)]),
        team("tm4", "Лисы", vec![member(&s3, "5А", MemberRole::Player)]),
        "Anna Admin",
    );
    m2.scheduled_dates.push(scheduled("d2", "2024-03-15", "14:00"));

    let result = h.engine.create_match(m2).await;
    match result {
        Err(EngineError::ScheduleConflict {
            match_id, students, ..
        }) => {
            assert_eq!(match_id, "m1");
            assert_eq!(students, vec!["Петров Петр".to_string()]);
        }
        other => panic!("expected a schedule conflict, got {:?}", other),
    }
    // Nothing was mutated.
    assert_eq!(h.engine.view().await.matches.len(), 1);
}

#[tokio::test]
async fn the_same_date_one_minute_later_is_accepted() {
    let h = harness(school_with_booked_match(), Duration::from_secs(30));
    let admin = school_with_booked_match().teachers[0].clone();
    h.engine.login(admin).await.expect("login");

    let s2 = student("s2", "Петров Петр");
    let s3 = student("s3", "Сидоров Сидор");
    let mut m2 = game_match(
        "m2",
        GameType::Valheim,
        team("tm3", "Волки", vec![member(&s2, "5А", MemberRole::Captain)]),
        team("tm4", "Лисы", vec![member(&s3, "5А", MemberRole::Player)]),
        "Anna Admin",
    );
    m2.scheduled_dates.push(scheduled("d2", "2024-03-15", "14:01"));

    h.engine.create_match(m2).await.expect("no conflict at 14:01");
    assert_eq!(h.engine.view().await.matches.len(), 2);
}

#[tokio::test]
async fn the_same_slot_with_disjoint_students_is_accepted() {
    let h = harness(school_with_booked_match(), Duration::from_secs(30));
    let admin = school_with_booked_match().teachers[0].clone();
    h.engine.login(admin).await.expect("login");

    let s3 = student("s3", "Сидоров Сидор");
    let s4 = student("s4", "Козлов Козьма");
    let mut m2 = game_match(
        "m2",
        GameType::Valheim,
        team("tm3", "Волки", vec![member(&s3, "5А", MemberRole::Captain)]),
        team("tm4", "Лисы", vec![member(&s4, "5А", MemberRole::Player)]),
        "Anna Admin",
    );
    m2.scheduled_dates.push(scheduled("d2", "2024-03-15", "14:00"));

    h.engine.create_match(m2).await.expect("disjoint rosters do not conflict");
}

#[tokio::test]
async fn a_student_cannot_play_on_both_teams() {
    let h = harness(school_with_booked_match(), Duration::from_secs(30));
    let admin = school_with_booked_match().teachers[0].clone();
    h.engine.login(admin).await.expect("login");

    let s3 = student("s3", "Сидоров Сидор");
    let m2 = game_match(
        "m2",
        GameType::Valheim,
        team("tm3", "Волки", vec![member(&s3, "5А", MemberRole::Captain)]),
        team("tm4", "Лисы", vec![member(&s3, "5А", MemberRole::Player)]),
        "Anna Admin",
    );

    assert!(matches!(
        h.engine.create_match(m2).await,
        Err(EngineError::Validation(_))
    ));
}

#[tokio::test]
async fn more_than_three_discipline_counters_are_rejected() {
    let h = harness(school_with_booked_match(), Duration::from_secs(30));
    let admin = school_with_booked_match().teachers[0].clone();
    h.engine.login(admin).await.expect("login");

    let s3 = student("s3", "Сидоров Сидор");
    let s4 = student("s4", "Козлов Козьма");
    let mut m2 = game_match(
        "m2",
        GameType::Factorio,
        team("tm3", "Волки", vec![member(&s3, "5А", MemberRole::Captain)]),
        team("tm4", "Лисы", vec![member(&s4, "5А", MemberRole::Player)]),
        "Anna Admin",
    );
    for i in 0..4 {
        m2.discipline_counters.push(DisciplineCounter {
            name: format!("Дисциплина {}", i + 1),
            scores: HashMap::new(),
        });
    }

    assert!(matches!(
        h.engine.create_match(m2).await,
        Err(EngineError::Validation(_))
    ));
}
