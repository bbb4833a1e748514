#![allow(dead_code)]

use classtrackd::broadcast::{
    BroadcastClient, BroadcastError, BroadcastTransport, ChangeRecord, PollResponse,
};
use classtrackd::error::EngineError;
use classtrackd::models::{
    ClassRoom, GameType, GlobalData, Match, MemberRole, Role, ScheduledDate, Student, Teacher,
    Team, TeamMember,
};
use classtrackd::remote::{RemoteStore, SyncPayload};
use classtrackd::store::SnapshotStore;
use classtrackd::sync::SyncEngine;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ---------------------------------------------------------------------------
// In-memory remote store

#[derive(Default)]
struct FakeRemoteState {
    data: GlobalData,
    pushes: Vec<SyncPayload>,
    deleted_teacher_ids: Vec<String>,
    fail_fetch: bool,
    fail_push: bool,
}

/// Remote store double: applies pushed collections to its held data and
/// records every push for assertions.
#[derive(Clone, Default)]
pub struct FakeRemote {
    inner: Arc<Mutex<FakeRemoteState>>,
}

impl FakeRemote {
    pub fn with_data(data: GlobalData) -> Self {
        let remote = Self::default();
        remote.inner.lock().expect("remote lock").data = data;
        remote
    }

    pub fn data(&self) -> GlobalData {
        self.inner.lock().expect("remote lock").data.clone()
    }

    pub fn set_data(&self, data: GlobalData) {
        self.inner.lock().expect("remote lock").data = data;
    }

    pub fn pushes(&self) -> Vec<SyncPayload> {
        self.inner.lock().expect("remote lock").pushes.clone()
    }

    pub fn push_count(&self) -> usize {
        self.inner.lock().expect("remote lock").pushes.len()
    }

    pub fn deleted_teacher_ids(&self) -> Vec<String> {
        self.inner
            .lock()
            .expect("remote lock")
            .deleted_teacher_ids
            .clone()
    }

    pub fn set_fail_fetch(&self, fail: bool) {
        self.inner.lock().expect("remote lock").fail_fetch = fail;
    }

    pub fn set_fail_push(&self, fail: bool) {
        self.inner.lock().expect("remote lock").fail_push = fail;
    }
}

impl RemoteStore for FakeRemote {
    async fn fetch_all(&self) -> Result<GlobalData, EngineError> {
        let st = self.inner.lock().expect("remote lock");
        if st.fail_fetch {
            return Err(EngineError::RemoteUnavailable("fake outage".to_string()));
        }
        Ok(st.data.clone())
    }

    async fn push_partial(&self, payload: &SyncPayload) -> Result<(), EngineError> {
        let mut st = self.inner.lock().expect("remote lock");
        if st.fail_push {
            return Err(EngineError::RemoteUnavailable("fake outage".to_string()));
        }
        st.pushes.push(payload.clone());
        if let Some(classes) = &payload.classes {
            st.data.classes = classes.clone();
        }
        if let Some(matches) = &payload.matches {
            st.data.matches = matches.clone();
        }
        if let Some(attendance) = &payload.attendance {
            st.data.attendance = attendance.clone();
        }
        for t in [&payload.teacher, &payload.current_teacher].into_iter().flatten() {
            match st.data.teachers.iter_mut().find(|x| x.id == t.id) {
                Some(existing) => *existing = t.clone(),
                None => st.data.teachers.push(t.clone()),
            }
        }
        Ok(())
    }

    async fn delete_teacher(&self, teacher_id: &str) -> Result<(), EngineError> {
        let mut st = self.inner.lock().expect("remote lock");
        if st.fail_push {
            return Err(EngineError::RemoteUnavailable("fake outage".to_string()));
        }
        st.data.teachers.retain(|t| t.id != teacher_id);
        st.deleted_teacher_ids.push(teacher_id.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In-memory broadcast transport

#[derive(Default)]
struct FakeTransportState {
    queued: Vec<ChangeRecord>,
    published: Vec<ChangeRecord>,
    poll_count: usize,
    fail_poll: bool,
}

/// Broadcast transport double: `queue` feeds changes to the next poll tick,
/// `published` records what the engine announced.
#[derive(Clone, Default)]
pub struct FakeTransport {
    inner: Arc<Mutex<FakeTransportState>>,
}

impl FakeTransport {
    pub fn queue(&self, change: ChangeRecord) {
        self.inner.lock().expect("transport lock").queued.push(change);
    }

    pub fn published(&self) -> Vec<ChangeRecord> {
        self.inner
            .lock()
            .expect("transport lock")
            .published
            .clone()
    }

    pub fn poll_count(&self) -> usize {
        self.inner.lock().expect("transport lock").poll_count
    }

    pub fn set_fail_poll(&self, fail: bool) {
        self.inner.lock().expect("transport lock").fail_poll = fail;
    }
}

impl BroadcastTransport for FakeTransport {
    async fn poll(
        &self,
        since: f64,
        _user_id: &str,
        _user_name: &str,
    ) -> Result<PollResponse, BroadcastError> {
        let mut st = self.inner.lock().expect("transport lock");
        st.poll_count += 1;
        if st.fail_poll {
            return Err(BroadcastError("fake poll outage".to_string()));
        }
        let changes: Vec<ChangeRecord> = st.queued.drain(..).collect();
        Ok(PollResponse {
            changes,
            timestamp: since + 1.0,
            online_users: Vec::new(),
        })
    }

    async fn publish(
        &self,
        kind: &str,
        data: &serde_json::Value,
        author: &str,
    ) -> Result<(), BroadcastError> {
        let mut st = self.inner.lock().expect("transport lock");
        st.published.push(ChangeRecord {
            kind: kind.to_string(),
            data: data.clone(),
            author: author.to_string(),
            timestamp: 0.0,
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures

pub fn teacher(id: &str, name: &str, role: Role) -> Teacher {
    Teacher {
        id: id.to_string(),
        name: name.to_string(),
        email: format!("{}@school.test", id),
        role,
        username: Some(id.to_string()),
        password: Some(classtrackd::auth::password_digest("secret")),
        created_at: "2024-01-01".to_string(),
    }
}

pub fn student(id: &str, name: &str) -> Student {
    Student {
        id: id.to_string(),
        name: name.to_string(),
        points: 0,
        achievements: Vec::new(),
        activities: Vec::new(),
        soft_skills: Vec::new(),
    }
}

pub fn class(id: &str, name: &str, responsible_teacher_id: Option<&str>) -> ClassRoom {
    ClassRoom {
        id: id.to_string(),
        name: name.to_string(),
        students: Vec::new(),
        responsible_teacher_id: responsible_teacher_id.map(String::from),
        enabled_games: Vec::new(),
    }
}

pub fn member(s: &Student, class_name: &str, role: MemberRole) -> TeamMember {
    TeamMember {
        student_id: s.id.clone(),
        student_name: s.name.clone(),
        class_name: class_name.to_string(),
        role,
    }
}

pub fn team(id: &str, name: &str, members: Vec<TeamMember>) -> Team {
    Team {
        id: id.to_string(),
        name: name.to_string(),
        members,
        color: None,
    }
}

pub fn game_match(id: &str, game_type: GameType, team1: Team, team2: Team, created_by: &str) -> Match {
    Match {
        id: id.to_string(),
        game_type,
        team1,
        team2,
        result: None,
        date: "2024-03-15".to_string(),
        completed: false,
        created_by: created_by.to_string(),
        scheduled_dates: Vec::new(),
        league: None,
        discipline_counters: Vec::new(),
    }
}

pub fn scheduled(id: &str, date: &str, time: &str) -> ScheduledDate {
    ScheduledDate {
        id: id.to_string(),
        date: date.to_string(),
        time: time.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Engine assembly

pub struct Harness {
    pub engine: SyncEngine<FakeRemote, FakeTransport>,
    pub remote: FakeRemote,
    pub transport: FakeTransport,
}

/// Engine over fakes with short timings: tests drive `run_sync_cycle`
/// directly where determinism matters and sleep past the debounce otherwise.
pub fn harness(data: GlobalData, debounce: Duration) -> Harness {
    let remote = FakeRemote::with_data(data);
    let transport = FakeTransport::default();
    let broadcast = BroadcastClient::new(transport.clone(), Duration::from_millis(10));
    let store = SnapshotStore::open_in_memory().expect("in-memory store");
    let engine = SyncEngine::new(remote.clone(), broadcast, store, debounce);
    Harness {
        engine,
        remote,
        transport,
    }
}
