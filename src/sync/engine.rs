use crate::auth::{self, CredentialVerifier};
use crate::backup;
use crate::broadcast::{BroadcastClient, BroadcastTransport, ChangeRecord, DATA_UPDATED};
use crate::conflicts;
use crate::error::EngineError;
use crate::models::{
    AppStateSnapshot, AttendanceRecord, ClassRoom, GlobalData, Match, MatchWinner,
    SoftSkillRating, Student, Teacher, MAX_DISCIPLINE_COUNTERS,
};
use crate::remote::{RemoteStore, SyncPayload};
use crate::results;
use crate::store::SnapshotStore;
use crate::sync::debounce::Debouncer;
use crate::sync::machine::{transition, Action, SyncEvent, SyncPhase};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

/// Engine wiring knobs. Production values: a quiet period of tens of seconds
/// bounds write amplification while a user is actively editing; the poll
/// interval approximates realtime delivery.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub sync_url: String,
    pub ws_url: String,
    pub debounce: Duration,
    pub poll_interval: Duration,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let sync_url = std::env::var("CLASSTRACK_SYNC_URL")
            .unwrap_or_else(|_| "http://localhost:8787/sync".to_string());
        let ws_url = std::env::var("CLASSTRACK_WS_URL")
            .unwrap_or_else(|_| "http://localhost:8787/ws".to_string());
        Self {
            sync_url,
            ws_url,
            debounce: Duration::from_secs(30),
            poll_interval: Duration::from_secs(3),
        }
    }
}

/// Broadcast payload for a `data_updated` change: the full updated
/// collections, so recipients never need a follow-up read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    classes: Option<Vec<ClassRoom>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    matches: Option<Vec<Match>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attendance: Option<Vec<AttendanceRecord>>,
}

struct EngineState {
    teacher: Option<Teacher>,
    /// Role-scoped local working set; mutated optimistically by the UI.
    classes: Vec<ClassRoom>,
    matches: Vec<Match>,
    attendance: Vec<AttendanceRecord>,
    /// Last known full aggregate; mutated only on push success, inbound
    /// broadcast application, or immediate-write completion.
    global: GlobalData,
    /// Local working set as of the last reconciliation; absence from the
    /// current set marks an entity as deleted by this session.
    prev_classes: Vec<ClassRoom>,
    prev_matches: Vec<Match>,
    phase: SyncPhase,
    last_sync_error: Option<String>,
    current_view: Option<String>,
    active_tab: Option<String>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            teacher: None,
            classes: Vec::new(),
            matches: Vec::new(),
            attendance: Vec::new(),
            global: GlobalData::default(),
            prev_classes: Vec::new(),
            prev_matches: Vec::new(),
            phase: SyncPhase::Idle,
            last_sync_error: None,
            current_view: None,
            active_tab: None,
        }
    }

    fn require_teacher(&self) -> Result<&Teacher, EngineError> {
        self.teacher.as_ref().ok_or(EngineError::NotLoggedIn)
    }

    fn session_snapshot(&self) -> Option<AppStateSnapshot> {
        self.teacher.as_ref().map(|t| AppStateSnapshot {
            teacher: t.clone(),
            classes: self.classes.clone(),
            matches: self.matches.clone(),
            attendance: self.attendance.clone(),
            current_view: self.current_view.clone(),
            active_tab: self.active_tab.clone(),
        })
    }

    /// Feed one event to the phase machine and adopt the new phase.
    fn step(&mut self, event: SyncEvent) -> Action {
        let (phase, action) = transition(self.phase, event);
        self.phase = phase;
        action
    }
}

/// Read-only view of the engine for the presentation layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineView {
    pub teacher: Option<Teacher>,
    pub classes: Vec<ClassRoom>,
    pub matches: Vec<Match>,
    pub attendance: Vec<AttendanceRecord>,
    pub global: GlobalData,
    pub phase: &'static str,
    pub last_sync_error: Option<String>,
    pub current_view: Option<String>,
    pub active_tab: Option<String>,
}

struct EngineInner<R, T> {
    remote: R,
    broadcast: BroadcastClient<T>,
    store: SnapshotStore,
    debounce_after: Duration,
    debouncer: Debouncer,
    state: Mutex<EngineState>,
}

/// The synchronization core. One instance per session: constructed before
/// login, torn down at logout. Cloning yields another handle to the same
/// engine.
pub struct SyncEngine<R, T> {
    inner: Arc<EngineInner<R, T>>,
}

impl<R, T> Clone for SyncEngine<R, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

fn scoped_for(teacher: &Teacher, data: &GlobalData) -> (Vec<ClassRoom>, Vec<Match>) {
    if teacher.role.sees_everything() {
        (data.classes.clone(), data.matches.clone())
    } else {
        let classes = data
            .classes
            .iter()
            .filter(|c| c.responsible_teacher_id.as_deref() == Some(teacher.id.as_str()))
            .cloned()
            .collect();
        let matches = data
            .matches
            .iter()
            .filter(|m| m.created_by == teacher.name)
            .cloned()
            .collect();
        (classes, matches)
    }
}

fn upsert_teacher(teachers: &mut Vec<Teacher>, teacher: &Teacher) {
    match teachers.iter_mut().find(|t| t.id == teacher.id) {
        Some(existing) => *existing = teacher.clone(),
        None => teachers.push(teacher.clone()),
    }
}

impl<R: RemoteStore, T: BroadcastTransport> SyncEngine<R, T> {
    pub fn new(
        remote: R,
        broadcast: BroadcastClient<T>,
        store: SnapshotStore,
        debounce_after: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                remote,
                broadcast,
                store,
                debounce_after,
                debouncer: Debouncer::new(),
                state: Mutex::new(EngineState::new()),
            }),
        }
    }

    async fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.inner.state.lock().await
    }

    fn persist_session(&self, st: &EngineState) {
        if let Some(snapshot) = st.session_snapshot() {
            if let Err(e) = self.inner.store.save_app_state(&snapshot) {
                log::warn!("failed to persist session state: {}", e);
            }
        }
    }

    fn persist_global(&self, st: &EngineState) {
        if let Err(e) = self.inner.store.save_global(&st.global) {
            log::warn!("failed to persist global cache: {}", e);
        }
    }

    fn schedule_debounce(&self) {
        let engine = self.clone();
        self.inner
            .debouncer
            .schedule(self.inner.debounce_after, async move {
                engine.run_sync_cycle().await;
            });
    }

    fn after_step(&self, action: Action) {
        if action == Action::Schedule {
            self.schedule_debounce();
        }
    }

    // ------------------------------------------------------------------
    // Login / resume / logout

    /// Authenticates against the freshly fetched teacher list and starts the
    /// session.
    pub async fn login_with_credentials(
        &self,
        username: &str,
        password: &str,
        verifier: &dyn CredentialVerifier,
    ) -> Result<Teacher, EngineError> {
        let data = self.inner.remote.fetch_all().await?;
        let teacher = auth::authenticate(&data.teachers, username, password, verifier)?;
        self.start_session(teacher.clone(), data, None, None).await;
        Ok(teacher)
    }

    /// Starts a session for an already-verified teacher.
    pub async fn login(&self, teacher: Teacher) -> Result<(), EngineError> {
        let data = self.inner.remote.fetch_all().await?;
        self.start_session(teacher, data, None, None).await;
        Ok(())
    }

    /// Resumes the persisted session, if any. The saved account must still
    /// exist remotely; otherwise the session blob is cleared and the caller
    /// is sent back to login.
    pub async fn resume(&self) -> Result<Option<Teacher>, EngineError> {
        let Some(saved) = self.inner.store.load_app_state()? else {
            return Ok(None);
        };
        let data = self.inner.remote.fetch_all().await?;
        if !data.teachers.iter().any(|t| t.id == saved.teacher.id) {
            self.inner.store.clear_app_state()?;
            return Err(EngineError::StaleAccount);
        }
        let teacher = saved.teacher.clone();
        self.start_session(
            teacher.clone(),
            data,
            saved.current_view.clone(),
            saved.active_tab.clone(),
        )
        .await;
        Ok(Some(teacher))
    }

    async fn start_session(
        &self,
        teacher: Teacher,
        data: GlobalData,
        current_view: Option<String>,
        active_tab: Option<String>,
    ) {
        let (classes, matches) = scoped_for(&teacher, &data);
        {
            let mut st = self.lock().await;
            st.attendance = data.attendance.clone();
            st.global = data;
            st.classes = classes.clone();
            st.matches = matches.clone();
            // First reconciliation pass must see zero deletions.
            st.prev_classes = classes;
            st.prev_matches = matches;
            st.teacher = Some(teacher.clone());
            st.phase = SyncPhase::Idle;
            st.last_sync_error = None;
            st.current_view = current_view;
            st.active_tab = active_tab;
            self.persist_session(&st);
            self.persist_global(&st);
        }
        self.register_broadcast_handler();
        self.inner.broadcast.connect(&teacher.id, &teacher.name);
        log::info!("session started for {} ({:?})", teacher.name, teacher.role);
    }

    fn register_broadcast_handler(&self) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.broadcast.on_changes(move |changes| {
            if let Some(inner) = weak.upgrade() {
                let engine = SyncEngine { inner };
                tokio::spawn(async move {
                    engine.apply_incoming(changes).await;
                });
            }
        });
    }

    /// Ends the session. The persisted blob survives so the session can be
    /// resumed; `clear_data` wipes it.
    pub async fn logout(&self) {
        self.inner.broadcast.disconnect();
        self.inner.debouncer.cancel();
        let mut st = self.lock().await;
        st.teacher = None;
        st.phase = SyncPhase::Idle;
        log::info!("session ended");
    }

    pub async fn clear_data(&self) -> Result<(), EngineError> {
        self.inner.store.clear_app_state()?;
        let mut st = self.lock().await;
        st.classes.clear();
        st.matches.clear();
        st.attendance.clear();
        st.prev_classes.clear();
        st.prev_matches.clear();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Local mutators (debounce path)

    pub async fn set_classes(&self, classes: Vec<ClassRoom>) -> Result<(), EngineError> {
        let mut st = self.lock().await;
        st.require_teacher()?;
        st.classes = classes;
        self.persist_session(&st);
        let action = st.step(SyncEvent::LocalEdit);
        drop(st);
        self.after_step(action);
        Ok(())
    }

    pub async fn set_matches(&self, matches: Vec<Match>) -> Result<(), EngineError> {
        let mut st = self.lock().await;
        st.require_teacher()?;
        st.matches = matches;
        self.persist_session(&st);
        let action = st.step(SyncEvent::LocalEdit);
        drop(st);
        self.after_step(action);
        Ok(())
    }

    pub async fn set_attendance(&self, attendance: Vec<AttendanceRecord>) -> Result<(), EngineError> {
        let mut st = self.lock().await;
        st.require_teacher()?;
        st.attendance = attendance;
        self.persist_session(&st);
        let action = st.step(SyncEvent::LocalEdit);
        drop(st);
        self.after_step(action);
        Ok(())
    }

    pub async fn update_class(&self, class: ClassRoom) -> Result<(), EngineError> {
        let mut st = self.lock().await;
        st.require_teacher()?;
        let Some(existing) = st.classes.iter_mut().find(|c| c.id == class.id) else {
            return Err(EngineError::Validation("class not found".to_string()));
        };
        *existing = class;
        self.persist_session(&st);
        let action = st.step(SyncEvent::LocalEdit);
        drop(st);
        self.after_step(action);
        Ok(())
    }

    pub async fn add_soft_skill_rating(
        &self,
        class_id: &str,
        student_id: &str,
        rating: SoftSkillRating,
    ) -> Result<(), EngineError> {
        let mut st = self.lock().await;
        st.require_teacher()?;
        let student = st
            .classes
            .iter_mut()
            .find(|c| c.id == class_id)
            .and_then(|c| c.students.iter_mut().find(|s| s.id == student_id))
            .ok_or_else(|| EngineError::Validation("student not found".to_string()))?;
        student.soft_skills.push(rating);
        self.persist_session(&st);
        let action = st.step(SyncEvent::LocalEdit);
        drop(st);
        self.after_step(action);
        Ok(())
    }

    /// UI navigation bookkeeping; persisted so a resumed session lands on the
    /// same view, but never synced remotely.
    pub async fn set_ui_state(
        &self,
        current_view: Option<String>,
        active_tab: Option<String>,
    ) -> Result<(), EngineError> {
        let mut st = self.lock().await;
        st.require_teacher()?;
        st.current_view = current_view;
        st.active_tab = active_tab;
        self.persist_session(&st);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Match creation and results

    /// Validates team composition and schedule before anything is mutated:
    /// a student may appear in only one of the two teams, a match carries at
    /// most three discipline counters, and no student may already be booked
    /// in another match at any of the proposed date+time slots.
    pub async fn create_match(&self, m: Match) -> Result<(), EngineError> {
        let mut st = self.lock().await;
        st.require_teacher()?;

        if m.discipline_counters.len() > MAX_DISCIPLINE_COUNTERS {
            return Err(EngineError::Validation(format!(
                "a match holds at most {} discipline counters",
                MAX_DISCIPLINE_COUNTERS
            )));
        }
        let team1_ids: HashSet<&str> = m.team1.members.iter().map(|x| x.student_id.as_str()).collect();
        if m.team2
            .members
            .iter()
            .any(|x| team1_ids.contains(x.student_id.as_str()))
        {
            return Err(EngineError::Validation(
                "a student cannot be in both teams".to_string(),
            ));
        }

        // Conflicts are checked against every known match, local or foreign.
        let local_ids: HashSet<&str> = st.matches.iter().map(|x| x.id.as_str()).collect();
        let mut known: Vec<&Match> = st.matches.iter().collect();
        known.extend(
            st.global
                .matches
                .iter()
                .filter(|x| !local_ids.contains(x.id.as_str())),
        );
        let known: Vec<Match> = known.into_iter().cloned().collect();

        let new_ids = m.student_ids();
        if let Some(info) = conflicts::check_schedule_conflicts(&new_ids, &m.scheduled_dates, &known)
        {
            let roster: Vec<&Student> = st
                .classes
                .iter()
                .chain(st.global.classes.iter())
                .flat_map(|c| c.students.iter())
                .collect();
            let students = info
                .conflicting_students
                .iter()
                .map(|id| conflicts::student_name(id, &roster))
                .collect();
            return Err(EngineError::ScheduleConflict {
                match_id: info.conflicting_match.id.clone(),
                match_description: format!(
                    "{} vs {}",
                    info.conflicting_match.team1.name, info.conflicting_match.team2.name
                ),
                students,
            });
        }

        st.matches.push(m);
        self.persist_session(&st);
        let action = st.step(SyncEvent::LocalEdit);
        drop(st);
        self.after_step(action);
        Ok(())
    }

    /// Completes a match: sets the winner and appends a win/loss activity
    /// record of the match's game type to every team member found in the
    /// local classes.
    pub async fn record_match_result(
        &self,
        match_id: &str,
        winner: MatchWinner,
    ) -> Result<(), EngineError> {
        let mut st = self.lock().await;
        st.require_teacher()?;
        let Some(m) = st.matches.iter_mut().find(|m| m.id == match_id) else {
            return Err(EngineError::Validation("match not found".to_string()));
        };
        m.result = Some(winner);
        m.completed = true;
        let completed = m.clone();
        let date = chrono::Utc::now().to_rfc3339();
        results::apply_match_result(&mut st.classes, &completed, winner, &date);
        self.persist_session(&st);
        let action = st.step(SyncEvent::LocalEdit);
        drop(st);
        self.after_step(action);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Immediate writes (bypass the debounce)

    /// Pushes the given collections right now, committing them to the held
    /// global data only on success.
    async fn push_immediate(&self, payload: SyncPayload) -> Result<(), EngineError> {
        match self.inner.remote.push_partial(&payload).await {
            Ok(()) => {
                let author = {
                    let mut st = self.lock().await;
                    if let Some(classes) = payload.classes.clone() {
                        st.global.classes = classes;
                    }
                    if let Some(matches) = payload.matches.clone() {
                        st.global.matches = matches;
                    }
                    if let Some(attendance) = payload.attendance.clone() {
                        st.global.attendance = attendance;
                    }
                    // The previous snapshot is left alone: a delete pending in
                    // the debounce path stays tracked. Re-detecting the
                    // entities this write already removed is harmless; the
                    // merged result then equals the held global data and the
                    // cycle skips the push.
                    st.last_sync_error = None;
                    self.persist_session(&st);
                    self.persist_global(&st);
                    st.teacher.as_ref().map(|t| t.name.clone())
                };
                if let Some(author) = author {
                    let update = DataUpdate {
                        classes: payload.classes,
                        matches: payload.matches,
                        attendance: payload.attendance,
                    };
                    let data = serde_json::to_value(&update).unwrap_or_default();
                    if let Err(e) = self.inner.broadcast.publish(DATA_UPDATED, &data, &author).await
                    {
                        // The remote write already succeeded; other sessions
                        // will observe the change on their next full sync.
                        log::warn!("broadcast publish failed after push: {}", e);
                    }
                }
                Ok(())
            }
            Err(e) => {
                let mut st = self.lock().await;
                st.last_sync_error = Some(e.to_string());
                log::error!("immediate push failed: {}", e);
                Err(e)
            }
        }
    }

    /// Deletes a class and, with it, its students and their attendance
    /// records. High-value mutation: pushed immediately instead of waiting
    /// out the debounce.
    pub async fn delete_class(&self, class_id: &str) -> Result<(), EngineError> {
        let payload = {
            let mut st = self.lock().await;
            let teacher = st.require_teacher()?.clone();
            let Some(pos) = st.classes.iter().position(|c| c.id == class_id) else {
                return Err(EngineError::Validation("class not found".to_string()));
            };
            let removed = st.classes.remove(pos);
            let gone: HashSet<String> = removed.students.iter().map(|s| s.id.clone()).collect();
            st.attendance.retain(|a| !gone.contains(&a.student_id));

            let mut classes = st.global.classes.clone();
            classes.retain(|c| c.id != class_id);
            let mut attendance = st.global.attendance.clone();
            attendance.retain(|a| !gone.contains(&a.student_id));

            self.persist_session(&st);
            SyncPayload {
                classes: Some(classes),
                matches: Some(st.global.matches.clone()),
                attendance: Some(attendance),
                current_teacher: Some(teacher),
                ..Default::default()
            }
        };
        self.push_immediate(payload).await
    }

    pub async fn delete_match(&self, match_id: &str) -> Result<(), EngineError> {
        let payload = {
            let mut st = self.lock().await;
            let teacher = st.require_teacher()?.clone();
            let Some(pos) = st.matches.iter().position(|m| m.id == match_id) else {
                return Err(EngineError::Validation("match not found".to_string()));
            };
            st.matches.remove(pos);

            let mut matches = st.global.matches.clone();
            matches.retain(|m| m.id != match_id);

            self.persist_session(&st);
            SyncPayload {
                classes: Some(st.global.classes.clone()),
                matches: Some(matches),
                attendance: Some(st.global.attendance.clone()),
                current_teacher: Some(teacher),
                ..Default::default()
            }
        };
        self.push_immediate(payload).await
    }

    pub async fn delete_student(
        &self,
        class_id: &str,
        student_id: &str,
    ) -> Result<(), EngineError> {
        let payload = {
            let mut st = self.lock().await;
            let teacher = st.require_teacher()?.clone();
            let Some(class) = st.classes.iter_mut().find(|c| c.id == class_id) else {
                return Err(EngineError::Validation("class not found".to_string()));
            };
            let before = class.students.len();
            class.students.retain(|s| s.id != student_id);
            if class.students.len() == before {
                return Err(EngineError::Validation("student not found".to_string()));
            }
            st.attendance.retain(|a| a.student_id != student_id);

            let mut classes = st.global.classes.clone();
            if let Some(global_class) = classes.iter_mut().find(|c| c.id == class_id) {
                global_class.students.retain(|s| s.id != student_id);
            }
            let mut attendance = st.global.attendance.clone();
            attendance.retain(|a| a.student_id != student_id);

            self.persist_session(&st);
            SyncPayload {
                classes: Some(classes),
                matches: Some(st.global.matches.clone()),
                attendance: Some(attendance),
                current_teacher: Some(teacher),
                ..Default::default()
            }
        };
        self.push_immediate(payload).await
    }

    // ------------------------------------------------------------------
    // Teacher management (global, not role-scoped)

    pub async fn create_teacher(&self, teacher: Teacher) -> Result<(), EngineError> {
        {
            let st = self.lock().await;
            st.require_teacher()?;
            if st.global.teachers.iter().any(|t| t.id == teacher.id) {
                return Err(EngineError::Validation(
                    "teacher id already exists".to_string(),
                ));
            }
        }
        let payload = SyncPayload {
            teacher: Some(teacher.clone()),
            ..Default::default()
        };
        self.inner.remote.push_partial(&payload).await?;
        let mut st = self.lock().await;
        st.global.teachers.push(teacher);
        self.persist_global(&st);
        Ok(())
    }

    pub async fn update_teacher(&self, teacher: Teacher) -> Result<(), EngineError> {
        let payload = SyncPayload {
            teacher: Some(teacher.clone()),
            ..Default::default()
        };
        self.inner.remote.push_partial(&payload).await?;
        let mut st = self.lock().await;
        upsert_teacher(&mut st.global.teachers, &teacher);
        if st.teacher.as_ref().map(|t| t.id.as_str()) == Some(teacher.id.as_str()) {
            st.teacher = Some(teacher);
            self.persist_session(&st);
        }
        self.persist_global(&st);
        Ok(())
    }

    pub async fn delete_teacher(&self, teacher_id: &str) -> Result<(), EngineError> {
        self.inner.remote.delete_teacher(teacher_id).await?;
        let mut st = self.lock().await;
        st.global.teachers.retain(|t| t.id != teacher_id);
        self.persist_global(&st);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Outbound reconciliation

    /// The debounce timer lands here. Computes the merged global dataset from
    /// the role-scoped local set, preserving foreign records and honoring
    /// deletions tracked against the previous local snapshot, and pushes it
    /// when it differs from the held global data.
    pub async fn run_sync_cycle(&self) {
        let (payload, author) = {
            let mut st = self.lock().await;
            let Some(teacher) = st.teacher.clone() else {
                return;
            };
            match st.step(SyncEvent::DebounceElapsed) {
                Action::RunSync => {}
                _ => {
                    log::debug!("sync cycle skipped in phase {}", st.phase.name());
                    return;
                }
            }

            let current_class_ids: HashSet<String> =
                st.classes.iter().map(|c| c.id.clone()).collect();
            let deleted_class_ids: HashSet<String> = st
                .prev_classes
                .iter()
                .map(|c| c.id.clone())
                .filter(|id| !current_class_ids.contains(id))
                .collect();
            let current_match_ids: HashSet<String> =
                st.matches.iter().map(|m| m.id.clone()).collect();
            let deleted_match_ids: HashSet<String> = st
                .prev_matches
                .iter()
                .map(|m| m.id.clone())
                .filter(|id| !current_match_ids.contains(id))
                .collect();

            // Records owned by other sessions: neither held locally nor
            // deleted by this session. They must survive the merge untouched.
            let mut merged_classes: Vec<ClassRoom> = st
                .global
                .classes
                .iter()
                .filter(|c| {
                    !current_class_ids.contains(&c.id) && !deleted_class_ids.contains(&c.id)
                })
                .cloned()
                .collect();
            merged_classes.extend(st.classes.iter().cloned());

            let mut merged_matches: Vec<Match> = st
                .global
                .matches
                .iter()
                .filter(|m| {
                    !current_match_ids.contains(&m.id) && !deleted_match_ids.contains(&m.id)
                })
                .cloned()
                .collect();
            merged_matches.extend(st.matches.iter().cloned());

            let merged_attendance = st.attendance.clone();

            // The snapshot must advance before the comparison so the same
            // delta is never detected twice.
            st.prev_classes = st.classes.clone();
            st.prev_matches = st.matches.clone();

            let unchanged = merged_classes == st.global.classes
                && merged_matches == st.global.matches
                && merged_attendance == st.global.attendance;
            if unchanged {
                let action = st.step(SyncEvent::PushSkipped);
                log::debug!("nothing to push");
                drop(st);
                self.after_step(action);
                return;
            }

            st.step(SyncEvent::PushStarted);
            log::info!(
                "pushing merged dataset: {} classes, {} matches, {} attendance",
                merged_classes.len(),
                merged_matches.len(),
                merged_attendance.len()
            );
            (
                SyncPayload {
                    classes: Some(merged_classes),
                    matches: Some(merged_matches),
                    attendance: Some(merged_attendance),
                    current_teacher: Some(teacher.clone()),
                    ..Default::default()
                },
                teacher,
            )
        };

        match self.inner.remote.push_partial(&payload).await {
            Ok(()) => {
                let action = {
                    let mut st = self.lock().await;
                    if let Some(classes) = payload.classes.clone() {
                        st.global.classes = classes;
                    }
                    if let Some(matches) = payload.matches.clone() {
                        st.global.matches = matches;
                    }
                    if let Some(attendance) = payload.attendance.clone() {
                        st.global.attendance = attendance;
                    }
                    upsert_teacher(&mut st.global.teachers, &author);
                    st.last_sync_error = None;
                    let action = st.step(SyncEvent::PushSucceeded);
                    self.persist_session(&st);
                    self.persist_global(&st);
                    action
                };
                let update = DataUpdate {
                    classes: payload.classes,
                    matches: payload.matches,
                    attendance: payload.attendance,
                };
                let data = serde_json::to_value(&update).unwrap_or_default();
                if let Err(e) = self
                    .inner
                    .broadcast
                    .publish(DATA_UPDATED, &data, &author.name)
                    .await
                {
                    log::warn!("broadcast publish failed after push: {}", e);
                }
                self.after_step(action);
            }
            Err(e) => {
                let mut st = self.lock().await;
                let action = st.step(SyncEvent::PushFailed);
                st.last_sync_error = Some(e.to_string());
                log::error!("auto-sync push failed: {}", e);
                drop(st);
                self.after_step(action);
            }
        }
    }

    // ------------------------------------------------------------------
    // Inbound reconciliation

    /// Applies broadcast changes from other sessions. Self-authored records
    /// are dropped here, and the phase is suppressed before any state is
    /// mutated so the resulting updates are never echoed back as local
    /// writes.
    pub async fn apply_incoming(&self, changes: Vec<ChangeRecord>) {
        for change in changes {
            let own_name = {
                let st = self.lock().await;
                match &st.teacher {
                    Some(t) => t.name.clone(),
                    None => return,
                }
            };
            if change.author == own_name {
                log::debug!("ignoring self-authored change");
                continue;
            }
            if change.kind != DATA_UPDATED {
                log::debug!("ignoring change of type {}", change.kind);
                continue;
            }
            let update: DataUpdate = match serde_json::from_value(change.data) {
                Ok(u) => u,
                Err(e) => {
                    log::warn!("malformed broadcast payload: {}", e);
                    continue;
                }
            };

            let action = {
                let mut st = self.lock().await;
                let action = st.step(SyncEvent::BroadcastApplied);
                let teacher = match st.teacher.clone() {
                    Some(t) => t,
                    None => return,
                };

                let attendance_present = update.attendance.is_some();
                if let Some(classes) = update.classes {
                    st.global.classes = classes;
                }
                if let Some(matches) = update.matches {
                    st.global.matches = matches;
                }
                if let Some(attendance) = update.attendance {
                    st.global.attendance = attendance;
                }

                if teacher.role.sees_everything() {
                    // Append records this session has not seen yet; entities
                    // it already holds may carry unsynced local edits and are
                    // left alone.
                    let known: HashSet<String> =
                        st.classes.iter().map(|c| c.id.clone()).collect();
                    let incoming: Vec<ClassRoom> = st
                        .global
                        .classes
                        .iter()
                        .filter(|c| !known.contains(&c.id))
                        .cloned()
                        .collect();
                    st.classes.extend(incoming);

                    let known: HashSet<String> =
                        st.matches.iter().map(|m| m.id.clone()).collect();
                    let incoming: Vec<Match> = st
                        .global
                        .matches
                        .iter()
                        .filter(|m| !known.contains(&m.id))
                        .cloned()
                        .collect();
                    st.matches.extend(incoming);
                } else {
                    // A junior's visibility is a strict subset that can
                    // shrink; rebuild it from scratch.
                    let (classes, matches) = scoped_for(&teacher, &st.global);
                    st.classes = classes;
                    st.matches = matches;
                }

                if attendance_present {
                    st.attendance = st.global.attendance.clone();
                }

                // The incoming payload is now the reconciled baseline.
                st.prev_classes = st.classes.clone();
                st.prev_matches = st.matches.clone();

                self.persist_session(&st);
                self.persist_global(&st);
                log::debug!("applied broadcast change from {}", change.author);
                action
            };
            self.after_step(action);
        }
    }

    // ------------------------------------------------------------------
    // Force sync, backup, views

    /// Full re-fetch and rescope, discarding any pending debounce cycle.
    pub async fn force_sync(&self) -> Result<(), EngineError> {
        let data = self.inner.remote.fetch_all().await?;
        self.inner.debouncer.cancel();
        let mut st = self.lock().await;
        let teacher = st.require_teacher()?.clone();
        let (classes, matches) = scoped_for(&teacher, &data);
        st.attendance = data.attendance.clone();
        st.global = data;
        st.classes = classes.clone();
        st.matches = matches.clone();
        st.prev_classes = classes;
        st.prev_matches = matches;
        st.phase = SyncPhase::Idle;
        st.last_sync_error = None;
        self.persist_session(&st);
        self.persist_global(&st);
        Ok(())
    }

    pub async fn create_backup(&self, out_path: &Path) -> Result<backup::ExportSummary, EngineError> {
        let snapshot = {
            let st = self.lock().await;
            match st.session_snapshot() {
                Some(s) => s,
                None => return Err(EngineError::NotLoggedIn),
            }
        };
        backup::export_state_bundle(&snapshot, out_path)
            .map_err(|e| EngineError::Storage(e.to_string()))
    }

    /// Replaces the local working set from a backup bundle; the change flows
    /// to the remote through the regular debounce path.
    pub async fn restore_from_backup(&self, in_path: &Path) -> Result<(), EngineError> {
        let restored = backup::import_state_bundle(in_path)
            .map_err(|e| EngineError::Validation(e.to_string()))?;
        let mut st = self.lock().await;
        st.require_teacher()?;
        st.classes = restored.classes;
        st.matches = restored.matches;
        st.attendance = restored.attendance;
        self.persist_session(&st);
        let action = st.step(SyncEvent::LocalEdit);
        drop(st);
        self.after_step(action);
        Ok(())
    }

    pub async fn view(&self) -> EngineView {
        let st = self.lock().await;
        EngineView {
            teacher: st.teacher.clone(),
            classes: st.classes.clone(),
            matches: st.matches.clone(),
            attendance: st.attendance.clone(),
            global: st.global.clone(),
            phase: st.phase.name(),
            last_sync_error: st.last_sync_error.clone(),
            current_view: st.current_view.clone(),
            active_tab: st.active_tab.clone(),
        }
    }
}
