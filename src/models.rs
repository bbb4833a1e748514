use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Wire-compatible domain model. Field names follow the remote store's JSON
/// contract (camelCase), so these types serialize directly into sync payloads,
/// broadcast payloads and the local snapshot blobs.

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Teacher,
    Junior,
}

impl Role {
    /// Admins and full teachers hold the complete class/match sets locally;
    /// juniors only ever see their own slice.
    pub fn sees_everything(self) -> bool {
        matches!(self, Role::Admin | Role::Teacher)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Valheim,
    Civilization,
    Factorio,
    Sport,
    Robo,
}

impl GameType {
    pub fn label(self) -> &'static str {
        match self {
            GameType::Valheim => "Valheim",
            GameType::Civilization => "Civilization",
            GameType::Factorio => "Factorio",
            GameType::Sport => "Спорт",
            GameType::Robo => "Робототехника",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WinLoss {
    Win,
    Loss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Player,
    Captain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Ongoing,
    Finished,
}

/// Common payload of the activity variants that come out of a team match.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchActivity {
    #[serde(default)]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<WinLoss>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<MemberRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_status: Option<GameStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opponent_team_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rated_by: Option<String>,
}

/// Append-only per-student activity log entry, tagged by activity type on the
/// wire. Each variant carries its discipline-specific metrics plus the shared
/// date and optional rater identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ActivityRecord {
    Lumosity {
        #[serde(default)]
        date: String,
        #[serde(default)]
        points: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rated_by: Option<String>,
    },
    Robo {
        #[serde(flatten)]
        outcome: MatchActivity,
        /// Minutes; absent when the record came from a match result rather
        /// than a timed session.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time: Option<i64>,
    },
    Sport(MatchActivity),
    Valheim(MatchActivity),
    Civilization {
        #[serde(flatten)]
        outcome: MatchActivity,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        civilization_year: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        civilization_defense_year: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        civilization_production1: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        civilization_production2: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        civilization_production3: Option<String>,
    },
    Simcity {
        #[serde(default)]
        date: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        simcity_citizens: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        simcity_happiness: Option<i64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        simcity_production: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rated_by: Option<String>,
    },
    Factorio {
        #[serde(flatten)]
        outcome: MatchActivity,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        factorio_flasks: Option<i64>,
    },
    Pe3d {
        #[serde(default)]
        date: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rated_by: Option<String>,
    },
    Lumocity {
        #[serde(default)]
        date: String,
        #[serde(default)]
        points: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rated_by: Option<String>,
    },
}

impl ActivityRecord {
    pub fn date(&self) -> &str {
        match self {
            ActivityRecord::Lumosity { date, .. }
            | ActivityRecord::Simcity { date, .. }
            | ActivityRecord::Pe3d { date, .. }
            | ActivityRecord::Lumocity { date, .. } => date,
            ActivityRecord::Sport(m) | ActivityRecord::Valheim(m) => &m.date,
            ActivityRecord::Robo { outcome, .. }
            | ActivityRecord::Civilization { outcome, .. }
            | ActivityRecord::Factorio { outcome, .. } => &outcome.date,
        }
    }
}

/// One soft-skill rating pass over a student, 1..=5 per axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoftSkillRating {
    pub leadership: i64,
    pub self_control: i64,
    pub communication: i64,
    pub self_reflection: i64,
    pub critical_thinking: i64,
    #[serde(default)]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rated_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub points: i64,
    #[serde(default)]
    pub achievements: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activities: Vec<ActivityRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub soft_skills: Vec<SoftSkillRating>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRoom {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible_teacher_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enabled_games: Vec<GameType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamMember {
    pub student_id: String,
    pub student_name: String,
    pub class_name: String,
    pub role: MemberRole,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<TeamMember>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledDate {
    pub id: String,
    pub date: String,
    pub time: String,
}

/// Per-match discipline tally: an integer score per student id. A match holds
/// at most [`MAX_DISCIPLINE_COUNTERS`] of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisciplineCounter {
    pub name: String,
    #[serde(default)]
    pub scores: HashMap<String, i64>,
}

pub const MAX_DISCIPLINE_COUNTERS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchWinner {
    #[serde(rename = "team1")]
    Team1,
    #[serde(rename = "team2")]
    Team2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    pub game_type: GameType,
    pub team1: Team,
    pub team2: Team,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<MatchWinner>,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub completed: bool,
    /// Teacher name (not id) of the session that created the match; junior
    /// visibility filters on this.
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scheduled_dates: Vec<ScheduledDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub league: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discipline_counters: Vec<DisciplineCounter>,
}

impl Match {
    /// Every student id across both teams.
    pub fn student_ids(&self) -> Vec<String> {
        self.team1
            .members
            .iter()
            .chain(self.team2.members.iter())
            .map(|m| m.student_id.clone())
            .collect()
    }
}

/// Absence marker: a record for (student, date) means the student was absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: String,
    pub student_id: String,
    pub date: String,
    #[serde(default)]
    pub created_at: String,
}

/// The server-of-record aggregate every client reconciles against.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalData {
    #[serde(default)]
    pub teachers: Vec<Teacher>,
    #[serde(default)]
    pub classes: Vec<ClassRoom>,
    #[serde(default)]
    pub matches: Vec<Match>,
    #[serde(default)]
    pub attendance: Vec<AttendanceRecord>,
}

/// Resumable session blob persisted in the local snapshot store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppStateSnapshot {
    pub teacher: Teacher,
    #[serde(default)]
    pub classes: Vec<ClassRoom>,
    #[serde(default)]
    pub matches: Vec<Match>,
    #[serde(default)]
    pub attendance: Vec<AttendanceRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_view: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_tab: Option<String>,
}
