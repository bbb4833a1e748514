use crate::models::{
    ActivityRecord, ClassRoom, GameStatus, Match, MatchActivity, MatchWinner, MemberRole, Role,
    Teacher, WinLoss,
};
use serde::Serialize;
use serde_json::{json, Value};

/// Tabular workbook data. Cell formatting and file generation belong to the
/// spreadsheet collaborator; this module only assembles sheets keyed by the
/// fixed column headers the collaborator expects.
#[derive(Debug, Clone, Serialize)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Sheet {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Sheet {
    fn new(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }
}

fn role_label(role: MemberRole) -> &'static str {
    match role {
        MemberRole::Captain => "Капитан",
        MemberRole::Player => "Игрок",
    }
}

fn result_label(result: Option<WinLoss>) -> &'static str {
    match result {
        Some(WinLoss::Win) => "Победа",
        Some(WinLoss::Loss) => "Поражение",
        None => "-",
    }
}

fn status_label(status: Option<GameStatus>) -> &'static str {
    match status {
        Some(GameStatus::Finished) => "Закончена",
        Some(GameStatus::Ongoing) => "Идет игра",
        None => "-",
    }
}

fn opt_str(v: &Option<String>) -> Value {
    json!(v.as_deref().unwrap_or("-"))
}

fn opt_num(v: Option<i64>) -> Value {
    match v {
        Some(n) => json!(n),
        None => json!("-"),
    }
}

const OUTCOME_COLUMNS: [&str; 6] = [
    "Название матча",
    "Команда",
    "Противник",
    "Роль",
    "Результат",
    "Статус игры",
];

fn outcome_cells(m: &MatchActivity) -> Vec<Value> {
    vec![
        opt_str(&m.match_name),
        opt_str(&m.team_name),
        opt_str(&m.opponent_team_name),
        json!(m.role.map(role_label).unwrap_or("Игрок")),
        json!(result_label(m.result)),
        json!(status_label(m.game_status)),
    ]
}

struct SummaryCounters {
    lumosity_points: i64,
    robo_minutes: i64,
    sport_wins: i64,
    sport_losses: i64,
    sport_captain: i64,
    sport_player: i64,
}

fn summarize(activities: &[ActivityRecord]) -> SummaryCounters {
    let mut c = SummaryCounters {
        lumosity_points: 0,
        robo_minutes: 0,
        sport_wins: 0,
        sport_losses: 0,
        sport_captain: 0,
        sport_player: 0,
    };
    for a in activities {
        match a {
            ActivityRecord::Lumosity { points, .. } => c.lumosity_points += points,
            ActivityRecord::Robo { time, .. } => c.robo_minutes += time.unwrap_or(0),
            ActivityRecord::Sport(m) => {
                match m.result {
                    Some(WinLoss::Win) => c.sport_wins += 1,
                    Some(WinLoss::Loss) => c.sport_losses += 1,
                    None => {}
                }
                match m.role {
                    Some(MemberRole::Captain) => c.sport_captain += 1,
                    Some(MemberRole::Player) => c.sport_player += 1,
                    None => {}
                }
            }
            _ => {}
        }
    }
    c
}

/// Per-class activity report. The summary sheet is always present, even with
/// zero students; discipline sheets are emitted only when they have rows.
pub fn class_report_workbook(classes: &[ClassRoom]) -> Workbook {
    let mut summary = Sheet::new(
        "Общая сводка",
        &[
            "ФИО",
            "Класс",
            "Люмосити (баллы)",
            "Робо (время мин)",
            "Спорт Побед",
            "Спорт Проигрышей",
            "Спорт Капитаном",
            "Спорт Игроком",
        ],
    );
    let mut lumosity = Sheet::new("Люмосити", &["ФИО", "Класс", "Дата", "Баллы"]);
    let mut robo = Sheet::new("Робо", &["ФИО", "Класс", "Дата", "Время (мин)"]);

    let mut sport_columns = vec!["ФИО", "Класс", "Дата"];
    sport_columns.extend(OUTCOME_COLUMNS);
    let mut sport = Sheet::new("Спорт", &sport_columns);
    let mut valheim = Sheet::new("Вальхейм", &sport_columns);

    let mut civ_columns = sport_columns.clone();
    civ_columns.extend([
        "Год объявления",
        "Год защиты",
        "Производство 1",
        "Производство 2",
        "Производство 3",
    ]);
    let mut civilization = Sheet::new("Цивилизация", &civ_columns);

    let mut simcity = Sheet::new(
        "Симсити",
        &[
            "ФИО",
            "Класс",
            "Дата",
            "Количество граждан",
            "Уровень счастья",
            "Производство",
        ],
    );

    let mut factorio_columns = sport_columns.clone();
    factorio_columns.push("Количество колб");
    let mut factorio = Sheet::new("Факторио", &factorio_columns);

    let mut pe3d = Sheet::new("3D Физкультура", &["ФИО", "Класс", "Дата"]);
    let mut lumocity = Sheet::new("Люмосити Сити", &["ФИО", "Класс", "Дата", "Баллы"]);

    for class in classes {
        for student in &class.students {
            let counters = summarize(&student.activities);
            summary.rows.push(vec![
                json!(student.name),
                json!(class.name),
                json!(counters.lumosity_points),
                json!(counters.robo_minutes),
                json!(counters.sport_wins),
                json!(counters.sport_losses),
                json!(counters.sport_captain),
                json!(counters.sport_player),
            ]);

            for activity in &student.activities {
                let base = vec![
                    json!(student.name),
                    json!(class.name),
                    json!(activity.date()),
                ];
                match activity {
                    ActivityRecord::Lumosity { points, .. } => {
                        let mut row = base;
                        row.push(json!(points));
                        lumosity.rows.push(row);
                    }
                    ActivityRecord::Robo { time, .. } => {
                        let mut row = base;
                        row.push(json!(time.unwrap_or(0)));
                        robo.rows.push(row);
                    }
                    ActivityRecord::Sport(m) => {
                        let mut row = base;
                        row.extend(outcome_cells(m));
                        sport.rows.push(row);
                    }
                    ActivityRecord::Valheim(m) => {
                        let mut row = base;
                        row.extend(outcome_cells(m));
                        valheim.rows.push(row);
                    }
                    ActivityRecord::Civilization {
                        outcome,
                        civilization_year,
                        civilization_defense_year,
                        civilization_production1,
                        civilization_production2,
                        civilization_production3,
                    } => {
                        let mut row = base;
                        row.extend(outcome_cells(outcome));
                        row.push(opt_num(*civilization_year));
                        row.push(opt_num(*civilization_defense_year));
                        row.push(opt_str(civilization_production1));
                        row.push(opt_str(civilization_production2));
                        row.push(opt_str(civilization_production3));
                        civilization.rows.push(row);
                    }
                    ActivityRecord::Simcity {
                        simcity_citizens,
                        simcity_happiness,
                        simcity_production,
                        ..
                    } => {
                        let mut row = base;
                        row.push(opt_num(*simcity_citizens));
                        row.push(opt_num(*simcity_happiness));
                        row.push(opt_str(simcity_production));
                        simcity.rows.push(row);
                    }
                    ActivityRecord::Factorio {
                        outcome,
                        factorio_flasks,
                    } => {
                        let mut row = base;
                        row.extend(outcome_cells(outcome));
                        row.push(opt_num(*factorio_flasks));
                        factorio.rows.push(row);
                    }
                    ActivityRecord::Pe3d { .. } => {
                        pe3d.rows.push(base);
                    }
                    ActivityRecord::Lumocity { points, .. } => {
                        let mut row = base;
                        row.push(json!(points));
                        lumocity.rows.push(row);
                    }
                }
            }
        }
    }

    let mut sheets = vec![summary];
    for sheet in [
        lumosity,
        robo,
        sport,
        valheim,
        civilization,
        simcity,
        factorio,
        pe3d,
        lumocity,
    ] {
        if !sheet.rows.is_empty() {
            sheets.push(sheet);
        }
    }
    Workbook { sheets }
}

fn teacher_role_label(role: Role) -> &'static str {
    match role {
        Role::Admin => "Администратор",
        Role::Teacher => "Учитель",
        Role::Junior => "МНС",
    }
}

/// Admin overview workbook: teachers, classes, students, matches and totals.
/// Credentials are never exported.
pub fn admin_workbook(teachers: &[Teacher], classes: &[ClassRoom], matches: &[Match]) -> Workbook {
    let mut teachers_sheet = Sheet::new("Учителя", &["ФИО", "Email", "Роль", "Дата регистрации"]);
    for t in teachers {
        teachers_sheet.rows.push(vec![
            json!(t.name),
            json!(if t.email.is_empty() { "-" } else { &t.email }),
            json!(teacher_role_label(t.role)),
            json!(t.created_at),
        ]);
    }

    let mut classes_sheet = Sheet::new("Классы", &["Класс", "Количество учеников", "Ответственный"]);
    for c in classes {
        let responsible = c
            .responsible_teacher_id
            .as_ref()
            .and_then(|id| teachers.iter().find(|t| &t.id == id))
            .map(|t| t.name.clone())
            .unwrap_or_else(|| "Не назначен".to_string());
        classes_sheet.rows.push(vec![
            json!(c.name),
            json!(c.students.len()),
            json!(responsible),
        ]);
    }

    let mut students_sheet = Sheet::new("Ученики", &["Класс", "ФИО ученика", "Баллы", "Достижения"]);
    for c in classes {
        for s in &c.students {
            let achievements = if s.achievements.is_empty() {
                "-".to_string()
            } else {
                s.achievements.join(", ")
            };
            students_sheet.rows.push(vec![
                json!(c.name),
                json!(s.name),
                json!(s.points),
                json!(achievements),
            ]);
        }
    }

    let mut matches_sheet = Sheet::new(
        "Матчи",
        &[
            "Тип игры",
            "Команда 1",
            "Команда 2",
            "Дата",
            "Статус",
            "Результат",
            "Создал",
        ],
    );
    for m in matches {
        let result = match m.result {
            Some(MatchWinner::Team1) => "Победа команды 1",
            Some(MatchWinner::Team2) => "Победа команды 2",
            None => "Не определён",
        };
        matches_sheet.rows.push(vec![
            json!(m.game_type.label()),
            json!(m.team1.name),
            json!(m.team2.name),
            json!(m.date),
            json!(if m.completed { "Завершён" } else { "В процессе" }),
            json!(result),
            json!(m.created_by),
        ]);
    }

    let total_students: usize = classes.iter().map(|c| c.students.len()).sum();
    let completed = matches.iter().filter(|m| m.completed).count();
    let count_role = |role: Role| teachers.iter().filter(|t| t.role == role).count();
    let mut stats = Sheet::new("Статистика", &["Показатель", "Значение"]);
    for (label, value) in [
        ("Администраторов", count_role(Role::Admin)),
        ("Учителей", count_role(Role::Teacher)),
        ("Младших научных сотрудников", count_role(Role::Junior)),
        ("Всего учеников", total_students),
        ("Всего матчей", matches.len()),
        ("Завершённых матчей", completed),
    ] {
        stats.rows.push(vec![json!(label), json!(value)]);
    }

    Workbook {
        sheets: vec![
            teachers_sheet,
            classes_sheet,
            students_sheet,
            matches_sheet,
            stats,
        ],
    }
}
