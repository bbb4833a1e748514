use crate::models::{Match, ScheduledDate, Student};

/// Details of a scheduling collision: the existing match and the student ids
/// booked on both sides at the same date and time.
#[derive(Debug, Clone)]
pub struct ConflictInfo {
    pub conflicting_match: Match,
    pub conflicting_students: Vec<String>,
}

/// Scans every existing match's schedule for an exact (date, time) collision
/// with the proposed schedule, then intersects team rosters. First hit wins.
/// A plain O(matches x schedules x students) scan; data volume is a single
/// school.
pub fn check_schedule_conflicts(
    new_match_student_ids: &[String],
    new_scheduled_dates: &[ScheduledDate],
    existing_matches: &[Match],
) -> Option<ConflictInfo> {
    for new_date in new_scheduled_dates {
        for existing in existing_matches {
            if existing.scheduled_dates.is_empty() {
                continue;
            }
            for existing_date in &existing.scheduled_dates {
                if existing_date.date != new_date.date || existing_date.time != new_date.time {
                    continue;
                }
                let existing_ids = existing.student_ids();
                let conflicting: Vec<String> = new_match_student_ids
                    .iter()
                    .filter(|id| existing_ids.contains(id))
                    .cloned()
                    .collect();
                if !conflicting.is_empty() {
                    return Some(ConflictInfo {
                        conflicting_match: existing.clone(),
                        conflicting_students: conflicting,
                    });
                }
            }
        }
    }
    None
}

/// Display-name lookup for conflict reporting.
pub fn student_name(student_id: &str, all_students: &[&Student]) -> String {
    all_students
        .iter()
        .find(|s| s.id == student_id)
        .map(|s| s.name.clone())
        .unwrap_or_else(|| "Неизвестный".to_string())
}
