use crate::models::{
    ActivityRecord, ClassRoom, GameStatus, GameType, Match, MatchActivity, MatchWinner, Team,
    WinLoss,
};

/// Builds the activity record a team member earns when a match completes.
fn outcome_record(
    game: GameType,
    match_name: &str,
    team: &Team,
    opponent: &Team,
    member_role: crate::models::MemberRole,
    result: WinLoss,
    date: &str,
) -> ActivityRecord {
    let outcome = MatchActivity {
        date: date.to_string(),
        result: Some(result),
        role: Some(member_role),
        game_status: Some(GameStatus::Finished),
        match_name: Some(match_name.to_string()),
        team_name: Some(team.name.clone()),
        opponent_team_name: Some(opponent.name.clone()),
        rated_by: None,
    };
    match game {
        GameType::Sport => ActivityRecord::Sport(outcome),
        GameType::Robo => ActivityRecord::Robo {
            outcome,
            time: None,
        },
        GameType::Valheim => ActivityRecord::Valheim(outcome),
        GameType::Civilization => ActivityRecord::Civilization {
            outcome,
            civilization_year: None,
            civilization_defense_year: None,
            civilization_production1: None,
            civilization_production2: None,
            civilization_production3: None,
        },
        GameType::Factorio => ActivityRecord::Factorio {
            outcome,
            factorio_flasks: None,
        },
    }
}

/// Applies a completed match to the class roster: every member of the winning
/// team gets a "win" record for the match's game type, every member of the
/// losing team a "loss" record, each carrying the member's role and the
/// team/opponent names. Members whose student id is no longer in any class
/// are skipped.
pub fn apply_match_result(classes: &mut [ClassRoom], m: &Match, winner: MatchWinner, date: &str) {
    let match_name = format!("{} vs {}", m.team1.name, m.team2.name);
    let sides = [
        (
            &m.team1,
            &m.team2,
            if winner == MatchWinner::Team1 {
                WinLoss::Win
            } else {
                WinLoss::Loss
            },
        ),
        (
            &m.team2,
            &m.team1,
            if winner == MatchWinner::Team2 {
                WinLoss::Win
            } else {
                WinLoss::Loss
            },
        ),
    ];

    for (team, opponent, result) in sides {
        for member in &team.members {
            for class in classes.iter_mut() {
                if let Some(student) = class.students.iter_mut().find(|s| s.id == member.student_id)
                {
                    student.activities.push(outcome_record(
                        m.game_type,
                        &match_name,
                        team,
                        opponent,
                        member.role,
                        result,
                        date,
                    ));
                    break;
                }
            }
        }
    }
}
