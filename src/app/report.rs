use crate::domain::placement::{
    is_imcu, team_floors, PlacementOutcome, PlacementRules, RedistributionPlan, ShuffleAnalysis,
    Team, ALL_TEAMS,
};
use std::collections::BTreeSet;
use std::fmt::Write;

const RULE: &str = "------------------------------------------------------------";
const BANNER: &str = "============================================================";

fn floors_for(team: Team) -> String {
    team_floors(team).join(", ")
}

/// 分配結果的文字報表
pub fn render_placement(outcome: &PlacementOutcome, rules: &PlacementRules) -> String {
    let mut out = String::new();
    // 寫入 String 不會失敗
    let _ = write_placement(&mut out, outcome, rules);
    out
}

fn write_placement(
    out: &mut String,
    outcome: &PlacementOutcome,
    rules: &PlacementRules,
) -> std::fmt::Result {
    let total = outcome.assignments.len();
    let geo = outcome.geographic_count();
    let geo_pct = if total > 0 { 100 * geo / total } else { 0 };

    writeln!(out, "{}", BANNER)?;
    writeln!(out, "RECOMMENDED ASSIGNMENTS")?;
    writeln!(out, "{}", BANNER)?;
    writeln!(out)?;
    writeln!(out, "Total patients to place: {}", total)?;
    writeln!(out, "Geographic placements: {} ({}%)", geo, geo_pct)?;
    writeln!(out, "Non-geographic: {}", total - geo)?;

    if !outcome.unplaced.is_empty() {
        let names: Vec<&str> = outcome
            .unplaced
            .iter()
            .map(|p| p.raw_location.as_str())
            .collect();
        writeln!(out, "Unplaced (no open teams): {}", names.join(", "))?;
    }

    writeln!(out)?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "BY TEAM:")?;
    writeln!(out, "{}", RULE)?;

    for team in ALL_TEAMS {
        let team_assignments = outcome.assignments_for(team);
        let start = outcome.starting_census.get(team);
        let end = outcome.final_census.get(team);
        if team_assignments.is_empty() && end == 0 {
            continue;
        }

        let imcu_marker = if is_imcu(team) {
            format!(" [IMCU cap:{}]", rules.imcu_cap)
        } else {
            String::new()
        };
        writeln!(out)?;
        writeln!(out, "Med {} ({}){}", team, floors_for(team), imcu_marker)?;
        writeln!(
            out,
            "  Census: {} → {} (+{} new)",
            start,
            end,
            team_assignments.len()
        )?;
        for a in team_assignments {
            let marker = if a.is_geographic { "✓" } else { "✗" };
            let floor = a
                .patient
                .floor
                .as_ref()
                .map(|f| f.label())
                .unwrap_or_else(|| "?".to_string());
            writeln!(out, "    {} {:15} ({})", marker, a.patient.raw_location, floor)?;
        }
    }

    writeln!(out)?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "ASSIGNMENT LIST (copy/paste ready):")?;
    writeln!(out, "{}", RULE)?;
    writeln!(out)?;
    for a in &outcome.assignments {
        let marker = if a.is_geographic { "GEO" } else { "   " };
        writeln!(
            out,
            "  {:15} → Med {:2}  {}",
            a.patient.raw_location, a.team, marker
        )?;
    }

    writeln!(out)?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "FINAL CENSUS SUMMARY:")?;
    writeln!(out, "{}", RULE)?;
    writeln!(out)?;
    writeln!(out, "  Team    Start  +New  =Final")?;
    writeln!(out, "  {}", "-".repeat(30))?;

    for team in ALL_TEAMS {
        let imcu = if is_imcu(team) { "*" } else { " " };
        if outcome.starting_census.is_closed(team) {
            writeln!(out, "  Med {:2}{}   --   CLOSED", team, imcu)?;
            continue;
        }

        let start = outcome.starting_census.get(team);
        let end = outcome.final_census.get(team);
        let mut bar = "█".repeat(end.min(20) as usize);
        if end > 20 {
            bar.push('+');
        }
        let warning = if is_imcu(team) && end >= rules.imcu_cap {
            " ⚠️ AT CAP"
        } else if !is_imcu(team) && end >= rules.soft_cap {
            " ⚠️ HIGH"
        } else {
            ""
        };
        writeln!(
            out,
            "  Med {:2}{}  {:3}   +{:2}   ={:3}  {}{}",
            team,
            imcu,
            start,
            end.saturating_sub(start),
            end,
            bar,
            warning
        )?;
    }

    writeln!(out)?;
    writeln!(out, "  * = IMCU team (hard cap: {})", rules.imcu_cap)?;
    writeln!(out, "  Other teams soft cap: {}", rules.soft_cap)?;
    Ok(())
}

/// 週一重新分配的文字報表
pub fn render_shuffle(analysis: &ShuffleAnalysis, closed: &BTreeSet<Team>) -> String {
    let mut out = String::new();
    let _ = write_shuffle(&mut out, analysis, closed);
    out
}

fn write_shuffle(
    out: &mut String,
    analysis: &ShuffleAnalysis,
    closed: &BTreeSet<Team>,
) -> std::fmt::Result {
    let total = analysis.needs_reassignment.len() + analysis.already_ok.len();
    writeln!(out, "Total patients: {}", total)?;
    writeln!(out, "Need reassignment: {}", analysis.needs_reassignment.len())?;
    writeln!(out, "Already OK: {}", analysis.already_ok.len())?;

    let mut wrong: Vec<_> = analysis.needs_reassignment.iter().collect();
    wrong.sort_by(|a, b| a.patient.room.cmp(&b.patient.room));
    let mut ok: Vec<_> = analysis.already_ok.iter().collect();
    ok.sort_by(|a, b| a.room.cmp(&b.room));

    writeln!(out)?;
    writeln!(out, "NEEDS REASSIGNMENT")?;
    writeln!(out, "{}", RULE)?;
    if wrong.is_empty() {
        writeln!(out, "All patients are on acceptable teams!")?;
    }
    for r in &wrong {
        if r.acceptable_teams.is_empty() {
            writeln!(
                out,
                "{}: Med {} -> ? (no geo match)",
                r.patient.room, r.patient.current_team
            )?;
        } else {
            let options: Vec<String> = r
                .acceptable_teams
                .iter()
                .map(|t| format!("Med {}", t))
                .collect();
            writeln!(
                out,
                "{}: Med {} -> {}",
                r.patient.room,
                r.patient.current_team,
                options.join(", ")
            )?;
        }
    }

    writeln!(out)?;
    writeln!(out, "ALREADY ON CORRECT TEAM")?;
    writeln!(out, "{}", RULE)?;
    for p in &ok {
        writeln!(out, "{}: Med {} OK", p.room, p.current_team)?;
    }

    writeln!(out)?;
    writeln!(out, "CURRENT CENSUS BY TEAM")?;
    writeln!(out, "{}", RULE)?;
    for team in ALL_TEAMS {
        if closed.contains(&team) {
            writeln!(out, "Med {:2}: CLOSED", team)?;
            continue;
        }
        let count = analysis
            .needs_reassignment
            .iter()
            .map(|r| &r.patient)
            .chain(analysis.already_ok.iter())
            .filter(|p| p.current_team == team)
            .count();
        writeln!(out, "Med {:2}: {:2} patients", team, count)?;
    }

    if !wrong.is_empty() {
        writeln!(out)?;
        writeln!(out, "REASSIGNMENT LIST")?;
        writeln!(out, "Room       From    To Options")?;
        writeln!(out, "{}", "-".repeat(40))?;
        for r in &wrong {
            if r.acceptable_teams.is_empty() {
                writeln!(
                    out,
                    "{:10} Med {:2}  ? (check location)",
                    r.patient.room, r.patient.current_team
                )?;
            } else {
                let options: Vec<String> =
                    r.acceptable_teams.iter().map(|t| t.to_string()).collect();
                writeln!(
                    out,
                    "{:10} Med {:2}  Med {}",
                    r.patient.room,
                    r.patient.current_team,
                    options.join("/")
                )?;
            }
        }
    }

    Ok(())
}

/// 重新分配結果的文字報表
pub fn render_redistribution(plan: &RedistributionPlan, closed: &BTreeSet<Team>) -> String {
    let mut out = String::new();
    let _ = write_redistribution(&mut out, plan, closed);
    out
}

fn write_redistribution(
    out: &mut String,
    plan: &RedistributionPlan,
    closed: &BTreeSet<Team>,
) -> std::fmt::Result {
    writeln!(out, "Total patients: {}", plan.assignments.len())?;
    let has_current_teams = plan
        .assignments
        .iter()
        .any(|a| a.entry.current_team.is_some());
    if has_current_teams {
        writeln!(out, "Patients moving: {}", plan.moving())?;
        writeln!(
            out,
            "Staying put: {}",
            plan.assignments.len() - plan.moving()
        )?;
    }

    let mut sorted: Vec<_> = plan.assignments.iter().collect();
    sorted.sort_by(|a, b| a.entry.room.cmp(&b.entry.room));

    writeln!(out)?;
    writeln!(out, "TEAM ASSIGNMENTS")?;
    writeln!(out, "{}", RULE)?;
    for a in &sorted {
        match a.entry.current_team {
            None => writeln!(out, "{} -> Med {}  ({})", a.entry.room, a.team, a.reason)?,
            Some(current) => {
                let marker = if a.is_move() { "->" } else { "=" };
                writeln!(
                    out,
                    "{}: Med {} {} Med {}  ({})",
                    a.entry.room, current, marker, a.team, a.reason
                )?
            }
        }
    }
    for entry in &plan.unassigned {
        writeln!(out, "{} -> ? (no open team)", entry.room)?;
    }

    writeln!(out)?;
    writeln!(out, "NEW CENSUS BY TEAM")?;
    writeln!(out, "{}", RULE)?;
    for team in ALL_TEAMS {
        if closed.contains(&team) {
            writeln!(out, "Med {:2}: CLOSED", team)?;
            continue;
        }
        let imcu = if is_imcu(team) { "*" } else { " " };
        writeln!(
            out,
            "Med {:2}{}: {:2} patients",
            team,
            imcu,
            plan.count_for(team)
        )?;
    }
    writeln!(out)?;
    writeln!(out, "  * = IMCU")?;
    Ok(())
}
