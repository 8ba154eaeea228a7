use geo_owl::adapters::intake::{
    parse_closed_teams, parse_room_list, parse_shuffle_input, read_census, read_patients,
};
use geo_owl::app::report::{render_placement, render_redistribution, render_shuffle};
use geo_owl::core::placer::analyze_shuffle;
use geo_owl::domain::placement::{is_imcu, Census, MoveReason};
use geo_owl::{Placer, TomlConfig};
use std::io::Write;
use tempfile::NamedTempFile;

const CENSUS_CSV: &str = "team,census
1,10
2,10
3,9
4,11
5,8
6,12
7,7
8,13
9,6
10,9
11,10
12,13
13,12
14,NA
15,X
";

#[test]
fn test_overnight_distribution_from_files() {
    let mut census_file = NamedTempFile::new().unwrap();
    census_file.write_all(CENSUS_CSV.as_bytes()).unwrap();
    let census = read_census(std::fs::File::open(census_file.path()).unwrap()).unwrap();

    let patients = "IMCU\n312A\n545B\n877\nED\n712\n545b\ndone\n";
    let list = read_patients(patients.as_bytes(), true).unwrap();
    assert_eq!(list.patients.len(), 6);
    assert_eq!(list.duplicates, vec!["545b"]);

    let placer = Placer::default();
    let outcome = placer.optimize(&list.patients, &census);

    assert_eq!(outcome.assignments.len(), 6);
    assert!(outcome.unplaced.is_empty());
    for a in &outcome.assignments {
        assert!(a.team != 14 && a.team != 15, "closed team used: {:?}", a);
        if is_imcu(a.team) {
            assert!(outcome.final_census.get(a.team) <= 10);
        }
    }

    // IMCU 與 312A 都只能給 Med 3 (Med 1/2 已滿)，第二位會因硬上限改派
    let med3 = outcome.assignments.iter().filter(|a| a.team == 3).count();
    assert_eq!(med3, 1);

    let total_before: u32 = (1..=15).map(|t| census.get(t)).sum();
    let total_after: u32 = (1..=15).map(|t| outcome.final_census.get(t)).sum();
    assert_eq!(total_after, total_before + 6);

    let report = render_placement(&outcome, placer.rules());
    assert!(report.contains("Total patients to place: 6"));
    assert!(report.contains("Med 14    --   CLOSED"));
}

#[test]
fn test_rules_from_config_change_outcome() {
    let census = Census::new().with_count(5, 15).with_count(10, 15);
    let list = read_patients("512\n".as_bytes(), true).unwrap();

    let default_outcome = Placer::default().optimize(&list.patients, &census);
    assert!(!default_outcome.assignments[0].is_geographic);

    let config = TomlConfig::from_toml_str("[placement]\nsoft_cap = 30\nmax_census_gap = 20\n")
        .unwrap();
    let relaxed = Placer::new(config.placement_rules()).optimize(&list.patients, &census);
    assert!(relaxed.assignments[0].is_geographic);
    assert_eq!(relaxed.assignments[0].team, 5);
}

#[test]
fn test_quick_mode_uses_empty_census() {
    let list = read_patients("512\n512\n512\n512\n".as_bytes(), false).unwrap();
    let outcome = Placer::default().optimize(&list.patients, &Census::new());

    let teams: Vec<u8> = outcome.assignments.iter().map(|a| a.team).collect();
    assert_eq!(teams, vec![5, 10, 5, 10]);
    assert!(outcome.assignments.iter().all(|a| a.is_geographic));
}

#[test]
fn test_monday_shuffle_flow() {
    let text = "304A 1\n343B 5\n534 Med 10\n435A 7\n877 4\nnonsense\n";
    let closed = parse_closed_teams("14, 15");
    let input = parse_shuffle_input(text);
    assert_eq!(input.patients.len(), 5);
    assert_eq!(input.warnings.len(), 1);

    let analysis = analyze_shuffle(&input.patients, &closed);
    let ok: Vec<&str> = analysis.already_ok.iter().map(|p| p.room.as_str()).collect();
    assert_eq!(ok, vec!["304A", "534"]);
    assert_eq!(analysis.needs_reassignment.len(), 3);

    let report = render_shuffle(&analysis, &closed);
    assert!(report.contains("343B: Med 5 -> Med 1, Med 2, Med 3"));
    assert!(report.contains("435A: Med 7 -> Med 4, Med 11"));
    assert!(report.contains("877: Med 4 -> Med 12, Med 6"));
}

#[test]
fn test_monday_redistribution_flow() {
    let text = "304A\n343B\n534\n912\nED bay\n304a\n";
    let closed = parse_closed_teams("14, 15");
    let (entries, warnings) = parse_room_list(text);
    assert_eq!(entries.len(), 4);
    assert_eq!(warnings.len(), 1);

    let plan = Placer::default().redistribute(&entries, &closed);

    let teams: Vec<(&str, u8)> = plan
        .assignments
        .iter()
        .map(|a| (a.entry.room.as_str(), a.team))
        .collect();
    assert_eq!(teams, vec![("304A", 1), ("343B", 2), ("534", 5), ("912", 12)]);
    assert!(plan
        .assignments
        .iter()
        .all(|a| a.reason == MoveReason::Geographic));

    let report = render_redistribution(&plan, &closed);
    assert!(report.contains("Total patients: 4"));
    assert!(report.contains("912 -> Med 12  (Geographic)"));
    assert!(report.contains("Med 14: CLOSED"));
    assert!(!report.contains("Patients moving"));
}
