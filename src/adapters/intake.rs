use crate::core::floor::normalize_floor;
use crate::domain::placement::{
    is_valid_team, Census, ExistingPatient, Patient, RoomEntry, Team,
};
use crate::utils::error::{GeoOwlError, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeSet, HashSet};
use std::io::{BufRead, Read};
use std::sync::OnceLock;

const CLOSED_MARKERS: [&str; 5] = ["NA", "X", "CLOSED", "N/A", "-"];

#[derive(Debug, Deserialize)]
struct CensusRow {
    team: String,
    #[serde(default)]
    census: Option<String>,
}

fn team_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(?:MED\s*)?(\d{1,2})$").unwrap())
}

fn parse_team(value: &str, line: usize) -> Result<Team> {
    let team = team_pattern()
        .captures(value.trim())
        .and_then(|caps| caps[1].parse::<Team>().ok())
        .filter(|t| is_valid_team(*t));

    team.ok_or_else(|| GeoOwlError::InputError {
        line,
        message: format!("'{}' is not a team between 1 and 15", value),
    })
}

/// 讀取 `team,census` 格式的 CSV
///
/// 空白視為 0，`NA`/`X`/`CLOSED`/`N/A`/`-` 代表團隊關閉，未列出的團隊視為 0。
pub fn read_census<R: Read>(reader: R) -> Result<Census> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut census = Census::new();
    for (index, row) in csv_reader.deserialize::<CensusRow>().enumerate() {
        let line = index + 2;
        let row = row?;
        let team = parse_team(&row.team, line)?;
        let value = row.census.unwrap_or_default().to_uppercase();

        if CLOSED_MARKERS.contains(&value.as_str()) {
            census.close(team);
            continue;
        }

        let count = if value.is_empty() {
            0
        } else {
            value.parse::<u32>().map_err(|_| GeoOwlError::InputError {
                line,
                message: format!("Med {}: enter a number, or NA/X if closed", team),
            })?
        };
        census.set(team, count);
    }

    tracing::debug!(
        "Loaded census, closed teams: {:?}",
        census.closed_teams()
    );
    Ok(census)
}

#[derive(Debug, Clone, Default)]
pub struct PatientList {
    pub patients: Vec<Patient>,
    pub duplicates: Vec<String>,
}

/// 每行一個位置，遇到 `done` 結束
pub fn read_patients<R: BufRead>(reader: R, skip_duplicates: bool) -> Result<PatientList> {
    let mut list = PatientList::default();
    let mut seen: HashSet<String> = HashSet::new();

    for line in reader.lines() {
        let line = line?;
        let location = line.trim();

        if location.eq_ignore_ascii_case("done") {
            break;
        }
        if location.is_empty() {
            continue;
        }

        if skip_duplicates && !seen.insert(location.to_uppercase()) {
            tracing::info!("Duplicate location {} skipped", location);
            list.duplicates.push(location.to_string());
            continue;
        }

        let floor = normalize_floor(location);
        list.patients.push(Patient {
            identifier: format!("Pt{}", list.patients.len() + 1),
            floor,
            raw_location: location.to_string(),
        });
    }

    Ok(list)
}

/// 逗號分隔的關閉團隊清單，無法辨識的項目直接忽略
pub fn parse_closed_teams(input: &str) -> BTreeSet<Team> {
    input
        .split(',')
        .filter_map(|t| t.trim().parse::<Team>().ok())
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct ShuffleInput {
    pub patients: Vec<ExistingPatient>,
    pub warnings: Vec<String>,
}

struct ShufflePatterns {
    room: Regex,
    team: Regex,
}

fn shuffle_patterns() -> &'static ShufflePatterns {
    static PATTERNS: OnceLock<ShufflePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| ShufflePatterns {
        room: Regex::new(r"(?i)\b(\d{3}[A-Z]?)\b").unwrap(),
        team: Regex::new(r"(?i)(?:Med\s*)?(\d{1,2})\b").unwrap(),
    })
}

/// 解析 `<房號> [Med] <團隊>` 格式的在院病人清單
pub fn parse_shuffle_input(text: &str) -> ShuffleInput {
    let p = shuffle_patterns();
    let mut input = ShuffleInput::default();
    let mut seen_rooms: HashSet<String> = HashSet::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some(room_match) = p.room.captures(line).and_then(|c| c.get(1)) else {
            input.warnings.push(format!("No room found: {}", line));
            continue;
        };
        let room = room_match.as_str().to_uppercase();

        let rest = &line[room_match.end()..];
        let Some(team) = p
            .team
            .captures(rest)
            .and_then(|c| c[1].parse::<Team>().ok())
        else {
            input.warnings.push(format!("No team found: {}", line));
            continue;
        };

        if !is_valid_team(team) {
            input.warnings.push(format!("Invalid team {}: {}", team, line));
            continue;
        }

        if !seen_rooms.insert(room.clone()) {
            continue;
        }

        input.patients.push(ExistingPatient {
            floor: normalize_floor(&room),
            room,
            current_team: team,
        });
    }

    input
}

/// 解析重新分配用的房號清單，每行一個房號，後面可附目前團隊
pub fn parse_room_list(text: &str) -> (Vec<RoomEntry>, Vec<String>) {
    let p = shuffle_patterns();
    let mut entries = Vec::new();
    let mut warnings = Vec::new();
    let mut seen_rooms: HashSet<String> = HashSet::new();

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some(room_match) = p.room.captures(line).and_then(|c| c.get(1)) else {
            warnings.push(format!("No room found: {}", line));
            continue;
        };
        let room = room_match.as_str().to_uppercase();
        if !seen_rooms.insert(room.clone()) {
            continue;
        }

        let current_team = p
            .team
            .captures(&line[room_match.end()..])
            .and_then(|c| c[1].parse::<Team>().ok())
            .filter(|t| is_valid_team(*t));

        entries.push(RoomEntry {
            floor: normalize_floor(&room),
            room,
            current_team,
        });
    }

    (entries, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_census() {
        let data = "team,census\n1,8\nMed 2,\n5,12\n14,NA\n15,x\n";
        let census = read_census(data.as_bytes()).unwrap();

        assert_eq!(census.get(1), 8);
        assert_eq!(census.get(2), 0);
        assert_eq!(census.get(5), 12);
        assert_eq!(census.get(7), 0);
        assert!(census.is_closed(14));
        assert!(census.is_closed(15));
        assert!(!census.is_closed(5));
    }

    #[test]
    fn test_read_census_rejects_bad_values() {
        let err = read_census("team,census\n3,lots\n".as_bytes()).unwrap_err();
        assert!(matches!(err, GeoOwlError::InputError { line: 2, .. }));

        let err = read_census("team,census\n16,4\n".as_bytes()).unwrap_err();
        assert!(matches!(err, GeoOwlError::InputError { .. }));
    }

    #[test]
    fn test_read_patients_skips_duplicates_and_stops_at_done() {
        let input = "512\n\n545B\n512\n877\ndone\n312\n";
        let list = read_patients(input.as_bytes(), true).unwrap();

        let locations: Vec<&str> = list
            .patients
            .iter()
            .map(|p| p.raw_location.as_str())
            .collect();
        assert_eq!(locations, vec!["512", "545B", "877"]);
        assert_eq!(list.duplicates, vec!["512"]);
        assert_eq!(list.patients[2].identifier, "Pt3");
    }

    #[test]
    fn test_read_patients_quick_mode_keeps_duplicates() {
        let list = read_patients("512\n512\n".as_bytes(), false).unwrap();
        assert_eq!(list.patients.len(), 2);
        assert!(list.duplicates.is_empty());
    }

    #[test]
    fn test_parse_closed_teams() {
        let closed = parse_closed_teams("14, 15,abc, 3");
        assert_eq!(closed.into_iter().collect::<Vec<_>>(), vec![3, 14, 15]);
    }

    #[test]
    fn test_parse_shuffle_input() {
        let text = "304A 1\n343b Med 5\nhello\n534 Med 10\n435A 22\n304A 2\n612\n";
        let input = parse_shuffle_input(text);

        let rooms: Vec<(&str, Team)> = input
            .patients
            .iter()
            .map(|p| (p.room.as_str(), p.current_team))
            .collect();
        assert_eq!(rooms, vec![("304A", 1), ("343B", 5), ("534", 10)]);
        assert_eq!(input.warnings.len(), 3);
        assert!(input.warnings[0].starts_with("No room found"));
        assert!(input.warnings[1].starts_with("Invalid team 22"));
        assert!(input.warnings[2].starts_with("No team found"));
    }

    #[test]
    fn test_parse_room_list() {
        let (entries, warnings) = parse_room_list("304a\n343B Med 5\n304A\nrounds\n534 99\n");

        let rooms: Vec<&str> = entries.iter().map(|e| e.room.as_str()).collect();
        assert_eq!(rooms, vec!["304A", "343B", "534"]);
        assert_eq!(entries[0].current_team, None);
        assert_eq!(entries[1].current_team, Some(5));
        assert_eq!(entries[2].current_team, None);
        assert!(entries[0].floor.is_some());
        assert_eq!(warnings, vec!["No room found: rounds".to_string()]);
    }
}
