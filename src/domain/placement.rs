use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// 內科團隊編號 (Med 1 - Med 15)
pub type Team = u8;

pub const ALL_TEAMS: std::ops::RangeInclusive<Team> = 1..=15;
pub const IMCU_TEAMS: [Team; 3] = [1, 2, 3];
/// 只有在一般團隊都滿時才使用
pub const OVERFLOW_TEAMS: [Team; 2] = [14, 15];

pub fn is_imcu(team: Team) -> bool {
    IMCU_TEAMS.contains(&team)
}

pub fn is_overflow(team: Team) -> bool {
    OVERFLOW_TEAMS.contains(&team)
}

pub fn is_valid_team(team: Team) -> bool {
    ALL_TEAMS.contains(&team)
}

/// 團隊負責的樓層標籤，用於報表顯示
pub fn team_floors(team: Team) -> &'static [&'static str] {
    match team {
        1..=3 => &["3W", "3E", "IMCU"],
        4 | 11 => &["4E", "4W"],
        5 | 10 => &["5E", "5W"],
        6 => &["6E", "6W"],
        7 | 9 => &["7E", "7W"],
        8 | 13 => &["8E"],
        12 => &["6E", "6W", "Boyer"],
        14 | 15 => &["Overflow"],
        _ => &[],
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Wing {
    East,
    West,
}

impl Wing {
    pub fn letter(&self) -> char {
        match self {
            Wing::East => 'E',
            Wing::West => 'W',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Floor {
    Ward { level: String, wing: Wing },
    Imcu,
    Boyer,
    /// 房號不在 01-20 / 30-49 範圍內，只能確定樓層
    Ambiguous { level: String },
}

impl Floor {
    pub fn ward(level: impl Into<String>, wing: Wing) -> Self {
        Floor::Ward {
            level: level.into(),
            wing,
        }
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Floor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Floor::Ward { level, wing } => write!(f, "{}{}", level, wing.letter()),
            Floor::Imcu => write!(f, "IMCU"),
            Floor::Boyer => write!(f, "BOYER"),
            Floor::Ambiguous { level } => write!(f, "{}?", level),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Patient {
    pub identifier: String,
    pub floor: Option<Floor>,
    pub raw_location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub patient: Patient,
    pub team: Team,
    pub is_geographic: bool,
    pub reason: String,
}

/// 各團隊目前的病人數與關閉狀態
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Census {
    counts: BTreeMap<Team, u32>,
    closed: BTreeSet<Team>,
}

impl Census {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_count(mut self, team: Team, count: u32) -> Self {
        self.set(team, count);
        self
    }

    pub fn with_closed(mut self, team: Team) -> Self {
        self.close(team);
        self
    }

    pub fn get(&self, team: Team) -> u32 {
        self.counts.get(&team).copied().unwrap_or(0)
    }

    pub fn set(&mut self, team: Team, count: u32) {
        self.counts.insert(team, count);
    }

    pub fn increment(&mut self, team: Team) {
        *self.counts.entry(team).or_insert(0) += 1;
    }

    pub fn close(&mut self, team: Team) {
        self.counts.insert(team, 0);
        self.closed.insert(team);
    }

    pub fn is_closed(&self, team: Team) -> bool {
        self.closed.contains(&team)
    }

    pub fn closed_teams(&self) -> &BTreeSet<Team> {
        &self.closed
    }

    pub fn open_teams(&self) -> Vec<Team> {
        ALL_TEAMS.filter(|t| !self.is_closed(*t)).collect()
    }
}

/// 分配規則的門檻值
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementRules {
    /// IMCU 團隊 (Med 1-3) 的硬上限
    pub imcu_cap: u32,
    /// 一般團隊的軟上限，盡量不超過
    pub soft_cap: u32,
    /// 同一團隊新病人超過此數時，優先分給其他地理團隊
    pub max_new_before_spread: u32,
    /// 地理團隊與最低病人數團隊差距達此值時改為平衡分配
    pub max_census_gap: u32,
    /// 地理團隊全滿時，非地理團隊需低於此差距才改派
    pub overflow_balance_gap: u32,
}

impl Default for PlacementRules {
    fn default() -> Self {
        Self {
            imcu_cap: 10,
            soft_cap: 14,
            max_new_before_spread: 3,
            max_census_gap: 4,
            overflow_balance_gap: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacementOutcome {
    pub assignments: Vec<Assignment>,
    pub unplaced: Vec<Patient>,
    pub starting_census: Census,
    pub final_census: Census,
}

impl PlacementOutcome {
    pub fn geographic_count(&self) -> usize {
        self.assignments.iter().filter(|a| a.is_geographic).count()
    }

    pub fn assignments_for(&self, team: Team) -> Vec<&Assignment> {
        self.assignments.iter().filter(|a| a.team == team).collect()
    }
}

/// 週一重新分配時已在院的病人
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExistingPatient {
    pub room: String,
    pub current_team: Team,
    pub floor: Option<Floor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reassignment {
    pub patient: ExistingPatient,
    /// 空陣列代表找不到地理對應 (樓層不明或地理團隊全關)
    pub acceptable_teams: Vec<Team>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ShuffleAnalysis {
    pub needs_reassignment: Vec<Reassignment>,
    pub already_ok: Vec<ExistingPatient>,
}

/// 依地理重新分配的房間；貼上的清單可能沒有目前團隊
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomEntry {
    pub room: String,
    pub current_team: Option<Team>,
    pub floor: Option<Floor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveReason {
    Geographic,
    NoChange,
    CensusBalance,
}

impl std::fmt::Display for MoveReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MoveReason::Geographic => write!(f, "Geographic"),
            MoveReason::NoChange => write!(f, "No change"),
            MoveReason::CensusBalance => write!(f, "Census balance"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redistribution {
    pub entry: RoomEntry,
    pub team: Team,
    pub reason: MoveReason,
}

impl Redistribution {
    pub fn is_move(&self) -> bool {
        self.entry.current_team != Some(self.team)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RedistributionPlan {
    pub assignments: Vec<Redistribution>,
    /// 沒有任何開放的非 IMCU 團隊可收
    pub unassigned: Vec<RoomEntry>,
}

impl RedistributionPlan {
    pub fn count_for(&self, team: Team) -> usize {
        self.assignments.iter().filter(|a| a.team == team).count()
    }

    pub fn moving(&self) -> usize {
        self.assignments.iter().filter(|a| a.is_move()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_labels() {
        assert_eq!(Floor::ward("5", Wing::East).label(), "5E");
        assert_eq!(Floor::Ambiguous { level: "5".into() }.label(), "5?");
        assert_eq!(Floor::Imcu.label(), "IMCU");
        assert_eq!(Floor::Boyer.label(), "BOYER");
    }

    #[test]
    fn test_census_closed_teams_are_zeroed() {
        let census = Census::new().with_count(14, 6).with_closed(14);
        assert_eq!(census.get(14), 0);
        assert!(census.is_closed(14));
        assert_eq!(census.open_teams().len(), 14);
    }
}
