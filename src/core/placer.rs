use crate::core::floor::geographic_teams;
use crate::domain::placement::{
    is_imcu, is_overflow, Assignment, Census, ExistingPatient, Floor, MoveReason, Patient,
    PlacementOutcome, PlacementRules, Reassignment, Redistribution, RedistributionPlan, RoomEntry,
    ShuffleAnalysis, Team, ALL_TEAMS, OVERFLOW_TEAMS,
};
use std::collections::{BTreeMap, BTreeSet};

/// 病人數最低的團隊；同分時取清單中較前面的
fn lowest(teams: &[Team], census: &Census) -> Option<Team> {
    teams
        .iter()
        .copied()
        .reduce(|best, t| if census.get(t) < census.get(best) { t } else { best })
}

struct Choice {
    team: Team,
    is_geographic: bool,
    reason: String,
}

/// 依地理位置、病人數平衡與公平性分配新病人
///
/// 規則依序為：
/// 1. 不分配給關閉的團隊
/// 2. IMCU 團隊 (Med 1-3) 有硬上限
/// 3. 其他團隊有軟上限，盡量避免超過
/// 4. 其他地理團隊仍有空間時，單一團隊新病人不超過上限
/// 5. 合格團隊中選病人數最低者
/// 6. 地理團隊明顯高於最低團隊時，以平衡優先
#[derive(Debug, Clone, Default)]
pub struct Placer {
    rules: PlacementRules,
}

impl Placer {
    pub fn new(rules: PlacementRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &PlacementRules {
        &self.rules
    }

    pub fn optimize(&self, patients: &[Patient], starting: &Census) -> PlacementOutcome {
        let mut census = starting.clone();
        let mut new_counts: BTreeMap<Team, u32> = BTreeMap::new();
        let mut assignments = Vec::with_capacity(patients.len());
        let mut unplaced = Vec::new();

        let open_teams = starting.open_teams();
        let regular_open: Vec<Team> = open_teams
            .iter()
            .copied()
            .filter(|t| !is_overflow(*t))
            .collect();

        // 依樓層排序，讓同樓層的病人集中處理
        let mut sorted: Vec<&Patient> = patients.iter().collect();
        sorted.sort_by_cached_key(|p| {
            (
                p.floor
                    .as_ref()
                    .map(|f| f.label())
                    .unwrap_or_else(|| "ZZZ".to_string()),
                p.identifier.clone(),
            )
        });

        for patient in sorted {
            let geo_teams: Vec<Team> = patient
                .floor
                .as_ref()
                .map(geographic_teams)
                .unwrap_or_default()
                .into_iter()
                .filter(|t| !starting.is_closed(*t))
                .collect();

            let choice = self
                .geographic_choice(patient, &geo_teams, &regular_open, &census, &new_counts)
                .or_else(|| self.fallback_choice(patient, &open_teams, &regular_open, &census));

            let Some(choice) = choice else {
                tracing::warn!("No open teams available for {}", patient.raw_location);
                unplaced.push(patient.clone());
                continue;
            };

            census.increment(choice.team);
            *new_counts.entry(choice.team).or_insert(0) += 1;

            tracing::debug!(
                "{} -> Med {} ({})",
                patient.raw_location,
                choice.team,
                choice.reason
            );
            assignments.push(Assignment {
                patient: patient.clone(),
                team: choice.team,
                is_geographic: choice.is_geographic,
                reason: choice.reason,
            });
        }

        PlacementOutcome {
            assignments,
            unplaced,
            starting_census: starting.clone(),
            final_census: census,
        }
    }

    fn under_caps(&self, team: Team, census: &Census) -> bool {
        census.get(team) < self.rules.soft_cap
            && (!is_imcu(team) || census.get(team) < self.rules.imcu_cap)
    }

    fn is_eligible_geo(
        &self,
        team: Team,
        geo_teams: &[Team],
        census: &Census,
        new_counts: &BTreeMap<Team, u32>,
    ) -> bool {
        let new_for = |t: Team| new_counts.get(&t).copied().unwrap_or(0);
        let others = move || geo_teams.iter().copied().filter(move |o| *o != team);

        if is_imcu(team) && census.get(team) >= self.rules.imcu_cap {
            return false;
        }

        // 軟上限：只有其他地理團隊還有空間時才跳過
        if !is_imcu(team)
            && census.get(team) >= self.rules.soft_cap
            && others().any(|o| self.under_caps(o, census))
        {
            return false;
        }

        if new_for(team) >= self.rules.max_new_before_spread
            && others().any(|o| new_for(o) < new_for(team) && self.under_caps(o, census))
        {
            return false;
        }

        true
    }

    fn geographic_choice(
        &self,
        patient: &Patient,
        geo_teams: &[Team],
        regular_open: &[Team],
        census: &Census,
        new_counts: &BTreeMap<Team, u32>,
    ) -> Option<Choice> {
        if geo_teams.is_empty() {
            return None;
        }
        let floor = patient
            .floor
            .as_ref()
            .map(|f| f.label())
            .unwrap_or_default();

        let eligible: Vec<Team> = geo_teams
            .iter()
            .copied()
            .filter(|t| self.is_eligible_geo(*t, geo_teams, census, new_counts))
            .collect();

        if let Some(best_geo) = lowest(&eligible, census) {
            let best_geo_census = census.get(best_geo);
            let non_imcu_regular: Vec<Team> = regular_open
                .iter()
                .copied()
                .filter(|t| !is_imcu(*t))
                .collect();

            if let Some(lowest_team) = lowest(&non_imcu_regular, census) {
                let lowest_census = census.get(lowest_team);
                if best_geo_census >= lowest_census + self.rules.max_census_gap
                    && !eligible.contains(&lowest_team)
                {
                    return Some(Choice {
                        team: lowest_team,
                        is_geographic: false,
                        reason: format!(
                            "Balance override ({}→Med {} would be {}, Med {} only {})",
                            floor,
                            best_geo,
                            best_geo_census + 1,
                            lowest_team,
                            lowest_census
                        ),
                    });
                }
            }

            return Some(Choice {
                team: best_geo,
                is_geographic: true,
                reason: format!("Geographic ({} → Med {})", floor, best_geo),
            });
        }

        // 所有地理團隊都達上限：仍遵守 IMCU 硬上限
        let available: Vec<Team> = geo_teams
            .iter()
            .copied()
            .filter(|t| !is_imcu(*t) || census.get(*t) < self.rules.imcu_cap)
            .collect();
        let best_geo = lowest(&available, census)?;
        let best_geo_census = census.get(best_geo);

        let non_geo: Vec<Team> = regular_open
            .iter()
            .copied()
            .filter(|t| !is_imcu(*t) && !geo_teams.contains(t))
            .collect();

        match lowest(&non_geo, census) {
            Some(best_non_geo)
                if best_geo_census
                    >= census.get(best_non_geo) + self.rules.overflow_balance_gap =>
            {
                Some(Choice {
                    team: best_non_geo,
                    is_geographic: false,
                    reason: format!(
                        "Balance override ({} geo full, Med {} lower census)",
                        floor, best_non_geo
                    ),
                })
            }
            Some(_) => Some(Choice {
                team: best_geo,
                is_geographic: true,
                reason: format!("Geographic (over soft cap, {} → Med {})", floor, best_geo),
            }),
            None => Some(Choice {
                team: best_geo,
                is_geographic: true,
                reason: format!("Geographic (equity override, {} → Med {})", floor, best_geo),
            }),
        }
    }

    fn fallback_choice(
        &self,
        patient: &Patient,
        open_teams: &[Team],
        regular_open: &[Team],
        census: &Census,
    ) -> Option<Choice> {
        let soft_cap = self.rules.soft_cap;
        let non_imcu_regular: Vec<Team> = regular_open
            .iter()
            .copied()
            .filter(|t| !is_imcu(*t))
            .collect();
        let open_overflow: Vec<Team> = OVERFLOW_TEAMS
            .iter()
            .copied()
            .filter(|t| open_teams.contains(t) && !is_imcu(*t))
            .collect();
        let under_soft_cap = |teams: &[Team]| -> Vec<Team> {
            teams
                .iter()
                .copied()
                .filter(|t| census.get(*t) < soft_cap)
                .collect()
        };

        // 一般團隊優先，都滿了才用 overflow 團隊
        let team = lowest(&under_soft_cap(&non_imcu_regular), census)
            .or_else(|| {
                if open_overflow.is_empty() {
                    return None;
                }
                lowest(&under_soft_cap(&open_overflow), census)
                    .or_else(|| lowest(&non_imcu_regular, census))
                    .or_else(|| lowest(&open_overflow, census))
            })
            .or_else(|| lowest(&non_imcu_regular, census))
            .or_else(|| lowest(open_teams, census))?;

        let reason = match &patient.floor {
            Some(Floor::Boyer) => {
                "Boyer overflow (Med 12 full), lowest census".to_string()
            }
            Some(floor) => format!("No geographic capacity for {}, lowest census", floor),
            None => "No floor specified, lowest census".to_string(),
        };

        Some(Choice {
            team,
            is_geographic: false,
            reason,
        })
    }
}

impl Placer {
    /// 週一把在院病人從零開始依地理重新分配
    ///
    /// 第一輪只看地理團隊 (IMCU 團隊受硬上限限制)，其餘病人在
    /// 開放的非 IMCU 一般團隊間依人數平衡分配。
    pub fn redistribute(
        &self,
        entries: &[RoomEntry],
        closed: &BTreeSet<Team>,
    ) -> RedistributionPlan {
        let balance_teams: Vec<Team> = ALL_TEAMS
            .filter(|t| !closed.contains(t) && !is_overflow(*t) && !is_imcu(*t))
            .collect();

        let mut counts = Census::new();
        let mut plan = RedistributionPlan::default();
        let mut leftover = Vec::new();

        for entry in entries {
            let eligible: Vec<Team> = entry
                .floor
                .as_ref()
                .map(geographic_teams)
                .unwrap_or_default()
                .into_iter()
                .filter(|t| !closed.contains(t))
                .filter(|t| !is_imcu(*t) || counts.get(*t) < self.rules.imcu_cap)
                .collect();

            match lowest(&eligible, &counts) {
                Some(team) => {
                    counts.increment(team);
                    let reason = if entry.current_team == Some(team) {
                        MoveReason::NoChange
                    } else {
                        MoveReason::Geographic
                    };
                    plan.assignments.push(Redistribution {
                        entry: entry.clone(),
                        team,
                        reason,
                    });
                }
                None => leftover.push(entry),
            }
        }

        for entry in leftover {
            match lowest(&balance_teams, &counts) {
                Some(team) => {
                    counts.increment(team);
                    plan.assignments.push(Redistribution {
                        entry: entry.clone(),
                        team,
                        reason: MoveReason::CensusBalance,
                    });
                }
                None => {
                    tracing::warn!("No open team for {}", entry.room);
                    plan.unassigned.push(entry.clone());
                }
            }
        }

        plan
    }
}

/// 使用預設規則分配
pub fn optimize_placements(patients: &[Patient], census: &Census) -> PlacementOutcome {
    Placer::default().optimize(patients, census)
}

/// 找出週一重新分配時不在地理團隊上的病人
pub fn analyze_shuffle(patients: &[ExistingPatient], closed: &BTreeSet<Team>) -> ShuffleAnalysis {
    let mut analysis = ShuffleAnalysis::default();

    for patient in patients {
        let acceptable: Vec<Team> = patient
            .floor
            .as_ref()
            .map(geographic_teams)
            .unwrap_or_default()
            .into_iter()
            .filter(|t| !closed.contains(t))
            .collect();

        if acceptable.contains(&patient.current_team) {
            analysis.already_ok.push(patient.clone());
        } else {
            analysis.needs_reassignment.push(Reassignment {
                patient: patient.clone(),
                acceptable_teams: acceptable,
            });
        }
    }

    analysis
}
