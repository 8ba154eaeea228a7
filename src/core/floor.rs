use crate::domain::placement::{Floor, Team, Wing};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

struct FloorPatterns {
    trailing_bed: Regex,
    floor_and_wing: Regex,
    room_number: Regex,
    spelled_floor: Regex,
}

fn patterns() -> &'static FloorPatterns {
    static PATTERNS: OnceLock<FloorPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| FloorPatterns {
        trailing_bed: Regex::new(r"[A-Z]$").unwrap(),
        floor_and_wing: Regex::new(r"(\d+)\s*([EW]|EAST|WEST)").unwrap(),
        room_number: Regex::new(r"\b(\d)(\d{2})\b").unwrap(),
        spelled_floor: Regex::new(r"FLOOR\s*(\d+)\s*(EAST|WEST|E|W)").unwrap(),
    })
}

fn wing_from(text: &str) -> Wing {
    if text.starts_with('E') {
        Wing::East
    } else {
        Wing::West
    }
}

/// 將位置字串轉成樓層
///
/// 房號慣例：X01-X20 為西側，X30-X49 為東側；750 以上、850 以上、9 樓與 9W 屬於 Boyer。
/// 床位字尾 (A/B) 會被忽略。回傳 `None` 代表任何團隊皆可 (急診或無法辨識)。
///
/// ```
/// use geo_owl::core::floor::normalize_floor;
///
/// assert_eq!(normalize_floor("312A").unwrap().label(), "3W");
/// assert_eq!(normalize_floor("545B").unwrap().label(), "5E");
/// assert_eq!(normalize_floor("877").unwrap().label(), "BOYER");
/// assert!(normalize_floor("ED").is_none());
/// ```
pub fn normalize_floor(location: &str) -> Option<Floor> {
    let original = location.trim().to_uppercase();

    // 特殊位置要在去除字尾之前判斷
    if original.contains("IMCU") {
        return Some(Floor::Imcu);
    }
    if ["OVERNIGHT", "ONR", "RECOVERY"]
        .iter()
        .any(|k| original.contains(k))
    {
        return Some(Floor::Boyer);
    }
    if ["ED", "EMERGENCY", "ER "].iter().any(|k| original.contains(k)) {
        return None;
    }
    if original.contains("BOYER") {
        return Some(Floor::Boyer);
    }

    let p = patterns();
    let location = p.trailing_bed.replace(&original, "");

    if let Some(caps) = p.floor_and_wing.captures(&location) {
        let level = &caps[1];
        let wing = wing_from(&caps[2]);
        if level == "9" && wing == Wing::West {
            return Some(Floor::Boyer);
        }
        return Some(Floor::ward(level, wing));
    }

    if let Some(caps) = p.room_number.captures(&location) {
        let level = &caps[1];
        let room: u32 = caps[2].parse().ok()?;

        return Some(match (level, room) {
            ("7", 50..) | ("8", 50..) | ("9", _) => Floor::Boyer,
            (_, 1..=20) => Floor::ward(level, Wing::West),
            (_, 30..=49) => Floor::ward(level, Wing::East),
            _ => Floor::Ambiguous {
                level: level.to_string(),
            },
        });
    }

    if let Some(caps) = p.spelled_floor.captures(&location) {
        return Some(Floor::ward(&caps[1], wing_from(&caps[2])));
    }

    None
}

fn ward_teams(level: &str) -> &'static [Team] {
    match level {
        "3" => &[1, 2, 3],
        "4" => &[4, 11],
        "5" => &[5, 10],
        "6" => &[6, 12],
        "7" => &[7, 9],
        "8" => &[8, 13],
        _ => &[],
    }
}

/// 負責該樓層的團隊，依偏好順序排列
pub fn geographic_teams(floor: &Floor) -> Vec<Team> {
    match floor {
        Floor::Imcu => vec![1, 2, 3],
        // 優先 Med 12，其次 Med 6
        Floor::Boyer => vec![12, 6],
        Floor::Ward { level, .. } => ward_teams(level).to_vec(),
        Floor::Ambiguous { level } => {
            // 東西兩側的聯集
            let union: BTreeSet<Team> = ward_teams(level).iter().copied().collect();
            union.into_iter().collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(location: &str) -> Option<String> {
        normalize_floor(location).map(|f| f.label())
    }

    #[test]
    fn test_room_numbers() {
        assert_eq!(label("312A").as_deref(), Some("3W"));
        assert_eq!(label("545B").as_deref(), Some("5E"));
        assert_eq!(label("401").as_deref(), Some("4W"));
        assert_eq!(label("620").as_deref(), Some("6W"));
        assert_eq!(label("630").as_deref(), Some("6E"));
        assert_eq!(label("525").as_deref(), Some("5?"));
        assert_eq!(label("500").as_deref(), Some("5?"));
    }

    #[test]
    fn test_boyer_rooms() {
        assert_eq!(label("877").as_deref(), Some("BOYER"));
        assert_eq!(label("750").as_deref(), Some("BOYER"));
        assert_eq!(label("749").as_deref(), Some("7E"));
        assert_eq!(label("912").as_deref(), Some("BOYER"));
        assert_eq!(label("9W-910").as_deref(), Some("BOYER"));
        assert_eq!(label("boyer").as_deref(), Some("BOYER"));
        // "ER " 先被判定為急診
        assert_eq!(label("Boyer 2"), None);
    }

    #[test]
    fn test_explicit_wings() {
        assert_eq!(label("7W-712").as_deref(), Some("7W"));
        // 字尾字母會先被當成床位去掉
        assert_eq!(label("7W"), None);
        assert_eq!(label("5E-512").as_deref(), Some("5E"));
        assert_eq!(label("3 East").as_deref(), Some("3E"));
        assert_eq!(label("floor 6 west").as_deref(), Some("6W"));
    }

    #[test]
    fn test_special_locations() {
        assert_eq!(label("imcu 4").as_deref(), Some("IMCU"));
        assert_eq!(label("Overnight recovery").as_deref(), Some("BOYER"));
        assert_eq!(label("ONR 3").as_deref(), Some("BOYER"));
        assert_eq!(label("ED"), None);
        assert_eq!(label("Emergency hold"), None);
        assert_eq!(label("lobby"), None);
        assert_eq!(label(""), None);
    }

    #[test]
    fn test_geographic_teams() {
        assert_eq!(geographic_teams(&Floor::ward("5", Wing::East)), vec![5, 10]);
        assert_eq!(geographic_teams(&Floor::ward("8", Wing::West)), vec![8, 13]);
        assert_eq!(geographic_teams(&Floor::Boyer), vec![12, 6]);
        assert_eq!(geographic_teams(&Floor::Imcu), vec![1, 2, 3]);
        assert_eq!(
            geographic_teams(&Floor::Ambiguous { level: "4".into() }),
            vec![4, 11]
        );
        assert!(geographic_teams(&Floor::ward("2", Wing::West)).is_empty());
    }
}
