use std::fmt;
use std::str::FromStr;

/// Ruleset whose leaderboard is synced independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Discipline {
    Osu,
    Taiko,
    Fruits, // osu!catch
    Mania,
}

impl Discipline {
    pub const ALL: [Discipline; 4] = [
        Discipline::Osu,
        Discipline::Taiko,
        Discipline::Fruits,
        Discipline::Mania,
    ];

    /// Path segment used by the rankings API and the cache key
    pub fn as_str(&self) -> &'static str {
        match self {
            Discipline::Osu => "osu",
            Discipline::Taiko => "taiko",
            Discipline::Fruits => "fruits",
            Discipline::Mania => "mania",
        }
    }

    /// Numeric mode id stored in the `mode` column
    pub fn mode_id(&self) -> u8 {
        match self {
            Discipline::Osu => 0,
            Discipline::Taiko => 1,
            Discipline::Fruits => 2,
            Discipline::Mania => 3,
        }
    }
}

impl fmt::Display for Discipline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Discipline {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "osu" => Ok(Discipline::Osu),
            "taiko" => Ok(Discipline::Taiko),
            "fruits" | "catch" => Ok(Discipline::Fruits),
            "mania" => Ok(Discipline::Mania),
            other => Err(format!("unknown discipline: {other}")),
        }
    }
}

/// Leaderboard flavour requested from upstream.
///
/// Only the ranked-score leaderboard feeds `score_{mode}` and the
/// highest-rank table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RankingType {
    #[default]
    Score,
}

impl RankingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankingType::Score => "score",
        }
    }
}

impl fmt::Display for RankingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "score" => Ok(RankingType::Score),
            other => Err(format!("unsupported ranking type: {other}")),
        }
    }
}

/// One leaderboard entry; position is implied by page order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingRecord {
    pub user_id: i64,
    pub username: String,
    pub ranked_score: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankingPage {
    pub records: Vec<RankingRecord>,
    /// Opaque token for the next page; `None` on the last page
    pub next_cursor: Option<String>,
}
