// 🏀 Team Entity - franchise codes + display names
//
// The warehouse keys every roster row by a three-letter franchise code.
// This registry is the whitelist the `team` request parameter is checked
// against, and the source of the display name shown on filter chips.

use serde::Serialize;

// ============================================================================
// CONFERENCE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Conference {
    East,
    West,
}

// ============================================================================
// TEAM ENTITY
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Team {
    /// Franchise code, always three upper-case letters
    pub code: &'static str,

    /// City + nickname, e.g. "Boston Celtics"
    pub name: &'static str,

    pub conference: Conference,
}

impl Team {
    const fn new(code: &'static str, name: &'static str, conference: Conference) -> Self {
        Team {
            code,
            name,
            conference,
        }
    }
}

static TEAMS: [Team; 30] = [
    Team::new("ATL", "Atlanta Hawks", Conference::East),
    Team::new("BOS", "Boston Celtics", Conference::East),
    Team::new("BKN", "Brooklyn Nets", Conference::East),
    Team::new("CHA", "Charlotte Hornets", Conference::East),
    Team::new("CHI", "Chicago Bulls", Conference::East),
    Team::new("CLE", "Cleveland Cavaliers", Conference::East),
    Team::new("DAL", "Dallas Mavericks", Conference::West),
    Team::new("DEN", "Denver Nuggets", Conference::West),
    Team::new("DET", "Detroit Pistons", Conference::East),
    Team::new("GSW", "Golden State Warriors", Conference::West),
    Team::new("HOU", "Houston Rockets", Conference::West),
    Team::new("IND", "Indiana Pacers", Conference::East),
    Team::new("LAC", "LA Clippers", Conference::West),
    Team::new("LAL", "Los Angeles Lakers", Conference::West),
    Team::new("MEM", "Memphis Grizzlies", Conference::West),
    Team::new("MIA", "Miami Heat", Conference::East),
    Team::new("MIL", "Milwaukee Bucks", Conference::East),
    Team::new("MIN", "Minnesota Timberwolves", Conference::West),
    Team::new("NOP", "New Orleans Pelicans", Conference::West),
    Team::new("NYK", "New York Knicks", Conference::East),
    Team::new("OKC", "Oklahoma City Thunder", Conference::West),
    Team::new("ORL", "Orlando Magic", Conference::East),
    Team::new("PHI", "Philadelphia 76ers", Conference::East),
    Team::new("PHX", "Phoenix Suns", Conference::West),
    Team::new("POR", "Portland Trail Blazers", Conference::West),
    Team::new("SAC", "Sacramento Kings", Conference::West),
    Team::new("SAS", "San Antonio Spurs", Conference::West),
    Team::new("TOR", "Toronto Raptors", Conference::East),
    Team::new("UTA", "Utah Jazz", Conference::West),
    Team::new("WAS", "Washington Wizards", Conference::East),
];

// ============================================================================
// TEAM REGISTRY
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct TeamRegistry;

impl TeamRegistry {
    pub fn new() -> Self {
        TeamRegistry
    }

    /// Exact lookup by franchise code (case-sensitive)
    pub fn find_by_code(&self, code: &str) -> Option<&'static Team> {
        TEAMS.iter().find(|team| team.code == code)
    }

    /// Normalize user input to a known franchise code
    ///
    /// Example: " bos " → Some("BOS"), "xyz" → None
    pub fn normalize_code(&self, raw: &str) -> Option<&'static str> {
        let candidate = raw.trim().to_ascii_uppercase();
        if candidate.len() != 3 || !candidate.bytes().all(|b| b.is_ascii_uppercase()) {
            return None;
        }
        self.find_by_code(&candidate).map(|team| team.code)
    }

    /// Display name for a code, falling back to the code itself
    pub fn display_name(&self, code: &str) -> String {
        self.find_by_code(code)
            .map(|team| team.name.to_string())
            .unwrap_or_else(|| code.to_string())
    }
}

// ============================================================================
// TESTS
// ============================================================================
