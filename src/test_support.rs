// In-memory warehouse fixture shared by the unit tests
//
// Reporting views are plain tables here; the workspaces only ever SELECT.

use crate::workspace::RequestContext;
use chrono::NaiveDate;
use rusqlite::Connection;

pub(crate) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
}

pub(crate) fn ctx() -> RequestContext {
    RequestContext::new(today())
}

pub(crate) fn warehouse() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(FIXTURE).unwrap();
    conn
}

const FIXTURE: &str = "
CREATE TABLE player_directory (
    player_id INTEGER PRIMARY KEY,
    player_name TEXT NOT NULL,
    team_code TEXT NOT NULL,
    agent_id INTEGER,
    agent_name TEXT,
    age INTEGER,
    position TEXT,
    contract_type TEXT NOT NULL,
    cap_hit REAL NOT NULL,
    years_remaining INTEGER,
    is_two_way INTEGER NOT NULL DEFAULT 0,
    has_lock_now INTEGER NOT NULL DEFAULT 0,
    is_trade_restricted_now INTEGER NOT NULL DEFAULT 0,
    has_option_upcoming INTEGER NOT NULL DEFAULT 0,
    is_non_guaranteed INTEGER NOT NULL DEFAULT 0
);

INSERT INTO player_directory VALUES
    (7,   'Marcus Vale', 'BOS', 100, 'Dana Pierce', 27, 'G', 'standard',     48000000, 4, 0, 0, 0, 0, 0),
    (23,  'Theo Brandt', 'LAL', 101, 'Rico Mendes', 24, 'F', 'rookie_scale',  9500000, 2, 0, 0, 0, 1, 0),
    (230, 'Isaiah Cole', 'NYK', 100, 'Dana Pierce', 21, 'G', 'two_way',        600000, 1, 1, 1, 0, 0, 0),
    (41,  'Owen Park',   'BOS', 102, 'Sam Whitley', 31, 'C', 'standard',     30000000, 2, 0, 0, 1, 0, 0),
    (55,  'Luis Ortega', 'MIA', 101, 'Rico Mendes', 29, 'F', 'minimum',       2100000, 2, 0, 0, 0, 0, 1),
    (88,  'Kenji Sato',  'NYK', 102, 'Sam Whitley', 22, 'G', 'two_way',        580000, 2, 1, 0, 0, 0, 0),
    (12,  'Andre Mills', 'MIA', 100, 'Dana Pierce', 33, 'C', 'standard',     14000000, 3, 0, 0, 0, 0, 0),
    (61,  'Nate Ruiz',   'LAL', 103, 'Casey Lund',  26, 'F', 'standard',      5200000, 1, 0, 0, 0, 0, 0);

CREATE TABLE agent_directory (
    agent_id INTEGER PRIMARY KEY,
    agent_name TEXT NOT NULL,
    agency_name TEXT,
    client_count INTEGER NOT NULL,
    book_total REAL NOT NULL,
    max_contract_count INTEGER NOT NULL DEFAULT 0,
    expiring_count INTEGER NOT NULL DEFAULT 0
);

INSERT INTO agent_directory VALUES
    (100, 'Dana Pierce', 'Pierce Sports Group',     3, 62600000, 1, 1),
    (101, 'Rico Mendes', 'Mendes Athlete Partners', 2, 11600000, 0, 0),
    (102, 'Sam Whitley', 'Whitley & Co',            2, 30580000, 0, 0),
    (103, 'Casey Lund',  'Club 23 Management',      1,  5200000, 0, 1),
    (104, 'Priya Shah',  'Shah Representation',     4, 30580000, 0, 2);

CREATE TABLE transaction_index (
    transaction_id INTEGER PRIMARY KEY,
    transaction_date TEXT NOT NULL,
    team_code TEXT NOT NULL,
    from_team_code TEXT,
    to_team_code TEXT,
    player_id INTEGER,
    player_name TEXT,
    transaction_type TEXT NOT NULL,
    description TEXT,
    amount REAL
);

INSERT INTO transaction_index VALUES
    (1, '2024-07-06', 'BOS', NULL,  'BOS', 7,   'Marcus Vale', 'extension', 'Five-year supermax extension', 240000000),
    (2, '2024-08-02', 'LAL', NULL,  'LAL', 23,  'Theo Brandt', 'signing',   'Rookie scale option exercised',  9500000),
    (3, '2024-12-20', 'NYK', 'BOS', 'NYK', 88,  'Kenji Sato',  'trade',     'Acquired in three-team deal',     580000),
    (4, '2025-01-10', 'NYK', NULL,  'NYK', 230, 'Isaiah Cole', 'two_way',   'Signed two-way, wears #23',       600000),
    (5, '2025-01-14', 'MIA', 'MIA', NULL,  99,  'Reggie Dunn', 'waiver',    'Waived',                               0),
    (6, '2024-06-20', 'BOS', 'PHX', 'BOS', 41,  'Owen Park',   'trade',     'Acquired for two firsts',       30000000),
    (7, '2025-01-02', 'MIA', 'MIA', 'CHA', 12,  'Andre Mills', 'trade',     'Sent out in salary match',      14000000);

CREATE TABLE two_way_utility (
    player_id INTEGER PRIMARY KEY,
    player_name TEXT NOT NULL,
    team_code TEXT NOT NULL,
    games_active INTEGER NOT NULL,
    active_limit INTEGER NOT NULL,
    games_remaining INTEGER NOT NULL,
    team_games_remaining INTEGER NOT NULL,
    is_conversion_candidate INTEGER NOT NULL DEFAULT 0
);

INSERT INTO two_way_utility VALUES
    (230, 'Isaiah Cole', 'NYK', 50, 50,  0, 40, 0),
    (88,  'Kenji Sato',  'NYK', 46, 50,  4, 40, 1),
    (301, 'Eli Grant',   'BOS', 30, 50, 20, 38, 0),
    (302, 'Tomas Reyes', 'MIA', 10, 50, 40, 39, 1),
    (303, 'Jay Okafor',  'LAL',  5, 50, 45, 41, 0),
    (304, 'Milo Hart',   'LAL', 12, 50, 38, 41, 0);
";
