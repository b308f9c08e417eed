// Entity registries
//
// Static reference data the workspaces normalize request input against.

pub mod team;

pub use team::{Conference, Team, TeamRegistry};
