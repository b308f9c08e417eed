// Concrete workspaces, one per warehouse reporting view

pub mod agents;
pub mod players;
pub mod transactions;
pub mod two_way;

pub use agents::{find_agent, AgentDirectory};
pub use players::{find_player, PlayerDirectory};
pub use transactions::TransactionIndex;
pub use two_way::TwoWayUtility;
