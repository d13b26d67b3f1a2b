pub mod collector;
pub mod history;
pub mod settings;
pub mod status;

pub use collector::{collect_cycle, DashboardState, PollOutcome};
