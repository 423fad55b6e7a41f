//! CLI command implementations.

mod ask;
mod config;
mod doctor;
mod index;
mod list;
mod search;
mod serve;
mod stats;

pub use ask::run_ask;
pub use config::run_config;
pub use doctor::run_doctor;
pub use index::{run_add, run_index};
pub use list::{run_delete, run_list, run_reset};
pub use search::run_search;
pub use serve::run_serve;
pub use stats::run_stats;
