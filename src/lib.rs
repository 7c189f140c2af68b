pub mod config;
pub mod crawler;
pub mod logger;
pub mod utils;

pub use config::{HarvestConfig, SiteConfig};
pub use crawler::{ChapterOutcome, ChapterReport, Harvester};
pub use utils::get_user_input;
