pub mod config;
pub mod error;
pub mod error_utils;
pub mod filter;
pub mod traits;
pub mod types;

pub use config::*;
pub use error::*;
pub use error_utils::*;
pub use filter::{age_in_days, classify, parse_created_at, partition_posts};
pub use traits::*;
pub use types::*;
