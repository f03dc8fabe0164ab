pub mod analysis;
pub mod config;
pub mod context;
pub mod curation;
pub mod error;
pub mod graph;
pub mod report;
pub mod suggestion;

pub use analysis::*;
pub use config::*;
pub use context::*;
pub use curation::*;
pub use error::*;
pub use graph::*;
pub use report::*;
pub use suggestion::*;
