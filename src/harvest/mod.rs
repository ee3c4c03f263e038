//! Harvest core: query planning, pacing, normalization and the run loop.

mod engine;
pub(crate) mod pacer;
mod query;
pub(crate) mod record;

pub use engine::Harvester;
pub use pacer::JitterPacer;
pub use query::{Category, HarvestPlan};
pub use record::{COLUMNS, HarvestResult};
