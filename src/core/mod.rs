pub mod calendar;
pub mod error;
pub mod rng;
pub mod types;

pub use calendar::{WarCalendar, WarDate};
pub use error::{EngineError, Result};
pub use rng::{Seed, TurnRng};
