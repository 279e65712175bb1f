pub mod runner;

pub use runner::{Sweeper, SweeperConfig};
