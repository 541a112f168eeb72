pub mod enrich;
pub mod indicators;


pub use enrich::*;
pub use indicators::*;
