//! Transport, mixing and source scheduling for synchronized stems.

pub mod engine;
pub mod mix;
pub mod scheduler;
pub mod transport;

pub use engine::{StemEngine, TransportSnapshot};
pub use mix::{effective_gain, MixState, Stem};
pub use transport::TransportState;
