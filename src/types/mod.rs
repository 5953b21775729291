pub mod gps;
pub mod klv;
pub mod telemetry;
pub mod track;

pub use gps::*;
pub use klv::*;
pub use telemetry::*;
pub use track::*;
