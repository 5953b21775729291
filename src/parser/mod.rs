pub mod decoder;
pub mod gps;
pub mod klv;
pub mod main;
pub mod registry;
pub mod stream;

pub use decoder::*;
pub use gps::*;
pub use klv::*;
pub use main::*;
pub use stream::*;
