pub mod flags;
pub mod iter;
pub mod manager;
pub mod overlay;

pub use flags::{Flags, Optimizations, ReadIso, Strategy, WriteIso};
pub use manager::{Manager, Transaction};
