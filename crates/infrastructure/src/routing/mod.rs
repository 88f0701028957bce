pub mod classifier;
pub mod isolator;

pub use classifier::classify;
pub use isolator::WorkloadIsolator;
