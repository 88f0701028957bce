pub mod cache;
pub mod layer;
pub mod pool;
pub mod rate_limit;
pub mod routing;

pub use layer::{LayerStats, ReadOutcome, ReadRequest, RequestContext, ResourceLayer, WriteOutcome};
