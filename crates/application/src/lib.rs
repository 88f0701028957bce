//! Quire Application Layer
//!
//! Ports consumed by the resource-management core. Adapters live in
//! `quire-infrastructure` or in the hosting application.
pub mod ports;
