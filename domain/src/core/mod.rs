//! Core domain concepts shared across all subdomains.
//!
//! - [`ids`]: sequence numbers, oracle indices and config digests
//! - [`payload`]: opaque query/observation/outcome/report buffers
//! - [`error::DomainError`]: configuration faults

pub mod error;
pub mod ids;
pub mod payload;
