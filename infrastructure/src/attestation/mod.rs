//! Report attestation adapters.

mod local;

pub use local::LocalAttestor;
