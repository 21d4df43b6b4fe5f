//! Plugin hosting: the bounded adapter around one instance and the manager
//! that creates, swaps and closes instances.

pub mod adapter;
pub mod lifecycle;

pub use adapter::{PluginAdapter, Stage, StageError};
pub use lifecycle::{LifecycleError, PluginLifecycleManager};
