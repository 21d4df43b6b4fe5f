//! Reporting plugins shipped with the engine.

pub mod median;

pub use median::{
    MedianPlugin, MedianPluginFactory, MedianReportInfo, PriceFeed, SimulatedPriceFeed,
    median_limits,
};
