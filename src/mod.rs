pub mod config;
pub mod control;

pub use control::integrator::{
    IntegralReading, IntegrationUpdate, Integrator, MeanFilteredReading,
};
