//! Infrastructure layer - statistical engines, services and logging

pub mod logging;
pub mod services;
pub mod statistics;
