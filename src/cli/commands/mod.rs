//! CLI command implementations.

pub mod ack;
pub mod analyze;
pub mod criteria;
pub mod history;
pub mod run;
