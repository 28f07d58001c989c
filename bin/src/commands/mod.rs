//! CLI command implementations.

pub(crate) mod clear;
pub(crate) mod run;
pub(crate) mod settings;
pub(crate) mod stats;
