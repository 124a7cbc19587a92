//! Utility functions shared by the parser and the backends

pub mod json;
pub mod sql;
pub mod time;
