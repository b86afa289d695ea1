//! Caller identity for the docflow server

pub mod middleware;
