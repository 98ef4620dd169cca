//! Shared test doubles for integration tests

pub mod blog_sim;
