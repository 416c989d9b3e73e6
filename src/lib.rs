//! Task list service: a REST API over a single `tasks` table and the client
//! that keeps a local mirror of it.

pub mod client;
pub mod config;
pub mod controller;
pub mod datastore;
pub mod log;
pub mod model;

#[cfg(test)]
mod e2e_tests;
