//! Ranking and pipeline synchronization engine for the recruiting board.
//!
//! Keeps a local, always-consistent view of jobs, candidates and their
//! asynchronous scoring state; orders candidates automatically or by hand;
//! and turns board drags into stage changes on the backend.

pub mod config;
pub mod errors;
pub mod models;
pub mod ordering;
pub mod persistence;
pub mod pipeline;
pub mod ranking_client;
pub mod routes;
pub mod state;
pub mod sync;
