//! Better Drinking Bird: allow/block/kill decisions for AI coding agent hooks.

pub mod classifier;
pub mod cli;
pub mod config;
pub mod decision;
pub mod error;
pub mod event;
pub mod mode;
pub mod pause;
pub mod provider;
pub mod rules;
pub mod stop;
pub mod supervisor;
pub mod transcript;
pub mod workspace;
