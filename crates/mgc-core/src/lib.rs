pub mod config;
pub mod logging;

pub mod control;
pub mod error;
pub mod git;
pub mod github;
pub mod repository;
pub mod retry;
pub mod scheduler;
