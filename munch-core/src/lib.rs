// src/lib.rs

pub mod db;
pub mod config;
pub mod retry;
pub mod repositories;
pub mod services;
pub mod context;
pub mod test_utils;

pub use db::Database;
pub use context::{Repositories, RewardServices};
pub use munch_common::error::Error;
