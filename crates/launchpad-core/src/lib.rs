pub mod config;
pub mod logging;

pub mod artifact;
pub mod control;
pub mod error;
pub mod launch;
pub mod lockfile;
pub mod progress;
pub mod queue;
pub mod registry;
pub mod storage;
pub mod transfer;
pub mod version;

#[cfg(test)]
mod testutil;
