pub mod batch;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod host;
pub mod mail;
pub mod policy;
pub mod probe;
pub mod report;
pub mod scheduler;
pub mod util;
