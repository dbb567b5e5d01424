pub mod cli;
pub mod config;
pub mod flow;
pub mod journaling;
pub mod message;
pub mod model;
pub mod retry;
pub mod session;
pub mod storage;
pub mod submission;
pub mod validation;
pub mod webhook;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
pub use model::{ContactInfo, EntrySet};
