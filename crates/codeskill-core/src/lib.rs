pub mod agents;
pub mod artifact;
pub mod classify;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod gate;
pub mod healing;
pub mod io;
pub mod parse;
pub mod paths;
pub mod report;
pub mod score;
pub mod sink;
pub mod skills;
pub mod task;

pub use error::{ErrorKind, Result, SkillError};
