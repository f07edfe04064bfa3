//! CLI Commands

pub mod init;
pub mod run;
pub mod targets;
pub mod validate;
