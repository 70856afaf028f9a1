//! CLI subcommands

pub mod doctor;
pub mod rightsize;
