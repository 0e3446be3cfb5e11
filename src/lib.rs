pub mod artifacts;
pub mod cli;
pub mod config;
pub mod data;
pub mod prepare;
