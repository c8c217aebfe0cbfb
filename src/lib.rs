pub mod config;
pub mod error;
pub mod input;
pub mod interview;
pub mod output;
pub mod profile;
pub mod report;
pub mod scoring;
