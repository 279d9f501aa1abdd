pub mod app;
pub mod command;
pub mod config;
pub mod domain;
pub mod error;
pub mod layout;
pub mod manifest;
pub mod output;
pub mod report;
pub mod stage;
pub mod stages;
