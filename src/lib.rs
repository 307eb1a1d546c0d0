pub mod analysis;
pub mod cli;
pub mod config;
pub mod core;
pub mod exit;
pub mod logs;
pub mod platform;
pub mod reboot;
pub mod runner;
pub mod ui;
