pub mod catalog;
pub mod cli;
pub mod config;
pub mod core;
pub mod engine;
pub mod exit;
pub mod gateway;
pub mod logs;
pub mod platform;
pub mod remediation;
pub mod rules;
pub mod trace;
pub mod tui;
pub mod ui;
