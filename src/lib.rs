//! Salary dataset exploration: load a CSV, filter it, chart it, fit a
//! baseline regression and export PDF reports.

pub mod charts;
pub mod cli;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod predictor;
pub mod report;
pub mod state;

#[cfg(feature = "gui")]
pub mod app;
#[cfg(feature = "gui")]
pub mod ui;
