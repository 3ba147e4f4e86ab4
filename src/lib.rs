//! Student records with weighted grade aggregation.
//!
//! The core is [`grading`]: exam results and exam definitions go in, a
//! percentage and letter grade come out. [`store`], [`notify`] and
//! [`service`] supply the data and react to changes around it.

pub mod cli;
pub mod config;
pub mod grading;
pub mod models;
pub mod notify;
pub mod report;
pub mod service;
pub mod store;
