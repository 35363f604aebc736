//! branchscope - review-friendly branch comparisons
//!
//! Compares two branch tips, classifies every changed file, recovers line
//! statistics when git's own diff falls short, and separates moved lines from
//! real edits.

pub mod adapters;
pub mod compare;
pub mod config;
pub mod domain;
pub mod ports;
pub mod report;
