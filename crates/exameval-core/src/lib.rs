//! exameval-core — Rule-based answer scoring, attempt grading, and reports.
//!
//! This crate defines the exam data model, the deterministic scoring rules,
//! and the batch engine that grades submitted attempts against model answers.

pub mod engine;
pub mod error;
pub mod grading;
pub mod model;
pub mod parser;
pub mod report;
pub mod repository;
pub mod scoring;
pub mod statistics;
pub mod traits;

pub use error::EvaluationError;
pub use scoring::{evaluate, Evaluation, MatchingMode, RuleBasedScorer};
