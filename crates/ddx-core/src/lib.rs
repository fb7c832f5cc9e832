//! DDX Diagnostic Reasoning Engine
//!
//! This library owns the stateful core of the differential-diagnosis
//! system:
//! - Symptom extraction into a canonical code set
//! - Disease priors from symptoms, epidemiology, family history, genomics
//! - Evidence fusion with imaging-model output
//! - Bayesian candidate updates from test results
//! - Information-value test recommendation
//! - Session lifecycle with resumable state
//! - Trust scoring and treatment advice at completion
//!
//! The binary entry point (`ddx`) in `main.rs` is a thin presentation
//! shim over [`engine::Engine`].

pub mod candidate;
pub mod engine;
pub mod fusion;
pub mod logging;
pub mod prior;
pub mod recommend;
pub mod report;
pub mod session;
pub mod similar;
pub mod symptom;
pub mod treatment;
pub mod trust;

pub use engine::{Engine, EngineOptions};
