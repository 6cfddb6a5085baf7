//! # Resonant Rust Backend
//!
//! Transit detection and vetting engine for stellar light curves.
//!
//! This crate searches brightness time series for periodic transit-like dips,
//! refines each candidate with a limb-darkened transit model fit, runs a
//! battery of physics-based vetting checks, scores a detection probability,
//! and triages every candidate into `accept`, `reject`, or `human_review`.
//! The pipeline runs as asynchronous jobs exposed through a REST API via Axum.
//!
//! ## Features
//!
//! - **Preprocessing**: outlier clipping, normalization, and detrending of raw flux
//! - **Period Search**: box-least-squares periodogram over a bounded period grid
//! - **Model Fitting**: limb-darkened trapezoid refinement of box candidates
//! - **Validation**: odd/even, secondary-eclipse, transit-shape, and density checks
//! - **Triage**: auditable decision table over probability and validation flags
//! - **HTTP API**: job submission, status polling, results, and SSE log streaming
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`api`]: Stable identifiers and the DTO surface for API consumers
//! - [`config`]: Pipeline policy thresholds, loadable from TOML
//! - [`models`]: Light curves, run parameters, and candidate records
//! - [`pipeline`]: The six detection/vetting stages and their error taxonomy
//! - [`services`]: Job tracking and the asynchronous pipeline driver
//! - [`http`]: Axum-based HTTP server and request handlers

pub mod api;
pub mod config;
pub mod models;
pub mod pipeline;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
