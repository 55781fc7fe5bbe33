//! # KITIS Schedule
//!
//! Scraper for the college's statically generated class-schedule site. The
//! site publishes one index page per source kind (groups, lecturers, rooms)
//! and one detail page per source, each a loosely structured HTML table.
//! This crate discovers the sources, parses detail pages into typed
//! schedules and lesson-accounting records, and renders them as
//! markup-escaped chat messages.
//!
//! ## Modules
//!
//! - [`config`]: Immutable configuration loaded from YAML
//! - [`models`]: Catalog, schedule and records data types
//! - [`api`]: Page fetching seam with timeout and retry
//! - [`scrapers`]: Encoding normalization, catalog, schedule, records and status
//! - [`bells`]: Lesson slot → bell time lookup
//! - [`outputs`]: Chat messages and JSON export
//! - [`service`]: Request-level facade owning the published catalog
//! - [`utils`]: Truncation and markup escaping
//!
//! Failures never surface as panics or errors to the caller of a schedule
//! request: they come back as [`service::Outcome`] variants, empty lists,
//! an unknown timestamp or a `-1` probe status.

pub mod api;
pub mod bells;
pub mod config;
pub mod models;
pub mod outputs;
pub mod scrapers;
pub mod service;
pub mod utils;
