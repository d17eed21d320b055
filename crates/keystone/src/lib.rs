//! Keystone - dependency graph and critical path engine for work items.
//!
//! Keystone records directed dependencies between work items owned by an
//! external tracker and answers scheduling questions over them: the
//! critical path, blocked critical items, parallel work streams, delay
//! impact and projected completion dates.
//!
//! Start with [`service::CriticalPathService`], which wires a
//! [`storage::WorkItemStore`] and a [`storage::DependencyStore`] together.

#![forbid(unsafe_code)]

pub mod config;
pub mod domain;
pub mod error;
pub mod graph;
pub mod logging;
pub mod report;
pub mod schedule;
pub mod service;
pub mod storage;

pub use error::{Error, Result};
pub use service::CriticalPathService;
