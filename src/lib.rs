//! Codegen Engine - Multi-backend code generation orchestration
//!
//! This crate picks a healthy model backend for each request, keeps
//! per-session generation context, validates generated code through a
//! layered pipeline and collects ratings for later model improvement.
//!
//! The entry point is [`application::Orchestrator`]; everything it talks to
//! outside the process sits behind a trait in [`ports`].

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
