//! Real-time, time-compressed wargame simulation server (spec.md §1-§2).
//!
//! The library crate exposes the simulation orchestration kernel and the
//! LLM-driven document pipeline; `main.rs` is a thin composition root that
//! wires concrete collaborators (Postgres, the HTTP-backed LLM client and
//! satellite catalog) behind the traits these modules depend on, the same
//! split the teacher keeps between its library surface and `main.rs`'s
//! process wiring.

pub mod allocation;
pub mod api;
pub mod broadcast;
pub mod catalog;
pub mod config;
pub mod coverage;
pub mod engine;
pub mod game_master;
pub mod ingest;
pub mod llm;
pub mod persistence;
pub mod propagation;
pub mod scenario_generator;
pub mod types;
