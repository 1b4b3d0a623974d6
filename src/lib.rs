//! Deterministic rule selection and loading engine for AI coding assistants.
//!
//! `rulebook-core` parses best-practice rule documents, resolves their
//! declared dependencies into an acyclic graph, and selects a dependency-
//! ordered subset of rules that fits a token budget. Selection is a pure
//! function of an immutable corpus snapshot and the request: identical
//! inputs always produce identical outputs, byte-for-byte.
//!
//! Pipeline: [`rule`] parser, [`graph`] resolver, [`selection`] selector,
//! with [`corpus`] holding versioned snapshots that can be reloaded while
//! readers keep using the previous one.

pub mod config;
pub mod corpus;
pub mod graph;
pub mod rule;
pub mod selection;
pub mod types;
