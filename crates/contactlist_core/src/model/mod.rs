//! Persisted domain model.
//!
//! # Responsibility
//! - Define the `Entity` contract the store uses for typed collections.
//! - Define concrete entities (`Contact`).
//!
//! # Invariants
//! - Every entity is identified by a stable, non-nil `EntityId`.

pub mod contact;
pub mod entity;
