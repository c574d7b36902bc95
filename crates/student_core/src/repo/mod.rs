//! Repository layer: the record-store contract and its implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repositories never raise "not found"; absence is `Ok(None)` or an empty
//!   list, and the service decides what it means.
//! - Case-insensitive filters compare `normalize_key` output on both sides.

pub mod memory_repo;
pub mod student_repo;
