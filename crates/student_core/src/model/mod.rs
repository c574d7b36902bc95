//! Domain model for student records.
//!
//! # Responsibility
//! - Define the persisted record shape shared by every store.
//! - Keep case-insensitive key rules in one place.
//!
//! # Invariants
//! - Every record is identified by a caller-supplied `StudentId`.
//! - Deletion is a hard delete; there are no tombstones.

pub mod student;
