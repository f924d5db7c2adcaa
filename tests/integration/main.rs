//! Integration tests
//!
//! Everything except `postgres` runs against the in-memory store. The
//! PostgreSQL tests are ignored by default:
//! `DATABASE_URL=postgres://... cargo test -- --ignored`

mod loan_lifecycle;
mod postgres;
mod reconciliation;
