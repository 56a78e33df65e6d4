//! Store E2E test suite.
//!
//! Runs the SeaORM queries behind `RecordStore` against a real PostgreSQL database
//! with migrations applied. Requires `DATABASE_URL`; every test is skipped without it.
//!
//! Run with: DATABASE_URL=postgres://... cargo test --test store_e2e


mod test_references;
