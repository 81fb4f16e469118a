//! Test-only adapters that live inside the core crate for convenience.
//!
//! These are intended for unit testing, local demos and the `memory` storage
//! mode of the api-server. The SQLite adapter lives in its own crate.

pub mod memory;
