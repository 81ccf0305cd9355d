//! Local service implementations.
//!
//! Stand-ins for remote services when running on a single machine:
//! - **Filesystem object store** - archives images under a directory that the
//!   server exposes over HTTP

pub mod filesystem;

pub use filesystem::LocalObjectStore;
