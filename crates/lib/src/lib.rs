//! toolmod-lib: core logic for toolmod
//!
//! toolmod manages Go command-line tools as versioned dependencies kept apart
//! from a project's own `go.mod`:
//! - [`manifest`]: the extended `gotool.mod` format and its plain resolver form
//! - [`workspace`]: transactional staging of the manifest in a scratch directory
//! - [`resolver`]: the `go` command, with deadlines and cancellation
//! - [`cache`]: built binaries keyed by tool path and version
//! - [`execute`]: parallel per-tool tasks under one cancellation token
//! - [`ops`]: the operations behind each CLI command

pub mod cache;
pub mod consts;
pub mod error;
pub mod execute;
pub mod manifest;
pub mod ops;
pub mod platform;
pub mod resolver;
pub mod util;
pub mod workspace;

pub use error::Error;
