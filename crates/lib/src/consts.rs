//! Well-known names shared across the crate.

use std::time::Duration;

pub const APP_NAME: &str = "toolmod";

/// Extended manifest file at the project root.
pub const MANIFEST_FILENAME: &str = "gotool.mod";
/// Companion checksum file at the project root.
pub const CHECKSUM_FILENAME: &str = "gotool.sum";

/// Names the resolver expects inside the scratch directory.
pub const RESOLVER_MANIFEST: &str = "go.mod";
pub const RESOLVER_CHECKSUM: &str = "go.sum";
/// Synthetic source importing every declared tool.
pub const REFERENCES_FILENAME: &str = "tools.go";

/// Module name used when a manifest declares none.
pub const DEFAULT_MODULE_NAME: &str = "tools";

/// Default output directory for built tools, relative to the project root.
pub const DEFAULT_OUTPUT_DIR: &str = "_tools";

pub const ENV_GO: &str = "TOOLMOD_GO";
pub const ENV_CACHE: &str = "TOOLMOD_CACHE";
pub const ENV_OUTPUT: &str = "TOOLMOD_OUTPUT";

/// Length of the hash suffix in cache keys.
pub const CACHE_KEY_HASH_LEN: usize = 20;

pub const TIMEOUT_GET: Duration = Duration::from_secs(15 * 60);
pub const TIMEOUT_BUILD: Duration = Duration::from_secs(15 * 60);
pub const TIMEOUT_DOWNLOAD: Duration = Duration::from_secs(15 * 60);
pub const TIMEOUT_LIST: Duration = Duration::from_secs(10 * 60);
pub const TIMEOUT_TIDY: Duration = Duration::from_secs(3 * 60);
pub const TIMEOUT_INIT: Duration = Duration::from_secs(60);
