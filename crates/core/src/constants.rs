//! Constants used throughout the clinlab core crate.
//!
//! This module contains the catalog and upstream-service constants to ensure
//! consistency across the codebase and make maintenance easier.

/// Default directory for range-catalog files when no explicit directory is configured.
pub const DEFAULT_CATALOG_DIR: &str = "crates/core/data";

/// Base URL of the Copomex postal-code service.
pub const DEFAULT_POSTAL_BASE_URL: &str = "https://api.copomex.com/query/info_cp";

/// Copomex access token used when none is configured ("pruebas" is the
/// provider's public test token).
pub const DEFAULT_POSTAL_TOKEN: &str = "pruebas";

/// Seconds a postal lookup may spend on the wire before it is abandoned.
pub const POSTAL_TIMEOUT_SECS: u64 = 5;
