//! Engine names and shared limits used across the importer.
use std::time::Duration;

// Engine names (used in the CLI `--source` flag and the HTTP path)
pub const DEVTO_ENGINE: &str = "devto";
pub const DEFAULT_ENGINE: &str = DEVTO_ENGINE;

// dev.to upstream
pub const DEVTO_BASE_URL: &str = "https://dev.to/api";
pub const DEVTO_HOST: &str = "dev.to";
pub const DEVTO_PAGE_SIZE: &str = "1000";

/// Per-request cap applied beneath the caller's deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Deadline for one import run, both from the CLI and per HTTP request.
pub const DEFAULT_IMPORT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

pub const USER_AGENT: &str = concat!("blog-importer/", env!("CARGO_PKG_VERSION"));

/// How much of a failing upstream body is kept in the error message.
pub const UPSTREAM_BODY_SNIPPET: usize = 512;

/// Progress messages longer than this are cut in the terminal reporter.
pub const PROGRESS_MESSAGE_MAX: usize = 60;

pub const DEFAULT_SERVER_PORT: u16 = 8080;
