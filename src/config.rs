//! Engine-internal constants.
//!
//! The core takes no environment or CLI configuration (that belongs to the outer
//! tool server, out of scope here). These are the only knobs the engine reads.

use std::time::Duration;

/// Global bound on concurrent detail-page fetches, shared across all workers.
pub const JOB_SEMAPHORE_PERMITS: usize = 3;

/// Reserved for future company-enrichment fan-out; allocated but never acquired
/// by the core flow today.
pub const COMPANY_SEMAPHORE_PERMITS: usize = 2;

/// Minimum accepted `refresh_interval` for a profile.
pub const MIN_REFRESH_INTERVAL_SECS: i64 = 3600;

/// Ceiling on the backoff sleep a worker takes after a failed cycle.
pub const WORKER_ERROR_BACKOFF_CAP_SECS: u64 = 300;

/// Period of the scheduler's profile-set reconciliation loop.
pub const RELOAD_LOOP_PERIOD: Duration = Duration::from_secs(30);

/// Listing pages fetched per scrape cycle.
pub const SEARCH_PAGES: u32 = 5;

/// Listing items per page (used to compute the `start` query parameter).
pub const PAGE_SIZE: u32 = 10;

/// Per-request HTTP client timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default retry budget for `request_with_backoff`.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff: `base * 2^attempt`.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Inter-request jitter range applied before listing/detail requests.
pub const JITTER_RANGE_SECS: (f64, f64) = (1.0, 3.0);

/// Company enrichment rows are considered stale after this many days.
pub const COMPANY_REFRESH_WINDOW_DAYS: i64 = 30;

/// Tracked fields diffed by the change-detection stage of the scrape pipeline.
pub const TRACKED_CHANGE_FIELDS: [&str; 3] =
    ["salary", "number_of_applicants", "raw_description"];

/// Realistic desktop-browser user agents rotated per HTTP client.
pub const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
];

/// File name of the embedded database within the per-user cache directory.
pub const DB_FILE_NAME: &str = "jobwatch.db";

/// Default profile seeded when the profiles table is empty.
pub mod default_profile {
    pub const NAME: &str = "default";
    pub const LOCATION: &str = "San Francisco, CA";
    pub const KEYWORDS: &str = "AI Engineer OR ML Engineer OR Research Engineer";
    pub const DISTANCE: i64 = 25;
    pub const TIME_FILTER: &str = "r7200";
    pub const REFRESH_INTERVAL: i64 = 7200;
}

/// Base URL of the upstream guest job-search endpoints.
pub const PORTAL_BASE_URL: &str = "https://www.linkedin.com/jobs-guest";
