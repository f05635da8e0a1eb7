// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "hikari";

// =============================================================================
// Environment Variables
// =============================================================================

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "HIKARI_LOG";

/// Environment variable for server host
pub const ENV_HOST: &str = "HIKARI_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "HIKARI_PORT";

/// Environment variable for the TimescaleDB connection URL
pub const ENV_DATABASE_URL: &str = "HIKARI_DATABASE_URL";

/// Environment variable for database pool size
pub const ENV_DB_MAX_CONNECTIONS: &str = "HIKARI_DB_MAX_CONNECTIONS";

/// Environment variable for the span buffer capacity
pub const ENV_BUFFER_MAX_SIZE: &str = "HIKARI_BUFFER_MAX_SIZE";

/// Environment variable for the writer batch size
pub const ENV_WRITE_BATCH_SIZE: &str = "HIKARI_WRITE_BATCH_SIZE";

/// Environment variable for the writer retry interval
pub const ENV_DB_RETRY_INTERVAL_SECONDS: &str = "HIKARI_DB_RETRY_INTERVAL_SECONDS";

/// Environment variable for the span retention window
pub const ENV_RETENTION_DAYS: &str = "HIKARI_RETENTION_DAYS";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port
pub const DEFAULT_PORT: u16 = 8000;

// =============================================================================
// Collector Defaults
// =============================================================================

/// Default span buffer capacity
pub const DEFAULT_BUFFER_MAX_SIZE: usize = 50_000;

/// Default number of records drained per writer iteration
pub const DEFAULT_WRITE_BATCH_SIZE: usize = 500;

/// Default sleep between writer retries after a transient database error
pub const DEFAULT_DB_RETRY_INTERVAL_SECS: u64 = 10;

/// Default retention window for the spans hypertable
pub const DEFAULT_RETENTION_DAYS: u32 = 30;

/// Buffer usage above which the health endpoint reports unhealthy
pub const BUFFER_UNHEALTHY_THRESHOLD: f64 = 0.9;

// =============================================================================
// Writer Behavior
// =============================================================================

/// How long the writer drains the buffer on graceful shutdown
pub const WRITER_DRAIN_DEADLINE_SECS: u64 = 30;

/// Writer poll interval while waiting for buffered records
pub const WRITER_POLL_INTERVAL_MS: u64 = 500;

/// Cap on the writer's restart backoff after an internal panic
pub const WRITER_RESTART_MAX_BACKOFF_SECS: u64 = 60;

// =============================================================================
// Database Pool Defaults
// =============================================================================

/// Default maximum pool connections
pub const POSTGRES_DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default minimum pool connections kept warm
pub const POSTGRES_DEFAULT_MIN_CONNECTIONS: u32 = 1;

/// Default pool acquire timeout
pub const POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 10;

/// Default idle connection timeout
pub const POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;

/// Default connection max lifetime
pub const POSTGRES_DEFAULT_MAX_LIFETIME_SECS: u64 = 1800;

/// Default connection-level statement timeout
pub const POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Query Deadlines
// =============================================================================

/// Per-query deadline for read paths
pub const QUERY_READ_TIMEOUT_SECS: u64 = 5;

/// Per-query deadline for write paths
pub const QUERY_WRITE_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// HTTP Limits
// =============================================================================

/// Server-enforced timeout for any single HTTP request
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default request body limit
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Request body limit for OTLP ingestion
pub const OTLP_BODY_LIMIT: usize = 16 * 1024 * 1024;

// =============================================================================
// Shutdown
// =============================================================================

/// How long to wait for background tasks on shutdown. Exceeds the writer
/// drain deadline so the drain can finish before tasks are abandoned.
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 35;
