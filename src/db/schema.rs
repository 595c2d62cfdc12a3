/// Schema for the cache and deferred order tables.
pub const SCHEMA: &str = r#"
-- Cache generations; exactly one is current per deployment
CREATE TABLE IF NOT EXISTS cache_generations (
    generation TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Stored response snapshots, keyed by hashed request descriptor
CREATE TABLE IF NOT EXISTS cache_entries (
    generation TEXT NOT NULL,
    key_hash TEXT NOT NULL,
    method TEXT NOT NULL,
    url TEXT NOT NULL,
    status INTEGER NOT NULL,
    headers BLOB NOT NULL,
    body BLOB NOT NULL,
    response_url TEXT NOT NULL,
    stored_at TEXT NOT NULL,
    PRIMARY KEY (generation, key_hash)
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_generation
    ON cache_entries(generation);

-- Orders waiting for resubmission; seq preserves arrival order
CREATE TABLE IF NOT EXISTS pending_orders (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    order_id TEXT NOT NULL UNIQUE,
    payload BLOB NOT NULL,
    queued_at TEXT NOT NULL
);
"#;
