//! SQL schema for the sales-planning SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS sales_plans (
    id          TEXT PRIMARY KEY,
    country     TEXT NOT NULL,
    year        TEXT NOT NULL,
    status      TEXT NOT NULL,   -- 'draft' | 'review' | 'approved' | 'published' | 'denied'
    user_email  TEXT,
    created_at  TEXT NOT NULL,   -- RFC 3339 UTC, microsecond precision
    updated_at  TEXT NOT NULL
);

-- Rows are only ever replaced wholesale: delete-then-insert per plan.
CREATE TABLE IF NOT EXISTS sales_plan_rows (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    plan_id         TEXT NOT NULL REFERENCES sales_plans(id) ON DELETE CASCADE,
    row_order       INTEGER NOT NULL,
    planning_period TEXT NOT NULL,   -- 'FY' | 'T1'..'T3' | 'Q1'..'Q4'
    hfb             TEXT,
    sales_goal      REAL NOT NULL,
    actual_sales    REAL NOT NULL,
    variance        REAL NOT NULL,
    qty             REAL,
    UNIQUE (plan_id, row_order)
);

-- Review status per row. No foreign key: entries for deleted plans are
-- left behind and never read.
CREATE TABLE IF NOT EXISTS row_statuses (
    plan_id     TEXT NOT NULL,
    ordinal     INTEGER NOT NULL,
    status      TEXT NOT NULL,   -- 'approved' | 'denied' | 'published'
    updated_at  TEXT NOT NULL,
    PRIMARY KEY (plan_id, ordinal)
);

-- Bumped in the same transaction as every row_statuses mutation.
CREATE TABLE IF NOT EXISTS status_revision (
    id       INTEGER PRIMARY KEY CHECK (id = 1),
    revision INTEGER NOT NULL
);
INSERT OR IGNORE INTO status_revision (id, revision) VALUES (1, 0);

CREATE TABLE IF NOT EXISTS user_roles (
    user_email  TEXT PRIMARY KEY,
    input_user  INTEGER NOT NULL DEFAULT 0,
    reviewer    INTEGER NOT NULL DEFAULT 0,
    admin       INTEGER NOT NULL DEFAULT 0,
    updated_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_rows_plan_id       ON sales_plan_rows(plan_id);
CREATE INDEX IF NOT EXISTS idx_plan_status        ON sales_plans(status);
CREATE INDEX IF NOT EXISTS idx_plan_year_country  ON sales_plans(year, country);

PRAGMA user_version = 1;
";
