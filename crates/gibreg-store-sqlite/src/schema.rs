//! SQL schema for the gibreg SQLite store.
//!
//! Executed once at connection startup. The layout is the durable contract
//! with existing data; changes must be gated on `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Rows are never deleted. A registration missing from the latest full sweep
-- is flagged with is_active = 0.
CREATE TABLE IF NOT EXISTS registry_entries (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    identifier     TEXT    NOT NULL CHECK (length(identifier) BETWEEN 1 AND 20),
    alias          TEXT    NOT NULL CHECK (length(alias) BETWEEN 1 AND 100),
    title          TEXT             CHECK (title IS NULL OR length(title) <= 100),
    kind           TEXT    NOT NULL CHECK (kind IN ('private_person', 'legal_entity')),
    document_type  TEXT    NOT NULL CHECK (document_type IN ('Invoice', 'DespatchAdvice')),
    first_seen_at  TEXT    NOT NULL,   -- RFC 3339 UTC, fixed width
    is_active      INTEGER NOT NULL DEFAULT 1 CHECK (is_active IN (0, 1)),
    created_at     TEXT    NOT NULL,
    last_synced_at TEXT    NOT NULL,
    CHECK (last_synced_at >= created_at)
);

CREATE UNIQUE INDEX IF NOT EXISTS registry_entries_key_idx
    ON registry_entries(identifier, alias, document_type);
CREATE INDEX IF NOT EXISTS registry_entries_identifier_idx
    ON registry_entries(identifier);
CREATE INDEX IF NOT EXISTS registry_entries_active_idx
    ON registry_entries(is_active);

PRAGMA user_version = 1;
";

/// Column list shared by every query that decodes a full row.
pub const ENTRY_COLUMNS: &str = "id, identifier, alias, title, kind, document_type,
     first_seen_at, is_active, created_at, last_synced_at";
