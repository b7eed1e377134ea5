//! SQL schema for the Cherry SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per entity of any type. Type-specific fields live in `payload`.
CREATE TABLE IF NOT EXISTS entities (
    id           TEXT PRIMARY KEY,
    entity_type  TEXT NOT NULL,   -- snake_case EntityType
    parent_id    TEXT REFERENCES entities(id) ON DELETE CASCADE,
    parent_type  TEXT,
    name         TEXT,
    description  TEXT,
    reference    TEXT,
    tags         TEXT NOT NULL DEFAULT '[]',
    status_type  TEXT NOT NULL DEFAULT 'active',
    since        TEXT,            -- RFC 3339; only set while inactive
    created_at   TEXT,
    created_by   TEXT,
    modified_at  TEXT,
    modified_by  TEXT,
    payload      TEXT NOT NULL DEFAULT '{}',
    CHECK ((parent_id IS NULL) = (parent_type IS NULL))
);

CREATE INDEX IF NOT EXISTS entities_type_idx   ON entities(entity_type);
CREATE INDEX IF NOT EXISTS entities_parent_idx ON entities(parent_id, entity_type);

PRAGMA user_version = 1;
";
