pub const SCHEMA: &str = r#"
-- Projects scope robots and grants
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Users hold project grants; tokens are just auth credentials for users
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

-- Tokens are auth credentials; non-admin tokens must belong to a user
CREATE TABLE IF NOT EXISTS tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,        -- first 8 chars of a UUID for fast lookup
    is_admin INTEGER NOT NULL DEFAULT 0,

    -- User binding (required for non-admin tokens, NULL only for admin tokens)
    user_id TEXT REFERENCES users(id) ON DELETE CASCADE,

    -- Lifecycle
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,            -- NULL = never
    last_used_at TEXT
);

-- Project grants: robot-management permissions a user has for a project
CREATE TABLE IF NOT EXISTS project_grants (
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    allow_bits INTEGER NOT NULL DEFAULT 0,
    deny_bits INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (user_id, project_id)
);

-- Robot accounts. AUTOINCREMENT keeps ids of deleted robots from being reused.
CREATE TABLE IF NOT EXISTS robots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    secret_hash TEXT NOT NULL,         -- argon2id hash, the secret itself is never stored
    disabled INTEGER NOT NULL DEFAULT 0,
    expires_at TEXT,                   -- NULL = never
    level TEXT NOT NULL DEFAULT 'project',
    permissions TEXT NOT NULL DEFAULT '[]',  -- JSON array of permission blocks
    creation_time TEXT DEFAULT (datetime('now')),
    update_time TEXT DEFAULT (datetime('now')),

    UNIQUE(project_id, name)
);

-- Create indexes
CREATE UNIQUE INDEX IF NOT EXISTS idx_tokens_lookup ON tokens(token_lookup);
CREATE INDEX IF NOT EXISTS idx_tokens_user ON tokens(user_id);
CREATE INDEX IF NOT EXISTS idx_project_grants_project ON project_grants(project_id);
CREATE INDEX IF NOT EXISTS idx_robots_project ON robots(project_id);
"#;
