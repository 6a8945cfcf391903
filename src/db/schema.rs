pub const SCHEMA: &str = r#"
-- Owners: journal users and their season calendar
CREATE TABLE IF NOT EXISTS owners (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    season_start_month INTEGER NOT NULL DEFAULT 9,
    season_start_day INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

-- Resort gazetteer
CREATE TABLE IF NOT EXISTS resorts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    country TEXT NOT NULL,
    latitude REAL,
    longitude REAL,
    verified INTEGER NOT NULL DEFAULT 0,
    suggested_by INTEGER,      -- owner that suggested an unverified resort
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (suggested_by) REFERENCES owners(id) ON DELETE CASCADE
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_resorts_verified_name
    ON resorts(name, country) WHERE verified = 1;

-- Calendar days: the canonical journal entries
CREATE TABLE IF NOT EXISTS days (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id INTEGER NOT NULL,
    date TEXT NOT NULL,
    resort_id INTEGER NOT NULL,
    day_number INTEGER,        -- NULL until renumbered
    notes TEXT,
    created_at TEXT NOT NULL,
    FOREIGN KEY (owner_id) REFERENCES owners(id) ON DELETE CASCADE,
    FOREIGN KEY (resort_id) REFERENCES resorts(id)
);

CREATE INDEX IF NOT EXISTS idx_days_owner_date ON days(owner_id, date);

-- Photo references attached to a day
CREATE TABLE IF NOT EXISTS day_photos (
    day_id INTEGER NOT NULL,
    blob_ref TEXT NOT NULL,
    PRIMARY KEY (day_id, blob_ref),
    FOREIGN KEY (day_id) REFERENCES days(id) ON DELETE CASCADE
);

-- Import sessions
CREATE TABLE IF NOT EXISTS import_sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id INTEGER NOT NULL,
    source TEXT NOT NULL,              -- 'text' or 'photos'
    status TEXT NOT NULL DEFAULT 'waiting',
    source_text TEXT,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (owner_id) REFERENCES owners(id) ON DELETE CASCADE
);

-- Draft entries: one bucket per (session, date, resort)
CREATE TABLE IF NOT EXISTS drafts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id INTEGER NOT NULL,
    date TEXT NOT NULL,
    resort_id INTEGER NOT NULL,
    decision TEXT NOT NULL DEFAULT 'pending',
    linked_day_id INTEGER,
    notes TEXT,
    UNIQUE (session_id, date, resort_id),
    FOREIGN KEY (session_id) REFERENCES import_sessions(id) ON DELETE CASCADE,
    FOREIGN KEY (resort_id) REFERENCES resorts(id),
    FOREIGN KEY (linked_day_id) REFERENCES days(id) ON DELETE SET NULL
);

-- Evidence: parsed text lines and uploaded photos
CREATE TABLE IF NOT EXISTS evidence (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id INTEGER NOT NULL,
    kind TEXT NOT NULL,                -- 'line' or 'photo'
    raw TEXT NOT NULL,                 -- line text or blob reference
    line_no INTEGER,
    content_hash TEXT,
    taken_at TEXT,
    date TEXT,
    resort_id INTEGER,
    latitude REAL,
    longitude REAL,
    exif_state TEXT,                   -- 'missing' or 'extracted' once processed
    draft_id INTEGER,
    error TEXT,
    FOREIGN KEY (session_id) REFERENCES import_sessions(id) ON DELETE CASCADE,
    FOREIGN KEY (draft_id) REFERENCES drafts(id) ON DELETE SET NULL
);

CREATE INDEX IF NOT EXISTS idx_evidence_session ON evidence(session_id);
CREATE INDEX IF NOT EXISTS idx_evidence_draft ON evidence(draft_id);
CREATE INDEX IF NOT EXISTS idx_evidence_hash ON evidence(session_id, content_hash);
"#;
