//! Durable catalog store and reconciler (SQLite)
//!
//! The catalog is the single owner of folder/media/tag state. Scan-derived
//! fields are refreshed on every rediscovery; user annotations (rating,
//! favorite, hidden, tags, history) are only ever touched by their own
//! explicit operations, so a rescan can never destroy them. Each public
//! operation is one transaction.

use std::collections::HashSet;
use std::path::Path;

use rusqlite::{params, types::Value, Connection};

use crate::error::CatalogError;
use crate::models::{MediaKind, MediaSummary, NewMedia, SearchFilters};

/// Stored under the `schema_version` preference key
pub const SCHEMA_VERSION: &str = "1.0";

/// Canonical form of a path as stored in the `media.path` column.
/// Forward slashes keep keys comparable across platforms.
pub fn db_path_key(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// The catalog database. Owns its connection; move it to the thread that
/// uses it.
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    /// Open or create the catalog at the given path.
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                let _ = std::fs::create_dir_all(parent);
            }
        }
        let conn = Connection::open(path)?;
        let catalog = Self { conn };
        catalog.init_schema()?;
        log::debug!("catalog opened: {}", path.display());
        Ok(catalog)
    }

    /// Open an in-memory catalog (for testing).
    pub fn open_in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory()?;
        let catalog = Self { conn };
        catalog.init_schema()?;
        Ok(catalog)
    }

    /// Create all tables and indexes. Idempotent.
    fn init_schema(&self) -> Result<(), CatalogError> {
        self.conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS folders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                path TEXT NOT NULL UNIQUE,
                is_active INTEGER NOT NULL DEFAULT 1,
                added_at TEXT DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS media (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                folder_id INTEGER NOT NULL,
                path TEXT NOT NULL UNIQUE,
                filename TEXT,
                ext TEXT,
                size INTEGER,
                mtime REAL,
                type TEXT, -- 'image' | 'video' | 'other'
                width INTEGER,
                height INTEGER,
                duration_s REAL,
                hash TEXT,
                created_exif TEXT,
                imported_at TEXT DEFAULT (datetime('now')),
                rating INTEGER,
                favorite INTEGER DEFAULT 0,
                hidden INTEGER DEFAULT 0,
                missing INTEGER DEFAULT 0,
                last_played_at TEXT,
                FOREIGN KEY(folder_id) REFERENCES folders(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS media_tags (
                media_id INTEGER NOT NULL,
                tag_id INTEGER NOT NULL,
                PRIMARY KEY (media_id, tag_id),
                FOREIGN KEY(media_id) REFERENCES media(id) ON DELETE CASCADE,
                FOREIGN KEY(tag_id) REFERENCES tags(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS people (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS faces (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                media_id INTEGER NOT NULL,
                x INTEGER, y INTEGER, w INTEGER, h INTEGER,
                person_id INTEGER NULL,
                embedding BLOB,
                FOREIGN KEY(media_id) REFERENCES media(id) ON DELETE CASCADE,
                FOREIGN KEY(person_id) REFERENCES people(id) ON DELETE SET NULL
            );

            CREATE TABLE IF NOT EXISTS playlists (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS playlist_items (
                playlist_id INTEGER NOT NULL,
                media_id INTEGER NOT NULL,
                position INTEGER NOT NULL,
                PRIMARY KEY (playlist_id, position),
                FOREIGN KEY(playlist_id) REFERENCES playlists(id) ON DELETE CASCADE,
                FOREIGN KEY(media_id) REFERENCES media(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                media_id INTEGER NOT NULL,
                played_at TEXT DEFAULT (datetime('now')),
                action TEXT NOT NULL, -- 'viewed' | 'skipped' | 'liked'
                FOREIGN KEY(media_id) REFERENCES media(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS thumbnails (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                media_id INTEGER NOT NULL,
                kind TEXT NOT NULL, -- 'small' | 'medium'
                thumb_path TEXT NOT NULL,
                width INTEGER,
                height INTEGER,
                generated_at TEXT DEFAULT (datetime('now')),
                UNIQUE(media_id, kind),
                FOREIGN KEY(media_id) REFERENCES media(id) ON DELETE CASCADE
            );

            CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_media_path ON media(path);
            CREATE INDEX IF NOT EXISTS idx_media_folder_type ON media(folder_id, type);
            CREATE INDEX IF NOT EXISTS idx_media_tags_tag ON media_tags(tag_id);
            CREATE INDEX IF NOT EXISTS idx_history_media_played ON history(media_id, played_at);
            ",
        )?;

        self.conn.execute(
            "INSERT OR REPLACE INTO preferences(key, value) VALUES('schema_version', ?1)",
            params![SCHEMA_VERSION],
        )?;
        Ok(())
    }

    /// Register a root folder. Idempotent: a path already known is a no-op
    /// that still returns the existing id.
    pub fn register_folder(&mut self, path: &Path) -> Result<i64, CatalogError> {
        let key = db_path_key(path);
        self.conn.execute(
            "INSERT OR IGNORE INTO folders(path, is_active) VALUES(?1, 1)",
            params![key],
        )?;
        let id: i64 = self
            .conn
            .query_row("SELECT id FROM folders WHERE path = ?1", params![key], |row| {
                row.get(0)
            })?;
        log::debug!("folder registered id={id} path={key}");
        Ok(id)
    }

    /// Soft-deactivate a folder. Records are kept; only the active flag
    /// changes.
    pub fn deactivate_folder(&mut self, folder_id: i64) -> Result<(), CatalogError> {
        self.conn.execute(
            "UPDATE folders SET is_active = 0 WHERE id = ?1",
            params![folder_id],
        )?;
        Ok(())
    }

    /// Insert or refresh one media record, keyed by path. Rediscovery
    /// refreshes every scan-derived field and clears `missing`; it never
    /// touches rating, favorite, hidden, tags or history.
    pub fn upsert_media(&mut self, media: &NewMedia) -> Result<i64, CatalogError> {
        self.conn.execute(
            "INSERT INTO media(
                folder_id, path, filename, ext, size, mtime, type,
                width, height, duration_s, hash, created_exif, missing
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, 0)
            ON CONFLICT(path) DO UPDATE SET
                folder_id=excluded.folder_id,
                filename=excluded.filename,
                ext=excluded.ext,
                size=excluded.size,
                mtime=excluded.mtime,
                type=excluded.type,
                width=excluded.width,
                height=excluded.height,
                duration_s=excluded.duration_s,
                hash=excluded.hash,
                created_exif=excluded.created_exif,
                missing=0",
            params![
                media.folder_id,
                media.path,
                media.filename,
                media.ext,
                media.size as i64,
                media.mtime,
                media.kind.as_str(),
                media.width,
                media.height,
                media.duration_s,
                media.hash,
                media.created_exif,
            ],
        )?;
        let id: i64 = self.conn.query_row(
            "SELECT id FROM media WHERE path = ?1",
            params![media.path],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Flag every record under `folder_id` whose path is not in
    /// `seen_paths` as missing. Entries of other folders are untouched.
    /// Must only be called after a completed (non-cancelled) scan pass.
    pub fn mark_missing(
        &mut self,
        folder_id: i64,
        seen_paths: &HashSet<String>,
    ) -> Result<usize, CatalogError> {
        let tx = self.conn.transaction()?;
        let to_mark: Vec<String> = {
            let mut stmt = tx.prepare("SELECT path FROM media WHERE folder_id = ?1")?;
            let rows = stmt.query_map(params![folder_id], |row| row.get::<_, String>(0))?;
            let mut paths = Vec::new();
            for row in rows {
                let path = row?;
                if !seen_paths.contains(&path) {
                    paths.push(path);
                }
            }
            paths
        };
        {
            let mut stmt = tx.prepare("UPDATE media SET missing = 1 WHERE path = ?1")?;
            for path in &to_mark {
                stmt.execute(params![path])?;
            }
        }
        tx.commit()?;
        log::info!("marked {} records missing in folder {}", to_mark.len(), folder_id);
        Ok(to_mark.len())
    }

    /// Search the catalog. All filters are optional and combined with AND;
    /// tag filtering requires the record to carry every listed tag.
    /// Results are most-recent-first, paginated via limit/offset.
    pub fn search(&self, filters: &SearchFilters) -> Result<Vec<MediaSummary>, CatalogError> {
        let mut where_clauses: Vec<String> = vec!["1=1".into()];
        let mut params_vec: Vec<Value> = Vec::new();
        let mut join = String::new();
        let mut having = String::new();

        if let Some(folder_id) = filters.folder_id {
            where_clauses.push("m.folder_id = ?".into());
            params_vec.push(Value::Integer(folder_id));
        }
        if let Some(kind) = filters.kind {
            where_clauses.push("m.type = ?".into());
            params_vec.push(Value::Text(kind.as_str().to_string()));
        }
        if let Some(favorite) = filters.favorite {
            where_clauses.push("m.favorite = ?".into());
            params_vec.push(Value::Integer(favorite as i64));
        }
        if let Some(hidden) = filters.hidden {
            where_clauses.push("m.hidden = ?".into());
            params_vec.push(Value::Integer(hidden as i64));
        }
        if let Some(text) = &filters.text {
            where_clauses.push("(m.filename LIKE ? OR m.path LIKE ?)".into());
            let like = format!("%{text}%");
            params_vec.push(Value::Text(like.clone()));
            params_vec.push(Value::Text(like));
        }
        if !filters.tags.is_empty() {
            let placeholders = vec!["?"; filters.tags.len()].join(",");
            join.push_str(
                " JOIN media_tags mt ON mt.media_id = m.id JOIN tags t ON t.id = mt.tag_id",
            );
            where_clauses.push(format!("t.name IN ({placeholders})"));
            for tag in &filters.tags {
                params_vec.push(Value::Text(tag.clone()));
            }
            // AND-of-set: the record must carry every requested tag
            having = format!(" HAVING COUNT(DISTINCT t.name) = {}", filters.tags.len());
        }

        let sql = format!(
            "SELECT m.id, m.path, m.filename, m.ext, m.size, m.mtime, m.type,
                    m.favorite, m.hidden, m.missing
             FROM media m{join}
             WHERE {}
             GROUP BY m.id{having}
             ORDER BY m.id DESC LIMIT ? OFFSET ?",
            where_clauses.join(" AND ")
        );
        params_vec.push(Value::Integer(filters.limit as i64));
        params_vec.push(Value::Integer(filters.offset as i64));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(params_vec), |row| {
            Ok(MediaSummary {
                id: row.get(0)?,
                path: row.get(1)?,
                filename: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                ext: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                size: row.get::<_, Option<i64>>(4)?.unwrap_or(0) as u64,
                mtime: row.get::<_, Option<f64>>(5)?.unwrap_or(0.0),
                kind: MediaKind::from_str(&row.get::<_, Option<String>>(6)?.unwrap_or_default()),
                favorite: row.get::<_, i64>(7)? != 0,
                hidden: row.get::<_, i64>(8)? != 0,
                missing: row.get::<_, i64>(9)? != 0,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        log::debug!("search returned {} results", results.len());
        Ok(results)
    }

    /// Sync a media record's tags to exactly the given set, creating tags
    /// as needed and detaching the rest.
    pub fn update_tags(&mut self, media_id: i64, tag_names: &[String]) -> Result<(), CatalogError> {
        let tx = self.conn.transaction()?;
        let existing: HashSet<String> = {
            let mut stmt = tx.prepare(
                "SELECT t.name FROM tags t
                 JOIN media_tags mt ON mt.tag_id = t.id WHERE mt.media_id = ?1",
            )?;
            let rows = stmt.query_map(params![media_id], |row| row.get::<_, String>(0))?;
            let mut names = HashSet::new();
            for row in rows {
                names.insert(row?);
            }
            names
        };
        let desired: HashSet<String> = tag_names.iter().cloned().collect();

        for name in desired.difference(&existing) {
            tx.execute("INSERT OR IGNORE INTO tags(name) VALUES(?1)", params![name])?;
            let tag_id: i64 =
                tx.query_row("SELECT id FROM tags WHERE name = ?1", params![name], |row| {
                    row.get(0)
                })?;
            tx.execute(
                "INSERT OR IGNORE INTO media_tags(media_id, tag_id) VALUES(?1, ?2)",
                params![media_id, tag_id],
            )?;
        }
        for name in existing.difference(&desired) {
            tx.execute(
                "DELETE FROM media_tags WHERE media_id = ?1
                 AND tag_id IN (SELECT id FROM tags WHERE name = ?2)",
                params![media_id, name],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Tag names currently attached to a media record.
    pub fn tags_for(&self, media_id: i64) -> Result<Vec<String>, CatalogError> {
        let mut stmt = self.conn.prepare(
            "SELECT t.name FROM tags t
             JOIN media_tags mt ON mt.tag_id = t.id
             WHERE mt.media_id = ?1 ORDER BY t.name",
        )?;
        let rows = stmt.query_map(params![media_id], |row| row.get(0))?;
        let mut names = Vec::new();
        for row in rows {
            names.push(row?);
        }
        Ok(names)
    }

    /// Append a history entry. `viewed` also stamps `last_played_at`;
    /// `liked` also sets the favorite flag.
    pub fn log_history(&mut self, media_id: i64, action: &str) -> Result<(), CatalogError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO history(media_id, action) VALUES(?1, ?2)",
            params![media_id, action],
        )?;
        if action == "viewed" {
            tx.execute(
                "UPDATE media SET last_played_at = datetime('now') WHERE id = ?1",
                params![media_id],
            )?;
        }
        if action == "liked" {
            tx.execute(
                "UPDATE media SET favorite = 1 WHERE id = ?1",
                params![media_id],
            )?;
        }
        tx.commit()?;
        log::debug!("history logged ({action}) for media {media_id}");
        Ok(())
    }

    /// Store a key/value preference, last-write-wins.
    pub fn set_preference(&mut self, key: &str, value: &str) -> Result<(), CatalogError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO preferences(key, value) VALUES(?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Read a preference, `None` when unset.
    pub fn get_preference(&self, key: &str) -> Result<Option<String>, CatalogError> {
        use rusqlite::OptionalExtension;
        let value = self
            .conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    /// Record a generated thumbnail for a media record, one per kind.
    pub fn set_thumbnail(
        &mut self,
        media_id: i64,
        kind: &str,
        thumb_path: &str,
        width: u32,
        height: u32,
    ) -> Result<(), CatalogError> {
        self.conn.execute(
            "INSERT INTO thumbnails(media_id, kind, thumb_path, width, height)
             VALUES(?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(media_id, kind) DO UPDATE SET
                thumb_path=excluded.thumb_path,
                width=excluded.width,
                height=excluded.height,
                generated_at=datetime('now')",
            params![media_id, kind, thumb_path, width, height],
        )?;
        Ok(())
    }

    /// Number of media records in the catalog.
    pub fn media_count(&self) -> Result<u64, CatalogError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM media", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
