use std::collections::HashMap;

use super::models::*;
use super::sqlite::Catalog;
use rusqlite::{params, Result, Row};
use tracing::debug;

const GROUP_QUERY_MAX: i64 = 500;
const SEARCH_LIMIT_MAX: i64 = 500;
const SEARCH_LIMIT_DEFAULT: i64 = 200;

fn row_to_record(row: &Row) -> Result<FileRecord> {
    Ok(FileRecord {
        path: row.get(0)?,
        name: row.get(1)?,
        ext: row.get(2)?,
        file_type: FileType::from_label(&row.get::<_, String>(3)?),
        size: row.get(4)?,
        modified: row.get(5)?,
        created: row.get(6)?,
        partial_hash: row.get(7)?,
        full_hash: row.get(8)?,
        is_dir: row.get(9)?,
        parent: row.get(10)?,
        content_snippet: row.get(11)?,
        indexed_at: row.get(12)?,
    })
}

const RECORD_COLUMNS: &str = "path, name, ext, type, size, modified, created, \
     partial_hash, full_hash, is_dir, parent, content_snippet, indexed_at";

impl Catalog {
    // ── Upserts ──────────────────────────────────────────────────

    /// Insert or refresh one record by path. Metadata, snippet and
    /// indexed_at are overwritten; hash columns are left untouched (only
    /// the duplicate scan writes those).
    pub fn upsert(&self, record: &FileRecord) -> Result<()> {
        self.upsert_batch(std::slice::from_ref(record)).map(|_| ())
    }

    /// Upsert a batch of records inside a single transaction.
    pub fn upsert_batch(&self, records: &[FileRecord]) -> Result<usize> {
        let tx = self.connection().unchecked_transaction()?;
        let mut count = 0;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO files_index \
                 (path, name, ext, type, size, modified, created, is_dir, \
                  parent, content_snippet, indexed_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, unixepoch()) \
                 ON CONFLICT(path) DO UPDATE SET \
                     name = excluded.name, \
                     ext = excluded.ext, \
                     type = excluded.type, \
                     size = excluded.size, \
                     modified = excluded.modified, \
                     created = excluded.created, \
                     is_dir = excluded.is_dir, \
                     parent = excluded.parent, \
                     content_snippet = excluded.content_snippet, \
                     indexed_at = excluded.indexed_at",
            )?;
            for record in records {
                count += stmt.execute(params![
                    record.path,
                    record.name,
                    record.ext,
                    record.file_type.as_str(),
                    record.size,
                    record.modified,
                    record.created,
                    record.is_dir,
                    record.parent,
                    record.content_snippet,
                ])?;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    // ── Point reads ──────────────────────────────────────────────

    pub fn get(&self, path: &str) -> Result<Option<FileRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM files_index WHERE path = ?1");
        match self
            .connection()
            .query_row(&sql, params![path], row_to_record)
        {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn count_records(&self) -> Result<i64> {
        self.connection()
            .query_row("SELECT COUNT(*) FROM files_index", [], |row| row.get(0))
    }

    // ── Prefix / browse queries ──────────────────────────────────

    pub fn query_by_path_prefix(&self, prefix: &str, limit: i64) -> Result<Vec<FileRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM files_index \
             WHERE path LIKE ?1 ORDER BY path LIMIT ?2"
        );
        let mut stmt = self.connection().prepare(&sql)?;
        let records = stmt
            .query_map(params![format!("{}%", prefix), limit], row_to_record)?
            .collect::<Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Immediate children of a directory, folders first then by name.
    pub fn list_children(&self, parent: &str) -> Result<Vec<FileRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM files_index \
             WHERE parent = ?1 ORDER BY is_dir DESC, name"
        );
        let mut stmt = self.connection().prepare(&sql)?;
        let records = stmt
            .query_map(params![parent], row_to_record)?
            .collect::<Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Parameterized read-only search over the catalog. Substring match on
    /// name or content snippet, optional ext/type/size/modified filters,
    /// newest-modified first.
    pub fn search(&self, search: &SearchParams) -> Result<Vec<FileRecord>> {
        let mut sql = format!("SELECT {RECORD_COLUMNS} FROM files_index WHERE 1=1");
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(query) = &search.query {
            sql.push_str(" AND (name LIKE ? OR content_snippet LIKE ?)");
            let like = format!("%{}%", query);
            args.push(Box::new(like.clone()));
            args.push(Box::new(like));
        }
        if let Some(ext) = &search.ext {
            sql.push_str(" AND ext = ?");
            args.push(Box::new(ext.to_lowercase()));
        }
        if let Some(file_type) = search.file_type {
            sql.push_str(" AND type = ?");
            args.push(Box::new(file_type.as_str().to_string()));
        }
        if let Some(size_min) = search.size_min {
            sql.push_str(" AND size >= ?");
            args.push(Box::new(size_min));
        }
        if let Some(size_max) = search.size_max {
            sql.push_str(" AND size <= ?");
            args.push(Box::new(size_max));
        }
        if let Some(modified_from) = search.modified_from {
            sql.push_str(" AND modified >= ?");
            args.push(Box::new(modified_from));
        }
        if let Some(modified_to) = search.modified_to {
            sql.push_str(" AND modified <= ?");
            args.push(Box::new(modified_to));
        }

        sql.push_str(" ORDER BY modified DESC LIMIT ?");
        let limit = if search.limit > 0 {
            search.limit.min(SEARCH_LIMIT_MAX)
        } else {
            SEARCH_LIMIT_DEFAULT
        };
        args.push(Box::new(limit));

        let mut stmt = self.connection().prepare(&sql)?;
        let arg_refs: Vec<&dyn rusqlite::ToSql> = args.iter().map(|a| a.as_ref()).collect();
        let records = stmt
            .query_map(arg_refs.as_slice(), row_to_record)?
            .collect::<Result<Vec<_>>>()?;
        Ok(records)
    }

    // ── Duplicate seed & hash updates ────────────────────────────

    /// Non-directory, non-empty rows under `root`, grouped by exact size.
    /// Buckets and their members come back in discovery order.
    pub fn size_buckets(&self, root: &str) -> Result<Vec<SizeBucket>> {
        let mut stmt = self.connection().prepare(
            "SELECT path, size FROM files_index \
             WHERE parent LIKE ?1 AND is_dir = 0 AND size > 0 \
             ORDER BY size, rowid",
        )?;
        let rows = stmt
            .query_map(params![format!("{}%", root)], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>>>()?;

        let mut buckets: Vec<SizeBucket> = Vec::new();
        for (path, size) in rows {
            match buckets.last_mut() {
                Some(bucket) if bucket.size == size => bucket.paths.push(path),
                _ => buckets.push(SizeBucket {
                    size,
                    paths: vec![path],
                }),
            }
        }
        Ok(buckets)
    }

    /// Group the given paths by their stored partial hash. Rows without a
    /// partial hash are left out.
    pub fn group_by_partial_hash(&self, paths: &[String]) -> Result<Vec<(String, Vec<String>)>> {
        let mut groups: HashMap<String, Vec<String>> = HashMap::new();
        // Chunked IN-lists keep us well under SQLite's bound-variable cap.
        for chunk in paths.chunks(500) {
            let placeholders = vec!["?"; chunk.len()].join(",");
            let sql = format!(
                "SELECT partial_hash, path FROM files_index \
                 WHERE partial_hash IS NOT NULL AND path IN ({placeholders}) \
                 ORDER BY rowid"
            );
            let mut stmt = self.connection().prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(chunk.iter()), |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<Result<Vec<_>>>()?;
            for (hash, path) in rows {
                groups.entry(hash).or_default().push(path);
            }
        }
        let mut result: Vec<_> = groups.into_iter().collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(result)
    }

    pub fn set_partial_hash(&self, path: &str, hash: &str) -> Result<()> {
        self.connection().execute(
            "UPDATE files_index SET partial_hash = ?1 WHERE path = ?2",
            params![hash, path],
        )?;
        Ok(())
    }

    pub fn set_full_hash(&self, path: &str, hash: &str) -> Result<()> {
        self.connection().execute(
            "UPDATE files_index SET full_hash = ?1 WHERE path = ?2",
            params![hash, path],
        )?;
        Ok(())
    }

    /// Persist a batch of `(path, partial_hash)` pairs in one transaction.
    pub fn set_partial_hashes(&self, entries: &[(String, String)]) -> Result<()> {
        let tx = self.connection().unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "UPDATE files_index SET partial_hash = ?1 WHERE path = ?2",
            )?;
            for (path, hash) in entries {
                stmt.execute(params![hash, path])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Persist a batch of `(path, full_hash)` pairs in one transaction.
    pub fn set_full_hashes(&self, entries: &[(String, String)]) -> Result<()> {
        let tx = self.connection().unchecked_transaction()?;
        {
            let mut stmt = tx
                .prepare_cached("UPDATE files_index SET full_hash = ?1 WHERE path = ?2")?;
            for (path, hash) in entries {
                stmt.execute(params![hash, path])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    // ── Duplicate groups (read path) ─────────────────────────────

    /// Materialize duplicate groups: hashed, non-directory, non-empty rows
    /// sharing `(partial_hash, size)`, largest size first. `root` restricts
    /// to rows under that directory; `limit` is clamped to 500.
    pub fn duplicate_groups(
        &self,
        root: Option<&str>,
        limit: i64,
    ) -> Result<Vec<DuplicateGroup>> {
        let limit = if limit > 0 {
            limit.min(GROUP_QUERY_MAX)
        } else {
            GROUP_QUERY_MAX
        };
        let root_pattern = root.map(|r| format!("{}%", r));

        let group_sql = "SELECT partial_hash, size, COUNT(*) AS cnt FROM files_index \
             WHERE partial_hash IS NOT NULL AND is_dir = 0 AND size > 0";
        let group_tail = " GROUP BY partial_hash, size HAVING cnt > 1 \
             ORDER BY size DESC, cnt DESC LIMIT ?";

        let keys: Vec<(String, i64)> = match &root_pattern {
            Some(pattern) => {
                let sql = format!("{group_sql} AND parent LIKE ?{group_tail}");
                let mut stmt = self.connection().prepare(&sql)?;
                let keys = stmt
                    .query_map(params![pattern, limit], |row| {
                        Ok((row.get(0)?, row.get(1)?))
                    })?
                    .collect::<Result<Vec<_>>>()?;
                keys
            }
            None => {
                let sql = format!("{group_sql}{group_tail}");
                let mut stmt = self.connection().prepare(&sql)?;
                let keys = stmt
                    .query_map(params![limit], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<Result<Vec<_>>>()?;
                keys
            }
        };

        let member_sql = "SELECT path, modified, full_hash FROM files_index \
             WHERE partial_hash = ?1 AND size = ?2 AND is_dir = 0";
        let mut groups = Vec::with_capacity(keys.len());
        for (partial_hash, size) in keys {
            let files = match &root_pattern {
                Some(pattern) => {
                    let sql = format!("{member_sql} AND parent LIKE ?3 ORDER BY rowid");
                    let mut stmt = self.connection().prepare(&sql)?;
                    let members = stmt
                        .query_map(params![partial_hash, size, pattern], |row| {
                            Ok(GroupMember {
                                path: row.get(0)?,
                                modified: row.get(1)?,
                                full_hash: row.get(2)?,
                            })
                        })?
                        .collect::<Result<Vec<_>>>()?;
                    members
                }
                None => {
                    let sql = format!("{member_sql} ORDER BY rowid");
                    let mut stmt = self.connection().prepare(&sql)?;
                    let members = stmt
                        .query_map(params![partial_hash, size], |row| {
                            Ok(GroupMember {
                                path: row.get(0)?,
                                modified: row.get(1)?,
                                full_hash: row.get(2)?,
                            })
                        })?
                        .collect::<Result<Vec<_>>>()?;
                    members
                }
            };
            groups.push(DuplicateGroup {
                size,
                partial_hash,
                files,
            });
        }
        Ok(groups)
    }

    // ── Deletes & history ────────────────────────────────────────

    /// Remove a record. Returns true if a row existed.
    pub fn delete(&self, path: &str) -> Result<bool> {
        let affected = self
            .connection()
            .execute("DELETE FROM files_index WHERE path = ?1", params![path])?;
        Ok(affected > 0)
    }

    pub fn record_history(&self, op_type: &str, payload: &serde_json::Value) -> Result<()> {
        self.connection().execute(
            "INSERT INTO op_history (op_type, payload) VALUES (?1, ?2)",
            params![op_type, payload.to_string()],
        )?;
        Ok(())
    }

    pub fn recent_history(&self, limit: i64) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self.connection().prepare(
            "SELECT id, op_type, payload, created_at FROM op_history \
             ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;
        let entries = stmt
            .query_map(params![limit.clamp(1, 200)], |row| {
                Ok(HistoryEntry {
                    id: row.get(0)?,
                    op_type: row.get(1)?,
                    payload: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>>>()?;
        debug!("Loaded {} history entries", entries.len());
        Ok(entries)
    }
}
