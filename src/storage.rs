// Odoo MCP Gate - LMDB Storage
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Persists the session journal to LMDB at <state>/SESSION.DB.

use crate::session::Session;
use anyhow::Result;
use heed::types::*;
use heed::{Database, Env, EnvOpenOptions};
use std::path::Path;

/// LMDB store for the session journal
pub struct SessionStore {
    env: Env,
    /// string keys -> JSON values
    db: Database<Str, Str>,
}

const SESSION_KEY: &str = "current_session";
const MAX_DB_SIZE: usize = 16 * 1024 * 1024;

impl SessionStore {
    /// Open or create LMDB at the given path
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(MAX_DB_SIZE)
                .max_dbs(2)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let db = env.create_database(&mut wtxn, Some("journal"))?;
        wtxn.commit()?;

        log::info!("Session journal opened at {:?}", path);
        Ok(Self { env, db })
    }

    pub fn save_session(&self, session: &Session) -> Result<()> {
        let json = serde_json::to_string(session)?;
        let mut wtxn = self.env.write_txn()?;
        self.db.put(&mut wtxn, SESSION_KEY, &json)?;
        wtxn.commit()?;
        Ok(())
    }

    pub fn load_session(&self) -> Result<Option<Session>> {
        let rtxn = self.env.read_txn()?;
        match self.db.get(&rtxn, SESSION_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(json)?)),
            None => Ok(None),
        }
    }

    /// Drop the stored journal. Returns whether one existed.
    pub fn clear(&self) -> Result<bool> {
        let mut wtxn = self.env.write_txn()?;
        let deleted = self.db.delete(&mut wtxn, SESSION_KEY)?;
        wtxn.commit()?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::ToolResult;
    use tempfile::tempdir;

    #[test]
    fn session_survives_reopen() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("SESSION.DB");
        {
            let store = SessionStore::open(&path)?;
            assert!(store.load_session()?.is_none());
            let mut session = Session::new();
            session.record_call("odoo_start", "odoo18", None, &ToolResult::error("Error: boom"));
            store.save_session(&session)?;
        }
        let store = SessionStore::open(&path)?;
        let loaded = store.load_session()?.expect("saved session");
        assert_eq!(loaded.call_count, 1);
        assert_eq!(loaded.failures.len(), 1);
        Ok(())
    }

    #[test]
    fn clear_removes_journal() -> Result<()> {
        let dir = tempdir()?;
        let store = SessionStore::open(&dir.path().join("SESSION.DB"))?;
        assert!(!store.clear()?);
        store.save_session(&Session::new())?;
        assert!(store.clear()?);
        assert!(store.load_session()?.is_none());
        Ok(())
    }
}
