//! The transactional store behind every API request.
//!
//! Each request runs on a [`Session`]: reads see committed state, writes are
//! staged and applied atomically on [`Session::commit`], and dropping an
//! uncommitted session discards everything it staged. Mutation paths load
//! their aggregate through a `get_*_by_id` that takes a per-row async lock
//! held for the rest of the session, so two concurrent mutations of the same
//! gameroom or game serialize. A lock that cannot be acquired within the
//! timeout surfaces as the conflict error the API maps to
//! "Another operation is pending. Try again.".

mod gamerooms;
mod games;
mod users;

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tuicub::error::Error;
use uuid::Uuid;

/// How long a session waits for a row lock before giving up with a conflict.
const LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum TreeKind {
    Users,
    Tokens,
    Gamerooms,
    Games,
}

#[derive(Debug)]
struct WriteOp {
    tree: TreeKind,
    key: Vec<u8>,
    /// `None` deletes the row.
    value: Option<Vec<u8>>,
}

/// The sled-backed store shared by all request workers.
pub struct Store {
    db: sled::Db,
    users: sled::Tree,
    tokens: sled::Tree,
    gamerooms: sled::Tree,
    games: sled::Tree,
    locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl Store {
    /// Opens (or creates) the store at the given path.
    pub fn open(path: &str) -> Result<Arc<Store>> {
        let db = sled::open(path).with_context(|| format!("Failed to open store at {path}"))?;
        Self::with_db(db)
    }

    /// An in-memory store for tests, destroyed on drop.
    pub fn temporary() -> Arc<Store> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .expect("Failed to open temporary store");
        Self::with_db(db).expect("Failed to open temporary store trees")
    }

    fn with_db(db: sled::Db) -> Result<Arc<Store>> {
        Ok(Arc::new(Store {
            users: db.open_tree("users")?,
            tokens: db.open_tree("user_tokens")?,
            gamerooms: db.open_tree("gamerooms")?,
            games: db.open_tree("games")?,
            db,
            locks: Mutex::new(HashMap::new()),
        }))
    }

    /// Starts a session for one request.
    pub fn session(self: &Arc<Self>) -> Session {
        Session {
            store: Arc::clone(self),
            guards: Vec::new(),
            locked: HashSet::new(),
            writes: Vec::new(),
        }
    }

    fn tree(&self, kind: TreeKind) -> &sled::Tree {
        match kind {
            TreeKind::Users => &self.users,
            TreeKind::Tokens => &self.tokens,
            TreeKind::Gamerooms => &self.gamerooms,
            TreeKind::Games => &self.games,
        }
    }

    fn row_lock(&self, id: Uuid) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        Arc::clone(locks.entry(id).or_default())
    }
}

/// A single request's view of the store.
pub struct Session {
    store: Arc<Store>,
    guards: Vec<OwnedMutexGuard<()>>,
    locked: HashSet<Uuid>,
    writes: Vec<WriteOp>,
}

impl Session {
    /// Acquires the row lock for an aggregate id, holding it until the
    /// session ends. Re-locking an id the session already holds is a no-op.
    pub(crate) async fn lock_row(&mut self, id: Uuid) -> Result<(), Error> {
        if self.locked.contains(&id) {
            return Ok(());
        }

        let lock = self.store.row_lock(id);
        let guard = tokio::time::timeout(LOCK_TIMEOUT, lock.lock_owned())
            .await
            .map_err(|_| Error::Conflict)?;
        self.guards.push(guard);
        self.locked.insert(id);
        Ok(())
    }

    fn read(&self, tree: TreeKind, key: &[u8]) -> Result<Option<sled::IVec>, Error> {
        self.store.tree(tree).get(key).map_err(internal)
    }

    fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        tree: TreeKind,
        key: &[u8],
    ) -> Result<Option<T>, Error> {
        match self.read(tree, key)? {
            None => Ok(None),
            Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(internal),
        }
    }

    fn stage_put<T: Serialize>(
        &mut self,
        tree: TreeKind,
        key: Vec<u8>,
        value: &T,
    ) -> Result<(), Error> {
        let value = serde_json::to_vec(value).map_err(internal)?;
        self.writes.push(WriteOp {
            tree,
            key,
            value: Some(value),
        });
        Ok(())
    }

    fn stage_delete(&mut self, tree: TreeKind, key: Vec<u8>) {
        self.writes.push(WriteOp {
            tree,
            key,
            value: None,
        });
    }

    /// Applies every staged write and flushes. Writes to one tree go down as
    /// a single atomic batch; batches are applied in a fixed tree order.
    /// Consumes the session, releasing its row locks.
    pub fn commit(self) -> Result<(), Error> {
        if self.writes.is_empty() {
            return Ok(());
        }

        let mut batches: HashMap<TreeKind, sled::Batch> = HashMap::new();
        for op in &self.writes {
            let batch = batches.entry(op.tree).or_default();
            match &op.value {
                Some(value) => batch.insert(op.key.as_slice(), value.as_slice()),
                None => batch.remove(op.key.as_slice()),
            }
        }

        for kind in [
            TreeKind::Users,
            TreeKind::Tokens,
            TreeKind::Gamerooms,
            TreeKind::Games,
        ] {
            if let Some(batch) = batches.remove(&kind) {
                self.store.tree(kind).apply_batch(batch).map_err(internal)?;
            }
        }

        self.store.db.flush().map_err(internal)?;
        Ok(())
    }
}

fn internal(err: impl std::fmt::Display) -> Error {
    Error::Internal {
        reason: err.to_string(),
    }
}

fn key_for(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}
