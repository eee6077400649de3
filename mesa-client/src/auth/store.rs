//! Token stores

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::storage::JsonFile;
use crate::{ClientError, ClientResult};

const TOKEN_FILE: &str = "auth_token.json";
const REMEMBER_FILE: &str = "remember_me.json";

/// Where a bearer token is kept between calls
pub trait TokenStore: Send + Sync {
    fn load(&self) -> ClientResult<Option<String>>;
    fn save(&self, token: &str) -> ClientResult<()>;
    fn clear(&self) -> ClientResult<()>;
}

/// Lives as long as the process
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> ClientResult<std::sync::MutexGuard<'_, Option<String>>> {
        self.token
            .lock()
            .map_err(|_| ClientError::Validation("token store lock poisoned".into()))
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> ClientResult<Option<String>> {
        Ok(self.slot()?.clone())
    }

    fn save(&self, token: &str) -> ClientResult<()> {
        *self.slot()? = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        *self.slot()? = None;
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct StoredToken {
    token: String,
}

/// Survives restarts
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    file: JsonFile,
}

impl FileTokenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(dir, TOKEN_FILE),
        }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> ClientResult<Option<String>> {
        Ok(self.file.load::<StoredToken>()?.map(|s| s.token))
    }

    fn save(&self, token: &str) -> ClientResult<()> {
        self.file.save(&StoredToken {
            token: token.to_string(),
        })
    }

    fn clear(&self) -> ClientResult<()> {
        self.file.remove()
    }
}

/// Persistent store, session store and the remember-me flag
#[derive(Clone)]
pub struct AuthStorage {
    persistent: Arc<dyn TokenStore>,
    session: Arc<dyn TokenStore>,
    remember: JsonFile,
}

impl AuthStorage {
    pub fn new(
        persistent: Arc<dyn TokenStore>,
        session: Arc<dyn TokenStore>,
        remember: JsonFile,
    ) -> Self {
        Self {
            persistent,
            session,
            remember,
        }
    }

    /// File-backed persistent store and in-memory session store under `dir`
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self::new(
            Arc::new(FileTokenStore::new(dir.clone())),
            Arc::new(MemoryTokenStore::new()),
            JsonFile::new(dir, REMEMBER_FILE),
        )
    }

    pub fn remember_me(&self) -> ClientResult<bool> {
        Ok(self.remember.load::<bool>()?.unwrap_or(false))
    }

    /// Keep `token` in the store matching `remember_me` and clear the other
    pub fn store(&self, token: &str, remember_me: bool) -> ClientResult<()> {
        if remember_me {
            self.persistent.save(token)?;
            self.session.clear()?;
        } else {
            self.session.save(token)?;
            self.persistent.clear()?;
        }
        self.remember.save(&remember_me)
    }

    /// Token from the store the remember-me flag points at
    pub fn load(&self) -> ClientResult<Option<String>> {
        if self.remember_me()? {
            self.persistent.load()
        } else {
            self.session.load()
        }
    }

    /// Wipe both stores and the flag
    pub fn clear_all(&self) -> ClientResult<()> {
        self.persistent.clear()?;
        self.session.clear()?;
        self.remember.remove()
    }
}
