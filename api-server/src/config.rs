use std::{
    collections::HashMap,
    env,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use crate::store::Storage;

pub(crate) const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub(crate) const DEFAULT_STORE_PATH: &str = "data/helicarrier.db";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) store: Arc<dyn Storage>,
    pub(crate) locks: Arc<TokenLocks>,
    /// Optional directory of pre-recorded boards (`map-<id>.json`); random
    /// placement is used for ids without a file.
    pub(crate) map_dir: Option<PathBuf>,
}

impl AppState {
    pub(crate) fn new(store: Arc<dyn Storage>, map_dir: Option<PathBuf>) -> Self {
        AppState {
            store,
            locks: Arc::new(TokenLocks::default()),
            map_dir,
        }
    }
}

/// One mutex per token: requests for a session are serialized across the
/// whole load -> mutate -> persist sequence.
#[derive(Default)]
pub(crate) struct TokenLocks {
    inner: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TokenLocks {
    pub(crate) fn for_token(&self, token: &str) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().unwrap();
        map.entry(token.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

pub(crate) fn read_env_string(name: &str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

pub(crate) fn read_env_optional_path(name: &str) -> Option<PathBuf> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
}
