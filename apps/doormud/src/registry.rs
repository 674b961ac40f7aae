//! The composition root's session collection.
//!
//! The session layer has no broadcast primitive; game logic builds one by
//! iterating this registry. Owned by `main`, injected into the modes that
//! need it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use mudsession::{SessionHandle, SessionId};

struct Entry {
    handle: SessionHandle,
    /// Character name once the session has entered the realm.
    name: Option<String>,
}

#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<Mutex<HashMap<SessionId, Entry>>>,
}

impl Registry {
    pub fn insert(&self, handle: SessionHandle) {
        self.lock().insert(handle.id(), Entry { handle, name: None });
    }

    pub fn remove(&self, id: SessionId) {
        self.lock().remove(&id);
    }

    /// Record the character name once logon completes.
    pub fn set_name(&self, id: SessionId, name: &str) {
        if let Some(e) = self.lock().get_mut(&id) {
            e.name = Some(name.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Names of everyone in the realm, sorted.
    pub fn who(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .lock()
            .values()
            .filter_map(|e| e.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Send `markup` to every session that has entered the realm. Best
    /// effort: a full or dead session drops the message.
    pub fn broadcast(&self, markup: &str) {
        for h in self.realm_handles() {
            let _ = h.send(markup);
        }
    }

    fn realm_handles(&self) -> Vec<SessionHandle> {
        self.lock()
            .values()
            .filter(|e| e.name.is_some())
            .map(|e| e.handle.clone())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionId, Entry>> {
        self.inner.lock().expect("registry mutex poisoned")
    }
}
