use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::users::password::hash_password;
use crate::users::repo_types::{NewUser, StoreError, User, UserUpdate};

#[derive(Debug)]
struct Inner {
    users: BTreeMap<u64, User>,
    by_email: HashMap<String, u64>,
    by_username: HashMap<String, u64>,
    next_id: u64,
}

/// In-memory user store with unique email and username indexes.
///
/// One lock covers the primary map, both indexes and the id counter, so every
/// operation observes and leaves them in lockstep.
#[derive(Debug)]
pub struct UserStore {
    inner: RwLock<Inner>,
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UserStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                users: BTreeMap::new(),
                by_email: HashMap::new(),
                by_username: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a user. Email is checked before username; a rejected create
    /// does not consume an id.
    pub fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let mut inner = self.write();

        if inner.by_email.contains_key(&new.email) {
            return Err(StoreError::DuplicateEmail);
        }
        if inner.by_username.contains_key(&new.username) {
            return Err(StoreError::DuplicateUsername);
        }

        let id = inner.next_id;
        inner.next_id += 1;

        let now = OffsetDateTime::now_utc();
        let user = User {
            id,
            email: new.email,
            username: new.username,
            full_name: new.full_name,
            password_hash: hash_password(&new.password),
            created_at: now,
            updated_at: now,
        };

        inner.by_email.insert(user.email.clone(), id);
        inner.by_username.insert(user.username.clone(), id);
        inner.users.insert(id, user.clone());

        debug!(user_id = id, "user created");
        Ok(user)
    }

    pub fn get(&self, id: u64) -> Option<User> {
        self.read().users.get(&id).cloned()
    }

    pub fn get_by_email(&self, email: &str) -> Option<User> {
        let inner = self.read();
        let id = inner.by_email.get(email)?;
        inner.users.get(id).cloned()
    }

    pub fn get_by_username(&self, username: &str) -> Option<User> {
        let inner = self.read();
        let id = inner.by_username.get(username)?;
        inner.users.get(id).cloned()
    }

    /// Snapshot of all live users in ascending id order.
    pub fn list_all(&self) -> Vec<User> {
        self.read().users.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply a partial update. `Ok(None)` means the id is unknown.
    ///
    /// Uniqueness is checked for every changed key before anything is written,
    /// so a rejected update leaves the record and both indexes as they were.
    /// `updated_at` is refreshed on every successful call.
    pub fn update(&self, id: u64, changes: UserUpdate) -> Result<Option<User>, StoreError> {
        let mut guard = self.write();
        let inner = &mut *guard;

        let Some(user) = inner.users.get_mut(&id) else {
            return Ok(None);
        };

        let email = changes.email.filter(|e| *e != user.email);
        let username = changes.username.filter(|u| *u != user.username);

        if email.as_ref().is_some_and(|e| inner.by_email.contains_key(e)) {
            return Err(StoreError::DuplicateEmail);
        }
        if username
            .as_ref()
            .is_some_and(|u| inner.by_username.contains_key(u))
        {
            return Err(StoreError::DuplicateUsername);
        }

        if let Some(email) = email {
            inner.by_email.remove(&user.email);
            inner.by_email.insert(email.clone(), id);
            user.email = email;
        }
        if let Some(username) = username {
            inner.by_username.remove(&user.username);
            inner.by_username.insert(username.clone(), id);
            user.username = username;
        }
        if let Some(full_name) = changes.full_name {
            user.full_name = full_name;
        }
        if let Some(password) = changes.password {
            user.password_hash = hash_password(&password);
        }
        user.updated_at = later_than(user.updated_at);

        debug!(user_id = id, "user updated");
        Ok(Some(user.clone()))
    }

    /// Remove a user and both of its index entries. Returns whether it existed.
    pub fn delete(&self, id: u64) -> bool {
        let mut inner = self.write();
        let Some(user) = inner.users.remove(&id) else {
            return false;
        };
        inner.by_email.remove(&user.email);
        inner.by_username.remove(&user.username);

        debug!(user_id = id, "user deleted");
        true
    }
}

// Wall clock time, nudged forward if it has not moved past `prev`.
fn later_than(prev: OffsetDateTime) -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    if now > prev {
        now
    } else {
        prev + Duration::nanoseconds(1)
    }
}
