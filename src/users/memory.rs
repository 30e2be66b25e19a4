use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::repo::{StoreError, UniqueField, UserStore};
use super::repo_types::{NewUser, User};

/// In-process `UserStore`. One lock covers check-and-write, so it enforces
/// uniqueness the way the unique indexes do in Postgres.
#[derive(Debug)]
pub struct MemoryUserStore {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    next_id: i64,
    users: BTreeMap<i64, User>,
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 1,
                users: BTreeMap::new(),
            }),
        }
    }
}

impl Inner {
    fn conflict(&self, skip_id: i64, username: &str, email: &str) -> Option<UniqueField> {
        let others = self.users.values().filter(|u| u.id != skip_id);
        for u in others {
            if u.username == username {
                return Some(UniqueField::Username);
            }
            if u.email == email {
                return Some(UniqueField::Email);
            }
        }
        None
    }
}

impl MemoryUserStore {
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().users.len()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        Ok(self.inner.lock().unwrap().users.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(field) = inner.conflict(0, &user.username, &user.email) {
            return Err(StoreError::Conflict(field));
        }
        let id = inner.next_id;
        inner.next_id += 1;
        let user = user.into_user(id);
        inner.users.insert(id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: &User) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(field) = inner.conflict(user.id, &user.username, &user.email) {
            return Err(StoreError::Conflict(field));
        }
        match inner.users.get_mut(&user.id) {
            Some(slot) => {
                *slot = user.clone();
                Ok(())
            }
            None => Err(StoreError::Other(anyhow::anyhow!("user {} vanished", user.id))),
        }
    }

    async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        Ok(self.inner.lock().unwrap().users.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            password_hash: "hash".into(),
            first_name: None,
            last_name: None,
            phone: None,
            image: None,
            bio: None,
            address: None,
        }
    }

    #[tokio::test]
    async fn ids_start_at_one_and_increase() {
        let store = MemoryUserStore::default();
        let a = store.create(new_user("alice", "a@example.com")).await.unwrap();
        let b = store.create(new_user("bob", "b@example.com")).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert!(a.active);
    }

    #[tokio::test]
    async fn second_writer_of_same_username_is_rejected() {
        let store = MemoryUserStore::default();
        store.create(new_user("alice", "a@example.com")).await.unwrap();
        let err = store
            .create(new_user("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(UniqueField::Username)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn update_may_keep_own_values_but_not_take_others() {
        let store = MemoryUserStore::default();
        let mut alice = store.create(new_user("alice", "a@example.com")).await.unwrap();
        store.create(new_user("bob", "b@example.com")).await.unwrap();

        alice.bio = Some("hi".into());
        store.update(&alice).await.unwrap();

        alice.email = "b@example.com".into();
        let err = store.update(&alice).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(UniqueField::Email)));
    }

    #[tokio::test]
    async fn delete_reports_absence() {
        let store = MemoryUserStore::default();
        let alice = store.create(new_user("alice", "a@example.com")).await.unwrap();
        assert!(store.delete(alice.id).await.unwrap());
        assert!(!store.delete(alice.id).await.unwrap());
        assert!(store.find_by_id(alice.id).await.unwrap().is_none());
    }
}
