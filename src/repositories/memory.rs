use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{QuoteStore, UserStore};
use crate::error::AppError;
use crate::models::{Quote, User};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    quotes: HashMap<i32, Quote>,
    next_quote_id: i32,
}

/// インメモリストア
///
/// DATABASE_URL 未設定時の開発用、およびテスト用。
/// プロセス終了でデータは失われる。
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, AppError> {
        self.state
            .read()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("memory store lock poisoned")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, AppError> {
        self.state
            .write()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("memory store lock poisoned")))
    }

    fn update_user(&self, id: Uuid, f: impl FnOnce(&mut User)) -> Result<(), AppError> {
        let mut state = self.write()?;
        if let Some(user) = state.users.get_mut(&id) {
            f(user);
            user.updated_at = OffsetDateTime::now_utc();
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn create_user(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<User, AppError> {
        let mut state = self.write()?;
        if state.users.values().any(|u| u.email == email) {
            return Err(AppError::EmailAlreadyExists);
        }

        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            password_hash: password_hash.to_string(),
            two_factor_secret: None,
            is_two_factor_enabled: false,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn set_two_factor_secret(&self, secret: &[u8], id: Uuid) -> Result<(), AppError> {
        self.update_user(id, |user| user.two_factor_secret = Some(secret.to_vec()))
    }

    async fn set_two_factor_enabled(&self, id: Uuid, secret: &[u8]) -> Result<bool, AppError> {
        let mut state = self.write()?;
        match state.users.get_mut(&id) {
            Some(user) if user.two_factor_secret.as_deref() == Some(secret) => {
                user.is_two_factor_enabled = true;
                user.updated_at = OffsetDateTime::now_utc();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl QuoteStore for MemoryStore {
    async fn create(&self, content: &str, author: &str) -> Result<Quote, AppError> {
        let mut state = self.write()?;
        state.next_quote_id += 1;

        let now = OffsetDateTime::now_utc();
        let quote = Quote {
            id: state.next_quote_id,
            content: content.to_string(),
            author: author.to_string(),
            created_at: now,
            updated_at: now,
        };
        state.quotes.insert(quote.id, quote.clone());

        Ok(quote)
    }

    async fn find_all(&self) -> Result<Vec<Quote>, AppError> {
        let mut quotes: Vec<Quote> = self.read()?.quotes.values().cloned().collect();
        quotes.sort_by_key(|q| q.id);
        Ok(quotes)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<Quote>, AppError> {
        Ok(self.read()?.quotes.get(&id).cloned())
    }

    async fn update(
        &self,
        id: i32,
        content: Option<&str>,
        author: Option<&str>,
    ) -> Result<Option<Quote>, AppError> {
        let mut state = self.write()?;
        let Some(quote) = state.quotes.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(content) = content {
            quote.content = content.to_string();
        }
        if let Some(author) = author {
            quote.author = author.to_string();
        }
        quote.updated_at = OffsetDateTime::now_utc();

        Ok(Some(quote.clone()))
    }

    async fn delete(&self, id: i32) -> Result<bool, AppError> {
        Ok(self.write()?.quotes.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_user_rejects_duplicate_email() {
        let store = MemoryStore::new();
        store.create_user("a@x.com", "A", "hash").await.unwrap();

        let result = store.create_user("a@x.com", "B", "hash").await;
        assert!(matches!(result, Err(AppError::EmailAlreadyExists)));
    }

    #[tokio::test]
    async fn test_two_factor_updates() {
        let store = MemoryStore::new();
        let user = store.create_user("a@x.com", "A", "hash").await.unwrap();

        store.set_two_factor_secret(&[1, 2, 3], user.id).await.unwrap();
        let pending = UserStore::find_by_id(&store, user.id).await.unwrap().unwrap();
        assert_eq!(pending.two_factor_secret, Some(vec![1, 2, 3]));
        assert!(!pending.is_two_factor_enabled);

        assert!(store.set_two_factor_enabled(user.id, &[1, 2, 3]).await.unwrap());
        let enabled = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert!(enabled.is_two_factor_enabled);
    }

    #[tokio::test]
    async fn test_two_factor_enable_with_replaced_secret() {
        let store = MemoryStore::new();
        let user = store.create_user("a@x.com", "A", "hash").await.unwrap();

        // 検証に使ったシークレットの後に再登録が割り込んだ状態
        store.set_two_factor_secret(&[1, 2, 3], user.id).await.unwrap();
        store.set_two_factor_secret(&[4, 5, 6], user.id).await.unwrap();

        assert!(!store.set_two_factor_enabled(user.id, &[1, 2, 3]).await.unwrap());
        let user = store.find_by_email("a@x.com").await.unwrap().unwrap();
        assert!(!user.is_two_factor_enabled);
        assert_eq!(user.two_factor_secret, Some(vec![4, 5, 6]));
    }

    #[tokio::test]
    async fn test_two_factor_enable_without_secret() {
        let store = MemoryStore::new();
        let user = store.create_user("a@x.com", "A", "hash").await.unwrap();

        assert!(!store.set_two_factor_enabled(user.id, &[1, 2, 3]).await.unwrap());
        assert!(!store.find_by_email("a@x.com").await.unwrap().unwrap().is_two_factor_enabled);
    }

    #[tokio::test]
    async fn test_quote_crud() {
        let store = MemoryStore::new();
        let first = store.create("Stay hungry", "Jobs").await.unwrap();
        let second = store.create("Less is more", "Mies").await.unwrap();
        assert_eq!(second.id, first.id + 1);

        let updated = store
            .update(first.id, None, Some("Steve Jobs"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.content, "Stay hungry");
        assert_eq!(updated.author, "Steve Jobs");

        assert!(store.delete(second.id).await.unwrap());
        assert!(!store.delete(second.id).await.unwrap());
        assert_eq!(store.find_all().await.unwrap().len(), 1);
        assert!(store.update(999, Some("x"), None).await.unwrap().is_none());
    }
}
