use std::sync::Mutex;

use async_trait::async_trait;
use time::OffsetDateTime;

use super::repo::{PasscodeStore, TemporaryPasscode};

#[derive(Debug, Default)]
pub struct MemoryPasscodeStore {
    records: Mutex<Vec<TemporaryPasscode>>,
}

impl MemoryPasscodeStore {
    pub fn all(&self) -> Vec<TemporaryPasscode> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl PasscodeStore for MemoryPasscodeStore {
    async fn create(
        &self,
        user_id: i64,
        code: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<TemporaryPasscode> {
        let mut records = self.records.lock().unwrap();
        let record = TemporaryPasscode {
            id: records.len() as i64 + 1,
            code: code.to_owned(),
            expires_at,
            user_id,
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn find_valid(
        &self,
        code: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<TemporaryPasscode>> {
        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .filter(|r| r.code == code && r.expires_at > now)
            .min_by_key(|r| r.expires_at)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use time::Duration;

    use super::*;

    #[tokio::test]
    async fn expired_codes_stop_matching_but_stay_stored() {
        let store = MemoryPasscodeStore::default();
        let t0 = OffsetDateTime::UNIX_EPOCH;
        store
            .create(1, "ABC1234", t0 + Duration::minutes(10))
            .await
            .unwrap();

        let hit = store.find_valid("ABC1234", t0).await.unwrap();
        assert_eq!(hit.map(|r| r.user_id), Some(1));
        assert!(store
            .find_valid("ABC1234", t0 + Duration::minutes(10))
            .await
            .unwrap()
            .is_none());
        assert!(store.find_valid("ZZZ9999", t0).await.unwrap().is_none());
        assert_eq!(store.all().len(), 1);
    }

    #[tokio::test]
    async fn lookup_is_repeatable() {
        let store = MemoryPasscodeStore::default();
        let t0 = OffsetDateTime::UNIX_EPOCH;
        store
            .create(3, "REUSE01", t0 + Duration::minutes(10))
            .await
            .unwrap();
        for _ in 0..3 {
            assert!(store.find_valid("REUSE01", t0).await.unwrap().is_some());
        }
    }
}
