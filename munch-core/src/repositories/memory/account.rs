// File: munch-core/src/repositories/memory/account.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;
use munch_common::error::Error;
use munch_common::models::{Account, LedgerEntry};
use munch_common::traits::repository_traits::AccountRepository;

#[derive(Debug, Default)]
struct AccountState {
    points: i64,
    updated_at: Option<DateTime<Utc>>,
    entries: Vec<LedgerEntry>,
    by_reference: HashMap<String, usize>,
}

impl AccountState {
    fn replay(&self, reference: &str) -> Option<LedgerEntry> {
        self.by_reference
            .get(reference)
            .and_then(|idx| self.entries.get(*idx))
            .cloned()
    }

    fn record(&mut self, user_id: Uuid, amount: i64, reference: &str) -> LedgerEntry {
        self.points += amount;
        let entry = LedgerEntry::new(user_id, amount, reference, self.points);
        self.updated_at = Some(entry.created_at);
        self.by_reference.insert(reference.to_string(), self.entries.len());
        self.entries.push(entry.clone());
        entry
    }
}

/// Process-local ledger. Each account sits behind its DashMap shard lock,
/// so every check-and-mutate below runs without interleaving for the same
/// user.
#[derive(Default)]
pub struct MemoryAccountRepository {
    accounts: DashMap<Uuid, AccountState>,
}

impl MemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for MemoryAccountRepository {
    async fn get_account(&self, user_id: Uuid) -> Result<Option<Account>, Error> {
        Ok(self.accounts.get(&user_id).map(|state| Account {
            user_id,
            points: state.points,
            updated_at: state.updated_at.unwrap_or_else(Utc::now),
        }))
    }

    async fn apply_credit(&self, user_id: Uuid, amount: i64, reference: &str) -> Result<LedgerEntry, Error> {
        let mut state = self.accounts.entry(user_id).or_default();
        if let Some(existing) = state.replay(reference) {
            return Ok(existing);
        }
        Ok(state.record(user_id, amount, reference))
    }

    async fn apply_debit(&self, user_id: Uuid, amount: i64, reference: &str) -> Result<LedgerEntry, Error> {
        let Some(mut state) = self.accounts.get_mut(&user_id) else {
            return Err(Error::InsufficientPoints { required: amount, available: 0 });
        };
        if let Some(existing) = state.replay(reference) {
            return Ok(existing);
        }
        if state.points < amount {
            return Err(Error::InsufficientPoints { required: amount, available: state.points });
        }
        Ok(state.record(user_id, -amount, reference))
    }

    async fn find_entry(&self, user_id: Uuid, reference: &str) -> Result<Option<LedgerEntry>, Error> {
        Ok(self.accounts.get(&user_id).and_then(|state| state.replay(reference)))
    }

    async fn list_entries(&self, user_id: Uuid, limit: i64) -> Result<Vec<LedgerEntry>, Error> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .accounts
            .get(&user_id)
            .map(|state| state.entries.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}
