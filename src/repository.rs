// src/repository.rs
use std::sync::Arc;

use log;
use uuid::Uuid;

use crate::cipher::SecretCipher;
use crate::error::{AppError, AppResult};
use crate::models::{
    timestamp_now, Collection, ContainerSummary, Credential, CredentialFilter, CredentialPatch,
    NewCredential,
};
use crate::store::RecordStore;

/// The only writer of the collection. Every mutation is one `RecordStore::modify` cycle.
#[derive(Clone)]
pub struct CredentialRepository {
    store: Arc<RecordStore>,
    cipher: Arc<dyn SecretCipher>,
}

impl CredentialRepository {
    pub fn new(store: Arc<RecordStore>, cipher: Arc<dyn SecretCipher>) -> Self {
        Self { store, cipher }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// All credentials, newest first, with passwords opened.
    pub fn list(&self) -> AppResult<Vec<Credential>> {
        let collection = self.store.load()?;
        collection
            .credentials
            .into_iter()
            .map(|c| self.reveal(c))
            .collect()
    }

    pub fn list_filtered(&self, filter: &CredentialFilter) -> AppResult<Vec<Credential>> {
        let collection = self.store.load()?;
        collection
            .credentials
            .into_iter()
            .filter(|c| filter.matches(c))
            .map(|c| self.reveal(c))
            .collect()
    }

    pub fn get(&self, id: &str) -> AppResult<Credential> {
        let collection = self.store.load()?;
        let credential = collection
            .credentials
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;
        self.reveal(credential)
    }

    pub fn create(&self, fields: NewCredential) -> AppResult<Credential> {
        let plaintext = fields.password.clone();
        let sealed = NewCredential { password: self.cipher.seal(&fields.password)?, ..fields };

        let mut created = self.store.modify(|collection| -> AppResult<Credential> {
            let now = timestamp_now();
            let credential = Credential::new(fresh_id(collection), sealed, &now);
            collection.credentials.insert(0, credential.clone());
            Ok(credential)
        })?;

        log::info!("Created credential {}", created.id);
        created.password = plaintext;
        Ok(created)
    }

    /// Merges `patch` into the credential with `id`. Fails with `NotFound` without writing.
    pub fn update(&self, id: &str, mut patch: CredentialPatch) -> AppResult<Credential> {
        if let Some(password) = patch.password.as_deref() {
            patch.password = Some(self.cipher.seal(password)?);
        }

        let updated = self.store.modify(|collection| -> AppResult<Credential> {
            let idx = collection
                .position(id)
                .ok_or_else(|| AppError::NotFound(id.to_string()))?;
            let now = timestamp_now();
            collection.credentials[idx].apply(patch, &now);
            Ok(collection.credentials[idx].clone())
        })?;

        log::info!("Updated credential {}", id);
        self.reveal(updated)
    }

    /// Removes the credential with `id` if present. Returns whether anything was removed.
    pub fn delete(&self, id: &str) -> AppResult<bool> {
        let removed = self.store.modify(|collection| -> AppResult<bool> {
            let before = collection.credentials.len();
            collection.credentials.retain(|c| c.id != id);
            Ok(collection.credentials.len() != before)
        })?;

        if removed {
            log::info!("Deleted credential {}", id);
        } else {
            log::debug!("Delete of unknown credential {} was a no-op", id);
        }
        Ok(removed)
    }

    /// Inserts all `entries` at the front, keeping their relative order, in one write.
    pub fn bulk_insert(&self, entries: Vec<NewCredential>) -> AppResult<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let sealed = entries
            .into_iter()
            .map(|fields| -> AppResult<NewCredential> {
                let password = self.cipher.seal(&fields.password)?;
                Ok(NewCredential { password, ..fields })
            })
            .collect::<AppResult<Vec<_>>>()?;

        let count = self.store.modify(|collection| -> AppResult<usize> {
            let now = timestamp_now();
            let mut batch = Vec::with_capacity(sealed.len());
            for fields in sealed {
                let id = fresh_id_excluding(collection, &batch);
                batch.push(Credential::new(id, fields, &now));
            }
            let count = batch.len();
            batch.append(&mut collection.credentials);
            collection.credentials = batch;
            Ok(count)
        })?;

        log::info!("Inserted {} credentials in one batch", count);
        Ok(count)
    }

    /// Distinct containers in order of first appearance, with record counts.
    pub fn containers(&self) -> AppResult<Vec<ContainerSummary>> {
        let collection = self.store.load()?;
        let mut summaries: Vec<ContainerSummary> = Vec::new();
        for name in collection.credentials.iter().filter_map(|c| c.container.as_deref()) {
            match summaries.iter_mut().find(|s| s.name == name) {
                Some(summary) => summary.count += 1,
                None => summaries.push(ContainerSummary { name: name.to_string(), count: 1 }),
            }
        }
        Ok(summaries)
    }

    /// Deletes every credential in container `name`. Returns how many were removed.
    pub fn delete_container(&self, name: &str) -> AppResult<usize> {
        let removed = self.store.modify(|collection| -> AppResult<usize> {
            let before = collection.credentials.len();
            collection
                .credentials
                .retain(|c| c.container.as_deref() != Some(name));
            Ok(before - collection.credentials.len())
        })?;

        log::info!("Deleted container {:?} with {} credentials", name, removed);
        Ok(removed)
    }

    fn reveal(&self, mut credential: Credential) -> AppResult<Credential> {
        credential.password = self.cipher.open(&credential.password)?;
        Ok(credential)
    }
}

fn fresh_id(collection: &Collection) -> String {
    fresh_id_excluding(collection, &[])
}

// Re-draws on collision with stored or pending ids.
fn fresh_id_excluding(collection: &Collection, pending: &[Credential]) -> String {
    loop {
        let id = Uuid::new_v4().to_string();
        if !collection.contains_id(&id) && !pending.iter().any(|c| c.id == id) {
            return id;
        }
    }
}
