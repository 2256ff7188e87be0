// src/service.rs
//! Request/response operations exposed to the UI, shared by the HTTP and CLI front ends.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::generator::{generate_password, CriteriaOverrides, PasswordCriteria};
use crate::import::{self, ImportOptions};
use crate::models::{ContainerSummary, Credential, CredentialFilter, CredentialPatch, ImportEntry, NewCredential};
use crate::repository::CredentialRepository;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ImportRequest {
    /// Raw comma-separated text; takes precedence over `entries`.
    pub csv: Option<String>,
    pub entries: Option<Vec<ImportEntry>>,
    pub container: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub added_count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeleteResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDeleteResponse {
    pub removed_count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GeneratedPassword {
    pub password: String,
}

pub struct CredentialService {
    repo: CredentialRepository,
    generator_defaults: PasswordCriteria,
}

impl CredentialService {
    pub fn new(repo: CredentialRepository, generator_defaults: PasswordCriteria) -> Self {
        Self { repo, generator_defaults }
    }

    pub fn list(&self, filter: &CredentialFilter) -> AppResult<Vec<Credential>> {
        if filter.is_empty() {
            self.repo.list()
        } else {
            self.repo.list_filtered(filter)
        }
    }

    pub fn get(&self, id: &str) -> AppResult<Credential> {
        self.repo.get(id)
    }

    pub fn create(&self, fields: NewCredential) -> AppResult<Credential> {
        self.repo.create(fields)
    }

    pub fn update(&self, id: &str, patch: CredentialPatch) -> AppResult<Credential> {
        self.repo.update(id, patch)
    }

    pub fn delete(&self, id: &str) -> AppResult<DeleteResponse> {
        self.repo.delete(id)?;
        Ok(DeleteResponse { success: true })
    }

    pub fn import(&self, request: ImportRequest) -> AppResult<ImportResponse> {
        let options = ImportOptions { container: request.container };
        let added_count = match (request.csv, request.entries) {
            (Some(csv), _) => import::import_csv(&self.repo, &csv, &options)?,
            (None, Some(entries)) => import::import_entries(&self.repo, entries, &options)?,
            (None, None) => {
                return Err(AppError::InvalidInput(
                    "import request needs either `csv` or `entries`".to_string(),
                ))
            }
        };
        Ok(ImportResponse { added_count })
    }

    pub fn containers(&self) -> AppResult<Vec<ContainerSummary>> {
        self.repo.containers()
    }

    pub fn delete_container(&self, name: &str) -> AppResult<ContainerDeleteResponse> {
        let removed_count = self.repo.delete_container(name)?;
        Ok(ContainerDeleteResponse { removed_count })
    }

    pub fn generate_password(&self, overrides: &CriteriaOverrides) -> AppResult<GeneratedPassword> {
        let criteria = self.generator_defaults.with_overrides(overrides);
        let password = generate_password(&criteria)?;
        Ok(GeneratedPassword { password })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::PlaintextCipher;
    use crate::config::CorruptPolicy;
    use crate::store::RecordStore;
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};

    fn service_in(dir: &TempDir) -> CredentialService {
        let store = Arc::new(RecordStore::new(dir.path().join("credentials.json"), CorruptPolicy::Fail));
        let repo = CredentialRepository::new(store, Arc::new(PlaintextCipher));
        CredentialService::new(repo, PasswordCriteria::default())
    }

    #[test]
    fn test_import_prefers_csv_over_entries() {
        let dir = tempdir().unwrap();
        let service = service_in(&dir);
        let request = ImportRequest {
            csv: Some("site\na.com\nb.com".to_string()),
            entries: Some(vec![ImportEntry::default()]),
            container: None,
        };
        assert_eq!(service.import(request).unwrap(), ImportResponse { added_count: 2 });
    }

    #[test]
    fn test_import_pre_parsed_entries() {
        let dir = tempdir().unwrap();
        let service = service_in(&dir);
        let request: ImportRequest = serde_json::from_str(
            r#"{"entries":[{"site":"a.com","username":"u","password":"p","notes":"n"}]}"#,
        )
        .unwrap();
        assert_eq!(service.import(request).unwrap().added_count, 1);
        assert_eq!(service.list(&CredentialFilter::default()).unwrap()[0].site, "a.com");
    }

    #[test]
    fn test_import_without_payload_is_invalid() {
        let dir = tempdir().unwrap();
        let service = service_in(&dir);
        assert!(matches!(
            service.import(ImportRequest::default()),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_delete_reports_success_for_unknown_id() {
        let dir = tempdir().unwrap();
        let service = service_in(&dir);
        assert_eq!(service.delete("missing").unwrap(), DeleteResponse { success: true });
    }

    #[test]
    fn test_import_response_uses_camel_case() {
        let json = serde_json::to_string(&ImportResponse { added_count: 3 }).unwrap();
        assert_eq!(json, r#"{"addedCount":3}"#);
    }

    #[test]
    fn test_generate_password_applies_overrides() {
        let dir = tempdir().unwrap();
        let service = service_in(&dir);
        let overrides = CriteriaOverrides {
            length: Some(12),
            use_symbols: Some(false),
            use_uppercase: Some(false),
            use_lowercase: Some(false),
            ..Default::default()
        };
        let generated = service.generate_password(&overrides).unwrap();
        assert_eq!(generated.password.len(), 12);
        assert!(generated.password.chars().all(|c| c.is_ascii_digit()));

        let zero = CriteriaOverrides { length: Some(0), ..Default::default() };
        assert!(matches!(service.generate_password(&zero), Err(AppError::InvalidInput(_))));
    }
}
