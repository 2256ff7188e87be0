// src/models.rs
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use chrono::{SecondsFormat, Utc};

/// Current time in the format stored in `createdAt`/`updatedAt`.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub id: String,
    #[serde(default)]
    pub site: String,
    #[serde(default)]
    pub username: String,
    /// Plaintext when handed to callers; sealed by the active cipher on disk.
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    /// Keys this crate does not know about, kept so a rewrite does not drop them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `""` counts as no container.
fn container_name(container: Option<String>) -> Option<String> {
    container.filter(|c| !c.is_empty())
}

impl Credential {
    /// Builds a record from creation input. The password is stored as given;
    /// callers seal it first.
    pub fn new(id: String, fields: NewCredential, now: &str) -> Self {
        Self {
            id,
            site: fields.site,
            username: fields.username,
            password: fields.password,
            notes: fields.notes,
            tags: fields.tags,
            container: container_name(fields.container),
            created_at: now.to_string(),
            updated_at: now.to_string(),
            extra: Map::new(),
        }
    }

    /// Merges every supplied field of `patch` over this record and refreshes `updated_at`.
    /// `id` and `created_at` never change.
    pub fn apply(&mut self, patch: CredentialPatch, now: &str) {
        if let Some(site) = patch.site {
            self.site = site;
        }
        if let Some(username) = patch.username {
            self.username = username;
        }
        if let Some(password) = patch.password {
            self.password = password;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(container) = patch.container {
            self.container = container_name(container);
        }
        self.updated_at = now.to_string();
    }
}

/// The whole persisted data file: `{ "credentials": [...] }`, newest first.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Collection {
    #[serde(default)]
    pub credentials: Vec<Credential>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Collection {
    pub fn new() -> Self {
        Collection::default()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.credentials.iter().any(|c| c.id == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.credentials.iter().position(|c| c.id == id)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct NewCredential {
    pub site: String,
    pub username: String,
    pub password: String,
    pub notes: String,
    pub tags: Vec<String>,
    pub container: Option<String>,
}

/// Partial update. `None` leaves a field untouched; for `container`,
/// `Some(None)` (an explicit JSON `null`) clears it.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct CredentialPatch {
    pub site: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
    #[serde(deserialize_with = "present")]
    pub container: Option<Option<String>>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// One normalized row of an import batch.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ImportEntry {
    pub site: String,
    pub username: String,
    pub password: String,
    pub notes: String,
    pub tags: Vec<String>,
    pub container: Option<String>,
}

impl From<ImportEntry> for NewCredential {
    fn from(entry: ImportEntry) -> Self {
        NewCredential {
            site: entry.site,
            username: entry.username,
            password: entry.password,
            notes: entry.notes,
            tags: entry.tags,
            container: entry.container,
        }
    }
}

/// Narrows `list` output. Empty fields match everything.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct CredentialFilter {
    #[serde(rename = "q")]
    pub query: Option<String>,
    pub tag: Option<String>,
    pub container: Option<String>,
}

impl CredentialFilter {
    pub fn is_empty(&self) -> bool {
        non_blank(&self.query).is_none()
            && non_blank(&self.tag).is_none()
            && non_blank(&self.container).is_none()
    }

    pub fn matches(&self, credential: &Credential) -> bool {
        if let Some(query) = non_blank(&self.query) {
            let needle = query.to_lowercase();
            let hit = [&credential.site, &credential.username, &credential.notes]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if let Some(tag) = non_blank(&self.tag) {
            if !credential.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        if let Some(container) = non_blank(&self.container) {
            if credential.container.as_deref() != Some(container) {
                return false;
            }
        }
        true
    }
}

// `?tag=` arrives as `Some("")`.
fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|v| !v.is_empty())
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub name: String,
    pub count: usize,
}
