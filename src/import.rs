// src/import.rs
//! Bulk import of comma-separated credential exports.
//!
//! Lines are split on bare commas; quoted fields are not understood, so a cell
//! containing a comma shifts the remaining columns.

use log;

use crate::error::{AppResult, ImportError, ImportResult};
use crate::models::{ImportEntry, NewCredential};
use crate::repository::CredentialRepository;

/// Header row and data rows of a parsed import file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTable {
    /// Trimmed and lower-cased.
    pub headers: Vec<String>,
    /// Trimmed cells, one `Vec` per non-empty input line after the header.
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Container assigned to every imported credential.
    pub container: Option<String>,
}

pub fn parse(text: &str) -> ImportResult<ParsedTable> {
    let mut lines = text.split('\n').map(str::trim).filter(|l| !l.is_empty());

    let header_line = lines.next().ok_or(ImportError::EmptyInput)?;
    let headers = header_line
        .split(',')
        .map(|h| h.trim().to_lowercase())
        .collect();
    let rows = lines
        .map(|line| line.split(',').map(|cell| cell.trim().to_string()).collect())
        .collect();

    Ok(ParsedTable { headers, rows })
}

#[derive(Debug, Default)]
struct ColumnMap {
    website: Option<usize>,
    site: Option<usize>,
    username: Option<usize>,
    password: Option<usize>,
    notes: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &[String]) -> Self {
        // A repeated header resolves to its last column.
        let find = |name: &str| headers.iter().rposition(|h| h == name);
        ColumnMap {
            website: find("website"),
            site: find("site"),
            username: find("username"),
            password: find("password"),
            notes: find("notes"),
        }
    }
}

fn cell(row: &[String], idx: Option<usize>) -> String {
    idx.and_then(|i| row.get(i)).cloned().unwrap_or_default()
}

/// Maps each row onto the canonical credential fields.
///
/// `website` wins over `site` when both columns exist and the `website` cell
/// is non-empty. Unknown columns are ignored; missing cells become `""`.
pub fn normalize(table: &ParsedTable) -> Vec<ImportEntry> {
    let columns = ColumnMap::from_headers(&table.headers);
    table
        .rows
        .iter()
        .map(|row| {
            let website = cell(row, columns.website);
            let site = if website.is_empty() { cell(row, columns.site) } else { website };
            ImportEntry {
                site,
                username: cell(row, columns.username),
                password: cell(row, columns.password),
                notes: cell(row, columns.notes),
                ..Default::default()
            }
        })
        .collect()
}

/// Inserts an already-normalized batch. A non-empty `options.container`
/// overrides the entries' own container.
pub fn import_entries(
    repo: &CredentialRepository,
    entries: Vec<ImportEntry>,
    options: &ImportOptions,
) -> AppResult<usize> {
    let batch: Vec<NewCredential> = entries
        .into_iter()
        .map(|mut entry| {
            if let Some(container) = options.container.as_ref().filter(|c| !c.is_empty()) {
                entry.container = Some(container.clone());
            }
            NewCredential::from(entry)
        })
        .collect();
    repo.bulk_insert(batch)
}

/// Parses, normalizes and inserts `text`. Returns the number of credentials added.
pub fn import_csv(repo: &CredentialRepository, text: &str, options: &ImportOptions) -> AppResult<usize> {
    let table = parse(text)?;
    let entries = normalize(&table);
    log::debug!(
        "Parsed import with {} columns and {} rows",
        table.headers.len(),
        entries.len()
    );
    let added = import_entries(repo, entries, options)?;
    log::info!("Imported {} credentials", added);
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::PlaintextCipher;
    use crate::config::CorruptPolicy;
    use crate::error::AppError;
    use crate::models::NewCredential;
    use crate::store::RecordStore;
    use std::sync::Arc;
    use tempfile::{tempdir, TempDir};

    fn repo_in(dir: &TempDir) -> CredentialRepository {
        let store = Arc::new(RecordStore::new(dir.path().join("credentials.json"), CorruptPolicy::Fail));
        CredentialRepository::new(store, Arc::new(PlaintextCipher))
    }

    #[test]
    fn test_parse_lowercases_headers_and_trims_cells() {
        let table = parse(" Website , UserName\r\n  a.com ,  bob \r\n\r\n").unwrap();
        assert_eq!(table.headers, vec!["website", "username"]);
        assert_eq!(table.rows, vec![vec!["a.com".to_string(), "bob".to_string()]]);
    }

    #[test]
    fn test_parse_skips_leading_blank_lines() {
        let table = parse("\n\n  \nsite,password\nx,y\n").unwrap();
        assert_eq!(table.headers, vec!["site", "password"]);
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn test_parse_empty_text_is_error() {
        assert!(matches!(parse(""), Err(ImportError::EmptyInput)));
        assert!(matches!(parse(" \n\r\n "), Err(ImportError::EmptyInput)));
    }

    #[test]
    fn test_normalize_example_row() {
        let table = parse("Website,Username,Password,Notes\nexample.com,bob,pw123,hello").unwrap();
        let entries = normalize(&table);
        assert_eq!(
            entries,
            vec![ImportEntry {
                site: "example.com".to_string(),
                username: "bob".to_string(),
                password: "pw123".to_string(),
                notes: "hello".to_string(),
                ..Default::default()
            }]
        );
    }

    #[test]
    fn test_normalize_short_and_long_rows() {
        let table = parse("site,username,password\nshort.com\nlong.com,u,p,extra,more").unwrap();
        let entries = normalize(&table);
        assert_eq!(entries[0].site, "short.com");
        assert_eq!(entries[0].username, "");
        assert_eq!(entries[0].password, "");
        assert_eq!(entries[1].site, "long.com");
        assert_eq!(entries[1].password, "p");
        assert_eq!(entries[1].notes, "");
    }

    #[test]
    fn test_normalize_ignores_unknown_columns() {
        let table = parse("url,Username,totp,Password\nignored.com,alice,123456,pw").unwrap();
        let entries = normalize(&table);
        assert_eq!(entries[0].site, "");
        assert_eq!(entries[0].username, "alice");
        assert_eq!(entries[0].password, "pw");
    }

    #[test]
    fn test_website_column_wins_over_site_when_non_empty() {
        let table = parse("site,website\nfrom-site,from-website\nfallback,").unwrap();
        let entries = normalize(&table);
        assert_eq!(entries[0].site, "from-website");
        assert_eq!(entries[1].site, "fallback");
    }

    #[test]
    fn test_comma_inside_quotes_is_not_special() {
        let table = parse("site,notes,password\na.com,\"hello, world\",pw").unwrap();
        let entries = normalize(&table);
        assert_eq!(entries[0].notes, "\"hello");
        assert_eq!(entries[0].password, "world\"");
    }

    #[test]
    fn test_import_csv_inserts_rows_in_file_order() {
        let dir = tempdir().unwrap();
        let repo = repo_in(&dir);
        repo.create(NewCredential { site: "existing".to_string(), ..Default::default() }).unwrap();

        let added = import_csv(
            &repo,
            "Website,Username,Password,Notes\nexample.com,bob,pw123,hello\nsecond.com,amy,pw,\n",
            &ImportOptions::default(),
        )
        .unwrap();
        assert_eq!(added, 2);

        let all = repo.list().unwrap();
        let sites: Vec<_> = all.iter().map(|c| c.site.as_str()).collect();
        assert_eq!(sites, vec!["example.com", "second.com", "existing"]);
        assert_eq!(all[0].username, "bob");
        assert_eq!(all[0].password, "pw123");
        assert_eq!(all[0].notes, "hello");
        assert!(all[0].tags.is_empty());
        assert_eq!(all[0].container, None);
    }

    #[test]
    fn test_header_only_import_adds_nothing() {
        let dir = tempdir().unwrap();
        let repo = repo_in(&dir);
        repo.create(NewCredential { site: "existing".to_string(), ..Default::default() }).unwrap();
        let before = std::fs::read(repo.store().path()).unwrap();

        let added = import_csv(&repo, "Website,Username,Password,Notes\n", &ImportOptions::default()).unwrap();
        assert_eq!(added, 0);
        assert_eq!(std::fs::read(repo.store().path()).unwrap(), before);
    }

    #[test]
    fn test_empty_import_is_invalid_input() {
        let dir = tempdir().unwrap();
        let repo = repo_in(&dir);
        let result = import_csv(&repo, "", &ImportOptions::default());
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert!(!repo.store().path().exists());
    }

    #[test]
    fn test_import_assigns_container() {
        let dir = tempdir().unwrap();
        let repo = repo_in(&dir);
        let options = ImportOptions { container: Some("Imported".to_string()) };
        import_csv(&repo, "site\na.com\nb.com", &options).unwrap();

        assert!(repo
            .list()
            .unwrap()
            .iter()
            .all(|c| c.container.as_deref() == Some("Imported")));
    }

    #[test]
    fn test_repeated_header_uses_last_column() {
        let table = parse("site,username,site\nfirst.com,bob,second.com").unwrap();
        let entries = normalize(&table);
        assert_eq!(entries[0].site, "second.com");
        assert_eq!(entries[0].username, "bob");
    }

    #[test]
    fn test_empty_container_is_stored_as_none() {
        let dir = tempdir().unwrap();
        let repo = repo_in(&dir);
        let options = ImportOptions { container: Some(String::new()) };
        let entries = vec![
            ImportEntry { site: "a.com".to_string(), container: Some("Mine".to_string()), ..Default::default() },
            ImportEntry { site: "b.com".to_string(), container: Some(String::new()), ..Default::default() },
        ];
        assert_eq!(import_entries(&repo, entries, &options).unwrap(), 2);

        let stored = repo.list().unwrap();
        assert_eq!(stored[0].container.as_deref(), Some("Mine"));
        assert_eq!(stored[1].container, None);
        assert!(repo.containers().unwrap().iter().all(|c| !c.name.is_empty()));
    }

    #[test]
    fn test_import_entries_keeps_entry_container_without_override() {
        let dir = tempdir().unwrap();
        let repo = repo_in(&dir);
        let entries = vec![ImportEntry {
            site: "a.com".to_string(),
            container: Some("Mine".to_string()),
            tags: vec!["x".to_string()],
            ..Default::default()
        }];
        assert_eq!(import_entries(&repo, entries, &ImportOptions::default()).unwrap(), 1);

        let stored = &repo.list().unwrap()[0];
        assert_eq!(stored.container.as_deref(), Some("Mine"));
        assert_eq!(stored.tags, vec!["x".to_string()]);
    }
}
