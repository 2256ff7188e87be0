// src/cli.rs
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use crate::cipher::{ChaChaCipher, PlaintextCipher, SecretCipher};
use crate::config::{self, Config};
use crate::error::{AppError, AppResult};
use crate::generator::{CriteriaOverrides, PasswordCriteria};
use crate::http;
use crate::models::{Credential, CredentialFilter, CredentialPatch, NewCredential};
use crate::repository::CredentialRepository;
use crate::service::{CredentialService, ImportRequest};
use crate::store::RecordStore;
use log;
use rpassword;

const PASSPHRASE_ENV: &str = "CREDVAULT_PASSPHRASE";

/// Local credential store with CSV import and an HTTP API for the desktop UI.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML config file
    #[clap(long, global = true, value_parser)]
    pub config: Option<PathBuf>,

    /// Overrides `data_file` from the config
    #[clap(long, global = true, value_parser)]
    pub data_file: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP API used by the UI
    Serve {
        #[clap(long)]
        host: Option<String>,
        #[clap(long)]
        port: Option<u16>,
    },
    /// List credentials, newest first
    List {
        #[clap(short, long)]
        query: Option<String>,
        #[clap(long)]
        tag: Option<String>,
        #[clap(long)]
        container: Option<String>,
    },
    /// Show one credential including its password
    Show { id: String },
    /// Add a credential
    Add(AddArgs),
    /// Change fields of an existing credential
    Update(UpdateArgs),
    /// Delete a credential (succeeds if it does not exist)
    Delete { id: String },
    /// Import credentials from a comma-separated file
    Import {
        #[clap(value_parser)]
        file: PathBuf,
        /// Put every imported credential into this container
        #[clap(long)]
        container: Option<String>,
    },
    /// List containers with their credential counts
    Containers,
    /// Delete a container and every credential in it
    DeleteContainer { name: String },
    /// Print a random password
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    #[clap(long, default_value = "")]
    pub site: String,
    #[clap(long, default_value = "")]
    pub username: String,
    #[clap(long, conflicts_with = "generate")]
    pub password: Option<String>,
    /// Use a generated password
    #[clap(long)]
    pub generate: bool,
    #[clap(long, default_value = "")]
    pub notes: String,
    #[clap(long = "tag")]
    pub tags: Vec<String>,
    #[clap(long)]
    pub container: Option<String>,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    pub id: String,
    #[clap(long)]
    pub site: Option<String>,
    #[clap(long)]
    pub username: Option<String>,
    #[clap(long)]
    pub password: Option<String>,
    #[clap(long)]
    pub notes: Option<String>,
    /// Replaces all tags
    #[clap(long = "tag")]
    pub tags: Option<Vec<String>>,
    #[clap(long, conflicts_with = "clear_container")]
    pub container: Option<String>,
    #[clap(long)]
    pub clear_container: bool,
}

#[derive(Args, Debug, Default)]
pub struct GenerateArgs {
    #[clap(short, long)]
    pub length: Option<usize>,
    #[clap(long)]
    pub no_uppercase: bool,
    #[clap(long)]
    pub no_lowercase: bool,
    #[clap(long)]
    pub no_numbers: bool,
    #[clap(long)]
    pub no_symbols: bool,
}

impl From<&GenerateArgs> for CriteriaOverrides {
    fn from(a: &GenerateArgs) -> Self {
        let off = |flag: bool| if flag { Some(false) } else { None };
        CriteriaOverrides {
            length: a.length,
            use_uppercase: off(a.no_uppercase),
            use_lowercase: off(a.no_lowercase),
            use_numbers: off(a.no_numbers),
            use_symbols: off(a.no_symbols),
        }
    }
}

impl From<UpdateArgs> for CredentialPatch {
    fn from(a: UpdateArgs) -> Self {
        let container = if a.clear_container {
            Some(None)
        } else {
            a.container.map(Some)
        };
        CredentialPatch {
            site: a.site,
            username: a.username,
            password: a.password,
            notes: a.notes,
            tags: a.tags,
            container,
        }
    }
}

fn cipher_for(config: &Config) -> AppResult<Arc<dyn SecretCipher>> {
    if !config.encryption.enabled {
        return Ok(Arc::new(PlaintextCipher));
    }
    let passphrase = match std::env::var(PASSPHRASE_ENV) {
        Ok(p) => p,
        Err(_) => rpassword::prompt_password("Enter store passphrase: ").map_err(|e| {
            log::error!("Failed to read passphrase: {}", e);
            AppError::Cli(format!("Failed to read passphrase: {}", e))
        })?,
    };
    if passphrase.is_empty() {
        return Err(AppError::Cli("Passphrase cannot be empty.".to_string()));
    }
    Ok(Arc::new(ChaChaCipher::new(&passphrase, &config.encryption.argon2_params)?))
}

/// Wires the record store, cipher and repository described by `config`.
pub fn open_service(config: &Config) -> AppResult<CredentialService> {
    log::info!("Using data file {:?}", config.data_file);
    let store = Arc::new(RecordStore::new(&config.data_file, config.storage.on_corrupt));
    let repo = CredentialRepository::new(store, cipher_for(config)?);
    Ok(CredentialService::new(repo, PasswordCriteria::from(&config.generator)))
}

fn print_credential(c: &Credential, with_password: bool) {
    println!("{}", c.id);
    println!("  Site:      {}", c.site);
    println!("  Username:  {}", c.username);
    if with_password {
        println!("  Password:  {}", c.password);
    }
    if !c.notes.is_empty() {
        println!("  Notes:     {}", c.notes);
    }
    if !c.tags.is_empty() {
        println!("  Tags:      {}", c.tags.join(", "));
    }
    if let Some(container) = &c.container {
        println!("  Container: {}", container);
    }
    println!("  Updated:   {}", c.updated_at);
}

/// Handles the parsed CLI command.
pub fn handle_cli_command(cli: Cli) -> AppResult<()> {
    log::debug!("Handling CLI command: {:?}", cli.command);
    let mut config = config::load_config(cli.config.as_deref());
    if let Some(data_file) = cli.data_file {
        config.data_file = data_file;
    }

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            let addr: SocketAddr = format!("{}:{}", host, port)
                .parse()
                .map_err(|e| AppError::Cli(format!("Invalid listen address {}:{}: {}", host, port, e)))?;

            let service = Arc::new(open_service(&config)?);
            let runtime = tokio::runtime::Runtime::new()?;
            runtime
                .block_on(http::serve(service, addr))
                .map_err(|e| {
                    log::error!("Server stopped: {:#}", e);
                    AppError::Cli(format!("Server failed: {:#}", e))
                })?;
        }
        Commands::List { query, tag, container } => {
            let service = open_service(&config)?;
            let filter = CredentialFilter { query, tag, container };
            let credentials = service.list(&filter)?;
            if credentials.is_empty() {
                println!("No credentials found.");
            }
            for c in &credentials {
                print_credential(c, false);
            }
            log::info!("Listed {} credentials.", credentials.len());
        }
        Commands::Show { id } => {
            let service = open_service(&config)?;
            print_credential(&service.get(&id)?, true);
        }
        Commands::Add(args) => {
            let service = open_service(&config)?;
            let password = match (args.password, args.generate) {
                (Some(p), _) => p,
                (None, true) => service.generate_password(&CriteriaOverrides::default())?.password,
                (None, false) => rpassword::prompt_password("Password: ").map_err(|e| {
                    log::error!("Failed to read password: {}", e);
                    AppError::Cli(format!("Failed to read password: {}", e))
                })?,
            };
            let created = service.create(NewCredential {
                site: args.site,
                username: args.username,
                password,
                notes: args.notes,
                tags: args.tags,
                container: args.container,
            })?;
            println!("Added credential {}", created.id);
        }
        Commands::Update(args) => {
            let service = open_service(&config)?;
            let id = args.id.clone();
            let updated = service.update(&id, CredentialPatch::from(args))?;
            print_credential(&updated, false);
        }
        Commands::Delete { id } => {
            let service = open_service(&config)?;
            service.delete(&id)?;
            println!("Deleted {}", id);
        }
        Commands::Import { file, container } => {
            let service = open_service(&config)?;
            let csv = fs::read_to_string(&file).map_err(|e| {
                log::error!("Failed to read import file {:?}: {}", file, e);
                AppError::InvalidInput(format!("Cannot read {:?}: {}", file, e))
            })?;
            let response = service.import(ImportRequest { csv: Some(csv), entries: None, container })?;
            println!("Imported {} credentials from {:?}", response.added_count, file);
        }
        Commands::Containers => {
            let service = open_service(&config)?;
            let containers = service.containers()?;
            if containers.is_empty() {
                println!("No containers.");
            }
            for c in containers {
                println!("{} ({})", c.name, c.count);
            }
        }
        Commands::DeleteContainer { name } => {
            let service = open_service(&config)?;
            let response = service.delete_container(&name)?;
            println!("Deleted container {:?} and {} credentials", name, response.removed_count);
        }
        Commands::Generate(args) => {
            let criteria = PasswordCriteria::from(&config.generator)
                .with_overrides(&CriteriaOverrides::from(&args));
            println!("{}", crate::generator::generate_password(&criteria)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_add_command() {
        let cli = Cli::try_parse_from([
            "credvault", "--data-file", "/tmp/c.json", "add", "--site", "a.com", "--username", "bob",
            "--password", "pw", "--tag", "x", "--tag", "y",
        ])
        .unwrap();
        assert_eq!(cli.data_file, Some(PathBuf::from("/tmp/c.json")));
        match cli.command {
            Commands::Add(args) => {
                assert_eq!(args.site, "a.com");
                assert_eq!(args.password.as_deref(), Some("pw"));
                assert_eq!(args.tags, vec!["x".to_string(), "y".to_string()]);
            }
            other => panic!("Expected Add, got {:?}", other),
        }
    }

    #[test]
    fn test_password_conflicts_with_generate() {
        let result = Cli::try_parse_from(["credvault", "add", "--password", "pw", "--generate"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_update_args_to_patch() {
        let cli = Cli::try_parse_from(["credvault", "update", "abc", "--notes", "n", "--clear-container"]).unwrap();
        let Commands::Update(args) = cli.command else { panic!("Expected Update") };
        let patch = CredentialPatch::from(args);
        assert_eq!(patch.notes.as_deref(), Some("n"));
        assert_eq!(patch.container, Some(None));
        assert_eq!(patch.site, None);
        assert_eq!(patch.tags, None);
    }

    #[test]
    fn test_generate_flags_to_overrides() {
        let args = GenerateArgs { length: Some(8), no_symbols: true, ..Default::default() };
        let o = CriteriaOverrides::from(&args);
        assert_eq!(o.length, Some(8));
        assert_eq!(o.use_symbols, Some(false));
        assert_eq!(o.use_numbers, None);
    }

    #[test]
    fn test_handle_import_and_list_against_temp_store() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("credvault.toml");
        let data_path = dir.path().join("credentials.json");
        let csv_path = dir.path().join("export.csv");
        fs::write(&csv_path, "Website,Username,Password\nexample.com,bob,pw123\n").unwrap();

        let import = Cli::try_parse_from([
            "credvault",
            "--config", config_path.to_str().unwrap(),
            "--data-file", data_path.to_str().unwrap(),
            "import", csv_path.to_str().unwrap(),
        ])
        .unwrap();
        handle_cli_command(import).unwrap();

        let mut config = config::load_config_from(&config_path);
        config.data_file = data_path;
        let listed = open_service(&config).unwrap().list(&CredentialFilter::default()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].site, "example.com");
    }
}
