use crate::models::listing::Owner;
use anyhow::{Context, Result};
use clap::Parser;
use std::env::{self, VarError};

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: String,
    pub database_url: String,
    pub owner_id: String,
    pub owner_display_name: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug, Default)]
#[command(author, version, about = "S3-compatible Object API")]
pub struct Args {
    /// Host to bind to (overrides OBJECT_API_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides OBJECT_API_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory where objects are stored (overrides OBJECT_API_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides OBJECT_API_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Owner ID reported in listings (overrides OBJECT_API_OWNER_ID)
    #[arg(long)]
    pub owner_id: Option<String>,

    /// Owner display name reported in listings (overrides OBJECT_API_OWNER_DISPLAY_NAME)
    #[arg(long)]
    pub owner_display_name: Option<String>,

    /// Apply the database schema and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let migrate = args.migrate;
        let cfg = Self::resolve(args, |key| env::var(key))?;
        Ok((cfg, migrate))
    }

    /// Merge parsed CLI args over values from `lookup` (normally the process
    /// environment), falling back to defaults.
    pub fn resolve<F>(args: Args, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|_| default.into());

        let env_port = match lookup("OBJECT_API_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing OBJECT_API_PORT value `{}`", value))?,
            Err(VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading OBJECT_API_PORT"),
        };

        Ok(Self {
            host: args
                .host
                .unwrap_or_else(|| var_or("OBJECT_API_HOST", "0.0.0.0")),
            port: args.port.unwrap_or(env_port),
            storage_dir: args
                .storage_dir
                .unwrap_or_else(|| var_or("OBJECT_API_STORAGE_DIR", "./data/objects")),
            database_url: args.database_url.unwrap_or_else(|| {
                var_or(
                    "OBJECT_API_DATABASE_URL",
                    "sqlite://./data/meta/object_api.db",
                )
            }),
            owner_id: args
                .owner_id
                .unwrap_or_else(|| var_or("OBJECT_API_OWNER_ID", "minio")),
            owner_display_name: args
                .owner_display_name
                .unwrap_or_else(|| var_or("OBJECT_API_OWNER_DISPLAY_NAME", "minio")),
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn owner(&self) -> Owner {
        Owner::new(&self.owner_id, &self.owner_display_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Result<String, VarError> + use<> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned().ok_or(VarError::NotPresent)
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = AppConfig::resolve(Args::default(), env_from(&[])).unwrap();
        assert_eq!(cfg.addr(), "0.0.0.0:3000");
        assert_eq!(cfg.storage_dir, "./data/objects");
        assert_eq!(cfg.owner(), Owner::new("minio", "minio"));
    }

    #[test]
    fn cli_overrides_env() {
        let args = Args::parse_from(["object-api", "--port", "9000", "--owner-id", "cli-owner"]);
        let env = env_from(&[
            ("OBJECT_API_PORT", "8000"),
            ("OBJECT_API_HOST", "127.0.0.1"),
            ("OBJECT_API_OWNER_ID", "env-owner"),
            ("OBJECT_API_OWNER_DISPLAY_NAME", "Env Owner"),
        ]);
        let cfg = AppConfig::resolve(args, env).unwrap();

        assert_eq!(cfg.addr(), "127.0.0.1:9000");
        assert_eq!(cfg.owner(), Owner::new("cli-owner", "Env Owner"));
    }

    #[test]
    fn bad_env_port_is_an_error() {
        let err = AppConfig::resolve(Args::default(), env_from(&[("OBJECT_API_PORT", "http")]))
            .unwrap_err();
        assert!(format!("{err:#}").contains("OBJECT_API_PORT"));
    }

    #[test]
    fn migrate_flag_parses() {
        assert!(Args::parse_from(["object-api", "--migrate"]).migrate);
        assert!(!Args::parse_from(["object-api"]).migrate);
    }
}
