use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub upload_dir: PathBuf,
    pub downloads_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let data_dir = PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()));

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| data_dir.join("data.db").to_string_lossy().into_owned());
        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .context("SERVER_PORT must be a valid u16")?;
        let upload_dir = resolve_dir(&data_dir, env::var("UPLOAD_DIR").ok(), "uploaded-files");
        let downloads_dir = resolve_dir(&data_dir, env::var("DOWNLOADS_DIR").ok(), "downloads");

        Ok(Self {
            database_url,
            server_host,
            server_port,
            upload_dir,
            downloads_dir,
        })
    }

    /// Creates the upload and download directories and the database's parent
    /// directory if they are missing. Runs once at startup.
    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.upload_dir).with_context(|| {
            format!("failed to create upload dir {}", self.upload_dir.display())
        })?;
        fs::create_dir_all(&self.downloads_dir).with_context(|| {
            format!(
                "failed to create downloads dir {}",
                self.downloads_dir.display()
            )
        })?;
        if let Some(parent) = Path::new(&self.database_url).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create database dir {}", parent.display())
                })?;
            }
        }
        Ok(())
    }
}

fn resolve_dir(data_dir: &Path, override_value: Option<String>, default_name: &str) -> PathBuf {
    match override_value {
        Some(value) if !value.trim().is_empty() => PathBuf::from(value),
        _ => data_dir.join(default_name),
    }
}

#[cfg(test)]
mod tests {
    use super::resolve_dir;
    use std::path::{Path, PathBuf};

    #[test]
    fn falls_back_to_data_dir_layout() {
        let dir = resolve_dir(Path::new("data"), None, "uploaded-files");
        assert_eq!(dir, PathBuf::from("data/uploaded-files"));
    }

    #[test]
    fn honors_override() {
        let dir = resolve_dir(Path::new("data"), Some("/srv/uploads".into()), "uploaded-files");
        assert_eq!(dir, PathBuf::from("/srv/uploads"));
    }

    #[test]
    fn ignores_blank_override() {
        let dir = resolve_dir(Path::new("data"), Some("  ".into()), "downloads");
        assert_eq!(dir, PathBuf::from("data/downloads"));
    }
}
