//! Account alias directory.
//!
//! Aliases live in a TOML file that is re-read on every lookup, so edits
//! take effect without restarting the service:
//!
//! ```toml
//! [[accounts]]
//! name = "cold-storage"
//! address = "bc1q..."
//! ```

use cexgate_core::AccountRecord;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("Accounts file not found: {0}")]
    Missing(PathBuf),
    #[error("Accounts file malformed: {0}")]
    Malformed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Deserialize)]
struct AccountsFile {
    #[serde(default)]
    accounts: Vec<AccountRecord>,
}

/// Maps account aliases to withdrawal addresses.
#[derive(Debug, Clone)]
pub struct AccountDirectory {
    path: PathBuf,
}

impl AccountDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every record from the file.
    pub async fn load(&self) -> Result<Vec<AccountRecord>, DirectoryError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(DirectoryError::Missing(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let file: AccountsFile =
            toml::from_str(&contents).map_err(|e| DirectoryError::Malformed(e.to_string()))?;
        Ok(file.accounts)
    }

    /// Address of the first account named `name`, or `None` if there is none.
    pub async fn resolve_address(&self, name: &str) -> Result<Option<String>, DirectoryError> {
        let accounts = self.load().await?;
        Ok(accounts
            .into_iter()
            .find(|a| a.name == name)
            .map(|a| a.address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn directory_with(contents: &str) -> (tempfile::NamedTempFile, AccountDirectory) {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        let dir = AccountDirectory::new(file.path());
        (file, dir)
    }

    #[tokio::test]
    async fn test_first_match_wins() {
        let (_file, dir) = directory_with(
            r#"
            [[accounts]]
            name = "test-account"
            address = "addr1"

            [[accounts]]
            name = "test-account"
            address = "addr2"
            "#,
        );

        assert_eq!(
            dir.resolve_address("test-account").await.unwrap().as_deref(),
            Some("addr1")
        );
        assert_eq!(dir.resolve_address("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_reread_on_every_lookup() {
        let (file, dir) = directory_with("accounts = []\n");
        assert_eq!(dir.resolve_address("late").await.unwrap(), None);

        std::fs::write(
            file.path(),
            "[[accounts]]\nname = \"late\"\naddress = \"addr9\"\n",
        )
        .unwrap();

        assert_eq!(
            dir.resolve_address("late").await.unwrap().as_deref(),
            Some("addr9")
        );
    }

    #[tokio::test]
    async fn test_missing_and_malformed_files() {
        let dir = AccountDirectory::new("/nonexistent/cexgate/accounts.toml");
        assert!(matches!(
            dir.resolve_address("x").await,
            Err(DirectoryError::Missing(_))
        ));

        let (_file, dir) = directory_with("accounts = \"not a list\"");
        assert!(matches!(
            dir.resolve_address("x").await,
            Err(DirectoryError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_file_has_no_accounts() {
        let (_file, dir) = directory_with("");
        assert!(dir.load().await.unwrap().is_empty());
    }
}
