use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

pub struct Config {
    pub data_dir: PathBuf,
}

impl Config {
    /// Resolve the data directory (`--data-dir` wins over the platform
    /// default) and make sure it exists.
    pub fn load(data_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => dir,
            None => ProjectDirs::from("", "", "synclife")
                .context("Could not determine home directory")?
                .data_dir()
                .to_path_buf(),
        };
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        Ok(Config { data_dir })
    }

    fn api_key_path(&self) -> PathBuf {
        self.data_dir.join("api_key")
    }

    /// The server's API key, generated and stored on first use.
    ///
    /// Returns `(key, newly_created)`. A blank key file counts as missing.
    pub fn load_or_create_api_key(&self) -> Result<(String, bool)> {
        let path = self.api_key_path();
        match std::fs::read_to_string(&path) {
            Ok(stored) if !stored.trim().is_empty() => return Ok((stored.trim().to_string(), false)),
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).context("Failed to read API key file"),
        }

        let key = generate_api_key();
        write_private(&path, &key)?;
        eprintln!("Generated new API key: {key}");
        eprintln!("Send it as: Authorization: Bearer {key}");
        Ok((key, true))
    }
}

/// 32 random bytes as lowercase hex.
fn generate_api_key() -> String {
    use rand::Rng;

    const HEX: &[u8; 16] = b"0123456789abcdef";
    let bytes: [u8; 32] = rand::rng().random();
    bytes
        .iter()
        .flat_map(|b| [HEX[usize::from(b >> 4)], HEX[usize::from(b & 0x0f)]])
        .map(char::from)
        .collect()
}

/// Write `contents` readable by the owner only.
fn write_private(path: &std::path::Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .context("Failed to set API key file permissions")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_creates_override_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("nested").join("data");
        let config = Config::load(Some(dir.clone())).unwrap();
        assert_eq!(config.data_dir, dir);
        assert!(dir.is_dir());
    }

    #[test]
    fn test_api_key_is_generated_once() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = Config::load(Some(tmp.path().to_path_buf())).unwrap();
        let (key, new) = config.load_or_create_api_key().unwrap();
        assert!(new);
        assert_eq!(key.len(), 64);

        let (again, new) = config.load_or_create_api_key().unwrap();
        assert!(!new);
        assert_eq!(again, key);
    }

    #[test]
    fn test_blank_key_file_is_replaced() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = Config::load(Some(tmp.path().to_path_buf())).unwrap();
        std::fs::write(config.api_key_path(), "  \n").unwrap();
        let (key, new) = config.load_or_create_api_key().unwrap();
        assert!(new);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[cfg(unix)]
    #[test]
    fn test_key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::TempDir::new().unwrap();
        let config = Config::load(Some(tmp.path().to_path_buf())).unwrap();
        config.load_or_create_api_key().unwrap();
        let mode = std::fs::metadata(config.api_key_path())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
