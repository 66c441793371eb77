use std::path::PathBuf;

/// Failures a caller is expected to tell apart.
///
/// These travel inside `anyhow::Error`; recover them with
/// `err.downcast_ref::<synclife_core::Error>()`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to write {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}")]
    InvalidInput(String),
    #[error("invalid credentials")]
    Auth,
    #[error("a user with email '{0}' is already registered")]
    UserExists(String),
}
