//! Handler locator and artifact source configuration

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use super::error::ValidationError;

/// Dotted `<module>.<symbol>` pair naming the handler to load.
///
/// The split happens on the last dot, so `pkg.sub.handler` names symbol
/// `handler` in module `pkg.sub`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerLocator {
    module: String,
    symbol: String,
}

impl HandlerLocator {
    pub fn new(module: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            symbol: symbol.into(),
        }
    }

    /// Module name, used to find the module file inside an artifact.
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Symbol resolved inside the loaded module.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

impl FromStr for HandlerLocator {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.rsplit_once('.') {
            Some((module, symbol)) if !module.is_empty() && !symbol.is_empty() => {
                Ok(Self::new(module, symbol))
            }
            _ => Err(ValidationError::InvalidHandlerLocator(s.to_string())),
        }
    }
}

impl fmt::Display for HandlerLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.module, self.symbol)
    }
}

/// Where the handler's code comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    /// Zip archive fetched over HTTP and unpacked into a scratch directory.
    Archive { url: String },

    /// Single pre-mounted module file.
    MountedFile { path: PathBuf },
}

impl ArtifactSource {
    /// Pick the source: an archive URL wins; an empty URL counts as unset.
    pub fn resolve(archive_url: Option<&str>, mounted_path: PathBuf) -> Result<Self, ValidationError> {
        match archive_url.map(str::trim).filter(|url| !url.is_empty()) {
            Some(url) => {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(ValidationError::InvalidArchiveUrl(url.to_string()));
                }
                Ok(Self::Archive {
                    url: url.to_string(),
                })
            }
            None => {
                if mounted_path.as_os_str().is_empty() {
                    return Err(ValidationError::MissingRequired("HANDLER_FILE_PATH"));
                }
                Ok(Self::MountedFile { path: mounted_path })
            }
        }
    }

    pub fn is_archive(&self) -> bool {
        matches!(self, Self::Archive { .. })
    }
}

impl fmt::Display for ArtifactSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Archive { url } => write!(f, "archive {}", url),
            Self::MountedFile { path } => write!(f, "mounted file {}", path.display()),
        }
    }
}
