//! Artifact Loader - locates the module file the handler lives in.
//!
//! Two sources are supported:
//!
//! | Source | Behaviour |
//! |--------|-----------|
//! | Archive URL | download, unpack into a scratch directory, search the tree |
//! | Mounted file | use the configured path as-is, never touch the network |
//!
//! The scratch directory is owned by the returned [`ResolvedModule`] and then
//! by the [`Artifact`]; it lives exactly as long as the loaded handler.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tempfile::TempDir;
use thiserror::Error;
use zip::ZipArchive;

use crate::config::{ArtifactSource, HandlerLocator};
use crate::domain::Handler;
use crate::ports::{ArtifactFetcher, FetchError, LoadedModule, ModuleId, ResolvedModule};

/// Name the downloaded archive is stored under before extraction.
pub const ARCHIVE_FILE_NAME: &str = "function.zip";

const SCRATCH_PREFIX: &str = "serverless_";

/// The archive could not be written or unpacked.
#[derive(Debug, Error)]
pub enum UnpackError {
    #[error("Failed to create scratch directory: {0}")]
    Scratch(#[source] io::Error),

    #[error("Invalid archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("I/O error while unpacking: {0}")]
    Io(#[from] io::Error),
}

/// Errors raised while resolving the module file.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Unpack(#[from] UnpackError),

    #[error("Module '{module}' not found under {}", .searched.display())]
    ModuleNotFound { module: String, searched: PathBuf },
}

/// File names that count as the module file for `module`, most specific
/// first: `libm.so`, `m.so`, `m` on Linux.
pub fn module_file_names(module: &str) -> [String; 3] {
    [
        format!("{}{}{}", std::env::consts::DLL_PREFIX, module, std::env::consts::DLL_SUFFIX),
        format!("{}{}", module, std::env::consts::DLL_SUFFIX),
        module.to_string(),
    ]
}

/// Resolves the configured artifact source into a loadable module file.
pub struct ArtifactLoader {
    fetcher: Arc<dyn ArtifactFetcher>,
}

impl ArtifactLoader {
    pub fn new(fetcher: Arc<dyn ArtifactFetcher>) -> Self {
        Self { fetcher }
    }

    /// Resolve `source` for the module named in `handler`.
    ///
    /// # Errors
    ///
    /// - `Fetch` when the archive cannot be downloaded
    /// - `Unpack` when it is not a valid zip archive
    /// - `ModuleNotFound` when no matching file exists
    pub async fn resolve(
        &self,
        source: &ArtifactSource,
        handler: &HandlerLocator,
    ) -> Result<ResolvedModule, ArtifactError> {
        match source {
            ArtifactSource::Archive { url } => self.resolve_archive(url, handler).await,
            ArtifactSource::MountedFile { path } => resolve_mounted(path, handler),
        }
    }

    async fn resolve_archive(&self, url: &str, handler: &HandlerLocator) -> Result<ResolvedModule, ArtifactError> {
        tracing::info!(url = %url, "Downloading handler archive");
        let bytes = self.fetcher.fetch(url).await?;
        tracing::info!(
            url = %url,
            bytes = bytes.len(),
            sha256 = %format!("{:x}", Sha256::digest(&bytes)),
            "Archive downloaded"
        );

        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir()
            .map_err(UnpackError::Scratch)?;
        unpack(&bytes, scratch.path())?;
        tracing::debug!(dir = %scratch.path().display(), "Archive unpacked");

        let names = module_file_names(handler.module());
        let path = find_module_file(scratch.path(), &names)
            .map_err(UnpackError::Io)?
            .ok_or_else(|| ArtifactError::ModuleNotFound {
                module: handler.module().to_string(),
                searched: scratch.path().to_path_buf(),
            })?;
        tracing::info!(path = %path.display(), "Module file found");

        Ok(ResolvedModule {
            path,
            module: handler.module().to_string(),
            symbol: handler.symbol().to_string(),
            scratch: Some(scratch),
        })
    }
}

fn resolve_mounted(path: &Path, handler: &HandlerLocator) -> Result<ResolvedModule, ArtifactError> {
    if !path.is_file() {
        return Err(ArtifactError::ModuleNotFound {
            module: handler.module().to_string(),
            searched: path.to_path_buf(),
        });
    }
    tracing::info!(path = %path.display(), "Using mounted module file");
    Ok(ResolvedModule::mounted(path, handler.module(), handler.symbol()))
}

/// Persist the archive, extract it next to itself, then remove it.
fn unpack(bytes: &[u8], dir: &Path) -> Result<(), UnpackError> {
    let archive_path = dir.join(ARCHIVE_FILE_NAME);
    fs::write(&archive_path, bytes)?;

    let mut archive = ZipArchive::new(File::open(&archive_path)?)?;
    archive.extract(dir)?;
    drop(archive);

    fs::remove_file(&archive_path)?;
    Ok(())
}

/// Pre-order walk in file-name order; files in a directory are checked
/// before its subdirectories. First match wins.
fn find_module_file(dir: &Path, names: &[String]) -> io::Result<Option<PathBuf>> {
    let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    let mut subdirs = Vec::new();
    for entry in entries {
        if entry.file_type()?.is_dir() {
            subdirs.push(entry.path());
            continue;
        }
        let file_name = entry.file_name();
        if names.iter().any(|name| file_name.to_str() == Some(name.as_str())) {
            return Ok(Some(entry.path()));
        }
    }

    for subdir in subdirs {
        if let Some(found) = find_module_file(&subdir, names)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

/// The resolved, loaded handler unit.
///
/// Fields drop in declaration order: the handler and its library go first,
/// then the scratch directory the library was loaded from.
pub struct Artifact {
    loaded: LoadedModule,
    path: PathBuf,
    scratch: Option<TempDir>,
}

impl Artifact {
    pub fn new(resolved: ResolvedModule, loaded: LoadedModule) -> Self {
        Self {
            loaded,
            path: resolved.path,
            scratch: resolved.scratch,
        }
    }

    pub fn id(&self) -> &ModuleId {
        &self.loaded.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch.as_ref().map(TempDir::path)
    }

    pub fn handler_mut(&mut self) -> &mut dyn Handler {
        self.loaded.handler.as_mut()
    }
}

impl std::fmt::Debug for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Artifact")
            .field("module", &self.loaded)
            .field("path", &self.path)
            .field("scratch", &self.scratch_dir())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::StaticArtifactFetcher;
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;

    const URL: &str = "https://artifacts.example.com/function.zip";

    fn archive(files: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in files {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(contents.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    fn locator() -> HandlerLocator {
        HandlerLocator::new("handler_module", "handler")
    }

    fn lib_name(module: &str) -> String {
        module_file_names(module)[0].clone()
    }

    #[test]
    fn module_file_names_cover_platform_conventions() {
        let names = module_file_names("metrics");
        assert_eq!(names[2], "metrics");
        assert!(names[0].contains("metrics"));
        assert!(names[1].starts_with("metrics"));
    }

    #[tokio::test]
    async fn nested_module_file_is_found_and_archive_removed() {
        let body = archive(&[
            ("README.md", "docs"),
            (format!("build/release/{}", lib_name("handler_module")).as_str(), "\x7fELF"),
        ]);
        let fetcher = Arc::new(StaticArtifactFetcher::new().with_body(URL, body));
        let loader = ArtifactLoader::new(fetcher.clone());

        let resolved = loader
            .resolve(&ArtifactSource::Archive { url: URL.to_string() }, &locator())
            .await
            .unwrap();

        let scratch = resolved.scratch_dir().unwrap();
        assert!(resolved.path.starts_with(scratch));
        assert!(resolved.path.ends_with(format!("build/release/{}", lib_name("handler_module"))));
        assert!(!scratch.join(ARCHIVE_FILE_NAME).exists());
        assert_eq!(resolved.symbol, "handler");
        assert_eq!(fetcher.fetch_count(), 1);
    }

    #[tokio::test]
    async fn shallow_match_wins_over_deeper_one() {
        let name = lib_name("handler_module");
        let body = archive(&[(format!("a/{}", name).as_str(), "deep"), (name.as_str(), "top")]);
        let loader = ArtifactLoader::new(Arc::new(StaticArtifactFetcher::new().with_body(URL, body)));

        let resolved = loader
            .resolve(&ArtifactSource::Archive { url: URL.to_string() }, &locator())
            .await
            .unwrap();

        assert_eq!(fs::read(&resolved.path).unwrap(), b"top");
    }

    #[tokio::test]
    async fn archive_without_module_is_module_not_found() {
        let body = archive(&[("other_module.so", "x")]);
        let loader = ArtifactLoader::new(Arc::new(StaticArtifactFetcher::new().with_body(URL, body)));

        let result = loader
            .resolve(&ArtifactSource::Archive { url: URL.to_string() }, &locator())
            .await;

        assert!(matches!(
            result,
            Err(ArtifactError::ModuleNotFound { ref module, .. }) if module == "handler_module"
        ));
    }

    #[tokio::test]
    async fn corrupt_archive_is_unpack_error() {
        let loader = ArtifactLoader::new(Arc::new(
            StaticArtifactFetcher::new().with_body(URL, b"definitely not a zip".to_vec()),
        ));

        let result = loader
            .resolve(&ArtifactSource::Archive { url: URL.to_string() }, &locator())
            .await;

        assert!(matches!(result, Err(ArtifactError::Unpack(UnpackError::Archive(_)))));
    }

    #[tokio::test]
    async fn failed_download_is_fetch_error() {
        let loader = ArtifactLoader::new(Arc::new(StaticArtifactFetcher::new()));

        let result = loader
            .resolve(&ArtifactSource::Archive { url: URL.to_string() }, &locator())
            .await;

        assert!(matches!(result, Err(ArtifactError::Fetch(FetchError::Status { status: 404, .. }))));
    }

    #[tokio::test]
    async fn mounted_file_is_used_without_fetching() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let fetcher = Arc::new(StaticArtifactFetcher::new());
        let loader = ArtifactLoader::new(fetcher.clone());

        let resolved = loader
            .resolve(
                &ArtifactSource::MountedFile { path: file.path().to_path_buf() },
                &locator(),
            )
            .await
            .unwrap();

        assert_eq!(resolved.path, file.path());
        assert!(resolved.scratch.is_none());
        assert_eq!(fetcher.fetch_count(), 0);
    }

    #[tokio::test]
    async fn missing_mounted_file_is_module_not_found() {
        let loader = ArtifactLoader::new(Arc::new(StaticArtifactFetcher::new()));

        let result = loader
            .resolve(
                &ArtifactSource::MountedFile { path: PathBuf::from("/nonexistent/handler.so") },
                &locator(),
            )
            .await;

        assert!(matches!(result, Err(ArtifactError::ModuleNotFound { .. })));
    }
}
