use std::path::PathBuf;

use anyhow::Context;
use hf_hub::{
    Cache, Repo, RepoType,
    api::tokio::{Api, ApiBuilder, Progress},
};
use indicatif::ProgressBar;
use once_cell::sync::OnceCell;
use tracing::Instrument;

use crate::progress::progress_bar;

static CACHE_DIR: OnceCell<PathBuf> = OnceCell::new();
static HF_API: OnceCell<Api> = OnceCell::new();

fn get_cache_dir() -> &'static PathBuf {
    CACHE_DIR.get_or_init(|| {
        dirs::cache_dir()
            .unwrap_or_default()
            .join("FrameStory")
            .join("models")
    })
}

/// Overrides the model cache directory. Must run before the first download.
pub fn set_cache_dir(path: PathBuf) -> anyhow::Result<()> {
    CACHE_DIR
        .set(path)
        .map_err(|_| anyhow::anyhow!("cache dir has already been set"))
}

pub fn api() -> anyhow::Result<&'static Api> {
    HF_API.get_or_try_init(|| {
        ApiBuilder::new()
            .with_cache_dir(get_cache_dir().to_path_buf())
            .high()
            .build()
            .context("failed to build Hugging Face API client")
    })
}

pub fn cache() -> Cache {
    Cache::new(get_cache_dir().to_path_buf())
}

pub fn repo(id: &str, revision: &str) -> Repo {
    Repo::with_revision(id.to_string(), RepoType::Model, revision.to_string())
}

/// Resolves `filename` from the `id@revision` model repo, downloading it into
/// the cache on first use.
pub async fn hf_download(id: &str, revision: &str, filename: &str) -> anyhow::Result<PathBuf> {
    let hf_repo = repo(id, revision);
    if let Some(path) = cache().repo(hf_repo.clone()).get(filename) {
        return Ok(path);
    }

    let span = tracing::info_span!("hf_download", id, revision, filename);
    let path = api()?
        .repo(hf_repo)
        .download_with_progress(filename, Reporter::new(filename))
        .instrument(span)
        .await
        .with_context(|| format!("failed to download {filename} from {id}@{revision}"))?;

    Ok(path)
}

#[derive(Clone)]
struct Reporter {
    pb: ProgressBar,
}

impl Reporter {
    fn new(filename: &str) -> Self {
        Self {
            pb: progress_bar(filename),
        }
    }
}

impl Progress for Reporter {
    async fn init(&mut self, size: usize, filename: &str) {
        self.pb.set_length(size as u64);
        self.pb.set_position(0);
        tracing::debug!(filename, size, "download started");
    }

    async fn update(&mut self, size: usize) {
        self.pb.inc(size as u64);
    }

    async fn finish(&mut self) {
        self.pb.finish_and_clear();
        tracing::debug!("download finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_keeps_revision() {
        let repo = repo("google/flan-t5-large", "main");
        assert_eq!(repo.revision(), "main");
        assert_eq!(repo.url(), "google/flan-t5-large");
    }

    #[tokio::test]
    async fn cached_file_is_served_without_network() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let cache = Cache::new(dir.path().to_path_buf());
        let hf_repo = repo("acme/tiny", "main");

        let cache_repo = cache.repo(hf_repo.clone());
        cache_repo.create_ref("0123456789abcdef")?;
        let snapshot = dir
            .path()
            .join(hf_repo.folder_name())
            .join("snapshots")
            .join("0123456789abcdef");
        std::fs::create_dir_all(&snapshot)?;
        std::fs::write(snapshot.join("config.json"), "{}")?;

        assert_eq!(
            cache_repo.get("config.json"),
            Some(snapshot.join("config.json"))
        );
        Ok(())
    }
}
