use std::{
    borrow::Cow,
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context as _, Result};
use reqwest::Client;

use crate::player::TrackInfo;

const DEFAULT_ICON_FILE: &str = "default.png";
/// Themed icon used when neither album art nor the default icon is available.
const GENERIC_ICON: &str = "audio-x-generic";

/// On-disk album art cache.
///
/// Art is keyed by `(artist, album)` so cycling through the tracks of an
/// album fetches its cover at most once; the files persist across sessions.
/// Albums whose fetch already failed this session are remembered and not
/// retried.
pub struct IconCache {
    dir: PathBuf,
    http: Client,
    default_icon_url: String,
    default_icon: Option<PathBuf>,
    attempted: HashSet<String>,
}

impl IconCache {
    pub fn new(dir: PathBuf, default_icon_url: String) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create icon cache directory {}", dir.display()))?;
        let default_path = dir.join(DEFAULT_ICON_FILE);
        let default_icon = default_path.is_file().then_some(default_path);
        Ok(Self {
            dir,
            http: Client::new(),
            default_icon_url,
            default_icon,
            attempted: HashSet::new(),
        })
    }

    /// Fetch the player's web icon into the cache unless a previous session
    /// already did. Failure is non-fatal; the themed icon is used instead.
    pub async fn ensure_default_icon(&mut self) {
        if self.default_icon.is_some() {
            return;
        }
        let path = self.dir.join(DEFAULT_ICON_FILE);
        match self.fetch_to(&self.default_icon_url, &path).await {
            Ok(()) => {
                tracing::info!(url = %self.default_icon_url, "Fetched default icon");
                self.default_icon = Some(path);
            }
            Err(e) => {
                tracing::warn!(?e, "Failed to fetch default icon, falling back to themed icon");
            }
        }
    }

    /// Icon shown when no album art is available.
    #[must_use]
    pub fn fallback_icon(&self) -> String {
        self.default_icon
            .as_ref()
            .map_or_else(|| GENERIC_ICON.to_string(), |p| p.display().to_string())
    }

    fn album_key(info: &TrackInfo) -> String {
        format!("{:x}", md5::compute(format!("{}-{}", info.artist, info.album)))
    }

    /// Resolve the icon to display for `info`.
    ///
    /// Local `file://` art is used directly. Remote art is served from the
    /// cache when present and fetched over HTTP once per album otherwise;
    /// any failure degrades to [`Self::fallback_icon`].
    pub async fn icon_for(&mut self, info: &TrackInfo) -> String {
        if let Some(local) = info.art_url.as_deref().and_then(local_art_path) {
            return local;
        }

        let key = Self::album_key(info);
        let path = self.dir.join(&key);
        if path.is_file() {
            return path.display().to_string();
        }
        if !self.attempted.insert(key) {
            // Already tried (and failed) this session
            return self.fallback_icon();
        }
        let Some(url) = info.art_url.clone() else {
            return self.fallback_icon();
        };
        match self.fetch_to(&url, &path).await {
            Ok(()) => {
                tracing::debug!(%url, album = %info.album, "Cached album art");
                path.display().to_string()
            }
            Err(e) => {
                tracing::warn!(?e, %url, "Failed to fetch album art");
                self.fallback_icon()
            }
        }
    }

    async fn fetch_to(&self, url: &str, path: &Path) -> Result<()> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("Failed to request {url}"))?
            .error_for_status()
            .with_context(|| format!("Server refused to serve {url}"))?;
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to download {url}"))?;
        fs::write(path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

/// Resolve a `file://` art URL to a local path, decoding percent escapes.
fn local_art_path(url: &str) -> Option<String> {
    let path = url.strip_prefix("file://")?;
    Some(
        urlencoding::decode(path)
            .map_or_else(|_| path.to_string(), Cow::into_owned),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(artist: &str, album: &str, art_url: Option<&str>) -> TrackInfo {
        TrackInfo {
            artist: artist.to_string(),
            title: "T".to_string(),
            album: album.to_string(),
            year: None,
            art_url: art_url.map(ToString::to_string),
            playing: true,
        }
    }

    fn cache(dir: &Path) -> IconCache {
        IconCache::new(dir.to_path_buf(), "http://localhost:9/icon.png".to_string()).unwrap()
    }

    #[test]
    fn album_key_is_stable_and_filename_safe() {
        let a = IconCache::album_key(&track("AC/DC", "Back in Black", None));
        let b = IconCache::album_key(&track("AC/DC", "Back in Black", None));
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn file_url_is_decoded_to_local_path() {
        assert_eq!(
            local_art_path("file:///home/user/My%20Art.png").as_deref(),
            Some("/home/user/My Art.png")
        );
        assert_eq!(local_art_path("https://example.com/a.png"), None);
    }

    #[tokio::test]
    async fn local_art_bypasses_the_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache(dir.path());
        let icon = cache
            .icon_for(&track("A", "Alb", Some("file:///tmp/cover.png")))
            .await;
        assert_eq!(icon, "/tmp/cover.png");
        assert!(cache.attempted.is_empty());
    }

    #[tokio::test]
    async fn cached_art_is_served_without_a_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache(dir.path());
        let info = track("A", "Alb", Some("http://localhost:9/art.png"));
        let path = dir.path().join(IconCache::album_key(&info));
        fs::write(&path, b"png").unwrap();

        let icon = cache.icon_for(&info).await;
        assert_eq!(icon, path.display().to_string());
        // Served from disk, so no fetch was recorded
        assert!(cache.attempted.is_empty());
    }

    #[tokio::test]
    async fn artless_track_falls_back_to_generic_icon() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache(dir.path());
        let info = track("A", "Alb", None);

        assert_eq!(cache.icon_for(&info).await, GENERIC_ICON);
        assert_eq!(cache.icon_for(&info).await, GENERIC_ICON);
        assert_eq!(cache.attempted.len(), 1);
    }

    #[tokio::test]
    async fn failed_fetch_is_not_retried_within_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = cache(dir.path());
        // Port 9 (discard) is not listening, so the fetch fails fast
        let info = track("A", "Alb", Some("http://127.0.0.1:9/art.png"));

        assert_eq!(cache.icon_for(&info).await, GENERIC_ICON);
        assert_eq!(cache.icon_for(&info).await, GENERIC_ICON);
        assert_eq!(cache.attempted.len(), 1);
    }

    #[test]
    fn existing_default_icon_is_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(DEFAULT_ICON_FILE), b"png").unwrap();
        let cache = cache(dir.path());
        assert_eq!(
            cache.fallback_icon(),
            dir.path().join(DEFAULT_ICON_FILE).display().to_string()
        );
    }
}
