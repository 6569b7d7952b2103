//! Local cache of the Steam application catalog (app ID → name).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::SteamError;

/// Steam Web API endpoint returning every app ID and name.
pub const STEAM_APPLIST_URL: &str = "https://api.steampowered.com/ISteamApps/GetAppList/v2/";

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SteamApp {
    pub appid: u32,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct AppListResponse {
    applist: AppList,
}

#[derive(Debug, Deserialize)]
struct AppList {
    apps: Vec<SteamApp>,
}

/// The app catalog cached as a JSON file.
#[derive(Debug, Clone)]
pub struct AppListCache {
    path: PathBuf,
    url: String,
}

impl AppListCache {
    /// Creates a cache stored at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            url: STEAM_APPLIST_URL.to_string(),
        }
    }

    /// Overrides the catalog endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Returns the default cache location under the user cache directory.
    pub fn default_path() -> PathBuf {
        compatkit_settings::cache_home()
            .join(compatkit_settings::APP_DIR)
            .join("steam_applist.json")
    }

    /// Returns the cache file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Downloads the catalog unless a cached copy exists and `force` is false.
    ///
    /// The new catalog is validated, written to a temporary sibling and
    /// renamed into place, so readers see either the old or the new file.
    /// Returns whether a download happened.
    pub async fn refresh(&self, client: &reqwest::Client, force: bool) -> Result<bool, SteamError> {
        if !force && self.path.exists() {
            return Ok(false);
        }

        let body = client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let parsed: AppListResponse = serde_json::from_slice(&body)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.part");
        tokio::fs::write(&tmp, &body).await?;
        tokio::fs::rename(&tmp, &self.path).await?;

        tracing::info!(
            path = %self.path.display(),
            apps = parsed.applist.apps.len(),
            "Steam app list cached"
        );
        Ok(true)
    }

    /// Looks up game names for `ids`.
    ///
    /// Missing or unreadable cache files yield an empty map.
    pub fn game_names_by_ids(&self, ids: &[u32]) -> HashMap<u32, String> {
        let mut names = HashMap::new();
        if ids.is_empty() {
            return names;
        }

        let apps = match self.load() {
            Ok(apps) => apps,
            Err(e) => {
                tracing::debug!(
                    path = %self.path.display(),
                    error = %e,
                    "Steam app list unavailable"
                );
                return names;
            }
        };

        for app in apps {
            if ids.contains(&app.appid) {
                names.insert(app.appid, app.name);
                if names.len() == ids.len() {
                    break;
                }
            }
        }

        names
    }

    fn load(&self) -> Result<Vec<SteamApp>, SteamError> {
        let data = std::fs::read(&self.path).map_err(|e| SteamError::Io(e.to_string()))?;
        let parsed: AppListResponse = serde_json::from_slice(&data)?;
        Ok(parsed.applist.apps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const APPLIST: &str = r#"{"applist":{"apps":[
        {"appid":570,"name":"Dota 2"},
        {"appid":1091500,"name":"Cyberpunk 2077"},
        {"appid":10,"name":"Counter-Strike"}
    ]}}"#;

    /// Starts a mock HTTP server that responds with the given JSON body.
    async fn mock_server(body: &str) -> (String, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{port}/ISteamApps/GetAppList/v2/");
        let body = body.to_string();

        let handle = tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                let mut buf = vec![0u8; 8192];
                let _ = stream.read(&mut buf).await;

                let resp = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = stream.write_all(resp.as_bytes()).await;
                let _ = stream.shutdown().await;
            }
        });

        (url, handle)
    }

    #[tokio::test]
    async fn refresh_downloads_and_caches() {
        let (url, handle) = mock_server(APPLIST).await;
        let tmp = tempfile::tempdir().unwrap();
        let cache = AppListCache::new(tmp.path().join("cache").join("applist.json")).with_url(url);

        let client = reqwest::Client::new();
        assert!(cache.refresh(&client, false).await.unwrap());
        assert!(cache.path().exists());
        assert!(!cache.path().with_extension("json.part").exists());

        let names = cache.game_names_by_ids(&[570, 1091500, 42]);
        assert_eq!(names.len(), 2);
        assert_eq!(names[&570], "Dota 2");
        assert_eq!(names[&1091500], "Cyberpunk 2077");

        handle.abort();
    }

    #[tokio::test]
    async fn refresh_skips_existing_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("applist.json");
        std::fs::write(&path, APPLIST).unwrap();

        // Nothing listens here; a request would fail.
        let cache = AppListCache::new(&path).with_url("http://127.0.0.1:9/");
        let client = reqwest::Client::new();
        assert!(!cache.refresh(&client, false).await.unwrap());
    }

    #[tokio::test]
    async fn invalid_payload_keeps_old_cache() {
        let (url, handle) = mock_server(r#"{"error":"rate limited"}"#).await;
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("applist.json");
        std::fs::write(&path, APPLIST).unwrap();

        let cache = AppListCache::new(&path).with_url(url);
        let client = reqwest::Client::new();
        assert!(cache.refresh(&client, true).await.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), APPLIST);

        handle.abort();
    }

    #[test]
    fn lookup_without_cache_is_empty() {
        let cache = AppListCache::new("/definitely/not/applist.json");
        assert!(cache.game_names_by_ids(&[570]).is_empty());
    }

    #[test]
    fn lookup_partial_file_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("applist.json");
        std::fs::write(&path, &APPLIST[..40]).unwrap();

        let cache = AppListCache::new(&path);
        assert!(cache.game_names_by_ids(&[570]).is_empty());
    }

    #[test]
    fn default_path_is_under_cache_dir() {
        assert!(AppListCache::default_path().ends_with("compatkit/steam_applist.json"));
    }
}
