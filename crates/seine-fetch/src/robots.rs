use dashmap::DashMap;
use reqwest::Client;
use robotstxt::DefaultMatcher;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Cached robots.txt state for one host. `None` content means the file was
/// missing or unfetchable and the host defaults to allow-all.
#[derive(Debug)]
struct RobotsEntry {
    content: Option<String>,
}

/// Per-host robots.txt gate.
///
/// The first sighting of a host fetches `{scheme}://{authority}/robots.txt`
/// and caches the result for the life of the crawl. 4xx and network errors
/// cache a permissive entry; 5xx does the same but is logged at warn so a
/// broken-robots host is visible to operators. A concurrent duplicate
/// fetch for the same host is harmless and last-write-wins.
pub struct RobotsPolicy {
    enabled: bool,
    user_agent: String,
    client: Client,
    cache: DashMap<String, Arc<RobotsEntry>>,
}

impl RobotsPolicy {
    pub fn new(user_agent: &str, enabled: bool, fetch_timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(fetch_timeout)
            .gzip(true)
            .build()?;
        Ok(Self {
            enabled,
            user_agent: user_agent.to_string(),
            client,
            cache: DashMap::new(),
        })
    }

    /// Whether the configured User-Agent may fetch `url`.
    ///
    /// Unparseable or host-less URLs are never fetchable.
    pub async fn can_fetch(&self, url: &str) -> bool {
        if !self.enabled {
            return true;
        }
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        let authority = match parsed.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };

        let entry = self.entry_for(parsed.scheme(), &authority).await;
        match &entry.content {
            None => true,
            Some(content) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(content, &self.user_agent, url)
            }
        }
    }

    async fn entry_for(&self, scheme: &str, authority: &str) -> Arc<RobotsEntry> {
        if let Some(entry) = self.cache.get(authority) {
            return entry.clone();
        }

        let robots_url = format!("{}://{}/robots.txt", scheme, authority);
        debug!(host = %authority, robots_url = %robots_url, "fetching robots.txt");

        let content = match self.client.get(&robots_url).send().await {
            Ok(response) if response.status().is_success() => response.text().await.ok(),
            Ok(response) if response.status().is_server_error() => {
                warn!(
                    host = %authority,
                    status = %response.status(),
                    "robots.txt fetch returned a server error, defaulting to allow-all"
                );
                None
            }
            Ok(response) => {
                debug!(
                    host = %authority,
                    status = %response.status(),
                    "no robots.txt for host, defaulting to allow-all"
                );
                None
            }
            Err(error) => {
                warn!(
                    host = %authority,
                    error = %error,
                    "failed to fetch robots.txt, defaulting to allow-all"
                );
                None
            }
        };

        let entry = Arc::new(RobotsEntry { content });
        self.cache.insert(authority.to_string(), entry.clone());
        entry
    }

    /// Number of hosts with a cached decision.
    pub fn cached_hosts(&self) -> usize {
        self.cache.len()
    }
}
