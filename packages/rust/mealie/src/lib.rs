//! Mealie REST client.
//!
//! [`MealieClient`] talks to a Mealie server's JSON API with a bearer token
//! and implements [`RecipeStore`] so the reconciliation engine can read the
//! taxonomy, search recipes, and write category/tag changes back.

mod pages;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use url::Url;

use mealiesync_shared::{
    MealieSyncError, Organizer, Recipe, RecipeSlug, RecipeStore, Result, TaxonomyKind,
};

use pages::{PER_PAGE, Page, collect_pages};

/// Default overall timeout for a single HTTP request.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("mealiesync/", env!("CARGO_PKG_VERSION"));

/// Query keys owned by the pagination loop.
const PAGINATION_KEYS: [&str; 2] = ["page", "perPage"];

// ---------------------------------------------------------------------------
// Response shapes
// ---------------------------------------------------------------------------

/// The authenticated user, as reported by `/api/users/self`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub username: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub household: String,
}

impl std::fmt::Display for UserInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (group={}, household={})",
            self.username, self.group, self.household
        )
    }
}

#[derive(Debug, Deserialize)]
struct SlugItem {
    slug: String,
}

#[derive(Debug, Serialize)]
struct OrganizerPatch<'a> {
    #[serde(rename = "recipeCategory")]
    categories: &'a [Organizer],
    tags: &'a [Organizer],
}

// ---------------------------------------------------------------------------
// Client options
// ---------------------------------------------------------------------------

/// Configuration for the HTTP client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Timeout for HTTP requests in seconds.
    pub timeout_secs: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// MealieClient
// ---------------------------------------------------------------------------

/// Authenticated handle on one Mealie server.
#[derive(Clone)]
pub struct MealieClient {
    base_url: String,
    token: String,
    client: Client,
}

impl std::fmt::Debug for MealieClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MealieClient")
            .field("base_url", &self.base_url)
            .field("token", &"***")
            .finish()
    }
}

impl MealieClient {
    /// Create a client for the server at `base_url`.
    ///
    /// A legacy group suffix (`.../g/<group>`) is stripped from the URL.
    pub fn new(base_url: &str, token: impl Into<String>, opts: &ClientOptions) -> Result<Self> {
        let base_url = strip_group_suffix(base_url);
        let parsed = Url::parse(base_url).map_err(|e| {
            MealieSyncError::validation(format!("invalid Mealie URL '{base_url}': {e}"))
        })?;

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| MealieSyncError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            token: token.into(),
            client,
        })
    }

    /// Verify connectivity and credentials by asking who we are.
    #[instrument(skip_all, fields(url = %self.base_url))]
    pub async fn check(&self) -> Result<UserInfo> {
        let user: UserInfo = self.get_json(self.get("/api/users/self")).await?;
        info!(user = %user, "successful login");
        Ok(user)
    }

    /// Call [`check`](Self::check) up to `attempts` times, one second apart.
    pub async fn wait_until_reachable(&self, attempts: u64) -> Result<UserInfo> {
        let attempts = attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.check().await {
                Ok(user) => return Ok(user),
                Err(e) if attempt < attempts => {
                    warn!(
                        remaining = attempts - attempt,
                        error = %e,
                        "cannot connect to mealie, retrying every 1s"
                    );
                    attempt += 1;
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
                Err(e) => {
                    return Err(MealieSyncError::Network(format!(
                        "mealie connection cannot be established: {e}"
                    )));
                }
            }
        }
    }

    /// All organizers (categories or tags) known to the server.
    #[instrument(skip(self))]
    pub async fn get_organizers(&self, kind: TaxonomyKind) -> Result<Vec<Organizer>> {
        let path = format!("/api/organizers/{kind}");
        collect_pages(kind.as_str(), |page| {
            let request = self.get(&path).query(&pagination(page));
            self.get_json::<Page<Organizer>>(request)
        })
        .await
    }

    /// Slugs of every recipe matching the given filter parameters.
    #[instrument(skip_all, fields(params = ?params))]
    pub async fn search_slugs(&self, params: &BTreeMap<String, String>) -> Result<Vec<RecipeSlug>> {
        let filters: Vec<(&str, &str)> = params
            .iter()
            .filter(|(key, _)| !PAGINATION_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();

        let items = collect_pages("recipes", |page| {
            let request = self
                .get("/api/recipes")
                .query(&filters)
                .query(&pagination(page));
            self.get_json::<Page<SlugItem>>(request)
        })
        .await?;

        Ok(items.into_iter().map(|item| RecipeSlug(item.slug)).collect())
    }

    /// Full detail record for one recipe.
    pub async fn get_recipe(&self, slug: &RecipeSlug) -> Result<Recipe> {
        debug!(%slug, "getting recipe");
        self.get_json(self.get(&format!("/api/recipes/{slug}")))
            .await
            .map_err(|e| match e {
                MealieSyncError::Http { status, body } => MealieSyncError::Http {
                    status,
                    body: format!("slug {slug}: {body}"),
                },
                other => other,
            })
    }

    /// Replace a recipe's categories and tags.
    pub async fn patch_organizers(
        &self,
        slug: &RecipeSlug,
        categories: &[Organizer],
        tags: &[Organizer],
    ) -> Result<()> {
        debug!(%slug, "updating organisers");
        let body = OrganizerPatch { categories, tags };
        let request = self
            .authorized(self.client.patch(self.url(&format!("/api/recipes/{slug}"))))
            .json(&body);
        self.send(request).await?;
        debug!(%slug, "organisers patched");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Request helpers
    // -----------------------------------------------------------------------

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.token)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authorized(self.client.get(self.url(path)))
    }

    /// Send a request and return the body of a successful response.
    async fn send(&self, request: RequestBuilder) -> Result<String> {
        let response = request
            .send()
            .await
            .map_err(|e| MealieSyncError::Network(e.to_string()))?;

        let status = response.status();
        let url = response.url().to_string();
        let body = response
            .text()
            .await
            .map_err(|e| MealieSyncError::Network(format!("{url}: failed to read body: {e}")))?;

        if !status.is_success() {
            return Err(MealieSyncError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let body = self.send(request).await?;
        serde_json::from_str(&body).map_err(|e| {
            debug!(%body, "undecodable response body");
            MealieSyncError::decode(e.to_string())
        })
    }
}

/// Everything before the last `/g/`, if present.
fn strip_group_suffix(url: &str) -> &str {
    match url.rfind("/g/") {
        Some(idx) => &url[..idx],
        None => url,
    }
}

fn pagination(page: u32) -> [(&'static str, String); 2] {
    [("page", page.to_string()), ("perPage", PER_PAGE.to_string())]
}

#[async_trait]
impl RecipeStore for MealieClient {
    async fn fetch_taxonomy(&self, kind: TaxonomyKind) -> Result<Vec<Organizer>> {
        self.get_organizers(kind).await
    }

    async fn search_recipe_slugs(
        &self,
        params: &BTreeMap<String, String>,
    ) -> Result<Vec<RecipeSlug>> {
        self.search_slugs(params).await
    }

    async fn fetch_recipe(&self, slug: &RecipeSlug) -> Result<Recipe> {
        self.get_recipe(slug).await
    }

    async fn write_recipe_taxonomy(
        &self,
        slug: &RecipeSlug,
        categories: &[Organizer],
        tags: &[Organizer],
    ) -> Result<()> {
        self.patch_organizers(slug, categories, tags).await
    }
}
