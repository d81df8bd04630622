use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::config::Config;
use crate::fetch;

const ACCEPT_V3: &str = "application/vnd.heroku+json; version=3";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Owner {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct App {
    pub name: String,
    pub owner: Owner,
    pub created_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
    pub slug_size: Option<u64>,
}

impl App {
    /// Time of the last release, or creation time for apps never released.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.released_at.unwrap_or(self.created_at)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub name: String,
    #[serde(default)]
    pub commit: Option<String>,
    pub user: Owner,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dyno {
    pub name: String,
    pub state: String,
    #[serde(default)]
    pub command: String,
    pub created_at: DateTime<Utc>,
}

impl Dyno {
    pub fn age(&self, now: DateTime<Utc>) -> std::time::Duration {
        (now - self.created_at).to_std().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedRef {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Addon {
    pub id: String,
    pub name: String,
    pub plan: NamedRef,
    pub app: NamedRef,
    #[serde(default)]
    pub config_vars: Vec<String>,
}

impl Addon {
    /// The variable `att` exposes this add-on as: the add-on's own config var
    /// when the API reports one, else the attachment's `NAME_URL`.
    pub fn config_var(&self, att: &Attachment) -> String {
        match self.config_vars.first() {
            Some(var) => var.clone(),
            None => att.default_config_var(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachedAddon {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub name: String,
    pub addon: AttachedAddon,
}

impl Attachment {
    pub fn default_config_var(&self) -> String {
        if self.name.is_empty() {
            String::new()
        } else {
            format!("{}_URL", self.name.to_uppercase())
        }
    }
}

/// An add-on joined with the attachment that exposes it to one app.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedAddon {
    pub kind: String,
    pub owner: String,
    pub name: String,
    pub config_var: String,
}

impl MergedAddon {
    /// Name shown in short listings: the config var, else the add-on type.
    pub fn short_name(&self) -> String {
        if self.config_var.is_empty() {
            format!("({})", self.kind)
        } else {
            self.config_var.clone()
        }
    }
}

pub struct PlatformClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl PlatformClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.api_url.clone(), config.api_key.clone())
    }

    fn get_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_V3));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("hk/", env!("CARGO_PKG_VERSION"))),
        );
        if let Some(key) = &self.api_key {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", key)).context("Invalid API key")?,
            );
        }
        Ok(headers)
    }

    /// Fetches the resource at `path` and decodes it into `T`.
    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .headers(self.get_headers()?)
            .send()
            .with_context(|| format!("Failed to send request to {}", path))?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "API request failed: {} - {}",
                response.status(),
                response.text()?
            ));
        }

        response
            .json::<T>()
            .with_context(|| format!("Failed to parse response from {}", path))
    }

    pub fn list_apps(&self) -> Result<Vec<App>> {
        self.get("/apps")
    }

    pub fn get_app(&self, name: &str) -> Result<App> {
        self.get(&app_path(name))
    }

    pub fn list_releases(&self, app: &str) -> Result<Vec<Release>> {
        self.get(&format!("{}/releases", app_path(app)))
    }

    pub fn get_release(&self, app: &str, name: &str) -> Result<Release> {
        self.get(&format!(
            "{}/releases/{}",
            app_path(app),
            urlencoding::encode(name)
        ))
    }

    pub fn list_dynos(&self, app: &str) -> Result<Vec<Dyno>> {
        self.get(&format!("{}/dynos", app_path(app)))
    }

    pub fn list_addons(&self, app: &str) -> Result<Vec<Addon>> {
        self.get(&format!("{}/addons", app_path(app)))
    }

    pub fn list_attachments(&self, app: &str) -> Result<Vec<Attachment>> {
        self.get(&format!("{}/addon-attachments", app_path(app)))
    }

    /// Resolves every add-on visible to `app` together with the config var
    /// it is attached as. Add-ons without an attachment to `app` are listed
    /// with an empty config var. Owners are the owner emails of the apps that
    /// own each add-on; lookups of those apps fan out and a failed lookup only
    /// leaves that owner blank.
    pub fn merged_addons(&self, app: &str) -> Result<Vec<MergedAddon>> {
        let addons = self.list_addons(app)?;
        let attachments = self.list_attachments(app)?;

        let owning_apps: Vec<String> = addons
            .iter()
            .map(|a| a.app.name.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let owners: HashMap<String, String> = fetch::fetch_each(&owning_apps, |name| {
            self.get_app(name).map(|a| (a.name, a.owner.email))
        })
        .into_iter()
        .flatten()
        .collect();

        Ok(merge_addons(&addons, &attachments, &owners))
    }
}

fn app_path(name: &str) -> String {
    format!("/apps/{}", urlencoding::encode(name))
}

/// Joins add-ons with their attachments. Output follows attachment order,
/// then any add-ons left unattached in API order.
pub fn merge_addons(
    addons: &[Addon],
    attachments: &[Attachment],
    owners: &HashMap<String, String>,
) -> Vec<MergedAddon> {
    let by_id: HashMap<&str, &Addon> = addons.iter().map(|a| (a.id.as_str(), a)).collect();
    let owner_of = |addon: &Addon| owners.get(&addon.app.name).cloned().unwrap_or_default();

    let mut merged = Vec::new();
    let mut attached = BTreeSet::new();
    for att in attachments {
        attached.insert(att.addon.id.as_str());
        match by_id.get(att.addon.id.as_str()) {
            Some(addon) => merged.push(MergedAddon {
                kind: addon.plan.name.clone(),
                owner: owner_of(addon),
                name: addon.name.clone(),
                config_var: addon.config_var(att),
            }),
            None => merged.push(MergedAddon {
                kind: String::new(),
                owner: String::new(),
                name: att.addon.name.clone(),
                config_var: att.default_config_var(),
            }),
        }
    }
    for addon in addons {
        if !attached.contains(addon.id.as_str()) {
            merged.push(MergedAddon {
                kind: addon.plan.name.clone(),
                owner: owner_of(addon),
                name: addon.name.clone(),
                config_var: String::new(),
            });
        }
    }
    merged
}
