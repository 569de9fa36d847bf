//! Session-login client that reads rendered course pages.
//!
//! Course pages come from the configured `course_urls`. Identities are taken from the
//! `id` query parameter of each page and activity link. When a link carries no id
//! the position on the page is used instead (see [`positional_module_id`]); such ids
//! shift when items are inserted above them, which shows up as new items and fresh
//! downloads. Folder activities are expanded one level deep.

use crate::catalog::{CatalogClient, Course, FileRef, Module, Section};
use crate::config::RemoteConfig;
use crate::error::ApiError;
use crate::types::{CourseId, ModuleId};
use async_trait::async_trait;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

const FALLBACK_EXTENSION: &str = ".html";

/// A configured course page and the id derived from it.
#[derive(Debug, Clone)]
struct CoursePage {
    id: CourseId,
    url: Url,
}

#[derive(Debug, Clone, PartialEq)]
struct PageItem {
    module_id: ModuleId,
    name: String,
    kind: String,
    link: Url,
}

#[derive(Debug, Clone, PartialEq)]
struct PageSection {
    name: String,
    ordinal: u32,
    items: Vec<PageItem>,
}

/// Logged-in browser session over the course pages.
pub struct ScrapeClient {
    http: reqwest::Client,
    pages: Vec<CoursePage>,
}

impl fmt::Debug for ScrapeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrapeClient")
            .field("pages", &self.pages)
            .finish_non_exhaustive()
    }
}

impl ScrapeClient {
    /// Log in through the site's login form. The session cookie is kept by the client.
    pub async fn connect(config: &RemoteConfig) -> Result<Self, ApiError> {
        config.validate().map_err(ApiError::ConfigError)?;
        let pages = course_pages(&config.course_urls)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("coursemirror/", env!("CARGO_PKG_VERSION")))
            .cookie_store(true)
            .build()
            .map_err(|e| ApiError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        let login_url = config.resolved_login_url();
        let login_page = get_text(&http, &login_url)
            .await
            .map_err(|e| ApiError::Unauthorized(format!("Login page unavailable: {}", e)))?;
        let login_token = parse_login_token(&login_page)?;
        if login_token.is_none() {
            debug!("Login form carries no logintoken");
        }

        let mut form = vec![
            ("username", config.username.clone().unwrap_or_default()),
            ("password", config.password.clone().unwrap_or_default()),
        ];
        if let Some(token) = login_token {
            form.push(("logintoken", token));
        }
        let response = http
            .post(&login_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| ApiError::Unauthorized(format!("Login failed: {}", e.without_url())))?;
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Unauthorized(format!("Login failed: {}", e.without_url())))?;
        if login_rejected(&body)? {
            return Err(ApiError::Unauthorized(
                "Invalid login, check remote.username and remote.password".to_string(),
            ));
        }

        info!("Logged in at {} for {} course pages", login_url, pages.len());
        Ok(Self { http, pages })
    }

    fn page(&self, course_id: CourseId) -> Result<&CoursePage, ApiError> {
        self.pages
            .iter()
            .find(|p| p.id == course_id)
            .ok_or_else(|| ApiError::CatalogError(format!("No course page for course {}", course_id)))
    }

    async fn folder_files(&self, item: &PageItem) -> Result<Vec<FileRef>, ApiError> {
        let body = get_text(&self.http, item.link.as_str()).await?;
        Ok(parse_folder_page(&body, &item.link)?
            .into_iter()
            .map(|(name, url)| FileRef {
                name,
                url: url.to_string(),
                parent_module_id: item.module_id,
            })
            .collect())
    }

    /// Name the single file behind an activity link; the extension comes from the
    /// server's `Content-Disposition`, `.html` when there is none.
    async fn activity_file(&self, item: &PageItem) -> Result<FileRef, ApiError> {
        let response = self
            .http
            .head(item.link.clone())
            .send()
            .await
            .map_err(|e| ApiError::CatalogError(format!("{}: {}", item.name, e.without_url())))?;
        if !response.status().is_success() {
            return Err(ApiError::CatalogError(format!(
                "{}: HTTP {}",
                item.name,
                response.status()
            )));
        }
        let extension = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(disposition_extension)
            .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());

        Ok(FileRef {
            name: with_extension(&item.name, &extension),
            url: item.link.to_string(),
            parent_module_id: item.module_id,
        })
    }
}

#[async_trait]
impl CatalogClient for ScrapeClient {
    async fn list_courses(&self) -> Result<Vec<Course>, ApiError> {
        let mut courses = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let title = match get_text(&self.http, page.url.as_str()).await {
                Ok(body) => parse_course_title(&body)?,
                Err(e) => {
                    warn!("Could not read course page {}: {}", page.url, e);
                    None
                }
            };
            courses.push(Course {
                id: page.id,
                name: title.unwrap_or_else(|| format!("Course {}", page.id)),
                short_name: None,
            });
        }
        Ok(courses)
    }

    async fn list_contents(&self, course_id: CourseId) -> Result<Vec<Section>, ApiError> {
        let page = self.page(course_id)?;
        let body = get_text(&self.http, page.url.as_str()).await?;
        let parsed = parse_course_page(&body, &page.url)?;

        let mut sections = Vec::with_capacity(parsed.len());
        for section in parsed {
            let mut modules = Vec::with_capacity(section.items.len());
            for item in section.items {
                let files = if item.kind == "folder" {
                    self.folder_files(&item).await
                } else {
                    self.activity_file(&item).await.map(|f| vec![f])
                };
                // Left without files, the module's files are picked up on a later run.
                let files = files.unwrap_or_else(|e| {
                    warn!("Could not resolve files of {}: {}", item.name, e);
                    Vec::new()
                });
                modules.push(Module {
                    id: item.module_id,
                    name: item.name,
                    kind: item.kind,
                    files,
                });
            }
            sections.push(Section {
                name: section.name,
                ordinal: section.ordinal,
                modules,
            });
        }
        Ok(sections)
    }

    async fn fetch_bytes(&self, file: &FileRef) -> Result<Vec<u8>, ApiError> {
        let response = self
            .http
            .get(&file.url)
            .send()
            .await
            .map_err(|e| ApiError::FetchFailed(format!("{}: {}", file.name, e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::FetchFailed(format!("{}: HTTP {}", file.name, status)));
        }
        if response.url().path().ends_with("/login/index.php") {
            return Err(ApiError::FetchFailed(format!(
                "{}: session expired (redirected to login)",
                file.name
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::FetchFailed(format!("{}: {}", file.name, e.without_url())))?;
        Ok(bytes.to_vec())
    }
}

async fn get_text(http: &reqwest::Client, url: &str) -> Result<String, ApiError> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| ApiError::CatalogError(format!("GET {} failed: {}", url, e.without_url())))?;
    if !response.status().is_success() {
        return Err(ApiError::CatalogError(format!(
            "GET {} returned HTTP {}",
            url,
            response.status()
        )));
    }
    response
        .text()
        .await
        .map_err(|e| ApiError::CatalogError(format!("GET {} failed: {}", url, e.without_url())))
}

fn selector(css: &str) -> Result<Selector, ApiError> {
    Selector::parse(css)
        .map_err(|e| ApiError::CatalogError(format!("Invalid selector {}: {:?}", css, e)))
}

fn id_param(url: &Url) -> Option<u64> {
    url.query_pairs()
        .find(|(key, _)| key == "id")
        .and_then(|(_, value)| value.parse().ok())
}

/// Course ids from the `id` of each page URL, else the page's 1-based position.
fn course_pages(urls: &[String]) -> Result<Vec<CoursePage>, ApiError> {
    urls.iter()
        .enumerate()
        .map(|(index, raw)| {
            let url = Url::parse(raw.trim())
                .map_err(|e| ApiError::ConfigError(format!("Invalid course URL {}: {}", raw, e)))?;
            let id = id_param(&url).unwrap_or_else(|| {
                let fallback = index as u64 + 1;
                warn!("Course URL {} has no id, using position {}", raw, fallback);
                fallback
            });
            Ok(CoursePage { id, url })
        })
        .collect()
}

/// Stand-in id for an activity link without one: section ordinal times 1000 plus the
/// 1-based item position.
fn positional_module_id(section_ordinal: u32, item_index: usize) -> ModuleId {
    u64::from(section_ordinal) * 1000 + item_index as u64 + 1
}

fn parse_login_token(body: &str) -> Result<Option<String>, ApiError> {
    let document = Html::parse_document(body);
    let input = selector(r#"input[name="logintoken"]"#)?;
    Ok(document
        .select(&input)
        .next()
        .and_then(|el| el.value().attr("value"))
        .map(str::to_string))
}

fn login_rejected(body: &str) -> Result<bool, ApiError> {
    if body.contains("Invalid login") {
        return Ok(true);
    }
    let document = Html::parse_document(body);
    let error = selector("#loginerrormessage, .loginerrors")?;
    Ok(document.select(&error).next().is_some())
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn parse_course_title(body: &str) -> Result<Option<String>, ApiError> {
    let document = Html::parse_document(body);
    for css in [".page-context-header h1", "title"] {
        let found = document
            .select(&selector(css)?)
            .map(element_text)
            .find(|t| !t.is_empty());
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

/// Instance name without the screen-reader suffix (" File", " Folder", ...).
fn visible_name(instance: ElementRef<'_>, hidden: &Selector) -> String {
    let mut text: String = instance.text().collect();
    for suffix in instance.select(hidden) {
        let hidden_text: String = suffix.text().collect();
        text = text.replacen(&hidden_text, "", 1);
    }
    text.trim().to_string()
}

fn activity_kind(item: ElementRef<'_>, link: &Url, hidden_label: &str) -> String {
    if let Some(kind) = item
        .value()
        .classes()
        .find_map(|c| c.strip_prefix("modtype_"))
    {
        return kind.to_string();
    }
    if hidden_label.trim().eq_ignore_ascii_case("folder") {
        return "folder".to_string();
    }
    link.path_segments()
        .and_then(|mut segments| {
            segments.find(|s| *s == "mod")?;
            segments.next().map(str::to_string)
        })
        .unwrap_or_else(|| "resource".to_string())
}

fn parse_course_page(body: &str, page_url: &Url) -> Result<Vec<PageSection>, ApiError> {
    let document = Html::parse_document(body);
    let section_sel = selector("li.section")?;
    let heading_sel = selector(".sectionname, .content h3")?;
    let item_sel = selector("li.activity")?;
    let instance_sel = selector(".instancename")?;
    let link_sel = selector("a[href]")?;
    let hidden_sel = selector(".accesshide")?;

    let mut sections = Vec::new();
    for (index, section) in document.select(&section_sel).enumerate() {
        let ordinal = section
            .value()
            .id()
            .and_then(|id| id.strip_prefix("section-"))
            .and_then(|n| n.parse().ok())
            .unwrap_or(index as u32);
        let name = section
            .select(&heading_sel)
            .map(element_text)
            .find(|t| !t.is_empty())
            .unwrap_or_else(|| format!("Section {}", ordinal));

        let mut items = Vec::new();
        for (item_index, item) in section.select(&item_sel).enumerate() {
            let Some(instance) = item.select(&instance_sel).next() else {
                continue;
            };
            let Some(link) = item
                .select(&link_sel)
                .next()
                .and_then(|a| a.value().attr("href"))
                .and_then(|href| page_url.join(href).ok())
            else {
                continue;
            };

            let name = visible_name(instance, &hidden_sel);
            if name.is_empty() {
                continue;
            }
            let hidden_label: String = instance
                .select(&hidden_sel)
                .flat_map(|h| h.text())
                .collect();
            let kind = activity_kind(item, &link, &hidden_label);

            let module_id = id_param(&link)
                .or_else(|| {
                    item.value()
                        .id()
                        .and_then(|id| id.strip_prefix("module-"))
                        .and_then(|n| n.parse().ok())
                })
                .unwrap_or_else(|| {
                    let fallback = positional_module_id(ordinal, item_index);
                    warn!("Activity {} has no id, using position {}", name, fallback);
                    fallback
                });

            items.push(PageItem {
                module_id,
                name,
                kind,
                link,
            });
        }

        sections.push(PageSection {
            name,
            ordinal,
            items,
        });
    }
    Ok(sections)
}

/// Files listed on a folder page; subfolders are not followed.
fn parse_folder_page(body: &str, page_url: &Url) -> Result<Vec<(String, Url)>, ApiError> {
    let document = Html::parse_document(body);
    let link_sel = selector(".fp-filename-icon a[href]")?;
    let name_sel = selector(".fp-filename")?;

    let mut files = Vec::new();
    for link in document.select(&link_sel) {
        let Some(url) = link
            .value()
            .attr("href")
            .and_then(|href| page_url.join(href).ok())
        else {
            continue;
        };
        let name = link
            .select(&name_sel)
            .map(element_text)
            .find(|t| !t.is_empty())
            .or_else(|| {
                url.path_segments()
                    .and_then(|mut s| s.next_back().map(str::to_string))
            })
            .filter(|n| !n.is_empty());
        if let Some(name) = name {
            files.push((name, url));
        }
    }
    Ok(files)
}

/// Extension (with the dot) of the `filename="..."` in a Content-Disposition value.
fn disposition_extension(header: &str) -> Option<String> {
    const KEY: &str = "filename=\"";
    let start = header.find(KEY)? + KEY.len();
    let rest = &header[start..];
    let file_name = &rest[..rest.find('"')?];
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => Some(format!(".{}", ext)),
        _ => None,
    }
}

fn with_extension(name: &str, extension: &str) -> String {
    if name.to_lowercase().ends_with(&extension.to_lowercase()) {
        name.to_string()
    } else {
        format!("{}{}", name, extension)
    }
}
