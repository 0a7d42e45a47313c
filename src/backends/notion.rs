// src/backends/notion.rs
use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{check_status, http_client, require, ReadingListBackend};
use crate::config::ReadingListConfig;
use crate::sources::types::ReadingItem;

const API_BASE: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";
/// Upper bound on query pages per call.
pub const MAX_PAGES: usize = 50;

/// Reading list stored in a Notion database with a select-type status column.
pub struct NotionClient {
    http: reqwest::Client,
    token: Option<String>,
    database_id: Option<String>,
    status_property: String,
    pending_status: String,
    done_status: String,
}

impl NotionClient {
    pub fn from_config(cfg: &ReadingListConfig) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            token: cfg.token.clone(),
            database_id: cfg.database_id.clone(),
            status_property: cfg.status_property.clone(),
            pending_status: cfg.pending_status.clone(),
            done_status: cfg.done_status.clone(),
        })
    }

    fn query_body(&self, cursor: Option<&str>) -> Value {
        let mut body = json!({
            "filter": {
                "property": self.status_property,
                "select": { "equals": self.pending_status }
            }
        });
        if let Some(c) = cursor {
            body["start_cursor"] = Value::String(c.to_string());
        }
        body
    }
}

#[derive(Debug, Deserialize)]
struct QueryResp {
    #[serde(default)]
    results: Vec<Page>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Page {
    id: String,
    #[serde(default)]
    properties: Map<String, Value>,
}

fn plain_text(rich: &Value) -> String {
    rich.as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|p| p.get("plain_text").and_then(Value::as_str))
                .collect::<String>()
        })
        .unwrap_or_default()
}

fn typed<'a>(props: &'a Map<String, Value>, name: &str, kind: &str) -> Option<&'a Value> {
    let prop = props.get(name)?;
    (prop.get("type").and_then(Value::as_str) == Some(kind)).then(|| &prop[kind])
}

fn page_to_item(page: Page) -> ReadingItem {
    let props = &page.properties;
    let title = typed(props, "Name", "title")
        .map(plain_text)
        .unwrap_or_default();
    let url = typed(props, "Link", "url")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let author = typed(props, "Author", "rich_text")
        .map(plain_text)
        .or_else(|| {
            typed(props, "Author", "select")
                .and_then(|s| s.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .filter(|s| !s.is_empty());

    ReadingItem {
        title,
        url,
        author,
        external_id: page.id,
    }
}

/// Cursor bookkeeping for a paginated query. Stops on a repeated cursor or
/// after [`MAX_PAGES`] pages.
#[derive(Debug, Default)]
pub struct Pager {
    pages: usize,
    seen: HashSet<String>,
}

impl Pager {
    /// Record one fetched page; returns the cursor to request next, if any.
    pub fn advance(&mut self, next: Option<String>) -> Result<Option<String>> {
        self.pages += 1;
        let Some(cursor) = next else {
            return Ok(None);
        };
        if !self.seen.insert(cursor.clone()) {
            bail!("notion query: cursor {cursor} repeated after {} pages", self.pages);
        }
        if self.pages >= MAX_PAGES {
            bail!("notion query: more than {MAX_PAGES} pages");
        }
        Ok(Some(cursor))
    }
}

/// One page of query results plus the cursor for the next one.
pub fn parse_query(body: &str) -> Result<(Vec<ReadingItem>, Option<String>)> {
    let resp: QueryResp = serde_json::from_str(body).context("parse notion query")?;
    let next = if resp.has_more { resp.next_cursor } else { None };
    Ok((resp.results.into_iter().map(page_to_item).collect(), next))
}

#[async_trait]
impl ReadingListBackend for NotionClient {
    async fn query_pending(&self) -> Result<Vec<ReadingItem>> {
        let token = require(&self.token, "NOTION_TOKEN")?;
        let db = require(&self.database_id, "NOTION_DATABASE_ID")?;
        let url = format!("{API_BASE}/databases/{db}/query");

        let mut items = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pager = Pager::default();
        loop {
            let resp = self
                .http
                .post(&url)
                .bearer_auth(token)
                .header("Notion-Version", NOTION_VERSION)
                .json(&self.query_body(cursor.as_deref()))
                .send()
                .await
                .context("notion query request")?;
            let resp = check_status(resp, "notion query").await?;
            let body = resp.text().await.context("notion query body")?;
            let (mut page, next) = parse_query(&body)?;
            items.append(&mut page);
            match pager.advance(next)? {
                Some(c) => cursor = Some(c),
                None => break,
            }
        }
        Ok(items)
    }

    async fn mark_completed(&self, item_id: &str) -> Result<()> {
        let token = require(&self.token, "NOTION_TOKEN")?;
        let body = json!({
            "properties": {
                self.status_property.as_str(): { "select": { "name": self.done_status } }
            }
        });
        let resp = self
            .http
            .patch(format!("{API_BASE}/pages/{item_id}"))
            .bearer_auth(token)
            .header("Notion-Version", NOTION_VERSION)
            .json(&body)
            .send()
            .await
            .context("notion update request")?;
        check_status(resp, "notion update").await?;
        Ok(())
    }
}
