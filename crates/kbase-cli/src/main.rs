//! `kbase` CLI: command-line client for a `kbase` server.
//!
//! Talks to the server exclusively over its HTTP API. Commands that add, edit
//! or delete content read the whole collection, change it locally, and write
//! the whole collection back, so two people editing at once will overwrite
//! each other.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value, json};

use kbase_core::codec::{ArticleList, WireArticles};
use kbase_core::model::{Article, ArticleRecord, Category, Tag};

// ── ANSI color helpers ───────────────────────────────────────────────

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const WHITE: &str = "\x1b[37m";

// ── CLI structure ────────────────────────────────────────────────────

/// kbase: a small knowledge base over a key-value store.
#[derive(Parser)]
#[command(
    name = "kbase",
    version,
    about = "kbase CLI: browse, back up and edit a kbase knowledge base",
    long_about = None,
    after_help = format!(
        "{DIM}Environment variables:{RESET}\n  \
         KBASE_ADDR             Server address (default: http://127.0.0.1:8787)\n  \
         KBASE_ADMIN_PASSWORD   Admin password for write and export commands\n\n\
         {DIM}Examples:{RESET}\n  \
         kbase status\n  \
         kbase articles\n  \
         kbase export --output backup.json\n  \
         kbase new-article --title \"Ownership\" --content \"...\" --publish\n  \
         kbase edit-article <ID> --unpublish"
    ),
)]
struct Cli {
    /// kbase server address.
    #[arg(long, env = "KBASE_ADDR", default_value = "http://127.0.0.1:8787")]
    addr: String,

    /// Admin password.
    #[arg(long, env = "KBASE_ADMIN_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show server health and store binding.
    Status,
    /// List articles. Published only, unless `--all` is given.
    Articles {
        /// Include drafts (needs the admin password).
        #[arg(long)]
        all: bool,
    },
    /// Export every collection to a JSON bundle.
    Export {
        /// Write the bundle to this file instead of stdout.
        #[arg(long, short)]
        output: Option<String>,
    },
    /// Restore collections from an export bundle. Collections missing from
    /// the file are left as they are.
    Import {
        /// Path to the bundle written by `kbase export`.
        file: String,
    },
    /// Add an article.
    NewArticle {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        /// Category id.
        #[arg(long)]
        category: Option<String>,
        /// Tag id (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Publish immediately instead of saving a draft.
        #[arg(long)]
        publish: bool,
    },
    /// Change fields of an existing article and bump its `updatedAt`.
    EditArticle {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        content: Option<String>,
        /// Category id. An empty string clears it.
        #[arg(long)]
        category: Option<String>,
        /// Tag id (repeatable). Replaces the existing tags.
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long, conflicts_with = "unpublish")]
        publish: bool,
        #[arg(long)]
        unpublish: bool,
    },
    /// Delete an article.
    DeleteArticle {
        id: String,
    },
    /// Add a category.
    NewCategory {
        name: String,
    },
    /// Delete a category. Refused while articles still use it.
    DeleteCategory {
        id: String,
    },
    /// Add a tag.
    NewTag {
        name: String,
    },
    /// Delete a tag. Refused while articles still use it.
    DeleteTag {
        id: String,
    },
}

// ── Pretty output helpers ────────────────────────────────────────────

fn header(icon: &str, title: &str) {
    println!("{BOLD}{CYAN}{icon} {title}{RESET}");
    println!("{DIM}─────────────────────────────────────────{RESET}");
}

fn kv_line(key: &str, value: &str) {
    println!("  {DIM}{key:<20}{RESET} {WHITE}{value}{RESET}");
}

fn success(msg: &str) {
    println!("{GREEN}{BOLD}✓{RESET} {msg}");
}

fn warning(msg: &str) {
    println!("{YELLOW}{BOLD}⚠{RESET} {YELLOW}{msg}{RESET}");
}

fn print_health(resp: &Value) {
    header("◆", "Server Status");
    kv_line("Status", resp["status"].as_str().unwrap_or("unknown"));
    kv_line("Message", resp["message"].as_str().unwrap_or(""));
    kv_line("Checked at", resp["timestamp"].as_str().unwrap_or(""));
    if resp["kv_configured"].as_bool() == Some(true) {
        kv_line("Storage", resp["storage"].as_str().unwrap_or("configured"));
    } else {
        warning("no storage bound; data routes will fail");
    }
    println!();
}

fn print_articles(data: &Value) {
    let articles = data["articles"].as_array().map_or(&[][..], Vec::as_slice);
    let categories = &data["categories"];

    header("▤", &format!("Articles ({})", articles.len()));
    if articles.is_empty() {
        println!("  {DIM}(none){RESET}");
    }
    for article in articles {
        let title = article["title"].as_str().unwrap_or("(untitled)");
        let id = article["id"].as_str().unwrap_or("?");
        let state = if article["published"] == Value::Bool(true) {
            format!("{GREEN}published{RESET}")
        } else {
            format!("{YELLOW}draft{RESET}")
        };
        let category = article["categoryId"]
            .as_str()
            .and_then(|cid| categories[cid]["name"].as_str())
            .unwrap_or("-");
        println!("  {WHITE}{title}{RESET} {DIM}[{id}] {category}{RESET} {state}");
    }
    println!();
}

// ── HTTP client ──────────────────────────────────────────────────────

struct Client {
    http: reqwest::Client,
    addr: String,
    password: Option<String>,
}

impl Client {
    fn new(addr: String, password: Option<String>) -> Self {
        let http = reqwest::Client::new();
        let addr = addr.trim_end_matches('/').to_owned();
        Self {
            http,
            addr,
            password,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.addr)
    }

    fn password(&self) -> Result<&str> {
        self.password.as_deref().ok_or_else(|| {
            anyhow::anyhow!("no admin password; set KBASE_ADMIN_PASSWORD or use --password")
        })
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let resp = self
            .http
            .get(self.url(path))
            .send()
            .await
            .context("request failed")?;
        handle_response(resp).await
    }

    /// POST to an admin route with `password` merged into `body`.
    async fn admin(&self, path: &str, body: Value) -> Result<Value> {
        let password = self.password()?;
        let mut body = match body {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        body.insert("password".to_owned(), Value::String(password.to_owned()));

        let resp = self
            .http
            .post(self.url(&format!("/api/admin/{path}")))
            .json(&Value::Object(body))
            .send()
            .await
            .context("request failed")?;
        handle_response(resp).await
    }
}

async fn handle_response(resp: reqwest::Response) -> Result<Value> {
    let status = resp.status();
    let body = resp.text().await.context("failed to read response body")?;
    if !status.is_success() {
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| error_message(&v))
            .unwrap_or(body);
        bail!("server returned {status}: {message}");
    }
    if body.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).context("failed to parse response JSON")
}

/// The `error` of a failure envelope, with any conflicting `ids` listed.
fn error_message(body: &Value) -> Option<String> {
    let error = body["error"].as_str()?;
    let ids: Vec<&str> = body["ids"]
        .as_array()
        .map(|ids| ids.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if ids.is_empty() {
        Some(error.to_owned())
    } else {
        Some(format!("{error}\n  conflicting ids: {}", ids.join(", ")))
    }
}

// ── Command dispatch ─────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let client = Client::new(cli.addr, cli.password);

    match run(client, cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("  {RED}{BOLD}✗ Error:{RESET} {e:#}");
            eprintln!();
            ExitCode::FAILURE
        }
    }
}

async fn run(client: Client, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Status => cmd_status(&client).await,
        Commands::Articles { all } => cmd_articles(&client, all).await,
        Commands::Export { output } => cmd_export(&client, output.as_deref()).await,
        Commands::Import { file } => cmd_import(&client, &file).await,
        Commands::NewArticle {
            title,
            content,
            category,
            tags,
            publish,
        } => {
            let mut article = Article::new(title, content);
            article.category_id = category;
            article.tag_ids = tags;
            article.published = publish;
            cmd_new_article(&client, article).await
        }
        Commands::EditArticle {
            id,
            title,
            content,
            category,
            tags,
            publish,
            unpublish,
        } => {
            let edit = ArticleEdit {
                title,
                content,
                category: category.map(|c| Some(c).filter(|c| !c.is_empty())),
                tags: (!tags.is_empty()).then_some(tags),
                published: match (publish, unpublish) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
            };
            cmd_edit_article(&client, &id, edit).await
        }
        Commands::DeleteArticle { id } => cmd_delete_article(&client, &id).await,
        Commands::DeleteCategory { id } => cmd_delete_named(&client, "categories", &id).await,
        Commands::DeleteTag { id } => cmd_delete_named(&client, "tags", &id).await,
        Commands::NewCategory { name } => {
            let category = Category::new(name);
            let record = json!({"id": category.id, "name": category.name});
            cmd_new_named(&client, "categories", &category.id, record).await
        }
        Commands::NewTag { name } => {
            let tag = Tag::new(name);
            let record = json!({"id": tag.id, "name": tag.name});
            cmd_new_named(&client, "tags", &tag.id, record).await
        }
    }
}

// ── Read commands ────────────────────────────────────────────────────

async fn cmd_status(client: &Client) -> Result<()> {
    println!();
    let resp = client.get("/health").await?;
    print_health(&resp);
    Ok(())
}

async fn cmd_articles(client: &Client, all: bool) -> Result<()> {
    let resp = if all {
        client.admin("data", json!({})).await?
    } else {
        client.get("/api/articles").await?
    };
    println!();
    print_articles(&resp["data"]);
    Ok(())
}

// ── Backup commands ──────────────────────────────────────────────────

async fn cmd_export(client: &Client, output: Option<&str>) -> Result<()> {
    let resp = client.admin("export", json!({})).await?;
    let text = serde_json::to_string_pretty(&resp["data"]).context("failed to format export")?;

    match output {
        Some(path) => {
            std::fs::write(path, text).with_context(|| format!("failed to write {path}"))?;
            success(&format!("exported to {path}"));
        }
        None => println!("{text}"),
    }
    Ok(())
}

async fn cmd_import(client: &Client, file: &str) -> Result<()> {
    let data = read_bundle(Path::new(file))?;
    let resp = client.admin("import", json!({ "data": data })).await?;

    let applied: Vec<&str> = resp["applied"]
        .as_array()
        .map(|a| a.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    if applied.is_empty() {
        warning("nothing to import");
    } else {
        success(&format!("imported {}", applied.join(", ")));
    }
    Ok(())
}

/// Load an import bundle. Accepts either the bare bundle or a full export
/// response with the bundle under `data`.
fn read_bundle(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let doc: Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    bundle_of(doc)
}

fn bundle_of(doc: Value) -> Result<Value> {
    let mut bundle = match doc {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Object(data)) => data,
            _ => map,
        },
        _ => bail!("import file must contain a JSON object"),
    };
    bundle.retain(|key, _| matches!(key.as_str(), "articles" | "categories" | "tags"));
    if bundle.is_empty() {
        bail!("import file has no articles, categories or tags");
    }
    Ok(Value::Object(bundle))
}

// ── Write commands ───────────────────────────────────────────────────

async fn cmd_new_article(client: &Client, article: Article) -> Result<()> {
    let current = client.admin("data", json!({})).await?;
    let id = article.id.clone();
    let articles = append_article(&current["data"]["articles"], ArticleRecord::from(article));

    client
        .admin("articles", json!({ "articles": articles }))
        .await?;
    success(&format!("article {id} saved"));
    Ok(())
}

async fn cmd_new_named(client: &Client, collection: &str, id: &str, record: Value) -> Result<()> {
    let current = client.admin("data", json!({})).await?;
    let mut body = Map::new();
    body.insert(
        collection.to_owned(),
        insert_named(&current["data"][collection], id, record),
    );

    client.admin(collection, Value::Object(body)).await?;
    success(&format!("{collection} entry {id} saved"));
    Ok(())
}

async fn cmd_edit_article(client: &Client, id: &str, edit: ArticleEdit) -> Result<()> {
    let current = client.admin("data", json!({})).await?;
    let articles = edit_article(&current["data"]["articles"], id, edit)?;

    client
        .admin("articles", json!({ "articles": articles }))
        .await?;
    success(&format!("article {id} updated"));
    Ok(())
}

async fn cmd_delete_article(client: &Client, id: &str) -> Result<()> {
    let current = client.admin("data", json!({})).await?;
    let articles = remove_article(&current["data"]["articles"], id)?;

    client
        .admin("articles", json!({ "articles": articles }))
        .await?;
    success(&format!("article {id} deleted"));
    Ok(())
}

async fn cmd_delete_named(client: &Client, collection: &str, id: &str) -> Result<()> {
    let current = client.admin("data", json!({})).await?;
    let mut body = Map::new();
    body.insert(
        collection.to_owned(),
        remove_named(&current["data"][collection], id)?,
    );

    client
        .admin(collection, Value::Object(body))
        .await
        .with_context(|| format!("{collection} entry {id} was not deleted"))?;
    success(&format!("{collection} entry {id} deleted"));
    Ok(())
}

/// Field changes for `edit-article`. `None` leaves a field untouched.
#[derive(Debug, Default)]
struct ArticleEdit {
    title: Option<String>,
    content: Option<String>,
    /// `Some(None)` clears the category.
    category: Option<Option<String>>,
    tags: Option<Vec<String>>,
    published: Option<bool>,
}

impl ArticleEdit {
    fn apply(self, article: &mut Article) {
        if let Some(title) = self.title {
            article.title = title;
        }
        if let Some(content) = self.content {
            article.content = content;
        }
        if let Some(category) = self.category {
            article.category_id = category;
        }
        if let Some(tags) = self.tags {
            article.tag_ids = tags;
        }
        if let Some(published) = self.published {
            article.published = published;
        }
        article.touch();
    }
}

/// The stored articles in either wire shape. Missing means empty.
fn stored_articles(current: &Value) -> Result<ArticleList> {
    if current.is_null() {
        return Ok(ArticleList::new());
    }
    let wire = WireArticles::try_from(current.clone()).context("unexpected articles document")?;
    Ok(wire.normalize())
}

/// The stored article list with article `id` edited in place.
///
/// Fields the client shape does not know about are carried over unchanged.
fn edit_article(current: &Value, id: &str, edit: ArticleEdit) -> Result<Value> {
    let mut articles: Vec<Value> = stored_articles(current)?
        .into_records()
        .into_iter()
        .map(ArticleRecord::into_value)
        .collect();
    let Some(slot) = articles.iter_mut().find(|a| a["id"].as_str() == Some(id)) else {
        bail!("no article with id {id}");
    };

    let mut article: Article = serde_json::from_value(slot.clone())
        .with_context(|| format!("article {id} cannot be edited"))?;
    edit.apply(&mut article);

    if let (Value::Object(stored), Value::Object(fields)) =
        (&mut *slot, ArticleRecord::from(article).into_value())
    {
        stored.extend(fields);
    }
    Ok(Value::Array(articles))
}

/// The stored article list without article `id`.
fn remove_article(current: &Value, id: &str) -> Result<Value> {
    let records = stored_articles(current)?.into_records();
    let before = records.len();
    let kept: Vec<Value> = records
        .into_iter()
        .filter(|r| r.id() != Some(id))
        .map(ArticleRecord::into_value)
        .collect();
    if kept.len() == before {
        bail!("no article with id {id}");
    }
    Ok(Value::Array(kept))
}

/// The stored id-keyed map without `id`.
fn remove_named(current: &Value, id: &str) -> Result<Value> {
    let mut map = current.as_object().cloned().unwrap_or_default();
    if map.remove(id).is_none() {
        bail!("no entry with id {id}");
    }
    Ok(Value::Object(map))
}

/// The stored article list with `record` appended.
fn append_article(current: &Value, record: ArticleRecord) -> Value {
    let mut articles = current.as_array().cloned().unwrap_or_default();
    articles.push(record.into_value());
    Value::Array(articles)
}

/// The stored id-keyed map with `record` added under `id`.
fn insert_named(current: &Value, id: &str, record: Value) -> Value {
    let mut map = current.as_object().cloned().unwrap_or_default();
    map.insert(id.to_owned(), record);
    Value::Object(map)
}
