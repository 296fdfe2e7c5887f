mod config;

use anyhow::{Context as AnyhowContext, Result};
use clap::{Parser, Subcommand};
use config::{Config, Context};
use reqwest::Client;

#[derive(Parser)]
#[command(name = "geosync")]
#[command(version, about = "GeoSync Command Line Tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Sync server URL (overrides context and GEOSYNC_SERVER_URL)
    #[arg(long)]
    server_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resynchronize a source
    ///
    /// SOURCE is a numeric id or a slug. By default the refresh job is
    /// queued for a worker; --sync runs it inline and waits for the result.
    /// A source with a running job is refused unless --force is given.
    ///
    /// Examples:
    ///     geosync resync towns-of-provence
    ///     geosync resync 42 --sync
    ///     geosync resync towns-of-provence --force
    #[command(verbatim_doc_comment)]
    Resync {
        /// Source id or slug
        source: String,

        /// Run the refresh inline instead of queueing it
        #[arg(long)]
        sync: bool,

        /// Bypass the running-job gate
        #[arg(long)]
        force: bool,
    },
    /// Resynchronize every source
    ///
    /// Refuses to dispatch anything if any source has a running job,
    /// unless --force is given.
    ///
    /// Examples:
    ///     geosync resync-all
    ///     geosync resync-all --force
    #[command(verbatim_doc_comment)]
    ResyncAll {
        /// Run the refreshes inline instead of queueing them
        #[arg(long)]
        sync: bool,

        /// Bypass the running-job gate
        #[arg(long)]
        force: bool,
    },
    /// Source management
    Source {
        #[command(subcommand)]
        command: SourceCommand,
    },
    /// List recent refresh jobs for a source
    ///
    /// Examples:
    ///     geosync jobs towns-of-provence
    ///     geosync jobs 42 --limit 5
    #[command(verbatim_doc_comment)]
    Jobs {
        /// Source id or slug
        source: String,

        /// Maximum number of jobs to show
        #[arg(long, default_value_t = 20)]
        limit: i64,

        /// Emit only the JSON response
        #[arg(short, long)]
        json: bool,
    },
    /// Fetch server health
    ///
    /// Examples:
    ///     geosync status
    ///     geosync --server-url=http://localhost:8090 status --json
    #[command(verbatim_doc_comment)]
    Status {
        /// Emit only the JSON response
        #[arg(short, long)]
        json: bool,
    },
    /// Context management
    Context {
        #[command(subcommand)]
        command: ContextCommand,
    },
    /// Database management
    ///
    /// Examples:
    ///     geosync db init
    ///     geosync db validate
    #[command(verbatim_doc_comment)]
    Db {
        #[command(subcommand)]
        command: DbCommand,
    },
}

#[derive(Subcommand)]
enum SourceCommand {
    /// List sources
    ///
    /// Examples:
    ///     geosync source list
    ///     geosync source list --kind geojson --status FAILED
    #[command(verbatim_doc_comment)]
    List {
        /// Filter by source kind (geojson, csv, wmts)
        #[arg(long)]
        kind: Option<String>,

        /// Filter by sync status (IDLE, RUNNING, DONE, FAILED)
        #[arg(long)]
        status: Option<String>,

        /// Emit only the JSON response
        #[arg(short, long)]
        json: bool,
    },
    /// Show one source
    ///
    /// Examples:
    ///     geosync source show towns-of-provence
    ///     geosync source show 42
    #[command(verbatim_doc_comment)]
    Show {
        /// Source id or slug
        source: String,
    },
    /// Create a source
    ///
    /// Examples:
    ///     geosync source create --name "Towns of Provence" --kind geojson \
    ///         --geom-type polygon --uri https://example.com/towns.geojson
    ///     geosync source create --name "Bike stations" --kind csv --geom-type point \
    ///         --uri ./stations.csv --settings '{"lng_field": "lon", "lat_field": "lat"}' \
    ///         --refresh-interval 60
    #[command(verbatim_doc_comment)]
    Create {
        /// Display name
        #[arg(long)]
        name: String,

        /// Slug (derived from the name when omitted)
        #[arg(long)]
        slug: Option<String>,

        /// Source kind: geojson, csv, or wmts
        #[arg(long)]
        kind: String,

        /// Geometry type: point, linestring, polygon, multipoint,
        /// multilinestring, or multipolygon
        #[arg(long)]
        geom_type: String,

        /// Payload location (http(s) URL or file path)
        #[arg(long)]
        uri: String,

        /// Kind-specific settings as a JSON object
        #[arg(long, value_name = "JSON")]
        settings: Option<String>,

        /// Periodic refresh interval in minutes
        #[arg(long, value_name = "N")]
        refresh_interval: Option<i32>,
    },
    /// Delete a source
    ///
    /// Examples:
    ///     geosync source delete old-layer
    #[command(verbatim_doc_comment)]
    Delete {
        /// Source id or slug
        source: String,
    },
}

#[derive(Subcommand)]
enum ContextCommand {
    /// Add a new context for connecting to sync servers
    ///
    /// Examples:
    ///     geosync context add local --server-url=http://localhost:8090
    ///     geosync context add prod --server-url=https://geosync.example.com --set-current
    #[command(verbatim_doc_comment)]
    Add {
        /// Context name
        name: String,

        /// Server URL (e.g., http://localhost:8090)
        #[arg(long)]
        server_url: String,

        /// Set as current context
        #[arg(long)]
        set_current: bool,
    },
    /// List all configured contexts
    List,
    /// Switch to a different context
    Use {
        /// Context name to switch to
        name: String,
    },
    /// Delete a context
    Delete {
        /// Context name to delete
        name: String,
    },
    /// Show the current context
    Current,
}

#[derive(Subcommand)]
enum DbCommand {
    /// Initialize the GeoSync database schema
    Init,
    /// Validate the GeoSync database schema
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let mut config = Config::load()?;

    let base_url = if let Some(url) = cli.server_url {
        url
    } else if let Ok(url) = std::env::var("GEOSYNC_SERVER_URL") {
        url
    } else {
        config
            .get_current_context()
            .map(|(_, ctx)| ctx.server_url.clone())
            .unwrap_or_else(|| "http://localhost:8090".to_string())
    };

    let client = Client::new();

    match cli.command {
        Commands::Resync {
            source,
            sync,
            force,
        } => {
            resync_source(&client, &base_url, &source, sync, force).await?;
        }
        Commands::ResyncAll { sync, force } => {
            resync_all_sources(&client, &base_url, sync, force).await?;
        }
        Commands::Source { command } => match command {
            SourceCommand::List { kind, status, json } => {
                list_sources(&client, &base_url, kind.as_deref(), status.as_deref(), json).await?;
            }
            SourceCommand::Show { source } => {
                show_source(&client, &base_url, &source).await?;
            }
            SourceCommand::Create {
                name,
                slug,
                kind,
                geom_type,
                uri,
                settings,
                refresh_interval,
            } => {
                create_source(
                    &client,
                    &base_url,
                    &name,
                    slug.as_deref(),
                    &kind,
                    &geom_type,
                    &uri,
                    settings.as_deref(),
                    refresh_interval,
                )
                .await?;
            }
            SourceCommand::Delete { source } => {
                delete_source(&client, &base_url, &source).await?;
            }
        },
        Commands::Jobs {
            source,
            limit,
            json,
        } => {
            list_jobs(&client, &base_url, &source, limit, json).await?;
        }
        Commands::Status { json } => {
            get_status(&client, &base_url, json).await?;
        }
        Commands::Context { command } => {
            handle_context_command(&mut config, command)?;
        }
        Commands::Db { command } => match command {
            DbCommand::Init => {
                db_init(&client, &base_url).await?;
            }
            DbCommand::Validate => {
                db_validate(&client, &base_url).await?;
            }
        },
    }

    Ok(())
}

fn handle_context_command(config: &mut Config, command: ContextCommand) -> Result<()> {
    match command {
        ContextCommand::Add {
            name,
            server_url,
            set_current,
        } => {
            config.contexts.insert(name.clone(), Context::new(server_url));
            if set_current || config.current_context.is_none() {
                config.current_context = Some(name.clone());
            }
            config.save()?;
            println!("Context '{}' added.", name);
            if config.current_context.as_ref() == Some(&name) {
                println!("Context '{}' is now the current context.", name);
            }
        }
        ContextCommand::List => {
            println!("  {:<15} {:<40}", "NAME", "SERVER URL");
            for (name, ctx) in &config.contexts {
                let current_mark = if config.current_context.as_ref() == Some(name) {
                    "*"
                } else {
                    " "
                };
                println!("{} {:<15} {:<40}", current_mark, name, ctx.server_url);
            }
        }
        ContextCommand::Use { name } => {
            if config.contexts.contains_key(&name) {
                config.current_context = Some(name.clone());
                config.save()?;
                println!("Switched to context '{}'.", name);
            } else {
                eprintln!("Context '{}' not found.", name);
                std::process::exit(1);
            }
        }
        ContextCommand::Delete { name } => {
            if config.contexts.remove(&name).is_some() {
                if config.current_context.as_ref() == Some(&name) {
                    config.current_context = None;
                }
                config.save()?;
                println!("Context '{}' deleted.", name);
            } else {
                eprintln!("Context '{}' not found.", name);
                std::process::exit(1);
            }
        }
        ContextCommand::Current => {
            if let Some((name, ctx)) = config.get_current_context() {
                println!("Current context: {}", name);
                println!("  Server URL: {}", ctx.server_url);
            } else {
                println!("No current context set.");
            }
        }
    }
    Ok(())
}

async fn resync_source(
    client: &Client,
    base_url: &str,
    reference: &str,
    sync: bool,
    force: bool,
) -> Result<()> {
    let url = format!("{}/api/sources/{}/resync", base_url, reference);
    let body = serde_json::json!({ "sync": sync, "force": force });

    let response = client
        .post(&url)
        .json(&body)
        .send()
        .await
        .context("Failed to send resync request")?;

    if response.status().is_success() {
        let receipt: serde_json::Value = response.json().await?;
        let slug = receipt
            .get("slug")
            .and_then(|v| v.as_str())
            .unwrap_or(reference);
        let job_id = receipt.get("job_id").and_then(|v| v.as_str()).unwrap_or("-");
        let mode = receipt.get("mode").and_then(|v| v.as_str()).unwrap_or("-");
        let status = receipt.get("status").and_then(|v| v.as_str()).unwrap_or("-");

        println!("Resync dispatched:");
        println!("  Source: {}", slug);
        println!("  Job:    {}", job_id);
        println!("  Mode:   {}", mode);
        println!("  Status: {}", status);

        if mode == "queued" {
            println!("\nTo check progress:");
            println!("  geosync jobs {}", slug);
        }

        if status == "failure" {
            eprintln!("Inline refresh failed, see job {} for details", job_id);
            std::process::exit(1);
        }
    } else {
        let status = response.status();
        let text = response.text().await?;
        eprintln!("Resync rejected: {} - {}", status, text);
        std::process::exit(1);
    }

    Ok(())
}

async fn resync_all_sources(client: &Client, base_url: &str, sync: bool, force: bool) -> Result<()> {
    let url = format!("{}/api/sources/resync-all", base_url);
    let body = serde_json::json!({ "sync": sync, "force": force });

    let response = client
        .post(&url)
        .json(&body)
        .send()
        .await
        .context("Failed to send resync-all request")?;

    if response.status().is_success() {
        let receipt: serde_json::Value = response.json().await?;
        let total = receipt.get("total").and_then(|v| v.as_u64()).unwrap_or(0);

        println!("Resync dispatched for {} source(s):", total);
        println!("  {:<30} {:<22} {:<8} {:<10}", "SLUG", "JOB", "MODE", "STATUS");

        let mut failures = 0;
        if let Some(receipts) = receipt.get("receipts").and_then(|v| v.as_array()) {
            for entry in receipts {
                let slug = entry.get("slug").and_then(|v| v.as_str()).unwrap_or("-");
                let job_id = entry.get("job_id").and_then(|v| v.as_str()).unwrap_or("-");
                let mode = entry.get("mode").and_then(|v| v.as_str()).unwrap_or("-");
                let status = entry.get("status").and_then(|v| v.as_str()).unwrap_or("-");

                println!("  {:<30} {:<22} {:<8} {:<10}", slug, job_id, mode, status);

                if status == "failure" {
                    failures += 1;
                }
            }
        }

        if failures > 0 {
            eprintln!("{} inline refresh(es) failed", failures);
            std::process::exit(1);
        }
    } else {
        let status = response.status();
        let text = response.text().await?;
        eprintln!("Resync-all rejected: {} - {}", status, text);
        std::process::exit(1);
    }

    Ok(())
}

async fn list_sources(
    client: &Client,
    base_url: &str,
    kind: Option<&str>,
    status: Option<&str>,
    json_only: bool,
) -> Result<()> {
    let mut request = client.get(format!("{}/api/sources", base_url));
    if let Some(kind) = kind {
        request = request.query(&[("kind", kind)]);
    }
    if let Some(status) = status {
        request = request.query(&[("status", status)]);
    }

    let response = request.send().await.context("Failed to send list request")?;

    if response.status().is_success() {
        let result: serde_json::Value = response.json().await?;
        if json_only {
            println!("{}", serde_json::to_string(&result)?);
            return Ok(());
        }

        let sources = result.as_array().cloned().unwrap_or_default();
        println!(
            "  {:<22} {:<28} {:<9} {:<16} {:<9} {:<19}",
            "ID", "SLUG", "KIND", "GEOMETRY", "STATUS", "LAST REFRESH"
        );
        for source in &sources {
            println!(
                "  {:<22} {:<28} {:<9} {:<16} {:<9} {:<19}",
                source.get("id").and_then(|v| v.as_str()).unwrap_or("-"),
                source.get("slug").and_then(|v| v.as_str()).unwrap_or("-"),
                source.get("kind").and_then(|v| v.as_str()).unwrap_or("-"),
                source.get("geom_type").and_then(|v| v.as_str()).unwrap_or("-"),
                source.get("status").and_then(|v| v.as_str()).unwrap_or("-"),
                format_timestamp(source.get("last_refresh_at")),
            );
        }
        println!("\n{} source(s)", sources.len());
    } else {
        let status = response.status();
        let text = response.text().await?;
        eprintln!("Failed to list sources: {} - {}", status, text);
        std::process::exit(1);
    }

    Ok(())
}

async fn show_source(client: &Client, base_url: &str, reference: &str) -> Result<()> {
    let url = format!("{}/api/sources/{}", base_url, reference);
    let response = client
        .get(&url)
        .send()
        .await
        .context("Failed to send show request")?;

    if response.status().is_success() {
        let result: serde_json::Value = response.json().await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let status = response.status();
        let text = response.text().await?;
        eprintln!("Failed to get source: {} - {}", status, text);
        std::process::exit(1);
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn create_source(
    client: &Client,
    base_url: &str,
    name: &str,
    slug: Option<&str>,
    kind: &str,
    geom_type: &str,
    uri: &str,
    settings: Option<&str>,
    refresh_interval: Option<i32>,
) -> Result<()> {
    let settings: serde_json::Value = match settings {
        Some(raw) => serde_json::from_str(raw).context("Failed to parse --settings JSON")?,
        None => serde_json::json!({}),
    };

    let mut body = serde_json::json!({
        "name": name,
        "kind": kind,
        "geom_type": geom_type,
        "uri": uri,
        "settings": settings,
    });
    if let Some(slug) = slug {
        body["slug"] = serde_json::json!(slug);
    }
    if let Some(minutes) = refresh_interval {
        body["refresh_interval_minutes"] = serde_json::json!(minutes);
    }

    let response = client
        .post(format!("{}/api/sources", base_url))
        .json(&body)
        .send()
        .await
        .context("Failed to send create request")?;

    if response.status().is_success() {
        let result: serde_json::Value = response.json().await?;
        println!("Source created:");
        println!("{}", serde_json::to_string_pretty(&result)?);

        if let Some(slug) = result.get("slug").and_then(|v| v.as_str()) {
            println!("\nTo refresh it:");
            println!("  geosync resync {}", slug);
        }
    } else {
        let status = response.status();
        let text = response.text().await?;
        eprintln!("Failed to create source: {} - {}", status, text);
        std::process::exit(1);
    }

    Ok(())
}

async fn delete_source(client: &Client, base_url: &str, reference: &str) -> Result<()> {
    let url = format!("{}/api/sources/{}", base_url, reference);
    let response = client
        .delete(&url)
        .send()
        .await
        .context("Failed to send delete request")?;

    if response.status().is_success() {
        let result: serde_json::Value = response.json().await?;
        let slug = result
            .get("slug")
            .and_then(|v| v.as_str())
            .unwrap_or(reference);
        println!("Source deleted: {}", slug);
    } else {
        let status = response.status();
        let text = response.text().await?;
        eprintln!("Failed to delete source: {} - {}", status, text);
        std::process::exit(1);
    }

    Ok(())
}

async fn list_jobs(
    client: &Client,
    base_url: &str,
    reference: &str,
    limit: i64,
    json_only: bool,
) -> Result<()> {
    // Resolve the id-or-slug reference to a numeric source id first
    let source_url = format!("{}/api/sources/{}", base_url, reference);
    let response = client
        .get(&source_url)
        .send()
        .await
        .context("Failed to send source lookup request")?;

    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await?;
        eprintln!("Failed to resolve source: {} - {}", status, text);
        std::process::exit(1);
    }

    let source: serde_json::Value = response.json().await?;
    let source_id = source
        .get("id")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let slug = source
        .get("slug")
        .and_then(|v| v.as_str())
        .unwrap_or(reference)
        .to_string();

    let response = client
        .get(format!("{}/api/jobs", base_url))
        .query(&[
            ("source_id", source_id.as_str()),
            ("limit", &limit.to_string()),
        ])
        .send()
        .await
        .context("Failed to send jobs request")?;

    if response.status().is_success() {
        let result: serde_json::Value = response.json().await?;
        if json_only {
            println!("{}", serde_json::to_string(&result)?);
            return Ok(());
        }

        let jobs = result.as_array().cloned().unwrap_or_default();
        println!("Refresh jobs for {}:", slug);
        println!(
            "  {:<22} {:<9} {:<18} {:>8} {:>7}  {:<19} MESSAGE",
            "JOB", "STATUS", "WORKER", "FEATURES", "ERRORS", "STARTED"
        );
        for job in &jobs {
            println!(
                "  {:<22} {:<9} {:<18} {:>8} {:>7}  {:<19} {}",
                job.get("id").and_then(|v| v.as_str()).unwrap_or("-"),
                job.get("status").and_then(|v| v.as_str()).unwrap_or("-"),
                job.get("worker_id").and_then(|v| v.as_str()).unwrap_or("-"),
                job.get("feature_count")
                    .and_then(|v| v.as_i64())
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                job.get("error_count")
                    .and_then(|v| v.as_i64())
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                format_timestamp(job.get("started_at")),
                job.get("message").and_then(|v| v.as_str()).unwrap_or(""),
            );
        }
        println!("\n{} job(s)", jobs.len());
    } else {
        let status = response.status();
        let text = response.text().await?;
        eprintln!("Failed to list jobs: {} - {}", status, text);
        std::process::exit(1);
    }

    Ok(())
}

async fn get_status(client: &Client, base_url: &str, json_only: bool) -> Result<()> {
    let url = format!("{}/api/health", base_url);
    let response = client
        .get(&url)
        .send()
        .await
        .context("Failed to send health request")?;

    let status = response.status();
    let result: serde_json::Value = response.json().await?;

    if json_only {
        println!("{}", serde_json::to_string(&result)?);
    } else {
        println!("Server health ({}):", base_url);
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    if !status.is_success() {
        std::process::exit(1);
    }

    Ok(())
}

async fn db_init(client: &Client, base_url: &str) -> Result<()> {
    println!("Initializing GeoSync database schema...");

    let url = format!("{}/api/db/init", base_url);
    let response = client
        .post(&url)
        .send()
        .await
        .context("Failed to send database init request")?;

    if response.status().is_success() {
        let result: serde_json::Value = response.json().await?;
        println!("Database initialized successfully:");
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let status = response.status();
        let text = response.text().await?;
        eprintln!("Failed to initialize database: {} - {}", status, text);
        return Err(anyhow::anyhow!("Database initialization failed"));
    }

    Ok(())
}

async fn db_validate(client: &Client, base_url: &str) -> Result<()> {
    println!("Validating GeoSync database schema...");

    let url = format!("{}/api/db/validate", base_url);
    let response = client
        .get(&url)
        .send()
        .await
        .context("Failed to send database validate request")?;

    if response.status().is_success() {
        let result: serde_json::Value = response.json().await?;
        println!("Database validation result:");
        println!("{}", serde_json::to_string_pretty(&result)?);

        if result.get("valid").and_then(|v| v.as_bool()) == Some(false) {
            return Err(anyhow::anyhow!("Database schema is not valid"));
        }
    } else {
        let status = response.status();
        let text = response.text().await?;
        eprintln!("Failed to validate database: {} - {}", status, text);
        return Err(anyhow::anyhow!("Database validation failed"));
    }

    Ok(())
}

fn format_timestamp(value: Option<&serde_json::Value>) -> String {
    value
        .and_then(|v| v.as_str())
        .map(|s| {
            chrono::DateTime::parse_from_rfc3339(s)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|_| s.to_string())
        })
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        let value = serde_json::json!("2024-05-01T12:30:00Z");
        assert_eq!(format_timestamp(Some(&value)), "2024-05-01 12:30:00");

        assert_eq!(format_timestamp(None), "-");

        let null = serde_json::Value::Null;
        assert_eq!(format_timestamp(Some(&null)), "-");
    }
}
