//! CLI for `apidocs`.
//!
//! # Subcommands
//!
//! ```text
//! # Render the whole document (local file or http(s) URL)
//! apidocs render --spec openapi.json --config apidocs.yaml --format html -o docs.html
//! apidocs render --spec http://localhost:8081/openapi.json
//!
//! # Inspect one component
//! apidocs fields  --spec openapi.json --schema Order --allow data.items[].id,code
//! apidocs example --spec openapi.json --schema Order
//!
//! # List operations in declaration order
//! apidocs paths --spec openapi.json
//!
//! # Serve /docs and /docs.md
//! apidocs serve --spec openapi.json --addr 127.0.0.1:8080
//! ```
//!
//! Logging goes to stderr; `-v` raises the level, `RUST_LOG` overrides it.

#![forbid(unsafe_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use apidocs::engine::{
    build_example_ref, example_json, filter_example, filter_fields, flatten_decorated,
    flatten_ref, AllowedPathSet, Document, Envelope, SchemaNode, SCHEMA_REF_PREFIX,
};
use apidocs::operation::{operation, present_methods};
use apidocs::server::{router, AppState};
use apidocs::{build_page, render_markdown, Error, HtmlRenderer, LoadedSpec, ProjectConfig};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// Render `OpenAPI` JSON documents as HTML and Markdown reference pages.
#[derive(Parser)]
#[command(name = "apidocs", version, about)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render the full documentation page.
    Render(RenderArgs),

    /// Print the flattened field table of one component schema.
    Fields(FieldsArgs),

    /// Print the example value of one component schema.
    Example(ExampleArgs),

    /// List documented operations in declaration order.
    Paths(SpecArgs),

    /// Serve the HTML page and Markdown export over HTTP.
    Serve(ServeArgs),
}

#[derive(Parser)]
struct SpecArgs {
    /// Path or `http(s)` URL of the `OpenAPI` JSON document.
    #[arg(short, long)]
    spec: String,
}

#[derive(Parser)]
struct ConfigArgs {
    /// Path to a project config YAML file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Page title. Overrides `title` from the config file.
    #[arg(long)]
    title: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Markdown,
    Html,
}

#[derive(Parser)]
struct RenderArgs {
    #[command(flatten)]
    spec: SpecArgs,

    #[command(flatten)]
    config: ConfigArgs,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Markdown)]
    format: Format,

    /// Write to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Parser)]
struct FieldsArgs {
    #[command(flatten)]
    spec: SpecArgs,

    /// Component name or `#/components/schemas/...` reference.
    #[arg(long)]
    schema: String,

    /// Path prefix for every row.
    #[arg(long, default_value = "")]
    prefix: String,

    /// Comma-separated allow-list patterns.
    #[arg(long, value_delimiter = ',')]
    allow: Option<Vec<String>>,

    /// Keep component names in type labels (`object(Order)`).
    #[arg(long)]
    decorated: bool,

    /// Print JSON instead of a Markdown table.
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct ExampleArgs {
    #[command(flatten)]
    spec: SpecArgs,

    /// Component name or `#/components/schemas/...` reference.
    #[arg(long)]
    schema: String,

    /// Comma-separated allow-list patterns.
    #[arg(long, value_delimiter = ',')]
    allow: Option<Vec<String>>,
}

#[derive(Parser)]
struct ServeArgs {
    /// Path or URL of the `OpenAPI` JSON document served by default.
    #[arg(short, long)]
    spec: Option<String>,

    #[command(flatten)]
    config: ConfigArgs,

    /// Listen address.
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: SocketAddr,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let client = reqwest::Client::new();

    runtime.block_on(async move {
        match cli.command {
            Command::Render(args) => run_render(&client, &args).await,
            Command::Fields(args) => run_fields(&client, &args).await,
            Command::Example(args) => run_example(&client, &args).await,
            Command::Paths(args) => run_paths(&client, &args).await,
            Command::Serve(args) => run_serve(&client, args).await,
        }
    })
}

/// Install the stderr subscriber; `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn load_spec(client: &reqwest::Client, src: &str) -> anyhow::Result<LoadedSpec> {
    tracing::info!(src, "loading document");
    apidocs::load_async(client, src)
        .await
        .with_context(|| format!("Failed to load spec: {src}"))
}

/// Load project config (if provided), then apply CLI overrides.
fn load_config(args: &ConfigArgs) -> anyhow::Result<ProjectConfig> {
    let config = match &args.config {
        Some(path) => {
            tracing::info!(config = %path.display(), "loading config");
            ProjectConfig::load(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?
        }
        None => ProjectConfig::default(),
    };
    Ok(match &args.title {
        Some(title) => config.with_title(title),
        None => config,
    })
}

async fn run_render(client: &reqwest::Client, args: &RenderArgs) -> anyhow::Result<()> {
    let spec = load_spec(client, &args.spec.spec).await?;
    let config = load_config(&args.config)?;

    let page = build_page(&spec, &config);
    let output = match args.format {
        Format::Markdown => render_markdown(&page),
        Format::Html => HtmlRenderer::with_template_dir(config.template_dir.as_deref())
            .and_then(|renderer| renderer.render(&page))
            .context("Failed to render HTML")?,
    };
    tracing::info!(endpoints = page.endpoints().count(), "rendered");

    match &args.output {
        Some(path) => {
            fs::write(path, output)
                .with_context(|| format!("Failed to write output: {}", path.display()))?;
            eprintln!("Wrote documentation to {}", path.display());
        }
        None => print!("{output}"),
    }
    Ok(())
}

/// Fail early with a clear message when the component does not exist.
fn ensure_schema(doc: &Document, schema: &str) -> anyhow::Result<()> {
    let name = schema.rsplit('/').next().unwrap_or(schema);
    if doc.schema(name).is_none() {
        return Err(Error::SchemaNotFound {
            name: schema.to_string(),
        }
        .into());
    }
    Ok(())
}

async fn run_fields(client: &reqwest::Client, args: &FieldsArgs) -> anyhow::Result<()> {
    let spec = load_spec(client, &args.spec.spec).await?;
    let doc = &spec.document;
    ensure_schema(doc, &args.schema)?;

    let fields = if args.decorated {
        let node = SchemaNode::from_value(&serde_json::json!({ "$ref": qualified_ref(&args.schema) }));
        flatten_decorated(doc, &node, &args.prefix)
    } else {
        flatten_ref(doc, &args.schema, &args.prefix)
    };
    let allowed = args.allow.as_ref().map(AllowedPathSet::new);
    let fields = filter_fields(fields, allowed.as_ref(), &Envelope::default());

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&fields).context("Failed to serialize fields")?
        );
        return Ok(());
    }
    println!("| Name | Required | Type | Description |\n|---|---|---|---|");
    for field in &fields {
        println!(
            "| {} | {} | {} | {} |",
            field.path,
            if field.required { "Yes" } else { "No" },
            field.ty,
            field.description
        );
    }
    Ok(())
}

async fn run_example(client: &reqwest::Client, args: &ExampleArgs) -> anyhow::Result<()> {
    let spec = load_spec(client, &args.spec.spec).await?;
    let doc = &spec.document;
    ensure_schema(doc, &args.schema)?;

    let allowed = args.allow.as_ref().map(AllowedPathSet::new);
    let example = filter_example(
        build_example_ref(doc, &args.schema),
        allowed.as_ref(),
        &Envelope::default(),
    );
    println!("{}", example_json(&example));
    Ok(())
}

async fn run_paths(client: &reqwest::Client, args: &SpecArgs) -> anyhow::Result<()> {
    let spec = load_spec(client, &args.spec).await?;
    let Some(paths) = spec.document.paths() else {
        eprintln!("Document has no paths");
        return Ok(());
    };
    for path in spec.ordered_paths() {
        let Some(item) = paths.get(&path) else {
            continue;
        };
        for method in present_methods(item) {
            let summary = operation(item, &method)
                .and_then(|op| op.get("summary"))
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default();
            println!("{:<7} {path}  {summary}", method.to_uppercase());
        }
    }
    Ok(())
}

async fn run_serve(client: &reqwest::Client, args: ServeArgs) -> anyhow::Result<()> {
    let spec = match args.spec.as_deref() {
        Some(src) => Some(load_spec(client, src).await?),
        None => None,
    };
    let config = load_config(&args.config)?;
    let routes = (config.route_docs.clone(), config.route_markdown.clone());
    let app = router(AppState::new(spec, config).context("Failed to load templates")?);

    let listener = tokio::net::TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("Failed to bind {}", args.addr))?;
    eprintln!(
        "Serving http://{}{} and http://{}{}",
        args.addr, routes.0, args.addr, routes.1
    );
    axum::serve(listener, app).await.context("Server error")
}

/// `Order` → `#/components/schemas/Order`; full references pass through.
fn qualified_ref(schema: &str) -> String {
    if schema.starts_with('#') {
        schema.to_string()
    } else {
        format!("{SCHEMA_REF_PREFIX}{schema}")
    }
}
