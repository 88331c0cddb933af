use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Context;
use clap::Parser;
use evado_core::{
    ArticleContent, PipelineConfig, Readability, ReadabilityOptions, extract_article,
};
use owo_colors::OwoColorize;

mod echo;
use echo::{print_banner, print_info, print_step, print_success, print_warning};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for extracted content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Markdown,
    Html,
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "html" => Ok(Self::Html),
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid format: {}. Valid options: markdown, html, text, json", s)),
        }
    }
}

/// Extract readable article content from web pages, past paywalls and bot blocks
#[derive(Parser, Debug)]
#[command(name = "evado")]
#[command(author = "Evado Contributors")]
#[command(version = VERSION)]
#[command(about = "Extract article content from web pages", long_about = None)]
struct Args {
    /// URL to fetch, local HTML file, or "-" for stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format (markdown, html, text, json)
    #[arg(short, long, default_value = "markdown", value_name = "FORMAT")]
    format: OutputFormat,

    /// Base URL for resolving relative links in file/stdin input
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Disable the bypass chain for blocked pages
    #[arg(long)]
    no_bypass: bool,

    /// Skip the readability pre-check and force extraction fallbacks
    #[arg(long)]
    force: bool,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn install_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("evado_core=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.verbose {
        print_banner();
        install_tracing();
    }

    let config = PipelineConfig::builder()
        .enable_bypass(!args.no_bypass)
        .timeout(args.timeout)
        .force(args.force)
        .build();

    let article = if args.input.starts_with("http://") || args.input.starts_with("https://") {
        if args.verbose {
            print_step(1, 3, &format!("Fetching {}", args.input.bright_white().underline()));
        }
        extract_article(&args.input, &config)
            .await
            .context("Failed to extract article")?
    } else {
        let html = if args.input == "-" {
            if args.verbose {
                print_step(1, 3, "Reading from stdin");
            }
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read from stdin")?;
            buffer
        } else {
            if args.verbose {
                print_step(1, 3, &format!("Reading {}", args.input.bright_white()));
            }
            fs::read_to_string(&args.input)
                .with_context(|| format!("Failed to read file: {}", args.input))?
        };

        let base_url = args.url.as_deref().unwrap_or("http://localhost/");
        let options = ReadabilityOptions {
            skip_pre_check: args.force,
            force_parse: true,
            ..Default::default()
        };
        let mut local = Readability::new()
            .parse_article(&html, base_url, &options)
            .context("Failed to extract article")?;
        if args.url.is_none() {
            local.source_url = None;
        }
        local
    };

    if args.verbose {
        print_step(2, 3, "Extraction finished");
        if let Some(title) = &article.title {
            eprintln!("  {} {}", "Title:".dimmed(), title.bright_white());
        }
        eprintln!("  {} {}", "Words:".dimmed(), article.word_count.to_string().bright_white());
        if let Some(annotation) = article.archive_annotation() {
            print_warning(&annotation);
        } else {
            print_info("Fetched directly from the origin");
        }
    }

    let output = render(&article, args.format)?;

    if args.verbose {
        print_step(3, 3, "Writing output");
    }

    match args.output {
        Some(path) => {
            fs::write(&path, output)
                .with_context(|| format!("Failed to write to file: {}", path.display()))?;
            print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => {
            print!("{}", output);
        }
    }

    Ok(())
}

fn render(article: &ArticleContent, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Markdown => match article.to_markdown() {
            Ok(result) => Ok(result.markdown),
            Err(e) => {
                // partial output beats none: fall back to the raw HTML
                print_warning(&format!("Markdown conversion failed ({e}), emitting HTML"));
                Ok(article.content_html.clone())
            }
        },
        OutputFormat::Html => Ok(article.content_html.clone()),
        OutputFormat::Text => Ok(article.text_content.clone()),
        OutputFormat::Json => {
            let value = article.to_json().context("Failed to serialize article")?;
            serde_json::to_string_pretty(&value).context("Failed to serialize article")
        }
    }
}
