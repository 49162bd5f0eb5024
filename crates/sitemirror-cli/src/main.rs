//! SiteMirror CLI - Command-line interface for mirroring a web page

use clap::{Parser, Subcommand, ValueEnum};
use sitemirror::{client::DEFAULT_OUTPUT_ROOT, CollisionPolicy, Mirror, MirrorResult};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Output format for the mirror summary
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Markdown with YAML frontmatter
    #[default]
    Md,
    /// JSON format
    Json,
}

/// SiteMirror - save a web page and its assets for offline use
#[derive(Parser, Debug)]
#[command(name = "sitemirror")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mirror a page into a local directory
    Mirror {
        /// URL of the page to mirror
        url: String,

        /// Output directory
        #[arg(long, short, default_value = DEFAULT_OUTPUT_ROOT)]
        dir: PathBuf,

        /// Summary format
        #[arg(long, short, default_value = "md")]
        output: OutputFormat,

        /// Custom User-Agent
        #[arg(long)]
        user_agent: Option<String>,

        /// Maximum concurrent downloads (0 = unbounded)
        #[arg(long, short)]
        concurrency: Option<usize>,

        /// Per-request timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Keep stylesheets and scripts as served
        #[arg(long)]
        no_format: bool,

        /// Let later assets replace earlier ones with the same file name
        #[arg(long)]
        overwrite: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Some(Commands::Mirror {
            url,
            dir,
            output,
            user_agent,
            concurrency,
            timeout,
            no_format,
            overwrite,
        }) => {
            let mut builder = Mirror::builder().format_assets(!no_format);
            if let Some(ua) = user_agent {
                builder = builder.user_agent(ua);
            }
            if let Some(limit) = concurrency {
                builder = builder.max_concurrency(limit);
            }
            if let Some(secs) = timeout {
                builder = builder.request_timeout(Duration::from_secs(secs));
            }
            if overwrite {
                builder = builder.collision_policy(CollisionPolicy::Overwrite);
            }

            let engine = builder.build().unwrap_or_else(|e| {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            });
            run_mirror(&engine, &url, dir, output).await;
        }
        None => {
            eprintln!("Usage: sitemirror mirror <URL> [--dir <DIR>]");
            eprintln!("   or: sitemirror --help");
            std::process::exit(1);
        }
    }
}

async fn run_mirror(engine: &Mirror, url: &str, dir: PathBuf, output: OutputFormat) {
    let result = engine
        .run_with_status(url, &dir, |progress| {
            if progress.message.is_some() {
                debug!(
                    settled = progress.settled,
                    total = progress.total,
                    url = progress.message.as_deref().unwrap_or_default(),
                    "Settled"
                );
            } else {
                info!(status = %progress.status, "Job status");
            }
        })
        .await;

    match result {
        Ok(result) => match output {
            OutputFormat::Md => writeln_safe(&format_summary(&result)),
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(&result).unwrap_or_else(|e| {
                    eprintln!("Error serializing result: {}", e);
                    std::process::exit(1);
                });
                writeln_safe(&json);
            }
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Format result as a markdown summary with YAML frontmatter
fn format_summary(result: &MirrorResult) -> String {
    let mut output = String::new();

    output.push_str("---\n");
    output.push_str(&format!("url: {}\n", result.source_url));
    output.push_str(&format!("output: {}\n", result.output_root.display()));
    output.push_str(&format!("index: {}\n", result.index_path.display()));
    output.push_str(&format!("succeeded: {}\n", result.succeeded.len()));
    output.push_str(&format!("failed: {}\n", result.failed.len()));
    output.push_str("---\n");

    if !result.succeeded.is_empty() {
        output.push_str("\n## Mirrored\n\n");
        for reference in &result.succeeded {
            output.push_str(&format!(
                "- `{}` <- {}\n",
                reference.destination_path, reference.resolved_url
            ));
        }
    }

    if !result.failed.is_empty() {
        output.push_str("\n## Failed\n\n");
        for failed in &result.failed {
            output.push_str(&format!(
                "- {} ({}): {}\n",
                failed.reference.resolved_url, failed.reference.kind, failed.reason
            ));
        }
    }

    output
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}
