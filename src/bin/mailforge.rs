//! CLI binary for mailforge.
//!
//! A thin shim over the library crate that maps CLI flags and a TOML config
//! file to `RunConfig` and prints a run summary.

use anyhow::{Context, Result};
use clap::Parser;
use mailforge::{generate_to_file, RunConfig, SocialEntry};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── Config file ──────────────────────────────────────────────────────────────

/// On-disk project configuration: the header-image mapping and social list.
///
/// ```toml
/// [header_images]
/// logo        = "./assets/header_images/1.png"
/// chairperson = "./assets/header_images/2.png"
///
/// [[social]]
/// link  = "https://example.social/club"
/// image = "./assets/social/icon.png"
/// ```
#[derive(Debug, Default, serde::Deserialize)]
struct FileConfig {
    #[serde(default)]
    header_images: HashMap<String, String>,
    #[serde(default)]
    social: Vec<SocialEntry>,
}

fn load_file_config(path: &PathBuf) -> Result<FileConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config file '{}'", path.display()))?;
    toml::from_str(&raw).with_context(|| format!("cannot parse config file '{}'", path.display()))
}

// ── CLI ──────────────────────────────────────────────────────────────────────

/// Assemble a templated HTML newsletter from an exported document bundle.
#[derive(Parser, Debug)]
#[command(name = "mailforge", version, about)]
struct Cli {
    /// Extracted bundle directory (one .html export + its images)
    bundle_dir: PathBuf,

    /// TOML file with the header-image mapping and social list
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Digest → URL cache file
    #[arg(long, default_value = "image_cache.json")]
    cache: PathBuf,

    /// Directory for the generated newsletter
    #[arg(long, default_value = "emails")]
    out_dir: PathBuf,

    /// Concurrent uploads (1–8)
    #[arg(long, default_value_t = 3)]
    concurrency: usize,

    /// Per-request network timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Image host account email
    #[arg(long, env = "POSTIMAGES_EMAIL", hide_env_values = true)]
    email: Option<String>,

    /// Image host account password
    #[arg(long, env = "POSTIMAGES_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Verbose logging (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "mailforge=info",
        1 => "mailforge=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let file_config = match &cli.config {
        Some(path) => load_file_config(path)?,
        None => FileConfig::default(),
    };

    let mut builder = RunConfig::builder()
        .header_images(file_config.header_images)
        .social(file_config.social)
        .cache_path(&cli.cache)
        .output_dir(&cli.out_dir)
        .concurrency(cli.concurrency)
        .request_timeout_secs(cli.timeout_secs);

    if let (Some(email), Some(password)) = (&cli.email, &cli.password) {
        builder = builder.credentials(email.clone(), password.clone());
    } else {
        eprintln!(
            "{} no credentials; set POSTIMAGES_EMAIL / POSTIMAGES_PASSWORD; \
             only fully cached images will resolve",
            yellow("warning:")
        );
    }

    // Ctrl-C raises the cancel flag; the run stops between uploads.
    let cancel = Arc::new(AtomicBool::new(false));
    builder = builder.cancel_flag(Arc::clone(&cancel));
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n{} finishing in-flight uploads, then stopping…", yellow("cancelled:"));
            cancel.store(true, Ordering::Relaxed);
        }
    });

    let config = builder.build()?;

    match generate_to_file(&cli.bundle_dir, &config).await {
        Ok((path, stats)) => {
            println!();
            println!("{} {}", green("✓"), bold(&format!("wrote {}", path.display())));
            println!(
                "  sections: {}/{} rendered",
                stats.sections_rendered, stats.sections_total
            );
            println!(
                "  images:   {} total: {} cached, {} uploaded, {}",
                stats.images_total,
                stats.images_cached,
                stats.images_uploaded,
                if stats.images_failed > 0 {
                    red(&format!("{} failed", stats.images_failed))
                } else {
                    "0 failed".to_string()
                }
            );
            println!("  duration: {}ms", stats.duration_ms);
            if stats.sections_total <= 1 {
                eprintln!(
                    "{} only {} section(s) found; check the export format",
                    yellow("warning:"),
                    stats.sections_total
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {e}", red("error:"));
            std::process::exit(1);
        }
    }
}
