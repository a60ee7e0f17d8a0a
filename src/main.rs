use anyhow::{Context, Result};
use clap::builder::{PossibleValuesParser, TypedValueParser};
use clap::Parser;
use reqwest::redirect::Policy;
use std::path::PathBuf;
use std::time::Duration;

use podfilter::{apply_private_override, Config, FeedSynchronizer, SyncOutcome};

const USER_AGENT: &str = concat!("podfilter/", env!("CARGO_PKG_VERSION"));

#[derive(Parser, Debug)]
#[command(name = "podfilter", version, about = "Filter podcast feeds into private RSS files")]
struct Args {
    /// Path to the YAML (or .toml) config file
    #[arg(short, long, value_name = "FILE", default_value = "feeds.yaml")]
    config: PathBuf,

    /// Always fetch the full feed, ignoring output modification times
    #[arg(short = 'n', long)]
    no_check_modified: bool,

    /// Force every output to be private (true) or public (false)
    #[arg(
        short = 'p',
        long,
        value_name = "BOOL",
        value_parser = PossibleValuesParser::new(["true", "false"]).map(|s| s == "true")
    )]
    private: Option<bool>,
}

/// Follows up to 5 redirects, refusing loops.
fn create_redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 5 {
            return attempt.error("Too many redirects (max 5)");
        }

        let url = attempt.url();
        if attempt.previous().iter().any(|prev| prev.as_str() == url.as_str()) {
            return attempt.error("Redirect loop detected");
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );

        attempt.follow()
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config '{}'", args.config.display()))?;
    apply_private_override(&mut config.feeds, args.private);

    if config.feeds.is_empty() {
        tracing::warn!(path = %args.config.display(), "No feeds configured");
        return Ok(());
    }

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .redirect(create_redirect_policy())
        .pool_idle_timeout(Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")?;
    let synchronizer = FeedSynchronizer::new(client).check_modified(!args.no_check_modified);

    let mut failed = 0usize;
    for dest in &config.feeds {
        match synchronizer.sync(dest).await {
            Ok(SyncOutcome::Written { added, .. }) if added > 0 => {
                println!("{}: added {} new item(s)", dest.output.display(), added);
            }
            Ok(_) => {}
            Err(e) => {
                failed += 1;
                tracing::error!(
                    url = %dest.url,
                    output = %dest.output.display(),
                    error = %e,
                    "Feed synchronization failed"
                );
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} feed(s) failed", failed, config.feeds.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_short_and_long_flags() {
        let args = Args::try_parse_from(["podfilter", "-p", "false"]).unwrap();
        assert_eq!(args.private, Some(false));

        let args = Args::try_parse_from(["podfilter", "--private", "true"]).unwrap();
        assert_eq!(args.private, Some(true));
    }

    #[test]
    fn test_private_rejects_other_values() {
        assert!(Args::try_parse_from(["podfilter", "-p", "maybe"]).is_err());
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["podfilter"]).unwrap();
        assert_eq!(args.config, PathBuf::from("feeds.yaml"));
        assert!(!args.no_check_modified);
        assert_eq!(args.private, None);
    }
}
