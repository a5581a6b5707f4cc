// src/bin/research_demo.rs
// Run one research request from the command line:
//   cargo run --bin research_demo -- "Acme Corp" acme.com
// Prints the human summary, then the full result as JSON.

use anyhow::{bail, Context, Result};
use tracing_subscriber::{fmt, EnvFilter};

use account_research::{get_summary, Aggregator, ResearchConfig, ResearchRequest};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let _ = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("research=info")),
        )
        .compact()
        .try_init();

    let mut args = std::env::args().skip(1);
    let Some(company) = args.next() else {
        bail!("usage: research_demo <company name> [domain]");
    };
    let mut request = ResearchRequest::new(company);
    if let Some(domain) = args.next() {
        request = request.with_domain(domain);
    }

    let cfg = ResearchConfig::load_default()?;
    let aggregator = Aggregator::from_config(&cfg)?;
    let result = aggregator
        .research(request)
        .await
        .context("research failed")?;

    println!("{}\n", get_summary(&result));
    println!(
        "{}",
        serde_json::to_string_pretty(&result).context("serializing result")?
    );
    Ok(())
}
