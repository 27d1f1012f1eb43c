use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use proposal_core::{
    ConfigLoader, ProposalOutcome, TelemetryOptions, Toolkit, extract_links, generate_proposal,
    init_telemetry, persist_trace, render_markdown,
};
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "proposal-cli",
    version,
    about = "Research a company and draft an AI/GenAI use-case proposal"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the four-stage pipeline for one company.
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Company to research.
    #[arg(long)]
    company: String,

    /// Industry the company operates in.
    #[arg(long)]
    industry: String,

    /// Path to a TOML configuration file (defaults to `PROPOSAL_CONFIG`, then `proposal.toml`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory to write `proposal.md` and `resources.md` into.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Directory to persist the run trace as JSON.
    #[arg(long)]
    trace_dir: Option<PathBuf>,

    /// Print the run trace after the proposal.
    #[arg(long, default_value_t = false)]
    explain: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let rt = Runtime::new()?;
    rt.block_on(async move {
        match cli.command {
            Command::Generate(args) => generate_command(args).await?,
        }
        Ok::<(), anyhow::Error>(())
    })?;

    Ok(())
}

async fn generate_command(args: GenerateArgs) -> Result<()> {
    let config = ConfigLoader::load(args.config.clone())?;
    init_telemetry(
        TelemetryOptions::default()
            .with_default_filter(config.logging.level.clone())
            .without_target(),
    )?;

    let toolkit = Toolkit::from_config(&config)?;
    info!(company = %args.company, industry = %args.industry, "starting proposal run");

    let outcome = generate_proposal(&toolkit, &args.company, &args.industry).await?;

    println!("# Generated Proposal\n\n{}\n", outcome.proposal);
    println!("# Resources\n\n{}\n", outcome.resources);

    let links = extract_links(&outcome.resources);
    if !links.is_empty() {
        println!("# Resource Links\n");
        for link in &links {
            println!("- {link}");
        }
        println!();
    }

    if let Some(dir) = args.out.as_deref() {
        write_outputs(dir, &outcome).await?;
    }

    if let Some(dir) = args.trace_dir.as_deref() {
        let path = persist_trace(dir, &outcome.run_id, &outcome.trace_events)?;
        info!(path = %path.display(), "trace persisted");
    }

    if args.explain {
        println!("{}", render_markdown(&outcome.trace_events));
    }

    Ok(())
}

async fn write_outputs(dir: &Path, outcome: &ProposalOutcome) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create output directory {}", dir.display()))?;

    for (name, text) in [
        ("proposal.md", &outcome.proposal),
        ("resources.md", &outcome.resources),
    ] {
        let path = dir.join(name);
        tokio::fs::write(&path, text)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "output written");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_requires_company_and_industry() {
        assert!(Cli::try_parse_from(["proposal-cli", "generate", "--company", "Acme Corp"]).is_err());

        let cli = Cli::try_parse_from([
            "proposal-cli",
            "generate",
            "--company",
            "Acme Corp",
            "--industry",
            "Retail",
            "--out",
            "out",
        ])
        .unwrap();

        let Command::Generate(args) = cli.command;
        assert_eq!(args.company, "Acme Corp");
        assert_eq!(args.industry, "Retail");
        assert_eq!(args.out, Some(PathBuf::from("out")));
        assert!(!args.explain);
    }
}
