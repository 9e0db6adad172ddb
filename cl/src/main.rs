use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::info;

use cwb_cl::cli::{Cli, Command};
use cwb_cl::{Corpus, Registry};

fn setup_logging(level: Option<&str>) -> Result<()> {
    let level: tracing::Level = level.unwrap_or("warn").parse().context("Invalid log level")?;
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_level.as_deref()).context("Failed to setup logging")?;

    let registry_dir = cli.registry_dir();
    info!(?registry_dir, "cwb-cl starting");

    match cli.command {
        Command::List => {
            let registry = Registry::open(&registry_dir)?;
            let ids = registry.list()?;
            if ids.is_empty() {
                println!("No corpora found in {}", registry_dir.display());
            } else {
                for id in ids {
                    println!("{}", id);
                }
            }
        }
        Command::Info { corpus, json } => {
            let corpus = Corpus::open(&corpus, &registry_dir).context(format!("Failed to open corpus {}", corpus))?;
            let entry = corpus.entry();
            let size = corpus.size()?;
            if json {
                let value = serde_json::json!({ "entry": entry, "size": size });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!("Corpus: {}", entry.id.cyan());
                if let Some(name) = &entry.name {
                    println!("  Name: {}", name);
                }
                println!("  Home: {}", entry.home.display());
                println!("  Charset: {}", entry.charset());
                println!("  Size: {} tokens", size);
                let positional: Vec<_> = entry.positional.iter().map(|a| a.name.as_str()).collect();
                let structural: Vec<_> = entry.structural.iter().map(|a| a.name.as_str()).collect();
                println!("  Positional: {}", positional.join(" "));
                println!("  Structural: {}", structural.join(" "));
            }
        }
        Command::Decode {
            corpus,
            attribute,
            start,
            end,
        } => {
            let corpus = Corpus::open(&corpus, &registry_dir)?;
            let attr = corpus.positional(&attribute)?;
            for (offset, value) in attr.values(start..end)?.into_iter().enumerate() {
                println!("{}\t{}", (start + offset).to_string().dimmed(), value);
            }
        }
        Command::Region {
            corpus,
            attribute,
            position,
        } => {
            let corpus = Corpus::open(&corpus, &registry_dir)?;
            let attr = corpus.structural(&attribute)?;
            match attr.find_pos(position)? {
                Some(span) => println!("{}\t{}\t{}", span.start, span.end, span.value.unwrap_or_default()),
                None => println!("{} Position {} is outside any {} region", "✗".red(), position, attribute),
            }
        }
    }

    Ok(())
}
