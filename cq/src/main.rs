use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use cqpconc::cli::{Cli, Command};
use cqpconc::config::Config;
use cqpconc::{ConcordanceBuilder, ConcordanceOptions, PageResult};
use cwb_cl::Corpus;

/// Width the left context is right-aligned to in text output
const LEFT_WIDTH: usize = 40;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Determine log level with priority: CLI --log-level > config file > default (WARN)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to WARN", s);
                tracing::Level::WARN
            }
        },
        None => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
    Ok(())
}

fn print_page(page: &PageResult, page_num: usize) {
    let shown = page.conclist.len();
    println!(
        "{} {} hits, page {} ({} shown)",
        "✓".green(),
        page.total.to_string().cyan(),
        page_num,
        shown
    );
    for line in &page.conclist {
        let meta = format!(
            "{} {}",
            line.time.as_deref().unwrap_or("-"),
            line.board.as_deref().unwrap_or("-")
        );
        println!(
            "{}  {:>width$} {} {}",
            meta.dimmed(),
            line.conc.0.to_string(),
            line.conc.1.to_string().yellow().bold(),
            line.conc.2,
            width = LEFT_WIDTH
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    if let Some(corpus) = cli.corpus {
        config.corpus = Some(corpus);
    }
    if let Some(registry) = cli.registry {
        config.registry_dir = registry;
    }
    if let Some(cqp_bin) = cli.cqp_bin {
        config.cqp_bin = cqp_bin;
    }
    debug!(?config, "main: resolved configuration");
    info!("cqpconc starting");

    match cli.command {
        Command::Query {
            word,
            page,
            per_page,
            pos,
            begin,
            end,
            boards,
            window,
            json,
        } => {
            let corpus = config.corpus()?;
            let mut builder = ConcordanceBuilder::connect(
                &config.cqp_bin,
                corpus,
                &config.registry_dir,
                config.attributes.clone(),
            )
            .context(format!("Failed to connect to corpus {}", corpus))?;

            let options = ConcordanceOptions {
                page_num: page,
                num_per_page: per_page.unwrap_or(config.defaults.num_per_page),
                show_pos: pos,
                begin_time: begin,
                end_time: end,
                boards,
                window_size: window.unwrap_or(config.defaults.window_size),
            };
            let result = builder.make_concordance(&word, &options);
            builder.close();

            match result.context(format!("Query for '{}' failed", word))? {
                Some(page_result) if json => println!("{}", serde_json::to_string_pretty(&page_result)?),
                Some(page_result) => print_page(&page_result, page),
                None if json => println!("null"),
                None => println!("No matches for '{}'", word),
            }
        }
        Command::Info => {
            let name = config.corpus()?;
            let corpus = Corpus::open(name, &config.registry_dir).context(format!("Failed to open corpus {}", name))?;
            let entry = corpus.entry();
            println!("Corpus: {}", entry.id.cyan());
            if let Some(long_name) = &entry.name {
                println!("  Name: {}", long_name);
            }
            println!("  Registry: {}", config.registry_dir.display());
            println!("  Home: {}", entry.home.display());
            println!("  Size: {} tokens", corpus.size()?);

            let attrs = &config.attributes;
            let checks = [
                ("word", &attrs.word, entry.positional_decl(&attrs.word).is_some()),
                ("pos", &attrs.pos, entry.positional_decl(&attrs.pos).is_some()),
                ("board", &attrs.board, entry.structural_decl(&attrs.board).is_some()),
                ("time", &attrs.time, entry.structural_decl(&attrs.time).is_some()),
            ];
            for (role, name, present) in checks {
                let mark = if present { "✓".green() } else { "✗".red() };
                println!("  {} {}: {}", mark, role, name);
            }
        }
    }

    Ok(())
}
