//! CLI argument parsing for cqpconc

use chrono::{DateTime, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "cqpconc")]
#[command(author, version, about = "KWIC concordances from CQP-indexed corpora", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Corpus to query (overrides config)
    #[arg(long)]
    pub corpus: Option<String>,

    /// CWB registry directory (overrides config)
    #[arg(short, long)]
    pub registry: Option<PathBuf>,

    /// Path to the cqp executable (overrides config)
    #[arg(long)]
    pub cqp_bin: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show one page of the concordance for a word
    Query {
        /// Word form to search for
        #[arg(required = true)]
        word: String,

        /// Page number, starting at 1
        #[arg(short, long, default_value = "1")]
        page: usize,

        /// Hits per page (default from config: 50)
        #[arg(short = 'n', long)]
        per_page: Option<usize>,

        /// Show part-of-speech tags
        #[arg(long)]
        pos: bool,

        /// Earliest timestamp, as an integer or YYYY-MM-DD
        #[arg(long, value_parser = parse_time_bound)]
        begin: Option<i64>,

        /// Latest timestamp, as an integer or YYYY-MM-DD
        #[arg(long, value_parser = parse_time_bound)]
        end: Option<i64>,

        /// Only show hits from this board (repeatable)
        #[arg(short, long = "board")]
        boards: Vec<String>,

        /// Context tokens on each side (default from config: 6)
        #[arg(short, long)]
        window: Option<usize>,

        /// Print the page as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the configured corpus and its attributes
    Info,
}

/// Parse a time bound given as an integer, a `YYYY-MM-DD` date (UTC
/// midnight) or an RFC 3339 timestamp, yielding epoch seconds for dates
pub fn parse_time_bound(s: &str) -> Result<i64, String> {
    let s = s.trim();
    if let Ok(n) = s.parse::<i64>() {
        return Ok(n);
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        && let Some(midnight) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(midnight.and_utc().timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.timestamp());
    }
    Err(format!("expected an integer, YYYY-MM-DD or RFC 3339 timestamp, got '{}'", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_bound_integer() {
        assert_eq!(parse_time_bound("1546300800").unwrap(), 1546300800);
        assert_eq!(parse_time_bound(" -5 ").unwrap(), -5);
    }

    #[test]
    fn test_parse_time_bound_date() {
        assert_eq!(parse_time_bound("2019-01-01").unwrap(), 1546300800);
        assert_eq!(parse_time_bound("2019-01-01T00:00:10+00:00").unwrap(), 1546300810);
    }

    #[test]
    fn test_parse_time_bound_rejects_garbage() {
        assert!(parse_time_bound("last tuesday").is_err());
    }

    #[test]
    fn test_query_args() {
        let cli = Cli::try_parse_from([
            "cqpconc", "query", "cat", "-p", "2", "-n", "10", "--pos", "-b", "sports", "-b", "news", "--begin",
            "2019-01-01",
        ])
        .unwrap();

        match cli.command {
            Command::Query {
                word,
                page,
                per_page,
                pos,
                begin,
                end,
                boards,
                ..
            } => {
                assert_eq!(word, "cat");
                assert_eq!(page, 2);
                assert_eq!(per_page, Some(10));
                assert!(pos);
                assert_eq!(begin, Some(1546300800));
                assert_eq!(end, None);
                assert_eq!(boards, vec!["sports".to_string(), "news".to_string()]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
