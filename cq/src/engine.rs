//! Query engine abstraction
//!
//! A query engine evaluates CQP statements against an indexed corpus and keeps
//! named result sets on its side of the connection. Running a query replaces
//! the `Last` result set, so one connection serves one query at a time.

use std::path::PathBuf;
use thiserror::Error;

/// Result set every query writes to
pub const LAST: &str = "Last";

/// Errors reported by a query engine connection
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to start {program}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Engine failed during startup: {0}")]
    Startup(String),

    #[error("Engine rejected `{statement}`: {message}")]
    Query { statement: String, message: String },

    #[error("Unexpected engine output: {0}")]
    Protocol(String),

    #[error("Statement must fit on one line: {0:?}")]
    InvalidStatement(String),

    #[error("Engine connection is closed")]
    Terminated,

    #[error("IO error talking to engine: {0}")]
    Io(#[from] std::io::Error),
}

/// One match as reported by the engine; `matchend` is the last matched token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub start: usize,
    pub matchend: usize,
}

/// A connection to a CQP-compatible query engine
pub trait QueryEngine {
    /// Run one statement and return its output lines
    fn execute(&mut self, statement: &str) -> Result<Vec<String>, EngineError>;

    /// Number of matches in a named result set
    fn size(&mut self, subcorpus: &str) -> Result<u64, EngineError> {
        let lines = self.execute(&format!("size {}", subcorpus))?;
        parse_size(&lines)
    }

    /// Matches `first..=last` of a named result set, in match order
    fn dump(&mut self, subcorpus: &str, first: u64, last: u64) -> Result<Vec<Match>, EngineError> {
        let lines = self.execute(&format!("dump {} {} {}", subcorpus, first, last))?;
        parse_dump(&lines)
    }

    /// Close the connection; later calls fail with [`EngineError::Terminated`]
    fn terminate(&mut self) -> Result<(), EngineError>;
}

/// Build the single-token query matching `value` on attribute `attribute`
pub fn word_query(attribute: &str, value: &str) -> String {
    format!("[{}=\"{}\"]", attribute, value)
}

/// Parse the output of `size <subcorpus>`
pub fn parse_size(lines: &[String]) -> Result<u64, EngineError> {
    let line = lines
        .iter()
        .map(|l| l.trim())
        .find(|l| !l.is_empty())
        .ok_or_else(|| EngineError::Protocol("empty reply to size".to_string()))?;
    line.parse()
        .map_err(|_| EngineError::Protocol(format!("bad size reply: {}", line)))
}

/// Parse the output of `dump`: tab-separated `match matchend target keyword`
/// lines. An empty reply is an empty result.
pub fn parse_dump(lines: &[String]) -> Result<Vec<Match>, EngineError> {
    lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|line| -> Result<Match, EngineError> {
            let mut fields = line.trim().split('\t');
            let mut next = || {
                fields
                    .next()
                    .and_then(|f| f.trim().parse::<usize>().ok())
                    .ok_or_else(|| EngineError::Protocol(format!("bad dump line: {}", line)))
            };
            let start = next()?;
            let matchend = next()?;
            Ok(Match { start, matchend })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_word_query() {
        assert_eq!(word_query("word", "cat"), r#"[word="cat"]"#);
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size(&lines("3")).unwrap(), 3);
        assert_eq!(parse_size(&lines("\n  42  \n")).unwrap(), 42);
        assert!(matches!(parse_size(&[]), Err(EngineError::Protocol(_))));
        assert!(matches!(parse_size(&lines("three")), Err(EngineError::Protocol(_))));
    }

    #[test]
    fn test_parse_dump() {
        let matches = parse_dump(&lines("1\t1\t-1\t-1\n5\t7\t-1\t-1")).unwrap();
        assert_eq!(
            matches,
            vec![Match { start: 1, matchend: 1 }, Match { start: 5, matchend: 7 }]
        );
    }

    #[test]
    fn test_parse_dump_empty_reply() {
        assert!(parse_dump(&lines("")).unwrap().is_empty());
        assert!(parse_dump(&[String::new()]).unwrap().is_empty());
    }

    #[test]
    fn test_parse_dump_rejects_garbage() {
        assert!(matches!(parse_dump(&lines("1")), Err(EngineError::Protocol(_))));
        assert!(matches!(parse_dump(&lines("a\tb")), Err(EngineError::Protocol(_))));
    }

    struct Canned(Vec<String>);

    impl QueryEngine for Canned {
        fn execute(&mut self, statement: &str) -> Result<Vec<String>, EngineError> {
            self.0.push(statement.to_string());
            match statement {
                "size Last" => Ok(lines("2")),
                "dump Last 0 1" => Ok(lines("4\t4\t-1\t-1\n9\t10\t-1\t-1")),
                _ => Ok(Vec::new()),
            }
        }

        fn terminate(&mut self) -> Result<(), EngineError> {
            Ok(())
        }
    }

    #[test]
    fn test_default_methods_issue_cqp_commands() {
        let mut engine = Canned(Vec::new());
        assert_eq!(engine.size(LAST).unwrap(), 2);
        let matches = engine.dump(LAST, 0, 1).unwrap();
        assert_eq!(matches[1], Match { start: 9, matchend: 10 });
        assert_eq!(engine.0, vec!["size Last".to_string(), "dump Last 0 1".to_string()]);
    }
}
