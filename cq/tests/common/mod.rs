//! Shared fixtures: a small CWB corpus and a scripted stand-in for cqp

#![allow(dead_code)]

use cwb_cl::CorpusWriter;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const FAKE_CQP: &str = include_str!("../fixtures/fake_cqp.sh");

pub struct Fixture {
    pub temp: TempDir,
    pub registry: PathBuf,
}

impl Fixture {
    pub fn script_path(&self) -> PathBuf {
        self.temp.path().join("fake_cqp.sh")
    }
}

//  0 the   1 cat  2 sat    3 .   | sports, t=100
//  4 a     5 cat  6 ran    7 .   | news,   t=200
//  8 my    9 cat  10 slept 11 .  | sports, no timestamp
pub fn bbs_corpus() -> Fixture {
    let temp = TempDir::new().unwrap();
    let registry = temp.path().join("registry");
    CorpusWriter::new("bbs", temp.path().join("data"))
        .positional(
            "word",
            &["the", "cat", "sat", ".", "a", "cat", "ran", ".", "my", "cat", "slept", "."],
        )
        .positional(
            "pos",
            &["DT", "NN", "VBD", "PU", "DT", "NN", "VBD", "PU", "PRP", "NN", "VBD", "PU"],
        )
        .structural(
            "text_board",
            &[(0, 3, Some("sports")), (4, 7, Some("news")), (8, 11, Some("sports"))],
        )
        .structural("text_time", &[(0, 3, Some("100")), (4, 7, Some("200"))])
        .write(&registry)
        .unwrap();

    std::fs::write(temp.path().join("fake_cqp.sh"), FAKE_CQP).unwrap();
    Fixture { temp, registry }
}

/// Mark the fake cqp script executable
#[cfg(unix)]
pub fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}
