//! The append-only marks file: `:<mark> <rev>\n` lines mapping a small
//! integer assigned by a VCS's fast-export/fast-import plugin to that VCS's
//! revision id (§4.2).
//!
//! Marks files are never rewritten in place by this crate -- they are read at
//! the start of a transaction and wholesale-replaced (by rename) with the
//! fresh copy the VCS tool produced, once a transaction commits.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::warn;

use crate::error::{EngineError, IoResultExt, Result};

#[derive(Debug, Clone, Default)]
pub struct Marks {
    by_rev: HashMap<String, u64>,
    by_mark: HashMap<u64, String>,
}

impl Marks {
    pub fn new() -> Self {
        Marks::default()
    }

    /// Parses a marks file. Tolerant: malformed lines are logged and skipped
    /// rather than aborting the load (§4.2). A missing file loads as empty.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Marks::new()),
            Err(e) => return Err(EngineError::io(path, e)),
        };

        let mut marks = Marks::new();
        for (lineno, line) in text.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            match parse_line(line) {
                Some((mark, rev)) => marks.insert(mark, rev),
                None => warn!(
                    path = %path.display(),
                    line = lineno + 1,
                    content = line,
                    "skipping malformed marks line"
                ),
            }
        }
        Ok(marks)
    }

    fn insert(&mut self, mark: u64, rev: String) {
        // Last-wins on duplicates: fast-export/fast-import themselves
        // guarantee uniqueness, so this path is never expected to matter.
        self.by_mark.insert(mark, rev.clone());
        self.by_rev.insert(rev, mark);
    }

    pub fn mark_for_rev(&self, rev: &str) -> Option<u64> {
        self.by_rev.get(rev).copied()
    }

    pub fn rev_for_mark(&self, mark: u64) -> Option<&str> {
        self.by_mark.get(&mark).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_mark.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_mark.is_empty()
    }

    /// Looks up the translation of `rev` (a source-VCS revision known by
    /// `self`) through the shared mark into `other`'s revision space. Used
    /// by the empty-export recovery path (§4.5.1 step 6) and by push-hook's
    /// zero-byte recovery (§4.5.5 step 3d).
    pub fn translate(&self, rev: &str, other: &Marks) -> Result<String> {
        let mark = self
            .mark_for_rev(rev)
            .ok_or_else(|| EngineError::MarksMismatch(format!("no mark recorded for revision {rev:?}")))?;
        other
            .rev_for_mark(mark)
            .map(|s| s.to_string())
            .ok_or_else(|| EngineError::MarksMismatch(format!("no revision recorded for mark :{mark}")))
    }
}

fn parse_line(line: &str) -> Option<(u64, String)> {
    let mut fields = line.split(' ');
    let mark_field = fields.next()?;
    let rev_field = fields.next()?;
    if fields.next().is_some() {
        return None;
    }
    if rev_field.is_empty() {
        return None;
    }
    let mark_str = mark_field.strip_prefix(':')?;
    let mark = mark_str.parse::<u64>().ok()?;
    Some((mark, rev_field.to_string()))
}

/// Atomically replaces `dest` with the contents currently at `src_tmp`,
/// consuming `src_tmp` (used to commit a freshly produced marks file over the
/// permanent one, §4.5.1/§4.5.3/§4.5.4/§4.5.5).
pub fn commit_marks_file(src_tmp: &Path, dest: &Path) -> Result<()> {
    fs::rename(src_tmp, dest).io_ctx(dest)
}

/// Creates an empty marks file at `path`, truncating if it already exists.
pub fn write_empty(path: &Path) -> Result<()> {
    fs::write(path, b"").io_ctx(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_well_formed_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("marks");
        fs::write(&path, ":1 revid-aaa\n:2 revid-bbb\n").unwrap();

        let marks = Marks::load(&path).unwrap();
        assert_eq!(marks.len(), 2);
        assert_eq!(marks.mark_for_rev("revid-aaa"), Some(1));
        assert_eq!(marks.rev_for_mark(2), Some("revid-bbb"));
    }

    #[test]
    fn skips_malformed_lines_without_failing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("marks");
        fs::write(
            &path,
            ":1 revid-aaa\nnot-a-mark-line\n:xx revid-bad-int\n:3 rev1 extra\n:2 revid-bbb\n",
        )
        .unwrap();

        let marks = Marks::load(&path).unwrap();
        assert_eq!(marks.len(), 2);
        assert_eq!(marks.mark_for_rev("revid-aaa"), Some(1));
        assert_eq!(marks.mark_for_rev("revid-bbb"), Some(2));
        assert_eq!(marks.rev_for_mark(3), None);
    }

    #[test]
    fn missing_file_loads_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("does-not-exist");
        let marks = Marks::load(&path).unwrap();
        assert!(marks.is_empty());
    }

    #[test]
    fn last_wins_on_duplicate_mark() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("marks");
        fs::write(&path, ":1 revid-aaa\n:1 revid-bbb\n").unwrap();

        let marks = Marks::load(&path).unwrap();
        assert_eq!(marks.rev_for_mark(1), Some("revid-bbb"));
    }

    #[test]
    fn translate_round_trips_through_shared_mark() {
        let dir = tempdir().unwrap();
        let src_path = dir.path().join("src.marks");
        let dst_path = dir.path().join("dst.marks");
        fs::write(&src_path, ":5 src-rev\n").unwrap();
        fs::write(&dst_path, ":5 0123456789abcdef0123456789abcdef01234567\n").unwrap();

        let src = Marks::load(&src_path).unwrap();
        let dst = Marks::load(&dst_path).unwrap();

        let translated = src.translate("src-rev", &dst).unwrap();
        assert_eq!(translated, "0123456789abcdef0123456789abcdef01234567");
    }

    #[test]
    fn translate_fails_when_rev_unknown() {
        let marks = Marks::new();
        let other = Marks::new();
        let err = marks.translate("nope", &other).unwrap_err();
        assert!(matches!(err, EngineError::MarksMismatch(_)));
    }
}
