//! Small shared helpers used by the blob store, scanner, and line-diff engine:
//! a byte-counting reader wrapper, repository-relative path normalization,
//! and universal-newline line splitting.

use std::{
    io::{self, BufRead, Read},
    path::Path,
};

/// A lightweight wrapper that counts bytes read from the underlying reader,
/// used by `BlobStore::put_stream` to report the size of a blob being
/// written without a second pass over the data.
pub struct CountingReader<R> {
    pub inner: R,
    pub bytes_read: u64,
}

impl<R> CountingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            bytes_read: 0,
        }
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bytes_read += n as u64;
        Ok(n)
    }
}

impl<R: BufRead> BufRead for CountingReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.bytes_read += amt as u64;
        self.inner.consume(amt);
    }
}

/// Normalizes a path relative to `root` to forward-slash form, as required
/// for `FileRecord::path` regardless of host OS.
pub fn normalize_relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Splits text on universal newlines (`\r\n`, `\r`, `\n`), preserving empty
/// trailing lines the way line-oriented diff tools expect: `"a\nb\n"` yields
/// `["a", "b"]`, not `["a", "b", ""]`.
pub fn split_lines(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                lines.push(std::mem::take(&mut current));
            }
            '\n' => {
                lines.push(std::mem::take(&mut current));
            }
            other => current.push(other),
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Joins lines with the host platform's newline, mirroring what the
/// non-overlapping merge path in `MergeEngine` produces.
pub fn join_lines_platform(lines: &[String]) -> String {
    let sep = if cfg!(windows) { "\r\n" } else { "\n" };
    lines.join(sep)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_lines_handles_mixed_endings() {
        let text = "a\r\nb\rc\nd";
        assert_eq!(split_lines(text), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn split_lines_drops_trailing_empty_line() {
        assert_eq!(split_lines("a\nb\n"), vec!["a", "b"]);
        assert_eq!(split_lines(""), Vec::<String>::new());
    }

    #[test]
    fn normalize_relative_path_uses_forward_slashes() {
        let root = Path::new("/repo");
        let path = Path::new("/repo/src/main.rs");
        assert_eq!(normalize_relative_path(root, path), "src/main.rs");
    }
}
