//! Comms key resolution.
//!
//! The key sent with each topic query comes from the `--key` flag unless a
//! BYOND `config.txt` is given and carries a `COMMS_PASSWORD` line, in which
//! case the config value wins.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use regex::bytes::Regex;
use thiserror::Error;
use tracing::{debug, warn};

// Whitespace is the ASCII set `[\t\n\f\r ]`; anything else, including
// non-ASCII spaces, belongs to the value.
const COMMS_PASSWORD_PATTERN: &str =
    r"(?-u)^[\t\n\f\r ]*COMMS_PASSWORD[\t\n\f\r ]+([^\t\n\f\r ]+)[\t\n\f\r ]*$";

/// Errors that prevent the key from being resolved.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to compile config pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Outcome of scanning a config file that could be read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyLookup {
    Found(String),
    NotFound,
}

/// Scan `reader` line by line for the first non-empty key captured by `pattern`.
fn scan_lines<R: BufRead>(mut reader: R, pattern: &Regex) -> io::Result<Option<String>> {
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(None);
        }

        if let Some(value) = pattern.captures(&line).and_then(|caps| caps.get(1)) {
            if !value.is_empty() {
                return Ok(Some(String::from_utf8_lossy(value.as_bytes()).into_owned()));
            }
        }
    }
}

/// Look up the comms key in the config file at `path`.
///
/// A file that cannot be opened or read is an error; a readable file
/// without a key line is [`KeyLookup::NotFound`].
pub fn find_comms_password(path: &Path) -> Result<KeyLookup, KeyError> {
    let pattern = Regex::new(COMMS_PASSWORD_PATTERN)?;
    let read_error = |source| KeyError::Read {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(read_error)?;
    let found = scan_lines(BufReader::new(file), &pattern).map_err(read_error)?;

    Ok(found.map_or(KeyLookup::NotFound, KeyLookup::Found))
}

/// Resolve the effective key from an optional config file and a fallback.
///
/// The config value overrides `fallback` when present. A config file
/// without a key line only produces a warning.
pub fn resolve_key(config_file: Option<&Path>, fallback: &str) -> Result<String, KeyError> {
    let Some(path) = config_file.filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(fallback.to_string());
    };

    match find_comms_password(path)? {
        KeyLookup::Found(key) => {
            debug!(path = %path.display(), "comms key loaded from config file");
            Ok(key)
        }
        KeyLookup::NotFound => {
            warn!(
                path = %path.display(),
                "could not find key in config file, falling back to flag"
            );
            Ok(fallback.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use std::sync::{Arc, Mutex};

    fn scan(input: &str) -> Option<String> {
        let pattern = Regex::new(COMMS_PASSWORD_PATTERN).unwrap();
        scan_lines(Cursor::new(input), &pattern).unwrap()
    }

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn scan_finds_first_key() {
        let input = "## comms\nCOMMS_PASSWORD first\nCOMMS_PASSWORD second\n";
        let key = scan(input);
        assert_eq!(key.as_deref(), Some("first"));
    }

    #[test]
    fn scan_tolerates_surrounding_whitespace() {
        let input = "   COMMS_PASSWORD\t s3cret  \r\n";
        let key = scan(input);
        assert_eq!(key.as_deref(), Some("s3cret"));
    }

    #[test]
    fn scan_ignores_non_matching_lines() {
        let input = "# COMMS_PASSWORD commented\nCOMMS_PASSWORD\nCOMMS_PASSWORD two words\nSERVER_NAME x\n";
        assert_eq!(scan(input), None);
    }

    #[test]
    fn scan_handles_last_line_without_newline() {
        let input = "SERVERNAME test\nCOMMS_PASSWORD tail";
        let key = scan(input);
        assert_eq!(key.as_deref(), Some("tail"));
    }

    #[test]
    fn scan_only_splits_on_ascii_whitespace() {
        assert_eq!(scan("COMMS_PASSWORD\u{a0}pw\n"), None);
        assert_eq!(scan("COMMS_PASSWORD pw\u{3000}\n").as_deref(), Some("pw\u{3000}"));
        assert_eq!(scan("COMMS_PASSWORD pw\u{0b}\n").as_deref(), Some("pw\u{0b}"));
        assert_eq!(scan("\u{2003}COMMS_PASSWORD pw\n"), None);
    }

    /// Run `f` under a subscriber that records every event, one per line.
    fn capture_events<T>(f: impl FnOnce() -> T) -> (T, String) {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || CaptureWriter(writer.clone()))
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .without_time()
            .with_target(false)
            .finish();

        let result = tracing::subscriber::with_default(subscriber, f);
        let output = String::from_utf8(buf.lock().unwrap().clone()).unwrap();
        (result, output)
    }

    struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

    impl Write for CaptureWriter {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn warnings(output: &str) -> usize {
        output
            .lines()
            .filter(|line| line.trim_start().starts_with("WARN"))
            .count()
    }

    #[test]
    fn missing_key_line_warns_once() {
        let file = config_file("SERVERNAME Baystation\n");

        let (key, output) = capture_events(|| resolve_key(Some(file.path()), "from-flag"));
        assert_eq!(key.unwrap(), "from-flag");
        assert_eq!(warnings(&output), 1, "events: {output}");
        assert!(output.contains("could not find key in config file"));
    }

    #[test]
    fn found_key_and_empty_path_do_not_warn() {
        let file = config_file("COMMS_PASSWORD from-config\n");

        let (key, output) = capture_events(|| resolve_key(Some(file.path()), "from-flag"));
        assert_eq!(key.unwrap(), "from-config");
        assert_eq!(warnings(&output), 0, "events: {output}");
        assert!(!output.contains("from-config"), "key leaked: {output}");

        let (key, output) = capture_events(|| resolve_key(None, "from-flag"));
        assert_eq!(key.unwrap(), "from-flag");
        assert_eq!(warnings(&output), 0, "events: {output}");
    }

    #[test]
    fn config_key_overrides_fallback() {
        let file = config_file("COMMS_PASSWORD from-config\n");
        let key = resolve_key(Some(file.path()), "from-flag").unwrap();
        assert_eq!(key, "from-config");
    }

    #[test]
    fn missing_key_line_falls_back() {
        let file = config_file("SERVERNAME Baystation\n");
        assert_eq!(
            find_comms_password(file.path()).unwrap(),
            KeyLookup::NotFound
        );
        let key = resolve_key(Some(file.path()), "from-flag").unwrap();
        assert_eq!(key, "from-flag");
    }

    #[test]
    fn no_config_file_uses_fallback() {
        assert_eq!(resolve_key(None, "flag").unwrap(), "flag");
        assert_eq!(resolve_key(Some(Path::new("")), "flag").unwrap(), "flag");
        assert_eq!(resolve_key(None, "").unwrap(), "");
    }

    #[test]
    fn unreadable_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("config.txt");

        let err = resolve_key(Some(missing.as_path()), "flag").unwrap_err();
        match err {
            KeyError::Read { path, .. } => assert_eq!(path, missing),
            other => panic!("expected read error, got {other}"),
        }
    }
}
