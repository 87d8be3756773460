//! Minimal `.env` loader: `KEY=value` lines, `#` comments, optional single
//! or double quotes around the value. Variables already present in the
//! environment are never overridden, and missing files are skipped.

use std::fs;
use std::path::Path;

pub fn load(path: impl AsRef<Path>) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for line in contents.lines() {
        let Some((key, value)) = parse_line(line) else {
            continue;
        };
        if std::env::var_os(key).is_some() {
            continue;
        }
        // Only called from main before the runtime starts, while the process
        // is still single-threaded.
        unsafe { std::env::set_var(key, value) };
    }
}

/// Splits one dotenv line into a key/value pair. Comments, blank lines and
/// lines without `=` yield `None`.
fn parse_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, unquote(value.trim())))
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
