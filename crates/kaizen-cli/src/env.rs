//! `.env` loading for API keys and repository settings.

use std::path::{Path, PathBuf};

const ENV_FILES: [&str; 2] = [".env.local", ".env"];

/// Load `.env.local` then `.env` from the working directory.
///
/// Returns the files that were read so the caller can log them once tracing
/// is up.
pub fn load_dotenv() -> Vec<PathBuf> {
    load_dotenv_from(Path::new("."))
}

/// Variables already in the environment win; `.env.local` wins over `.env`.
pub fn load_dotenv_from(dir: &Path) -> Vec<PathBuf> {
    let mut loaded = Vec::new();
    for filename in ENV_FILES {
        let path = dir.join(filename);
        let Ok(content) = std::fs::read_to_string(&path) else {
            continue;
        };
        for (key, value) in parse_env(&content) {
            if std::env::var_os(key).is_none() {
                std::env::set_var(key, value);
            }
        }
        loaded.push(path);
    }
    loaded
}

/// `KEY=VALUE` pairs, skipping blanks and `#` comments. Surrounding quotes are
/// stripped and an `export ` prefix is ignored.
fn parse_env(content: &str) -> Vec<(&str, &str)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key, unquote(value.trim())))
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
