//! Text output parsing for winget and Chocolatey
//!
//! Both parsers are lenient: a line that does not fit the expected shape is
//! dropped and the rest of the batch is kept.

use regex::Regex;
use std::sync::LazyLock;

use crate::types::{AppRecord, Source};

/// Columns in winget tables are separated by two or more whitespace characters.
/// Single spaces belong to the cell (e.g. "Visual Studio Code").
static COLUMN_GAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("column gap regex is valid"));

/// Parse a winget `search` table.
///
/// Everything up to the dashed separator line is ignored, as are blank lines
/// and any row repeating the header cells. Column 1 is the name, column 2 the id and
/// column 3 (if present) the version.
pub fn parse_winget_table(output: &str) -> Vec<AppRecord> {
    let mut apps = Vec::new();
    let mut data_started = false;
    let mut header: Vec<&str> = Vec::new();

    for raw_line in output.lines() {
        // winget redraws a progress spinner with carriage returns
        let line = raw_line.rsplit('\r').next().unwrap_or(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        if is_separator(line) {
            data_started = true;
            continue;
        }

        let columns: Vec<&str> = COLUMN_GAP.split(line).map(str::trim).collect();
        if !data_started {
            // The last line before the separator is the header
            header = columns;
            continue;
        }

        if is_header_repeat(&columns, &header)
            || columns.len() < 2
            || columns[0].is_empty()
            || columns[1].is_empty()
        {
            continue;
        }

        let mut app = AppRecord::new(columns[0], columns[1], Source::Winget);
        if let Some(version) = columns.get(2) {
            app.version = (*version).to_string();
        }
        apps.push(app);
    }

    apps
}

/// winget sometimes prints the header again at the bottom, possibly with
/// fewer columns.
fn is_header_repeat(columns: &[&str], header: &[&str]) -> bool {
    !header.is_empty() && header.starts_with(columns)
}

/// Parse a winget `list` table. Same format as search, every row is installed.
pub fn parse_winget_installed(output: &str) -> Vec<AppRecord> {
    mark_installed(parse_winget_table(output))
}

/// Parse Chocolatey `--limit-output` lines of the form `name|version[|...]`.
///
/// Chocolatey has no separate display name, so the package name doubles as
/// the package id.
pub fn parse_choco_lines(output: &str) -> Vec<AppRecord> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let mut fields = line.split('|').map(str::trim);
            let name = fields.next()?;
            let version = fields.next()?;
            if name.is_empty() {
                return None;
            }
            Some(AppRecord::new(name, name, Source::Chocolatey).with_version(version))
        })
        .collect()
}

/// Parse Chocolatey `list --local-only` output. Every line is installed.
pub fn parse_choco_installed(output: &str) -> Vec<AppRecord> {
    mark_installed(parse_choco_lines(output))
}

fn mark_installed(apps: Vec<AppRecord>) -> Vec<AppRecord> {
    apps.into_iter().map(AppRecord::installed).collect()
}

fn is_separator(line: &str) -> bool {
    line.contains("---") && line.chars().all(|c| c == '-' || c.is_whitespace())
}
