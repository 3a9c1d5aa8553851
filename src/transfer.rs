//! CSV export and import of saved lists.
//!
//! Export writes one file per list named `{list}_{YYYY-MM-DD_HH-MM-SS}.csv`.
//! Import derives the list name back from such a file name.

use chrono::NaiveDateTime;
use regex::Regex;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::types::{AppRecord, Source};

pub const CSV_HEADER: [&str; 8] = [
    "Name",
    "Package ID",
    "Version",
    "Source",
    "Description",
    "Is Installed",
    "Is Saved",
    "List ID",
];

/// Name, package id, version, source and description
const REQUIRED_COLUMNS: usize = 5;

const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

static TIMESTAMP_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"_\d{4}-\d{2}-\d{2}_\d{2}-\d{2}-\d{2}$").expect("timestamp regex is valid")
});

/// Replace spaces and path separators so the name is safe as a file name.
pub fn sanitize_list_name(name: &str) -> String {
    name.replace([' ', '/', '\\'], "_")
}

pub fn export_file_name(list_name: &str, at: NaiveDateTime) -> String {
    format!(
        "{}_{}.csv",
        sanitize_list_name(list_name),
        at.format(FILE_TIMESTAMP_FORMAT)
    )
}

/// Derive a list name from an import file: drop the extension and a trailing
/// export timestamp, then turn underscores back into spaces.
pub fn list_name_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = TIMESTAMP_SUFFIX.replace(&stem, "").replace('_', " ");
    let name = name.trim();
    if name.is_empty() {
        "Imported List".to_string()
    } else {
        name.to_string()
    }
}

pub fn write_apps<W: Write>(writer: W, apps: &[AppRecord]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(CSV_HEADER)?;

    for app in apps {
        let list_id = app.list_id.unwrap_or_default().to_string();
        csv.write_record([
            app.name.as_str(),
            app.package_id.as_str(),
            app.version.as_str(),
            app.source.as_str(),
            app.description.as_str(),
            bool_str(app.is_installed),
            bool_str(app.is_saved),
            list_id.as_str(),
        ])?;
    }

    csv.flush()?;
    Ok(())
}

fn bool_str(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// Read app rows from an exported (or hand-written) CSV.
///
/// The header needs at least five columns and the file at least one data
/// row. Short rows and rows without a name or package id are skipped.
pub fn read_apps<R: Read>(reader: R) -> Result<Vec<AppRecord>> {
    let mut csv = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let header_len = csv.headers()?.len();
    if header_len < REQUIRED_COLUMNS {
        return Err(Error::InvalidCsv(format!(
            "expected at least {} columns, got {}",
            REQUIRED_COLUMNS, header_len
        )));
    }

    let records = csv.records().collect::<std::result::Result<Vec<_>, _>>()?;
    if records.is_empty() {
        return Err(Error::InvalidCsv("CSV file is empty".to_string()));
    }

    let apps = records
        .iter()
        .filter(|record| record.len() >= REQUIRED_COLUMNS)
        .filter_map(|record| {
            let field = |i: usize| record.get(i).unwrap_or_default().trim();
            let (name, package_id) = (field(0), field(1));
            if name.is_empty() || package_id.is_empty() {
                return None;
            }
            Some(
                AppRecord::new(name, package_id, Source::from(field(3)))
                    .with_version(field(2))
                    .with_description(field(4)),
            )
        })
        .collect();

    Ok(apps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn timestamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 30)
            .unwrap()
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(
            export_file_name("My Dev/Tools", timestamp()),
            "My_Dev_Tools_2024-03-09_14-05-30.csv"
        );
        assert_eq!(
            export_file_name("a\\b", timestamp()),
            "a_b_2024-03-09_14-05-30.csv"
        );
    }

    #[test]
    fn test_list_name_from_exported_file() {
        let path = PathBuf::from("/tmp/exports/My_Dev_Tools_2024-03-09_14-05-30.csv");
        assert_eq!(list_name_from_path(&path), "My Dev Tools");
    }

    #[test]
    fn test_list_name_without_timestamp() {
        assert_eq!(list_name_from_path(Path::new("work_apps.csv")), "work apps");
        assert_eq!(list_name_from_path(Path::new("Games.csv")), "Games");
        assert_eq!(
            list_name_from_path(Path::new("_2024-03-09_14-05-30.csv")),
            "Imported List"
        );
    }

    #[test]
    fn test_written_file_has_exact_header_and_literal_bools() {
        let mut app = AppRecord::new("Git, for Windows", "Git.Git", Source::Winget)
            .with_version("2.43.0")
            .with_description("Distributed \"VCS\"");
        app.is_saved = true;
        app.list_id = Some(4);

        let mut out = Vec::new();
        write_apps(&mut out, &[app]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next(),
            Some("Name,Package ID,Version,Source,Description,Is Installed,Is Saved,List ID")
        );
        assert_eq!(
            lines.next(),
            Some("\"Git, for Windows\",Git.Git,2.43.0,winget,\"Distributed \"\"VCS\"\"\",false,true,4")
        );
    }

    #[test]
    fn test_read_skips_incomplete_rows() {
        let csv = "Name,Package ID,Version,Source,Description\n\
                   Git,Git.Git,2.43.0,winget,VCS\n\
                   ,missing.name,1,winget,\n\
                   NoId,,1,winget,\n\
                   short,row\n\
                   nodejs, nodejs ,21.5.0,chocolatey,JS runtime\n";
        let apps = read_apps(csv.as_bytes()).unwrap();

        let ids: Vec<&str> = apps.iter().map(|a| a.package_id.as_str()).collect();
        assert_eq!(ids, vec!["Git.Git", "nodejs"]);
        assert_eq!(apps[1].source, Source::Chocolatey);
        assert_eq!(apps[1].description, "JS runtime");
    }

    #[test]
    fn test_read_rejects_narrow_header() {
        let err = read_apps("Name,Package ID\nGit,Git.Git\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::InvalidCsv(_)));
    }

    #[test]
    fn test_read_rejects_empty_file() {
        let err = read_apps(CSV_HEADER.join(",").as_bytes()).unwrap_err();
        assert!(matches!(err, Error::InvalidCsv(msg) if msg.contains("empty")));
    }
}
