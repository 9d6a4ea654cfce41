//! CSV loaders for the three input tables.
//!
//! Column headers follow the crawler export the tool is fed with:
//!
//! | Table | Required | Optional |
//! |-------|----------|----------|
//! | content | `Adresse`, `Segments`, `Extracteur 1 1` | `Extracteur 2 1` |
//! | links | `Source`, `Destination` | |
//! | performance | `URL`, `Clics`, `Impressions`, `Position` | |
//!
//! Comma and semicolon delimiters are both accepted (the delimiter is
//! sniffed from the header line) and a leading UTF-8 BOM is ignored.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use linkweave_core::{
    AnalysisInput, Error, RawLink, RawPageRecord, RawPerformanceRow, Result,
};
use linkweave_engine::preprocess::normalize_category;

pub const CONTENT_URL: &str = "Adresse";
pub const CONTENT_SEGMENT: &str = "Segments";
pub const CONTENT_PRIMARY: &str = "Extracteur 1 1";
pub const CONTENT_SECONDARY: &str = "Extracteur 2 1";
pub const LINK_SOURCE: &str = "Source";
pub const LINK_DESTINATION: &str = "Destination";
pub const PERF_URL: &str = "URL";
pub const PERF_CLICKS: &str = "Clics";
pub const PERF_IMPRESSIONS: &str = "Impressions";
pub const PERF_POSITION: &str = "Position";

/// One of the three uploadable tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    Content,
    Links,
    Performance,
}

impl TableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableKind::Content => "content",
            TableKind::Links => "links",
            TableKind::Performance => "performance",
        }
    }

    /// Headers that must be present for the table to be accepted.
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            TableKind::Content => &[CONTENT_URL, CONTENT_SEGMENT, CONTENT_PRIMARY],
            TableKind::Links => &[LINK_SOURCE, LINK_DESTINATION],
            TableKind::Performance => &[PERF_URL, PERF_CLICKS, PERF_IMPRESSIONS, PERF_POSITION],
        }
    }

    /// Every column the loader reads, required ones first.
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            TableKind::Content => &[CONTENT_URL, CONTENT_SEGMENT, CONTENT_PRIMARY, CONTENT_SECONDARY],
            other => other.required_columns(),
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "content" => Ok(TableKind::Content),
            "links" => Ok(TableKind::Links),
            // Search Console export
            "performance" | "gsc" => Ok(TableKind::Performance),
            other => Err(Error::InvalidInput(format!("unknown table kind: {}", other))),
        }
    }
}

/// Paths of the tables feeding one analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputFiles {
    pub content: PathBuf,
    pub links: Option<PathBuf>,
    pub performance: Option<PathBuf>,
}

impl InputFiles {
    pub fn content_only(content: impl Into<PathBuf>) -> Self {
        Self {
            content: content.into(),
            links: None,
            performance: None,
        }
    }
}

// =============================================================================
// Reading helpers
// =============================================================================

struct HeaderIndex {
    table: TableKind,
    columns: HashMap<String, usize>,
    /// `;`-separated exports write decimals with a comma.
    decimal_comma: bool,
}

impl HeaderIndex {
    fn new(table: TableKind, headers: &csv::StringRecord, delimiter: u8) -> Self {
        let columns = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim_start_matches('\u{feff}').trim().to_string(), i))
            .collect();
        Self {
            table,
            columns,
            decimal_comma: delimiter == b';',
        }
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.columns.get(name).copied().ok_or_else(|| {
            Error::InvalidInput(format!(
                "missing required column '{}' in {} table",
                name, self.table
            ))
        })
    }

    fn optional(&self, name: &str) -> Option<usize> {
        self.columns.get(name).copied()
    }

    fn require_all(&self) -> Result<()> {
        for name in self.table.required_columns() {
            self.require(name)?;
        }
        Ok(())
    }
}

fn sniff_delimiter(path: &Path) -> Result<u8> {
    let mut first_line = String::new();
    BufReader::new(File::open(path)?).read_line(&mut first_line)?;
    let semicolons = first_line.matches(';').count();
    let commas = first_line.matches(',').count();
    Ok(if semicolons > commas { b';' } else { b',' })
}

fn open(path: &Path, table: TableKind) -> Result<(csv::Reader<File>, HeaderIndex)> {
    if !path.is_file() {
        return Err(Error::NotFound(format!(
            "{} table file {}",
            table,
            path.display()
        )));
    }
    let delimiter = sniff_delimiter(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;
    let index = HeaderIndex::new(table, reader.headers()?, delimiter);
    Ok((reader, index))
}

fn cell(record: &csv::StringRecord, idx: usize) -> Option<String> {
    record
        .get(idx)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Parse a numeric cell with optional digit-group spaces.
///
/// When both `.` and `,` appear, the last one is the decimal separator. A
/// lone `,` is a decimal separator in `decimal_comma` tables; elsewhere it
/// is one only when it occurs once and is not followed by exactly three
/// digits (`4,5` but not `1,234`).
fn parse_number(raw: &str, decimal_comma: bool) -> Option<f64> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}' && *c != '\u{202f}')
        .collect();
    let normalized = match (compact.rfind(','), compact.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => compact.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => compact.replace(',', ""),
        (Some(comma), None) => {
            let fraction = &compact[comma + 1..];
            let grouped = fraction.len() == 3 && fraction.bytes().all(|b| b.is_ascii_digit());
            let single = compact.matches(',').count() == 1;
            if decimal_comma || (single && !grouped) {
                compact.replace(',', ".")
            } else {
                compact.replace(',', "")
            }
        }
        _ => compact,
    };
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Blank or unparsable counts read as 0.
fn parse_count(raw: Option<String>, decimal_comma: bool) -> u64 {
    raw.as_deref()
        .and_then(|v| parse_number(v, decimal_comma))
        .filter(|v| *v >= 0.0)
        .map(|v| v.round() as u64)
        .unwrap_or(0)
}

/// Blank or unparsable positions read as NaN, which never earns a boost.
fn parse_position(raw: Option<String>, decimal_comma: bool) -> f64 {
    raw.as_deref()
        .and_then(|v| parse_number(v, decimal_comma))
        .unwrap_or(f64::NAN)
}

// =============================================================================
// Loaders
// =============================================================================

/// Check that `path` is a readable CSV carrying the table's required headers.
pub fn validate_columns(path: &Path, table: TableKind) -> Result<()> {
    let (_, index) = open(path, table)?;
    index.require_all()
}

/// Load the content table. Rows are returned as-is; dropping rows without
/// usable text happens when the working set is built.
#[instrument(skip_all, fields(subsystem = "jobs", component = "input", op = "load_content"))]
pub fn load_content(path: &Path) -> Result<Vec<RawPageRecord>> {
    let (mut reader, index) = open(path, TableKind::Content)?;
    index.require_all()?;
    let url = index.require(CONTENT_URL)?;
    let segment = index.require(CONTENT_SEGMENT)?;
    let primary = index.require(CONTENT_PRIMARY)?;
    let secondary = index.optional(CONTENT_SECONDARY);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(RawPageRecord {
            url: cell(&record, url),
            category: cell(&record, segment),
            content_primary: cell(&record, primary),
            content_secondary: secondary.and_then(|i| cell(&record, i)),
        });
    }
    debug!(row_count = rows.len(), "Content table loaded");
    Ok(rows)
}

/// Load the existing-links table. Rows missing either end are skipped.
#[instrument(skip_all, fields(subsystem = "jobs", component = "input", op = "load_links"))]
pub fn load_links(path: &Path) -> Result<Vec<RawLink>> {
    let (mut reader, index) = open(path, TableKind::Links)?;
    index.require_all()?;
    let source = index.require(LINK_SOURCE)?;
    let destination = index.require(LINK_DESTINATION)?;

    let mut links = Vec::new();
    let mut skipped = 0usize;
    for record in reader.records() {
        let record = record?;
        match (cell(&record, source), cell(&record, destination)) {
            (Some(source_url), Some(destination_url)) => links.push(RawLink {
                source_url,
                destination_url,
            }),
            _ => skipped += 1,
        }
    }
    debug!(link_count = links.len(), skipped, "Links table loaded");
    Ok(links)
}

/// Load the performance table. Rows without a URL are skipped.
#[instrument(skip_all, fields(subsystem = "jobs", component = "input", op = "load_performance"))]
pub fn load_performance(path: &Path) -> Result<Vec<RawPerformanceRow>> {
    let (mut reader, index) = open(path, TableKind::Performance)?;
    index.require_all()?;
    let url = index.require(PERF_URL)?;
    let clicks = index.require(PERF_CLICKS)?;
    let impressions = index.require(PERF_IMPRESSIONS)?;
    let position = index.require(PERF_POSITION)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let Some(row_url) = cell(&record, url) else {
            continue;
        };
        rows.push(RawPerformanceRow {
            url: row_url,
            clicks: parse_count(cell(&record, clicks), index.decimal_comma),
            impressions: parse_count(cell(&record, impressions), index.decimal_comma),
            position: parse_position(cell(&record, position), index.decimal_comma),
        });
    }
    debug!(row_count = rows.len(), "Performance table loaded");
    Ok(rows)
}

/// Load every table named in `files`.
pub fn load_input(files: &InputFiles) -> Result<AnalysisInput> {
    Ok(AnalysisInput {
        pages: load_content(&files.content)?,
        links: match &files.links {
            Some(path) => load_links(path)?,
            None => Vec::new(),
        },
        performance: match &files.performance {
            Some(path) => load_performance(path)?,
            None => Vec::new(),
        },
    })
}

/// Template table: the expected headers followed by one example row.
pub fn sample_table(table: TableKind) -> Result<Vec<u8>> {
    let row: &[&str] = match table {
        TableKind::Content => &[
            "https://www.example.fr/blog/choisir-chaussures-trail",
            "Blog",
            "Comment choisir ses chaussures de trail",
            "Amorti, accroche et poids selon le terrain",
        ],
        TableKind::Links => &[
            "https://www.example.fr/blog/choisir-chaussures-trail",
            "https://www.example.fr/categorie/chaussures",
        ],
        TableKind::Performance => &[
            "https://www.example.fr/produit/chaussure-trail-x",
            "42",
            "1200",
            "7.3",
        ],
    };
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.columns())?;
    writer.write_record(row)?;
    writer
        .into_inner()
        .map_err(|e| Error::Internal(format!("sample {} table: {}", table, e)))
}

/// Sorted distinct normalized categories found in a content table. Only the
/// `Segments` column is required.
pub fn read_segments(path: &Path) -> Result<Vec<String>> {
    let (mut reader, index) = open(path, TableKind::Content)?;
    let segment = index.require(CONTENT_SEGMENT)?;

    let mut segments = BTreeSet::new();
    for record in reader.records() {
        let record = record?;
        if let Some(label) = cell(&record, segment) {
            segments.insert(normalize_category(Some(&label)).as_str().to_string());
        }
    }
    Ok(segments.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_table_kind_parse() {
        assert_eq!("content".parse::<TableKind>().unwrap(), TableKind::Content);
        assert_eq!(" Links ".parse::<TableKind>().unwrap(), TableKind::Links);
        assert_eq!("gsc".parse::<TableKind>().unwrap(), TableKind::Performance);
        assert!(matches!(
            "pages".parse::<TableKind>(),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_load_content_with_optional_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "content.csv",
            "Adresse,Segments,Extracteur 1 1,Extracteur 2 1\n\
             https://site.fr/a,Blog,Premier texte,Suite\n\
             https://site.fr/b,Produit,,\n",
        );
        let rows = load_content(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].url.as_deref(), Some("https://site.fr/a"));
        assert_eq!(rows[0].content_secondary.as_deref(), Some("Suite"));
        assert_eq!(rows[1].content_primary, None);
    }

    #[test]
    fn test_load_content_semicolon_and_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "content.csv",
            "\u{feff}Adresse;Segments;Extracteur 1 1\n/a;blog;texte, avec virgule\n",
        );
        let rows = load_content(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].content_primary.as_deref(), Some("texte, avec virgule"));
        assert_eq!(rows[0].content_secondary, None);
    }

    #[test]
    fn test_missing_column_is_named() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "content.csv", "Adresse,Segments\n/a,blog\n");
        let err = load_content(&path).unwrap_err();
        match err {
            Error::InvalidInput(msg) => assert!(msg.contains("Extracteur 1 1"), "{}", msg),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_links(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_load_links_skips_incomplete_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "links.csv",
            "Source,Destination,Ancre\n/a,/b,texte\n/a,,x\n,/c,y\n",
        );
        let links = load_links(&path).unwrap();
        assert_eq!(
            links,
            vec![RawLink {
                source_url: "/a".into(),
                destination_url: "/b".into()
            }]
        );
    }

    #[test]
    fn test_load_performance_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "gsc.csv",
            "URL;Clics;Impressions;Position\n\
             /a;12;1 200;4,5\n\
             /b;;;\n\
             ;3;4;5\n\
             /c;n/a;-4;abc\n",
        );
        let rows = load_performance(&path).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].clicks, 12);
        assert_eq!(rows[0].impressions, 1200);
        assert!((rows[0].position - 4.5).abs() < 1e-9);
        assert_eq!(rows[1].clicks, 0);
        assert!(rows[1].position.is_nan());
        assert_eq!(rows[2].url, "/c");
        assert_eq!(rows[2].clicks, 0);
        assert_eq!(rows[2].impressions, 0);
    }

    #[test]
    fn test_comma_digit_groups_in_comma_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "gsc.csv",
            "URL,Clics,Impressions,Position\n\
             /a,\"1,234\",\"56,789\",3.2\n\
             /b,\"1,234,567\",\"12,5\",\"4,5\"\n",
        );
        let rows = load_performance(&path).unwrap();
        assert_eq!(rows[0].clicks, 1234);
        assert_eq!(rows[0].impressions, 56789);
        assert!((rows[0].position - 3.2).abs() < 1e-9);
        assert_eq!(rows[1].clicks, 1_234_567);
        assert_eq!(rows[1].impressions, 13);
        assert!((rows[1].position - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_number_separators() {
        assert_eq!(parse_number("1,234", false), Some(1234.0));
        assert_eq!(parse_number("4,5", false), Some(4.5));
        assert_eq!(parse_number("1,234", true), Some(1.234));
        assert_eq!(parse_number("1.234,5", false), Some(1234.5));
        assert_eq!(parse_number("1,234.5", true), Some(1234.5));
        assert_eq!(parse_number("12\u{a0}345", true), Some(12345.0));
        assert_eq!(parse_number("n/a", false), None);
    }

    #[test]
    fn test_sample_tables_load() {
        let dir = tempfile::tempdir().unwrap();
        for table in [TableKind::Content, TableKind::Links, TableKind::Performance] {
            let path = dir.path().join(format!("sample-{}.csv", table));
            std::fs::write(&path, sample_table(table).unwrap()).unwrap();
            validate_columns(&path, table).unwrap();
        }

        let content = load_content(&dir.path().join("sample-content.csv")).unwrap();
        assert_eq!(content.len(), 1);
        assert!(content[0].content_secondary.is_some());
        let links = load_links(&dir.path().join("sample-links.csv")).unwrap();
        assert_eq!(links.len(), 1);
        let perf = load_performance(&dir.path().join("sample-performance.csv")).unwrap();
        assert_eq!(perf[0].clicks, 42);
        assert!((perf[0].position - 7.3).abs() < 1e-9);
    }

    #[test]
    fn test_validate_columns() {
        let dir = tempfile::tempdir().unwrap();
        let good = write(&dir, "links.csv", "Source,Destination\n");
        let bad = write(&dir, "bad.csv", "URL,Clics\n");
        assert!(validate_columns(&good, TableKind::Links).is_ok());
        assert!(matches!(
            validate_columns(&bad, TableKind::Performance),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_load_input_optional_tables() {
        let dir = tempfile::tempdir().unwrap();
        let content = write(&dir, "c.csv", "Adresse,Segments,Extracteur 1 1\n/a,blog,texte\n");
        let input = load_input(&InputFiles::content_only(&content)).unwrap();
        assert_eq!(input.pages.len(), 1);
        assert!(input.links.is_empty());
        assert!(input.performance.is_empty());
    }

    #[test]
    fn test_read_segments_normalized_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "c.csv",
            "Adresse,Segments\n/a,Produits\n/b,Blog Article\n/c,\n/d,Landing\n/e,Categories\n/f,blog\n",
        );
        assert_eq!(
            read_segments(&path).unwrap(),
            vec!["blog", "categorie", "landing", "produit"]
        );
    }
}
