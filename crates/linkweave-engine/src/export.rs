//! Flat tabular export of suggestions.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use linkweave_core::{defaults, Result, Suggestion};

/// Column headers of the exported table.
pub const HEADERS: [&str; 7] = [
    "Source URL",
    "Source Category",
    "Target URL",
    "Target Category",
    "Similarity Score",
    "Final Score",
    "Anchor Suggestions",
];

/// Write suggestions as CSV to any writer.
pub fn write_csv<W: Write>(writer: W, suggestions: &[Suggestion]) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(HEADERS)?;
    for s in suggestions {
        let similarity = format!("{:.4}", s.similarity_score);
        let final_score = format!("{:.4}", s.final_score);
        let anchors = s.joined_anchors();
        out.write_record([
            s.source_url.as_str(),
            s.source_category.as_str(),
            s.target_url.as_str(),
            s.target_category.as_str(),
            similarity.as_str(),
            final_score.as_str(),
            anchors.as_str(),
        ])?;
    }
    out.flush()?;
    Ok(())
}

/// File name for a job's result artifact.
pub fn result_file_name(job_id: Uuid, at: DateTime<Utc>) -> String {
    format!(
        "{}_{}_{}.csv",
        defaults::RESULT_FILE_PREFIX,
        at.format("%Y%m%d_%H%M%S"),
        job_id.simple()
    )
}

/// Write suggestions to `dir/<result_file_name>`, creating `dir` if needed.
/// Returns the written path.
///
/// The table is written under a `.partial` name and renamed once complete,
/// so the final name only ever holds a whole file.
pub fn write_result_file(dir: &Path, job_id: Uuid, suggestions: &[Suggestion]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(result_file_name(job_id, Utc::now()));
    let partial = path.with_extension("csv.partial");
    let written = std::fs::File::create(&partial)
        .map_err(Into::into)
        .and_then(|file| write_csv(std::io::BufWriter::new(file), suggestions))
        .and_then(|()| std::fs::rename(&partial, &path).map_err(Into::into));
    if let Err(e) = written {
        let _ = std::fs::remove_file(&partial);
        return Err(e);
    }
    Ok(path)
}
