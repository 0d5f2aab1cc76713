use std::fs;
use std::path::Path;

use transcript_wer::Report;

use crate::json_report_formatter::create_parent_dir;

pub fn write_report(path: &Path, report: &Report) -> Result<(), String> {
    create_parent_dir(path)?;
    fs::write(path, report.to_html())
        .map_err(|err| format!("Failed to write HTML report '{}': {err}", path.display()))
}
