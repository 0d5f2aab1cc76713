use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use transcript_wer::Report;

pub fn write_report(path: &Path, report: &Report) -> Result<(), String> {
    create_parent_dir(path)?;
    let mut file = File::create(path)
        .map_err(|err| format!("Failed to create JSON report '{}': {err}", path.display()))?;
    serde_json::to_writer_pretty(&mut file, report)
        .map_err(|err| format!("Failed to serialize JSON report '{}': {err}", path.display()))?;
    file.write_all(b"\n")
        .map_err(|err| format!("Failed to finalize JSON report '{}': {err}", path.display()))?;
    Ok(())
}

pub(crate) fn create_parent_dir(path: &Path) -> Result<(), String> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|err| {
                format!(
                    "Failed to create report output directory '{}': {err}",
                    parent.display()
                )
            })
        }
        _ => Ok(()),
    }
}
