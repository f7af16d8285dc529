use std::path::{Path, PathBuf};

use crate::gap::*;

pub fn simplify_file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// The sub-directory holding the files of a category in an input root.
pub fn conventional_directory(category: Category) -> String {
    format!("api_data_aadhar_{}", category.name())
}

/// All the CSV files of a directory, sorted by path.
pub fn discover_csv_files(dir: &Path) -> GapResult<Vec<PathBuf>> {
    let dir_s = dir.display().to_string();
    ensure!(dir.is_dir(), MissingSourceDirSnafu { path: &dir_s });

    let mut files: Vec<PathBuf> = Vec::new();
    for entry_r in fs::read_dir(dir).context(ListingDirSnafu { path: &dir_s })? {
        let entry = entry_r.context(ListingDirSnafu { path: &dir_s })?;
        let p = entry.path();
        let is_csv = p
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if p.is_file() && is_csv {
            files.push(p);
        }
    }
    files.sort();
    ensure!(!files.is_empty(), NoCsvFilesSnafu { path: dir_s });
    Ok(files)
}
