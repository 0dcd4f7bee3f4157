use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::router::Destination;

/// Resolved destination folders and the import log location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderLayout {
    pub processed_dir: PathBuf,
    pub needs_review_dir: PathBuf,
    pub duplicate_dir: PathBuf,
    pub logs_dir: PathBuf,
    pub log_path: PathBuf,
}

impl FolderLayout {
    pub fn dir_for(&self, destination: Destination) -> &Path {
        match destination {
            Destination::Processed => &self.processed_dir,
            Destination::NeedsReview => &self.needs_review_dir,
            Destination::Duplicate => &self.duplicate_dir,
        }
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [
            &self.processed_dir,
            &self.needs_review_dir,
            &self.duplicate_dir,
            &self.logs_dir,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

/// Relative folder names live under the input directory.
pub fn resolve_folder(input_dir: &Path, folder: &str) -> PathBuf {
    let p = PathBuf::from(folder);
    if p.is_absolute() {
        p
    } else {
        input_dir.join(p)
    }
}

fn free_name(dest_dir: &Path, src: &Path) -> PathBuf {
    let file_name = src.file_name().map(PathBuf::from).unwrap_or_default();
    let dest = dest_dir.join(&file_name);
    if !dest.exists() {
        return dest;
    }

    let stem = src.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = src
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");

    let mut candidate = dest_dir.join(format!("{stem}_{stamp}{ext}"));
    let mut counter = 1;
    while candidate.exists() {
        candidate = dest_dir.join(format!("{stem}_{stamp}_{counter}{ext}"));
        counter += 1;
    }
    candidate
}

/// Move `src` into `dest_dir` without overwriting; a clashing name gets a
/// timestamp suffix. Returns the final path.
pub fn move_with_suffix(src: &Path, dest_dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dest_dir)?;
    let dest = free_name(dest_dir, src);
    relocate(src, &dest)?;
    debug!(from = %src.display(), to = %dest.display(), "moved");
    Ok(dest)
}

/// Rename `src` to `dest`, copying across filesystems. On failure exactly one
/// of the two paths exists.
pub fn relocate(src: &Path, dest: &Path) -> Result<()> {
    match std::fs::rename(src, dest) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            std::fs::copy(src, dest)?;
            if let Err(e) = std::fs::remove_file(src) {
                let _ = std::fs::remove_file(dest);
                return Err(e.into());
            }
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
