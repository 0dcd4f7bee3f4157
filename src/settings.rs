use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StackbookError};
use crate::folders::{resolve_folder, FolderLayout};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderNames {
    #[serde(default = "default_processed")]
    pub processed: String,
    #[serde(default = "default_needs_review")]
    pub needs_review: String,
    #[serde(default = "default_duplicate")]
    pub duplicate: String,
    #[serde(default = "default_logs")]
    pub logs: String,
}

fn default_processed() -> String {
    "Processed".to_string()
}

fn default_needs_review() -> String {
    "Needs Review".to_string()
}

fn default_duplicate() -> String {
    "Duplicate".to_string()
}

fn default_logs() -> String {
    "logs".to_string()
}

impl Default for FolderNames {
    fn default() -> Self {
        Self {
            processed: default_processed(),
            needs_review: default_needs_review(),
            duplicate: default_duplicate(),
            logs: default_logs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_site")]
    pub site: String,
    #[serde(default = "default_hero_name")]
    pub hero_name: String,
    #[serde(default = "default_input_dir")]
    pub input_dir: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default = "default_session_gap_minutes")]
    pub session_gap_minutes: i64,
    #[serde(default = "default_file_extension")]
    pub file_extension: String,
    #[serde(default)]
    pub folders: FolderNames,
    #[serde(default = "default_log_file_name")]
    pub log_file_name: String,
}

fn default_site() -> String {
    "GG".to_string()
}

fn default_hero_name() -> String {
    "Hero".to_string()
}

fn default_input_dir() -> String {
    data_dir().join("summaries").to_string_lossy().to_string()
}

fn default_db_path() -> String {
    data_dir().join("stackbook.db").to_string_lossy().to_string()
}

fn default_session_gap_minutes() -> i64 {
    60
}

fn default_file_extension() -> String {
    ".txt".to_string()
}

fn default_log_file_name() -> String {
    "import_log.jsonl".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            site: default_site(),
            hero_name: default_hero_name(),
            input_dir: default_input_dir(),
            db_path: default_db_path(),
            dry_run: false,
            session_gap_minutes: default_session_gap_minutes(),
            file_extension: default_file_extension(),
            folders: FolderNames::default(),
            log_file_name: default_log_file_name(),
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("stackbook")
}

pub fn default_settings_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("stackbook")
        .join("settings.json")
}

/// Missing file means defaults; a file that does not parse is an error.
pub fn load_settings(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| StackbookError::Settings(format!("{}: {e}", path.display())))
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Some(home) = dirs::home_dir() {
            return format!("{}{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Settings with paths expanded and folders resolved, ready for one run.
#[derive(Debug, Clone)]
pub struct ImportConfig {
    pub site: String,
    pub hero_name: String,
    pub input_dir: PathBuf,
    pub db_path: PathBuf,
    pub dry_run: bool,
    pub session_gap_minutes: i64,
    pub file_extension: String,
    pub folders: FolderLayout,
}

impl ImportConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        if settings.session_gap_minutes < 0 {
            return Err(StackbookError::Settings(format!(
                "session_gap_minutes must not be negative (got {})",
                settings.session_gap_minutes
            )));
        }
        let input_dir = PathBuf::from(shellexpand_path(&settings.input_dir));
        let logs_dir = resolve_folder(&input_dir, &settings.folders.logs);
        let folders = FolderLayout {
            processed_dir: resolve_folder(&input_dir, &settings.folders.processed),
            needs_review_dir: resolve_folder(&input_dir, &settings.folders.needs_review),
            duplicate_dir: resolve_folder(&input_dir, &settings.folders.duplicate),
            log_path: logs_dir.join(&settings.log_file_name),
            logs_dir,
        };
        let file_extension = if settings.file_extension.starts_with('.') {
            settings.file_extension.clone()
        } else {
            format!(".{}", settings.file_extension)
        };
        Ok(Self {
            site: settings.site.clone(),
            hero_name: settings.hero_name.clone(),
            db_path: PathBuf::from(shellexpand_path(&settings.db_path)),
            input_dir,
            dry_run: settings.dry_run,
            session_gap_minutes: settings.session_gap_minutes,
            file_extension,
            folders,
        })
    }
}
