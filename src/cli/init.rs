use std::path::Path;

use crate::db;
use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path, ImportConfig};

pub fn run(config_path: &Path, input_dir: Option<String>, db_path: Option<String>) -> Result<()> {
    let mut settings = load_settings(config_path)?;
    if let Some(dir) = input_dir {
        settings.input_dir = shellexpand_path(&dir);
    }
    if let Some(path) = db_path {
        settings.db_path = shellexpand_path(&path);
    }
    save_settings(config_path, &settings)?;

    let cfg = ImportConfig::from_settings(&settings)?;
    std::fs::create_dir_all(&cfg.input_dir)?;
    cfg.folders.ensure_dirs()?;
    db::open(&cfg.db_path)?;

    println!("Settings:   {}", config_path.display());
    println!("Input dir:  {}", cfg.input_dir.display());
    println!("Database:   {}", cfg.db_path.display());
    Ok(())
}
