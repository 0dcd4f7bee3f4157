use std::path::Path;

use crate::db::{count_results, get_connection};
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::importer::list_input_files;
use crate::settings::{load_settings, ImportConfig};

pub fn run(config_path: &Path) -> Result<()> {
    let settings = load_settings(config_path)?;
    let cfg = ImportConfig::from_settings(&settings)?;

    println!("Settings:   {}", config_path.display());
    println!("Site:       {} (hero: {})", cfg.site, cfg.hero_name);
    println!("Input dir:  {}", cfg.input_dir.display());
    println!("Log file:   {}", cfg.folders.log_path.display());
    println!("Database:   {}", cfg.db_path.display());

    if cfg.db_path.exists() {
        let size = std::fs::metadata(&cfg.db_path)?.len();
        println!("DB size:    {}", format_bytes(size));
        let conn = get_connection(&cfg.db_path)?;
        println!();
        println!("Stored results:  {}", count_results(&conn)?);
    } else {
        println!();
        println!("Database not found. Run `stackbook init` to set up.");
    }

    match list_input_files(&cfg) {
        Ok(files) => println!("Waiting files:   {}", files.len()),
        Err(e) => println!("Waiting files:   - ({e})"),
    }
    Ok(())
}
