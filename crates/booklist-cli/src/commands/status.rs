//! Status command handler

use anyhow::Result;

use booklist_core::{LoadSource, Store};

use crate::output::{Output, OutputFormat};

fn load_source_name(source: LoadSource) -> &'static str {
    match source {
        LoadSource::Primary => "snapshot",
        LoadSource::Backup => "backup",
        LoadSource::Empty => "empty",
    }
}

/// Show status information
pub fn show(store: &Store, output: &Output) -> Result<()> {
    let stats = store.stats();
    let config = store.config();

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "loaded_from": load_source_name(stats.load_source),
                    "unsaved_changes": stats.dirty,
                    "cover_renderer": store.cover_renderer(),
                    "autosave_interval_secs": config.autosave_interval().as_secs(),
                    "storage": {
                        "snapshot_exists": stats.storage.snapshot_exists,
                        "backup_exists": stats.storage.backup_exists,
                        "snapshot_size": stats.storage.snapshot_size,
                        "backup_size": stats.storage.backup_size,
                        "total_size": stats.storage.total_size()
                    },
                    "counts": {
                        "books": stats.books,
                        "files": stats.files,
                        "covers": stats.covers
                    }
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", stats.books);
        }
        OutputFormat::Human => {
            println!("Booklist Status");
            println!("===============");
            println!();
            println!("Storage:");
            println!("  Location:    {}", config.data_dir.display());
            println!("  Loaded from: {}", load_source_name(stats.load_source));
            println!(
                "  Backup:      {}",
                if stats.storage.backup_exists {
                    "present"
                } else {
                    "none"
                }
            );
            println!("  Size:        {}", stats.storage.total_size_human());
            println!();
            println!("Settings:");
            println!("  Autosave:    every {:?}", config.autosave_interval());
            println!("  Covers:      {}", store.cover_renderer());
            println!();
            println!("Contents:");
            println!("  Books:  {}", stats.books);
            println!("  Files:  {}", stats.files);
            println!("  Covers: {}", stats.covers);
        }
    }

    Ok(())
}
