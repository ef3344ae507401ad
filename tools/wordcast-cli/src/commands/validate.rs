//! Dry run over a record folder.

use std::path::PathBuf;

use wordcast_common::config::AppConfig;
use wordcast_project_model::entry::{find_name_collisions, RecordSet};

pub fn run(
    config: &AppConfig,
    json_folder: PathBuf,
    image_folder: PathBuf,
    output_folder: Option<PathBuf>,
) -> anyhow::Result<()> {
    println!("Validating records in: {}", json_folder.display());

    let records = RecordSet::load(&json_folder)
        .map_err(|e| anyhow::anyhow!("Failed to load records: {e}"))?;
    let entries: Vec<_> = records.entries().cloned().collect();
    let extension = config.export.format.extension();

    println!("  Record files: {}", records.files.len());
    println!("  Entries: {}", entries.len());

    let mut issues = 0usize;
    for (path, reason) in &records.failures {
        println!("  [ERR] {}: {reason}", path.display());
        issues += 1;
    }

    let mut pending = 0usize;
    for entry in &entries {
        let image = entry.resolve_image(&image_folder);
        let existing = output_folder
            .as_ref()
            .map(|dir| entry.output_path(dir, extension))
            .filter(|path| path.exists());

        match (&image, &existing) {
            (_, Some(path)) => println!("  [SKIP] {} (exists: {})", entry.name, path.display()),
            (None, None) => {
                println!("  [MISSING] {}: no image for id '{}'", entry.name, entry.image_id);
                issues += 1;
            }
            (Some(path), None) => {
                println!("  [OK] {} <- {}", entry.name, path.display());
                pending += 1;
            }
        }
    }

    for collision in find_name_collisions(&entries) {
        let names: Vec<&str> = collision
            .indices
            .iter()
            .map(|&i| entries[i].name.as_str())
            .collect();
        println!(
            "  [COLLISION] {}.{extension} shared by {}; only the first is rendered",
            collision.stem,
            names.join(", ")
        );
        issues += 1;
    }

    println!();
    if issues == 0 {
        println!("{pending} entries ready to render.");
    } else {
        println!("{pending} entries ready to render, {issues} issue(s) found.");
    }

    Ok(())
}
