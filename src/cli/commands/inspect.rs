//! Inspect command - show what a cache file holds

use crate::cache::{CacheHandle, ItemGroupKind};
use crate::cli::args::{InspectArgs, OutputFormat};
use crate::error::{AssetsError, AssetsResult};
use chrono::{DateTime, Local};
use console::style;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Summary of one cache file
#[derive(Debug, Serialize)]
struct CacheSummary {
    path: String,
    version: i32,
    fingerprint: String,
    strings: usize,
    modified: Option<String>,
    groups: Vec<GroupSummary>,
}

#[derive(Debug, Serialize)]
struct GroupSummary {
    name: &'static str,
    items: usize,
}

/// Execute the inspect command
pub async fn execute(args: InspectArgs) -> AssetsResult<()> {
    let path = args.cache;
    let summary = tokio::task::spawn_blocking(move || summarize(&path))
        .await
        .map_err(|e| AssetsError::Internal(format!("inspect task failed: {}", e)))??;

    match args.format {
        OutputFormat::Table => print_table(&summary),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Plain => {
            for group in &summary.groups {
                println!("{}\t{}", group.name, group.items);
            }
        }
    }

    Ok(())
}

/// Read the header and every group, without checking the fingerprint
fn summarize(path: &Path) -> AssetsResult<CacheSummary> {
    let file = File::open(path)
        .map_err(|e| AssetsError::io(format!("opening {}", path.display()), e))?;
    let modified = file
        .metadata()
        .and_then(|m| m.modified())
        .ok()
        .map(|t| DateTime::<Local>::from(t).to_rfc3339());

    let mut handle = CacheHandle::inspect(BufReader::new(file))?;
    let header = handle.header().clone();
    let strings = handle.strings().len();

    let mut groups = Vec::with_capacity(ItemGroupKind::ALL.len());
    while let Some(kind) = handle.next_group() {
        let items = handle.read_item_group()?;
        groups.push(GroupSummary {
            name: kind.name(),
            items: items.len(),
        });
    }

    Ok(CacheSummary {
        path: path.display().to_string(),
        version: header.version,
        fingerprint: header.fingerprint.to_hex(),
        strings,
        modified,
        groups,
    })
}

fn print_table(summary: &CacheSummary) {
    println!("{:<14} {}", "Cache:", summary.path);
    println!("{:<14} {}", "Version:", summary.version);
    println!("{:<14} {}", "Fingerprint:", summary.fingerprint);
    println!("{:<14} {}", "Strings:", summary.strings);
    if let Some(ref modified) = summary.modified {
        println!("{:<14} {}", "Modified:", modified);
    }
    println!();

    println!("{:<30} {:>8}", "GROUP", "ITEMS");
    println!("{}", "-".repeat(39));
    for group in &summary.groups {
        let count = if group.items == 0 {
            style(group.items.to_string()).dim()
        } else {
            style(group.items.to_string()).cyan()
        };
        println!("{:<30} {:>8}", group.name, count);
    }
}
