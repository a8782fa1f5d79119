//! Resolve command - resolve and print package assets

use crate::cache::{Item, ResolveSettings};
use crate::cli::args::{OutputFormat, ResolveArgs};
use crate::config::Config;
use crate::error::{AssetsError, AssetsResult};
use crate::resolve::{default_cache_path, resolve, ResolveRequest, ResolvedAssets};
use console::style;
use serde_json::{json, Map, Value};
use tracing::debug;

/// Execute the resolve command
pub async fn execute(args: ResolveArgs, config: &Config) -> AssetsResult<()> {
    let format = args.format;
    let request = build_request(args, config);
    debug!(
        "Resolving {} for {} (fingerprint {})",
        request.graph_path.display(),
        request.settings.target_framework,
        request.settings.fingerprint()
    );

    let assets = tokio::task::spawn_blocking(move || resolve(&request, None))
        .await
        .map_err(|e| AssetsError::Internal(format!("resolve task failed: {}", e)))??;

    match format {
        OutputFormat::Table => print_table(&assets),
        OutputFormat::Json => print_json(&assets)?,
        OutputFormat::Plain => print_plain(&assets),
    }

    Ok(())
}

/// Combine command-line arguments with configured defaults.
///
/// Switches given on the command line can only turn a behavior on.
fn build_request(args: ResolveArgs, config: &Config) -> ResolveRequest {
    let defaults = &config.resolve;

    let mut settings = ResolveSettings::new(args.project, args.framework);
    settings.runtime_identifier = args.rid;
    settings.project_language = Some(
        args.language
            .unwrap_or_else(|| defaults.project_language.clone()),
    );
    settings.ensure_runtime_package_dependencies =
        args.ensure_runtime_package_dependencies || defaults.ensure_runtime_package_dependencies;
    settings.disable_framework_assemblies =
        args.disable_framework_assemblies || defaults.disable_framework_assemblies;
    settings.disable_transitive_project_references = args.disable_transitive_project_references
        || defaults.disable_transitive_project_references;
    settings.mark_package_references_as_externally_resolved =
        defaults.mark_package_references_as_externally_resolved;
    settings.satellite_resource_languages = if args.satellite_languages.is_empty() {
        defaults.satellite_resource_languages.clone()
    } else {
        Some(args.satellite_languages)
    };
    settings.copy_local_runtime_target_assets =
        args.copy_local_runtime_targets || defaults.copy_local_runtime_target_assets;
    settings.copy_local_package_exclusions = defaults
        .copy_local_package_exclusions
        .iter()
        .cloned()
        .chain(args.no_copy_local)
        .collect();
    settings.exclude_from_publish = defaults
        .exclude_from_publish
        .iter()
        .cloned()
        .chain(args.exclude_from_publish)
        .collect();

    let cache_path = args
        .cache
        .unwrap_or_else(|| default_cache_path(&args.graph, &config.cache.file_name));

    ResolveRequest {
        graph_path: args.graph,
        cache_path,
        settings,
        emit_log_messages: defaults.emit_log_messages,
        cache_enabled: config.cache.enabled && !args.no_cache,
        design_time_build: args.design_time || defaults.design_time_build,
    }
}

fn print_table(assets: &ResolvedAssets) {
    for (kind, items) in assets.groups.iter() {
        if items.is_empty() {
            continue;
        }

        println!("{} ({})", style(kind.name()).bold(), items.len());
        for item in items {
            println!("  {}", item.spec);
            for (key, value) in &item.metadata {
                println!("    {}", style(format!("{}={}", key, value)).dim());
            }
        }
        println!();
    }

    let cache_state = if assets.regenerated {
        style("regenerated").yellow()
    } else {
        style("up to date").green()
    };
    println!(
        "Total: {} item(s), cache {}",
        assets.groups.total(),
        cache_state
    );
}

fn item_json(item: &Item) -> Value {
    let metadata: Map<String, Value> = item
        .metadata
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    json!({ "spec": item.spec, "metadata": metadata })
}

fn assets_json(assets: &ResolvedAssets) -> Value {
    let groups: Map<String, Value> = assets
        .groups
        .iter()
        .map(|(kind, items)| {
            (
                kind.name().to_string(),
                Value::Array(items.iter().map(item_json).collect()),
            )
        })
        .collect();
    json!({ "regenerated": assets.regenerated, "groups": groups })
}

fn print_json(assets: &ResolvedAssets) -> AssetsResult<()> {
    println!("{}", serde_json::to_string_pretty(&assets_json(assets))?);
    Ok(())
}

fn print_plain(assets: &ResolvedAssets) {
    for (kind, items) in assets.groups.iter() {
        for item in items {
            println!("{}\t{}", kind.name(), item.spec);
        }
    }
}
