use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use compatkit_ctmods::CompatTool;
use compatkit_file_ops::{
    InstallTarget, LocationRegistry, folder_name_from_label, list_installed_tools, remove_tool,
    sort_tool_names,
};
use compatkit_settings::{Config, config_path};
use compatkit_steam::{AppListCache, Paths, find_games_using_tool, is_mapping_unavailable};
use compatkit_transfer::ProgressReporter;

fn registry() -> LocationRegistry {
    let registry = LocationRegistry::new();
    registry.ensure_compat_tools_folders();
    registry
}

fn active_install_dir(registry: &LocationRegistry, config: &mut Config) -> Result<PathBuf> {
    registry
        .resolve_active_install_directory(config, InstallTarget::Get)
        .context("no install location found; install Steam or Lutris, or run `compatkit use <dir>`")
}

fn find_tool(id: &str) -> Result<Box<dyn CompatTool>> {
    if let Some(tool) = compatkit_ctmods::tool_by_id(id)? {
        return Ok(tool);
    }
    let known: Vec<_> = compatkit_ctmods::available_tools()?
        .iter()
        .map(|t| t.id())
        .collect();
    bail!("unknown tool {id:?}; available: {}", known.join(", "))
}

pub fn locations(config: &mut Config) -> Result<()> {
    let registry = registry();
    let active = registry.resolve_active_install_directory(config, InstallTarget::Get);

    for loc in registry.locations() {
        let dir = registry.expand(&loc.install_dir);
        let marker = if active.as_ref() == Some(&dir) { "*" } else { " " };
        let state = if dir.exists() { "" } else { " (not found)" };
        println!(
            "{marker} {:<16} {:<8} {}{state}",
            loc.display_name,
            loc.launcher,
            dir.display()
        );
    }

    if let Some(dir) = active {
        let loc = registry.resolve_location_from_directory(&dir);
        if loc.is_unknown() {
            println!("* {:<16} {:<8} {}", loc.display_name, "", dir.display());
        }
    }
    Ok(())
}

pub fn use_location(config: &mut Config, dir: &str) -> Result<()> {
    if config.path().is_none() {
        bail!(
            "configuration at {} could not be loaded; fix or remove it before selecting a location",
            config_path().display()
        );
    }

    let target = if dir == "default" {
        InstallTarget::Default
    } else {
        InstallTarget::Path(PathBuf::from(dir))
    };

    let registry = registry();
    let resolved = registry
        .resolve_active_install_directory(config, target)
        .context("no install locations are known")?;

    let loc = registry.resolve_location_from_directory(&resolved);
    println!("active install location: {} ({})", resolved.display(), loc.display_name);
    if !resolved.exists() {
        tracing::warn!(path = %resolved.display(), "install location does not exist yet");
    }
    Ok(())
}

pub fn list(config: &mut Config) -> Result<()> {
    let registry = registry();
    let install_dir = active_install_dir(&registry, config)?;

    let tools = list_installed_tools(&install_dir);
    let folders: Vec<&str> = tools.iter().map(|t| t.folder_name.as_str()).collect();

    for name in sort_tool_names(&folders) {
        if let Some(tool) = tools.iter().find(|t| t.folder_name == name) {
            println!("{tool}");
        }
    }
    Ok(())
}

pub async fn remove(config: &mut Config, label: &str, force: bool) -> Result<()> {
    let registry = registry();
    let install_dir = active_install_dir(&registry, config)?;
    let location = registry.resolve_location_from_directory(&install_dir);

    if location.launcher == "steam" && !force {
        ensure_unused_by_steam(folder_name_from_label(label), &install_dir).await?;
    }

    if remove_tool(label, &install_dir)? {
        println!("removed {}", folder_name_from_label(label));
    } else {
        println!("{} is not installed in {}", folder_name_from_label(label), install_dir.display());
    }
    Ok(())
}

async fn ensure_unused_by_steam(tool_name: &str, install_dir: &Path) -> Result<()> {
    let steam_root = install_dir
        .parent()
        .map(Paths::with_base)
        .map_or_else(Paths::new, Ok)?;
    let mapping_file = steam_root.config_vdf_path();

    let games = find_games_using_tool(tool_name, &mapping_file);
    if is_mapping_unavailable(&games) {
        bail!(
            "cannot read Steam's tool assignments from {}; use --force to remove anyway",
            mapping_file.display()
        );
    }
    if games.is_empty() {
        return Ok(());
    }

    let cache = AppListCache::new(AppListCache::default_path());
    let client = reqwest::Client::new();
    if let Err(e) = cache.refresh(&client, false).await {
        tracing::warn!("failed to download Steam app list: {e}");
    }

    let ids: Vec<u32> = games.iter().filter_map(|id| id.parse().ok()).collect();
    let names = cache.game_names_by_ids(&ids);

    eprintln!("{tool_name} is used by:");
    for id in &games {
        let name = id
            .parse::<u32>()
            .ok()
            .and_then(|id| names.get(&id))
            .map(String::as_str)
            .unwrap_or("unknown game");
        eprintln!("  {name} ({id})");
    }
    bail!("{tool_name} is in use; reassign these games or pass --force")
}

pub async fn releases(tool_id: &str, limit: u32) -> Result<()> {
    let tool = find_tool(tool_id)?;
    let tags = tool.fetch_releases(limit).await;
    if tags.is_empty() {
        bail!("no releases found for {}", tool.name());
    }
    for tag in tags {
        println!("{tag}");
    }
    Ok(())
}

fn ensure_supported_launcher(tool: &dyn CompatTool, launcher: &str, location: &str) -> Result<()> {
    let supported = compatkit_ctmods::tools_for_launcher(launcher)?;
    if supported.iter().any(|t| t.id() == tool.id()) {
        return Ok(());
    }
    let ids: Vec<_> = supported.iter().map(|t| t.id()).collect();
    bail!(
        "{} cannot be installed for {location}; tools for {launcher}: {}",
        tool.name(),
        if ids.is_empty() { "none".to_string() } else { ids.join(", ") }
    )
}

pub async fn install(
    config: &mut Config,
    tool_id: &str,
    version: &str,
    temp_dir: Option<PathBuf>,
) -> Result<()> {
    let tool = find_tool(tool_id)?;
    let registry = registry();
    let install_dir = active_install_dir(&registry, config)?;

    let location = registry.resolve_location_from_directory(&install_dir);
    if !location.is_unknown() {
        ensure_supported_launcher(&*tool, &location.launcher, &location.display_name)?;
    }

    let temp_dir = temp_dir.unwrap_or_else(|| std::env::temp_dir().join("compatkit"));

    let (reporter, mut rx) = ProgressReporter::channel();
    let printer = tokio::spawn(async move {
        while let Some(percent) = rx.recv().await {
            eprint!("\r{percent:>3}%");
        }
        eprintln!();
    });

    let installed = tool
        .install(version, &install_dir, &temp_dir, &reporter)
        .await;
    drop(reporter);
    let _ = printer.await;

    if !installed {
        bail!("installing {} {version} failed; see the log above", tool.name());
    }
    println!("installed {} {version} into {}", tool.name(), install_dir.display());
    Ok(())
}

pub async fn info(tool_id: &str, version: &str) -> Result<()> {
    let tool = find_tool(tool_id)?;
    let meta = tool
        .fetch_release_metadata(version)
        .await
        .with_context(|| format!("release {version} not found for {}", tool.name()))?;

    println!("{} {}", tool.name(), meta.version);
    println!("{}", tool.description());
    if let Some(date) = meta.publish_date {
        println!("published: {date}");
    }
    match (&meta.download_url, meta.size_bytes) {
        (Some(url), Some(size)) => println!("download:  {url} ({size} bytes)"),
        (Some(url), None) => println!("download:  {url}"),
        (None, _) => println!("download:  no matching asset"),
    }
    println!("details:   {}", tool.release_info_url(&meta.version));
    Ok(())
}
