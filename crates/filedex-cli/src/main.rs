mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::process;

use chrono::{Local, TimeZone};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use filedex_core::catalog::{FileType, SearchParams};
use filedex_core::{config, detector, AppConfig, Catalog, JobSupervisor};
use indicatif::HumanBytes;
use tracing::{error, info};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    match args.command {
        Some(Commands::Index { paths }) => {
            if let Err(err) = run_index(&config, paths) {
                error!("Error: {}", err);
            }
        }
        Some(Commands::Scan { root }) => {
            if let Err(err) = run_scan(&config, root) {
                error!("Error: {}", err);
            }
        }
        Some(Commands::Groups { root, limit }) => {
            if let Err(err) = run_groups(&config, root.as_deref(), limit) {
                error!("Error: {}", err);
            }
        }
        Some(Commands::Search {
            query,
            ext,
            file_type,
            limit,
        }) => {
            if let Err(err) = run_search(&config, query, ext, file_type, limit) {
                error!("Error: {}", err);
            }
        }
        Some(Commands::Status) => {
            if let Err(err) = run_status(&config) {
                error!("Error: {}", err);
            }
        }
        Some(Commands::Delete { paths, yes }) => {
            if let Err(err) = run_delete(&config, paths, yes) {
                error!("Error: {}", err);
            }
        }
        Some(Commands::History { limit }) => {
            if let Err(err) = run_history(&config, limit) {
                error!("Error: {}", err);
            }
        }
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
        }
        Some(Commands::TruncateDb) => {
            match prompt_confirm(
                "Are you SURE you want to COMPLETELY DELETE the catalog?",
                Some(false),
            ) {
                Ok(true) => match Catalog::open(&config.db_path) {
                    Ok(catalog) => {
                        if let Err(e) = catalog.truncate_all() {
                            error!("Error truncating catalog: {}", e);
                        } else {
                            println!("All tables truncated");
                        }
                    }
                    Err(e) => error!("Error opening catalog: {}", e),
                },
                _ => {
                    process::exit(0);
                }
            }
        }
        None => {
            let _ = Cli::command().print_long_help();
        }
    }

    Ok(())
}

fn run_index(config: &AppConfig, paths: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let roots = if paths.is_empty() {
        config.root_paths.clone()
    } else {
        paths
    };
    if roots.is_empty() {
        return Err("No root paths given (pass them as arguments or set root_paths in Config.toml)".into());
    }

    let supervisor = JobSupervisor::new(&config.db_path);
    supervisor.start_index(roots, config.ignore_patterns.clone());
    let rx = supervisor
        .take_index_progress()
        .expect("progress stream already taken");
    progress::watch_index(rx);

    let status = supervisor.index_status();
    info!(
        "Indexed {} entries into {}",
        format!("{}", status.indexed).green(),
        config.db_path,
    );
    Ok(())
}

fn run_scan(config: &AppConfig, root: String) -> Result<(), Box<dyn std::error::Error>> {
    let supervisor = JobSupervisor::new(&config.db_path);
    supervisor.start_dup_scan(root.clone());
    let rx = supervisor
        .take_dup_progress()
        .expect("progress stream already taken");
    progress::watch_dup(rx);

    let catalog = Catalog::open(&config.db_path)?;
    let root = canonical_or_given(&root);
    let groups = catalog.duplicate_groups(Some(&root), 500)?;
    let wasted: i64 = groups.iter().map(|g| g.wasted_bytes()).sum();
    info!(
        "{} duplicate groups, {} wasted (run `filedex groups` for details)",
        format!("{}", groups.len()).red(),
        format!("{}", HumanBytes(wasted.max(0) as u64)).red(),
    );
    Ok(())
}

fn run_groups(
    config: &AppConfig,
    root: Option<&str>,
    limit: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::open(&config.db_path)?;
    let root = root.map(canonical_or_given);
    let groups = catalog.duplicate_groups(root.as_deref(), limit)?;

    if groups.is_empty() {
        println!("No duplicate groups found. Run `filedex scan <root>` first.");
        return Ok(());
    }

    for (i, group) in groups.iter().enumerate() {
        println!(
            "{} {} x{} ({} wasted)",
            format!("[{}]", i + 1).bold(),
            format!("{}", HumanBytes(group.size.max(0) as u64)).cyan(),
            group.files.len(),
            format!("{}", HumanBytes(group.wasted_bytes().max(0) as u64)).red(),
        );
        for (j, member) in group.files.iter().enumerate() {
            let marker = if j == 0 { "*" } else { " " };
            println!(
                "  {} {}  (modified {})",
                marker,
                member.path,
                format_timestamp(member.modified),
            );
        }
    }
    Ok(())
}

fn run_search(
    config: &AppConfig,
    query: String,
    ext: Option<String>,
    file_type: Option<String>,
    limit: i64,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::open(&config.db_path)?;
    let params = SearchParams {
        query: Some(query),
        ext,
        file_type: file_type.as_deref().map(FileType::from_label),
        limit,
        ..Default::default()
    };
    let records = catalog.search(&params)?;

    if records.is_empty() {
        println!("No matches.");
        return Ok(());
    }
    for record in &records {
        println!(
            "{:>10}  {}  {}",
            format!("{}", HumanBytes(record.size.max(0) as u64)),
            format_timestamp(record.modified),
            record.path,
        );
    }
    println!("{} matches", records.len());
    Ok(())
}

fn run_status(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::open(&config.db_path)?;
    let records = catalog.count_records()?;
    let groups = catalog.duplicate_groups(None, 500)?;
    println!("Catalog: {}", config.db_path);
    println!("  {} records indexed", format!("{}", records).green());
    println!("  {} duplicate groups known", format!("{}", groups.len()).red());
    Ok(())
}

fn run_delete(
    config: &AppConfig,
    paths: Vec<String>,
    yes: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if paths.is_empty() {
        return Err("No paths given".into());
    }
    if !yes {
        let prompt = format!("Delete {} file(s) (trash when possible)?", paths.len());
        if !prompt_confirm(&prompt, Some(false))? {
            return Ok(());
        }
    }

    let catalog = Catalog::open(&config.db_path)?;
    let outcome = detector::delete_files(&catalog, &paths)?;

    println!(
        "{} deleted, {} failed",
        format!("{}", outcome.deleted.len()).green(),
        format!("{}", outcome.errors.len()).red(),
    );
    for err in &outcome.errors {
        println!("  {} {}: {}", "✗".red(), err.path, err.message);
    }
    Ok(())
}

fn run_history(config: &AppConfig, limit: i64) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = Catalog::open(&config.db_path)?;
    let entries = catalog.recent_history(limit)?;
    if entries.is_empty() {
        println!("No recorded operations.");
        return Ok(());
    }
    for entry in &entries {
        println!(
            "{}  {:<8} {}",
            format_timestamp(entry.created_at),
            entry.op_type,
            entry.payload,
        );
    }
    Ok(())
}

fn canonical_or_given(path: &str) -> String {
    std::fs::canonicalize(path)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|_| path.to_string())
}

fn format_timestamp(secs: i64) -> String {
    match Local.timestamp_opt(secs, 0) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        _ => format!("{}", secs),
    }
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
