use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gatewarden_core::config::Config;
use gatewarden_core::core_registry::{clamp_admission_limit, GroupRegistry, ManagedGroup};
use gatewarden_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use gatewarden_core::storage::open_pool;
use gatewarden_core::types::ChatId;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "gatewarden")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    /// Override the database file path
    #[arg(long)]
    database: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register a group for moderation
    Register {
        /// External chat identifier of the group
        chat_id: String,

        /// Display title for the group
        title: String,

        /// Daily admission limit
        #[arg(long)]
        limit: Option<u32>,

        /// Start with the restricted-script filter disabled
        #[arg(long)]
        no_filter: bool,
    },

    /// List registered groups
    List {
        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one registered group
    Show {
        chat_id: String,

        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Update a group's display title
    SetTitle { chat_id: String, title: String },

    /// Update a group's daily admission limit
    SetLimit { chat_id: String, limit: u32 },

    /// Enable or disable a group's restricted-script filter
    SetFilter {
        chat_id: String,

        #[arg(value_parser = clap::value_parser!(bool))]
        enabled: bool,
    },

    /// Remove a group from moderation
    Remove { chat_id: String },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = LogLevel::parse(&args.log_level).unwrap_or_else(|| {
        eprintln!("Invalid log level '{}', using 'info'", args.log_level);
        LogLevel::Info
    });

    let log_config = LogConfig::new(log_level).json_format(args.json_logs);
    init_logging_with_config(log_config)?;

    let config = Config::from_env().context("loading configuration")?;
    let db_path = args
        .database
        .unwrap_or_else(|| config.storage.database_path());
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }

    let pool = open_pool(&db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    let registry = GroupRegistry::new(pool);

    match args.command {
        Command::Register { chat_id, title, limit, no_filter } => {
            let requested = limit.unwrap_or(config.moderation.default_admission_limit);
            let admission_limit = clamp_admission_limit(requested);
            if admission_limit != requested {
                warn!(requested, admission_limit, "admission limit clamped");
            }
            let filter_enabled = if no_filter {
                false
            } else {
                config.moderation.default_filter_enabled
            };

            let group = registry.create(
                ChatId::new(chat_id),
                title,
                admission_limit,
                filter_enabled,
            )?;
            info!(chat_id = %group.chat_id, id = %group.id, "group registered");
            print_group(&group);
        }

        Command::List { page, json } => {
            let page_size = config.admin.page_size;
            let offset = page_offset(page, page_size);
            let groups = registry.list(offset, page_size)?;
            let total = registry.count()?;

            if json {
                println!("{}", serde_json::to_string_pretty(&groups)?);
            } else if groups.is_empty() {
                println!("No groups on page {} ({} registered total)", page, total);
            } else {
                for group in &groups {
                    print_group(group);
                }
                println!("Page {} of {} registered groups", page, total);
            }
        }

        Command::Show { chat_id, json } => {
            let group = resolve(&registry, &chat_id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&group)?);
            } else {
                print_group(&group);
            }
        }

        Command::SetTitle { chat_id, title } => {
            let group = resolve(&registry, &chat_id)?;
            registry.set_title(group.id, &title)?;
            info!(chat_id = %group.chat_id, title, "title updated");
        }

        Command::SetLimit { chat_id, limit } => {
            let group = resolve(&registry, &chat_id)?;
            let clamped = clamp_admission_limit(limit);
            if clamped != limit {
                warn!(requested = limit, admission_limit = clamped, "admission limit clamped");
            }
            registry.set_admission_limit(group.id, clamped)?;
            info!(chat_id = %group.chat_id, limit = clamped, "admission limit updated");
        }

        Command::SetFilter { chat_id, enabled } => {
            let group = resolve(&registry, &chat_id)?;
            registry.set_filter_enabled(group.id, enabled)?;
            info!(chat_id = %group.chat_id, enabled, "filter flag updated");
        }

        Command::Remove { chat_id } => {
            let group = resolve(&registry, &chat_id)?;
            registry.delete(group.id)?;
            info!(chat_id = %group.chat_id, "group removed");
        }
    }

    Ok(())
}

/// Row offset of a 1-based page; saturates instead of overflowing for
/// out-of-range page numbers.
fn page_offset(page: u32, page_size: u32) -> u32 {
    page.saturating_sub(1).saturating_mul(page_size)
}

fn resolve(registry: &GroupRegistry, chat_id: &str) -> Result<ManagedGroup> {
    registry
        .find_by_chat_id(&ChatId::new(chat_id))?
        .with_context(|| format!("group '{}' is not registered", chat_id))
}

fn print_group(group: &ManagedGroup) {
    println!(
        "{}  {}  limit={}  filter={}",
        group.chat_id,
        group.title,
        group.admission_limit,
        if group.filter_enabled { "on" } else { "off" },
    );
}
