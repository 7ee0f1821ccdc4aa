use clap::{Parser, Subcommand};
use overlay_core::{
    decode, encode, resolve_holder, AnyResource, ChangeNotification, InMemoryCache, Member,
    Notification, OverlayConfig, OverlayDiff, OverlayDispatcher, OverlayMasks, Permission,
    PermissionSet, Resource, Role,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "overlay-cli", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List the permissions set in a mask
    Decode {
        /// Decimal, 0x hex or 0b binary mask
        #[arg(long, value_parser = parse_mask)]
        mask: u64,
    },
    /// Encode permission identifiers such as MANAGE_ROLES into a mask
    Encode {
        #[arg(required = true)]
        permissions: Vec<String>,
    },
    /// Show what an overlay leaves inherited
    Inherited {
        #[arg(long, value_parser = parse_mask, default_value = "0")]
        allow: u64,
        #[arg(long, value_parser = parse_mask, default_value = "0")]
        deny: u64,
    },
    /// Compare an overlay before and after an update
    Diff {
        #[arg(long, value_parser = parse_mask, default_value = "0")]
        old_allow: u64,
        #[arg(long, value_parser = parse_mask, default_value = "0")]
        old_deny: u64,
        #[arg(long, value_parser = parse_mask, default_value = "0")]
        allow: u64,
        #[arg(long, value_parser = parse_mask, default_value = "0")]
        deny: u64,
    },
    /// Replay a JSON file of overlay notifications through a dispatcher
    Replay {
        #[arg(long)]
        file: PathBuf,
        /// Optional TOML dispatcher config
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Contents of a replay file
#[derive(Debug, Deserialize)]
struct ReplayScript {
    #[serde(default)]
    members: Vec<Member>,
    #[serde(default)]
    roles: Vec<Role>,
    notifications: Vec<ChangeNotification>,
}

fn parse_mask(s: &str) -> Result<u64, String> {
    let s = s.trim().replace('_', "");
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else if let Some(bin) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        u64::from_str_radix(bin, 2)
    } else {
        s.parse::<u64>()
    };
    parsed.map_err(|e| format!("invalid mask '{}': {}", s, e))
}

fn describe(set: &PermissionSet) -> String {
    if set.is_empty() {
        return "(none)".to_string();
    }
    set.iter()
        .map(|p| p.name())
        .collect::<Vec<_>>()
        .join(", ")
}

fn diff_lines(diff: &OverlayDiff) -> Vec<String> {
    let sections = [
        ("newly allowed", diff.newly_allowed()),
        ("no longer allowed", diff.no_longer_allowed()),
        ("newly denied", diff.newly_denied()),
        ("no longer denied", diff.no_longer_denied()),
    ];
    sections
        .iter()
        .filter(|(_, set)| !set.is_empty())
        .map(|(label, set)| format!("  {}: {}", label, describe(set)))
        .collect()
}

fn print_masks(masks: OverlayMasks) {
    println!("allowed:   {}", describe(&masks.allow()));
    println!("denied:    {}", describe(&masks.deny()));
    println!("inherited: {}", describe(&masks.inherited()));
    println!("inherited raw: {:#018x}", masks.inherited_raw());
    if masks.conflicting_raw() != 0 {
        println!("conflicting:   {}", describe(&decode(masks.conflicting_raw())));
    }
}

/// Dispatch every notification in `file`, returning the lines to print.
fn replay(file: &Path, config: Option<&Path>) -> overlay_core::Result<Vec<String>> {
    let config = match config {
        Some(path) => OverlayConfig::from_file(path)?,
        None => OverlayConfig::default(),
    };
    let script: ReplayScript = serde_json::from_str(&std::fs::read_to_string(file)?)?;
    info!(
        notifications = script.notifications.len(),
        "Replaying {}",
        file.display()
    );

    let cache = InMemoryCache::new();
    for member in script.members {
        cache.insert_member(member);
    }
    for role in script.roles {
        cache.insert_role(role);
    }

    let dispatcher = OverlayDispatcher::with_config(config);
    let mut lines = Vec::new();
    for notification in script.notifications {
        match dispatcher.dispatch(notification) {
            Ok(result) => lines.extend(summarize(&result, &cache)),
            Err(e) => warn!("Skipping notification: {}", e),
        }
    }

    if let Some(log) = dispatcher.event_log() {
        info!(records = log.len(), "Replay finished");
    }
    Ok(lines)
}

fn summarize(result: &Notification<AnyResource>, cache: &InMemoryCache) -> Vec<String> {
    let event = result.event();
    let overlay = event.permission_overlay();
    let holder = resolve_holder(overlay, cache)
        .map(|h| h.name().to_string())
        .unwrap_or_else(|| overlay.holder().to_string());

    let mut headline = format!(
        "{} overlay for {} on {} #{}",
        result.kind(),
        holder,
        event.resource().kind(),
        event.resource().name()
    );
    if let Some(id) = event.metadata().correlation_id {
        headline.push_str(&format!(" (correlation {})", id));
    }

    let mut lines = vec![headline];
    if let Some(update) = result.as_update() {
        lines.extend(diff_lines(&update.diff()));
    }
    lines
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Decode { mask } => {
            for permission in decode(mask) {
                println!(
                    "{:>2}  {:<22} {}",
                    permission.offset(),
                    permission.identifier(),
                    permission.name()
                );
            }
            let unknown = mask & !overlay_core::permission::ALL_PERMISSIONS;
            if unknown != 0 {
                println!("unregistered bits: {:#x}", unknown);
            }
        }
        Commands::Encode { permissions } => {
            match permissions
                .iter()
                .map(|name| name.parse::<Permission>())
                .collect::<Result<Vec<_>, _>>()
            {
                Ok(parsed) => println!("{}", encode(&parsed)),
                Err(e) => {
                    error!("{}", e);
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Inherited { allow, deny } => print_masks(OverlayMasks::new(allow, deny)),
        Commands::Diff {
            old_allow,
            old_deny,
            allow,
            deny,
        } => {
            let diff = OverlayDiff::between(
                OverlayMasks::new(old_allow, old_deny),
                OverlayMasks::new(allow, deny),
            );
            if diff.is_empty() {
                println!("No changes.");
            } else {
                for line in diff_lines(&diff) {
                    println!("{}", line);
                }
            }
        }
        Commands::Replay { file, config } => match replay(&file, config.as_deref()) {
            Ok(lines) => {
                for line in lines {
                    println!("{}", line);
                }
            }
            Err(e) => {
                error!("Replay failed: {}", e);
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        },
    }
}
