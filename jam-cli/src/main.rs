//! `jam-core`: the operator maintenance CLI (spec.md §6.2) for a JAM
//! message base plus FTN echomail gateway.
//!
//! Subcommands mirror the table in spec.md §6.2 exactly: `stats`,
//! `pack`, `purge`, `fix`, `link`, `lastread`, `toss`, `scan`,
//! `ftn-pack`. Exit codes follow spec.md §6.2: 0 success, 1 usage
//! error, 2 runtime error.

mod config;

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use jam_manager::{Manager, PurgeLimits};
use jam_types::{Area, FtnAddress, LastReadRecord};

use config::BbsRoot;

#[derive(Parser)]
#[command(
    name = "jam-core",
    version,
    about = "Maintenance CLI for a jam-core message base and FTN echomail gateway"
)]
struct Cli {
    /// Config directory, defaults to `<root>/config`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Data directory; the BBS root is its parent (spec.md §6.3).
    #[arg(long, global = true)]
    data: Option<PathBuf>,
    /// Suppress per-item output; only summary/errors are printed.
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show per-area counts and file sizes.
    Stats {
        #[arg(long)]
        all: bool,
        area: Option<String>,
    },
    /// Rewrite bases to reclaim space.
    Pack {
        #[arg(long)]
        all: bool,
        #[arg(long = "dry-run")]
        dry_run: bool,
        area: Option<String>,
    },
    /// Delete by age/count.
    Purge {
        #[arg(long)]
        all: bool,
        #[arg(long)]
        days: Option<u32>,
        #[arg(long)]
        keep: Option<u32>,
        #[arg(long = "dry-run")]
        dry_run: bool,
        area: Option<String>,
    },
    /// Verify/repair integrity.
    Fix {
        #[arg(long)]
        all: bool,
        #[arg(long)]
        repair: bool,
        area: Option<String>,
    },
    /// Rebuild reply threading.
    Link { area: String },
    /// Show or reset a user's per-area last-read pointer.
    Lastread {
        area: String,
        user: Option<String>,
        #[arg(long)]
        reset: Option<String>,
    },
    /// Run the inbound toss pipeline.
    Toss {
        #[arg(long)]
        network: String,
    },
    /// Run the outbound scan/export pipeline.
    Scan {
        #[arg(long)]
        network: String,
    },
    /// Bundle outbound packets for the transport agent.
    FtnPack {
        #[arg(long)]
        network: String,
    },
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // clap renders --help/--version through the same path with
            // a success exit; anything else is a usage error (exit 1).
            let _ = e.print();
            std::process::exit(if e.exit_code() == 0 { 0 } else { 1 });
        }
    };

    env_logger::init();

    match run(cli) {
        Ok(()) => {}
        Err(e) => {
            eprintln!("jam-core: {e:#}");
            std::process::exit(2);
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let root_path = BbsRoot::resolve_root(cli.data.as_deref())?;
    let root = BbsRoot::load_with(root_path, cli.config.clone())?;
    let local_address = root.local_address()?;
    let areas = jam_manager::registry::load(root.areas_path())
        .with_context(|| format!("loading area registry from {}", root.areas_path().display()))?;
    let manager = Manager::new(local_address, areas);
    let quiet = cli.quiet;

    match cli.command {
        Command::Stats { all, area } => cmd_stats(&manager, all, area, quiet),
        Command::Pack { all, dry_run, area } => cmd_pack(&manager, all, dry_run, area, quiet),
        Command::Purge { all, days, keep, dry_run, area } => {
            cmd_purge(&manager, all, days, keep, dry_run, area, quiet)
        }
        Command::Fix { all, repair, area } => cmd_fix(&manager, all, repair, area, quiet),
        Command::Link { area } => cmd_link(&manager, &area, quiet),
        Command::Lastread { area, user, reset } => cmd_lastread(&manager, &area, user, reset, quiet),
        Command::Toss { network } => cmd_toss(&manager, &root, &network, quiet),
        Command::Scan { network } => cmd_scan(&manager, &root, &network, quiet),
        Command::FtnPack { network } => cmd_ftn_pack(&root, local_address, &network, quiet),
    }
}

/// Resolves which areas a `--all`-capable command should touch: every
/// registered area, or just `area` when one was named. Usage errors
/// (neither given) exit 1 via the `bail!` -> `anyhow::Error` path,
/// which `main` maps to exit 2 for runtime errors — `--all` xor a named
/// area is treated as a normal argument-validation failure here since
/// clap cannot express that mutual requirement declaratively.
fn selected_areas(manager: &Manager, all: bool, area: Option<String>) -> Result<Vec<Area>> {
    if all {
        return Ok(manager.list_areas());
    }
    let tag = area.context("either --all or an area tag is required")?;
    let area = manager
        .area(&tag)
        .with_context(|| format!("unknown area {tag:?}"))?;
    Ok(vec![area])
}

fn cmd_stats(manager: &Manager, all: bool, area: Option<String>, quiet: bool) -> Result<()> {
    let areas = selected_areas(manager, all || area.is_none(), area)?;
    for area in &areas {
        let base = manager.base_for(&area.tag)?;
        let paths = base.paths();
        let sizes: u64 = [paths.jhr(), paths.jdt(), paths.jdx(), paths.jlr()]
            .iter()
            .map(|p| std::fs::metadata(p).map(|m| m.len()).unwrap_or(0))
            .sum();
        if !quiet {
            println!(
                "{:<16} active={:<8} base_msg_num={:<8} mod_counter={:<8} bytes={}",
                area.tag,
                base.active_msgs(),
                base.base_msg_num(),
                base.mod_counter(),
                sizes
            );
        }
    }
    println!("{} area(s)", areas.len());
    Ok(())
}

fn cmd_pack(manager: &Manager, all: bool, dry_run: bool, area: Option<String>, quiet: bool) -> Result<()> {
    let areas = selected_areas(manager, all, area)?;
    let mut total_removed = 0usize;
    for area in &areas {
        let base = manager.base_for(&area.tag)?;
        if dry_run {
            if !quiet {
                println!("{}: dry-run, not packed", area.tag);
            }
            continue;
        }
        let removed = base.pack()?;
        total_removed += removed;
        if !quiet {
            println!("{}: removed {removed} deleted message(s)", area.tag);
        }
    }
    println!("packed {} area(s), {total_removed} message(s) reclaimed", areas.len());
    Ok(())
}

fn cmd_purge(
    manager: &Manager,
    all: bool,
    days: Option<u32>,
    keep: Option<u32>,
    dry_run: bool,
    area: Option<String>,
    quiet: bool,
) -> Result<()> {
    let areas = selected_areas(manager, all, area)?;
    let limits = PurgeLimits { max_age_days: days, max_messages: keep };
    let mut total_deleted = 0usize;
    for area in &areas {
        let report = manager.purge_area(&area.tag, limits, dry_run)?;
        total_deleted += report.deleted;
        if !quiet {
            println!(
                "{}: {} message(s) {}",
                area.tag,
                report.deleted,
                if dry_run { "would be purged" } else { "purged" }
            );
        }
    }
    println!("{total_deleted} message(s) across {} area(s)", areas.len());
    Ok(())
}

fn cmd_fix(manager: &Manager, all: bool, repair: bool, area: Option<String>, quiet: bool) -> Result<()> {
    let areas = selected_areas(manager, all, area)?;
    let mut any_dirty = false;
    for area in &areas {
        let base = jam_base::Base::open_for_fix(area.base_path.as_str())
            .with_context(|| format!("opening {} for fix", area.tag))?;
        let report = base.fix(repair)?;
        if !report.is_clean() {
            any_dirty = true;
        }
        if !quiet {
            if report.is_clean() {
                println!("{}: clean", area.tag);
            } else {
                println!("{}: {report:?}", area.tag);
            }
        }
    }
    if any_dirty && !repair {
        bail!("integrity problems found; re-run with --repair to fix them");
    }
    Ok(())
}

fn cmd_link(manager: &Manager, area: &str, quiet: bool) -> Result<()> {
    let updated = manager.rebuild_threads(area)?;
    if !quiet {
        println!("{area}: {updated} header(s) updated");
    }
    Ok(())
}

fn cmd_lastread(
    manager: &Manager,
    area: &str,
    user: Option<String>,
    reset: Option<String>,
    quiet: bool,
) -> Result<()> {
    if let Some(user) = reset {
        let base = manager.base_for(area)?;
        let crc = jam_codec::crc::crc32_lowercase(&user);
        base.set_last_read(&user, LastReadRecord::new(crc, 0))?;
        if !quiet {
            println!("{area}: reset last-read pointer for {user:?}");
        }
        return Ok(());
    }
    let user = user.context("a user handle is required unless --reset is given")?;
    let base = manager.base_for(area)?;
    match base.get_last_read(&user) {
        Ok(rec) => println!(
            "{area}: {user} last_read={} high_read={}",
            rec.last_read_msg, rec.high_read_msg
        ),
        Err(jam_base::BaseError::NoLastRead(_)) => println!("{area}: {user} has no lastread record"),
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

fn network_config<'a>(root: &'a BbsRoot, network: &str) -> Result<&'a config::NetworkConfig> {
    root.network(network)
}

fn cmd_toss(manager: &Manager, root: &BbsRoot, network: &str, quiet: bool) -> Result<()> {
    let net = network_config(root, network)?;
    let area_map_text = std::fs::read_to_string(root.resolve(&net.area_map))
        .with_context(|| format!("reading area map {}", net.area_map))?;
    let dupedb = jam_dupedb::DupeDb::open(root.dupedb_path())?;

    let config = jam_tosser::InboundConfig {
        inbound_path: root.resolve(&net.inbound),
        secure_inbound_path: net
            .secure_inbound
            .as_deref()
            .map(|p| root.resolve(p))
            .unwrap_or_else(|| root.resolve(&net.inbound)),
        bad_path: root.resolve(&net.bad),
        bbs_root: root.root.clone(),
    };

    let report = jam_tosser::process_inbound(manager, &dupedb, &config, &area_map_text, network)?;
    dupedb.prune(jam_dupedb::DEFAULT_HORIZON_SECS);
    dupedb.persist()?;

    if !quiet {
        for issue in &report.errors {
            eprintln!("{network}: {}: {}", issue.unit, issue.reason);
        }
    }
    println!(
        "{network}: {} packet(s), {} imported, {} dupe(s), {} error(s)",
        report.packets,
        report.imported,
        report.dupes,
        report.errors.len()
    );
    if !report.errors.is_empty() {
        bail!("{} message(s) failed to import", report.errors.len());
    }
    Ok(())
}

fn cmd_scan(manager: &Manager, root: &BbsRoot, network: &str, quiet: bool) -> Result<()> {
    let net = network_config(root, network)?;
    let area_map_text = std::fs::read_to_string(root.resolve(&net.area_map))
        .with_context(|| format!("reading area map {}", net.area_map))?;
    let area_map = jam_tosser::parse_area_map(network, &area_map_text, &root.root)?;
    let dupedb = jam_dupedb::DupeDb::open(root.dupedb_path())?;
    let local_address = root.local_address()?;
    let outbound_dir = root.resolve(&net.outbound);

    let fallback_uplinks: Vec<FtnAddress> =
        net.uplinks.iter().map(|a| FtnAddress::from_str(a)).collect::<Result<_, _>>()
            .with_context(|| format!("parsing uplinks for network {network:?}"))?;

    let mut total_exported = 0usize;
    let mut areas_scanned = 0usize;
    for area in manager.list_areas() {
        if area.network_tag.as_deref() != Some(network) {
            continue;
        }
        let uplinks: Vec<FtnAddress> = area_map
            .get(&area.tag)
            .map(|(_, entry)| entry.uplinks.clone())
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| fallback_uplinks.clone());
        if uplinks.is_empty() {
            continue;
        }
        areas_scanned += 1;
        let report = jam_tosser::scan_and_export(
            manager,
            &dupedb,
            &area.tag,
            local_address,
            &uplinks,
            &outbound_dir,
        )?;
        total_exported += report.exported;
        if !quiet {
            println!("{}: exported {} message(s)", area.tag, report.exported);
        }
    }
    dupedb.persist()?;
    println!("{network}: {total_exported} message(s) exported across {areas_scanned} area(s)");
    Ok(())
}

fn cmd_ftn_pack(root: &BbsRoot, local_address: FtnAddress, network: &str, quiet: bool) -> Result<()> {
    let net = network_config(root, network)?;
    let outbound_dir = root.resolve(&net.outbound);
    let bundles = jam_tosser::pack_outbound(&outbound_dir, local_address)?;
    if !quiet {
        for bundle in &bundles {
            println!("{}", bundle.display());
        }
    }
    println!("{network}: {} bundle(s) written", bundles.len());
    Ok(())
}
