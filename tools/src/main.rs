//! profile-inspect: headless maintenance tool for profile slots.
//!
//! Usage:
//!   profile-inspect --root ./Saved/Profiles list
//!   profile-inspect --root profiles.db --backend sqlite list --json
//!   profile-inspect --config store.json dump Run1 0
//!   profile-inspect --config store.json verify
//!   profile-inspect --config store.json delete Run1 0

use anyhow::{bail, Context, Result};
use profile_core::{
    codec,
    config::{BackendKind, StoreConfig},
    error::StoreError,
    store::{ProfileStore, SlotBackend},
    types::{ProfileId, SliceKind},
};
use std::env;
use std::path::PathBuf;

#[derive(serde::Serialize)]
struct ListRow {
    slot_name:          String,
    slot_index:         u32,
    display_name:       String,
    last_played_utc:    String,
    total_play_seconds: f64,
    schema_version:     u16,
}

#[derive(serde::Serialize)]
struct VerifyRow {
    slot:     String,
    ok:       bool,
    sections: Vec<String>,
    error:    Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let config = resolve_config(&args)?;
    let json = args.iter().any(|a| a == "--json");
    let positional = positional_args(&args);

    let store = config.open_store().context("opening slot store")?;
    log::debug!("using {} backend at {}", store.backend().name(), config.root.display());

    match positional.as_slice() {
        ["list"] => list(&store, json),
        ["dump", name, index] => dump(&store, &parse_id(name, index)?),
        ["verify"] => verify(&store, json),
        ["delete", name, index] => {
            let id = parse_id(name, index)?;
            if store.delete_profile(&id)? {
                println!("deleted {id}");
            } else {
                println!("no profile in {id}");
            }
            Ok(())
        }
        _ => bail!("usage: profile-inspect (--root DIR [--backend file|sqlite] | --config FILE) (list [--json] | dump NAME INDEX | verify [--json] | delete NAME INDEX)"),
    }
}

fn resolve_config(args: &[String]) -> Result<StoreConfig> {
    if let Some(path) = flag_value(args, "--config") {
        return StoreConfig::load(path);
    }
    let Some(root) = flag_value(args, "--root") else {
        bail!("either --config or --root is required");
    };
    let backend = match flag_value(args, "--backend").unwrap_or("file") {
        "file" => BackendKind::File,
        "sqlite" => BackendKind::Sqlite,
        other => bail!("unknown backend '{other}'"),
    };
    Ok(StoreConfig {
        backend,
        fsync: true,
        ..StoreConfig::default_test(PathBuf::from(root))
    })
}

fn list<B: SlotBackend>(store: &ProfileStore<B>, json: bool) -> Result<()> {
    let summaries = store.list_profiles()?;
    if json {
        let rows: Vec<ListRow> = summaries
            .into_iter()
            .map(|s| ListRow {
                slot_name:          s.id.slot_name,
                slot_index:         s.id.slot_index,
                display_name:       s.meta.display_name,
                last_played_utc:    s.meta.last_played_utc.to_rfc3339(),
                total_play_seconds: s.meta.total_play_seconds,
                schema_version:     s.schema_version,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("(no profiles)");
        return Ok(());
    }
    println!("=== PROFILES ({}) ===", summaries.len());
    for s in &summaries {
        println!(
            "  {:<24} {:<20} {}  {:>8.0}s  v{}",
            s.id.to_string(),
            s.meta.display_name,
            s.meta.last_played_utc.format("%Y-%m-%d %H:%M:%S"),
            s.meta.total_play_seconds,
            s.schema_version
        );
    }
    Ok(())
}

fn dump<B: SlotBackend>(store: &ProfileStore<B>, id: &ProfileId) -> Result<()> {
    let snapshot = store.load_profile(id)?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn verify<B: SlotBackend>(store: &ProfileStore<B>, json: bool) -> Result<()> {
    let mut rows = Vec::new();
    for id in store.backend().slots()? {
        let sections: Vec<String> = store
            .backend()
            .read(&id)?
            .and_then(|bytes| codec::inspect(&bytes).ok())
            .map(|layout| {
                layout
                    .sections
                    .iter()
                    .map(|s| match s.kind {
                        Some(kind) => kind.name().to_string(),
                        None => format!("unknown({})", s.tag),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let error = match store.load_profile(&id) {
            Ok(_) => None,
            Err(e @ (StoreError::CorruptPayload { .. } | StoreError::Io(_))) => Some(e.to_string()),
            Err(e) => return Err(e.into()),
        };
        rows.push(VerifyRow { slot: id.to_string(), ok: error.is_none(), sections, error });
    }

    let bad = rows.iter().filter(|r| !r.ok).count();
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("=== VERIFY ({} slots, {} corrupt) ===", rows.len(), bad);
        for row in &rows {
            match &row.error {
                None => println!("  OK    {:<24} [{}]", row.slot, row.sections.join(", ")),
                Some(e) => println!("  FAIL  {:<24} {e}", row.slot),
            }
        }
        println!("  expected order: {}", canonical_order());
    }
    if bad > 0 {
        bail!("{bad} corrupt slot(s)");
    }
    Ok(())
}

fn canonical_order() -> String {
    SliceKind::ALL
        .iter()
        .map(|k| k.name())
        .collect::<Vec<_>>()
        .join(" → ")
}

fn parse_id(name: &str, index: &str) -> Result<ProfileId> {
    let index: u32 = index
        .parse()
        .with_context(|| format!("slot index '{index}' is not a number"))?;
    let id = ProfileId::new(name, index);
    if let Err(reason) = id.validate() {
        bail!("invalid slot: {reason}");
    }
    Ok(id)
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

/// Arguments that are neither flags nor flag values.
fn positional_args(args: &[String]) -> Vec<&str> {
    const VALUED: [&str; 3] = ["--root", "--backend", "--config"];
    let mut out = Vec::new();
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if VALUED.contains(&arg.as_str()) {
            skip_next = true;
            continue;
        }
        if arg.starts_with("--") {
            continue;
        }
        out.push(arg.as_str());
    }
    out
}
