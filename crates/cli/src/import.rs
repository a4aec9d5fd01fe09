//! `dyetrack parse | reconcile | commit` over a dispatch sheet.

use std::path::{Path, PathBuf};

use serde::Serialize;

use dyetrack_io::{export, xlsx, SqliteStore};
use dyetrack_recon::cache::OrderCache;
use dyetrack_recon::commit::{CommitReport, OutcomeStatus};
use dyetrack_recon::parse::parse_rows;
use dyetrack_recon::summary::ReviewSummary;
use dyetrack_recon::{DispatchRecord, ImportConfig, ImportSession, MatchResult, RecordId};

use crate::exit_codes::EXIT_COMMIT_FAILED;
use crate::{settings, CliError};

/// A `--pick ROW=LABEL` override. ROW is the 1-based spreadsheet row.
#[derive(Debug, Clone, PartialEq)]
pub struct Pick {
    pub id: RecordId,
    pub label: String,
}

pub fn parse_pick(arg: &str) -> Result<Pick, CliError> {
    let (row, label) = arg
        .split_once('=')
        .ok_or_else(|| CliError::args(format!("invalid --pick '{arg}'")).with_hint("expected ROW=LABEL, e.g. --pick '4=ORD-7 - Rib (300kg)'"))?;
    let row: usize = row
        .trim()
        .parse()
        .ok()
        .filter(|r| *r >= 1)
        .ok_or_else(|| CliError::args(format!("invalid row in --pick '{arg}'")))?;
    Ok(Pick {
        id: RecordId(row - 1),
        label: label.to_string(),
    })
}

fn read_records(sheet: &Path, config: &ImportConfig) -> Result<Vec<DispatchRecord>, CliError> {
    let rows = xlsx::read_first_sheet(sheet)?;
    let records = parse_rows(&rows, config);
    if records.is_empty() {
        tracing::warn!(sheet = %sheet.display(), "no dispatch rows found");
    }
    Ok(records)
}

/// Load, auto-match and apply manual picks.
fn review(
    sheet: &Path,
    config: &ImportConfig,
    store: &SqliteStore,
    picks: &[String],
) -> Result<(ImportSession, OrderCache), CliError> {
    let picks = picks.iter().map(|p| parse_pick(p)).collect::<Result<Vec<_>, _>>()?;
    let records = read_records(sheet, config)?;

    let mut cache = OrderCache::new();
    cache.ensure_loaded(store)?;

    let mut session = ImportSession::new();
    session.load(records, &cache);
    for pick in &picks {
        session.pick(pick.id, &pick.label, &cache).map_err(|e| {
            CliError::from(e).with_hint("ROW is the spreadsheet row number of a data row")
        })?;
    }
    Ok((session, cache))
}

// ============================================================================
// parse
// ============================================================================

pub fn cmd_parse(config: Option<&Path>, sheet: PathBuf, json: bool) -> Result<(), CliError> {
    let (config, _) = settings::load(config)?;
    let records = read_records(&sheet, &config)?;

    if json {
        println!("{}", to_json(&records)?);
        return Ok(());
    }

    for r in &records {
        println!(
            "{:>5}  {:<10} {:<10} {:<20} {:<20} {:<12} {:>9.2} {:>9.2}  {}",
            r.id.0 + 1,
            r.dispatch_number,
            r.date_sent,
            r.client,
            r.fabric,
            r.color,
            r.quantity_sent,
            r.quantity_received,
            r.machine.as_deref().unwrap_or("-"),
        );
    }
    eprintln!("{} dispatch rows", records.len());
    Ok(())
}

// ============================================================================
// reconcile
// ============================================================================

#[derive(Serialize)]
struct ReviewOutput<'a> {
    results: &'a [MatchResult],
    summary: ReviewSummary,
}

pub fn cmd_reconcile(
    config: Option<&Path>,
    sheet: PathBuf,
    db: PathBuf,
    picks: Vec<String>,
    json: bool,
    export_path: Option<PathBuf>,
) -> Result<(), CliError> {
    let (config, _) = settings::load(config)?;
    let store = SqliteStore::open(&db)?;
    let (session, _cache) = review(&sheet, &config, &store, &picks)?;
    let summary = session.summary();

    if let Some(ref path) = export_path {
        export::export_review(path, session.results())?;
        eprintln!("wrote {}", path.display());
    }

    if json {
        let output = ReviewOutput { results: session.results(), summary: summary.clone() };
        println!("{}", to_json(&output)?);
    } else {
        for r in session.results() {
            println!(
                "{:>5}  {:<10} {:<20} {:<12} {}",
                r.id().0 + 1,
                r.record.dispatch_number,
                r.record.fabric,
                r.record.color,
                r.resolution,
            );
        }
    }

    print_summary(&summary);
    Ok(())
}

fn print_summary(s: &ReviewSummary) {
    eprintln!(
        "{} rows: {} matched, {} new, {} pending; {:.2} kg sent, {:.2} kg received",
        s.total, s.matched, s.new, s.pending, s.kg_sent, s.kg_received,
    );
    if let Some(ratio) = s.scrap_ratio {
        eprintln!("scrap: {:.1}%", ratio * 100.0);
    }
    for (machine, kg) in &s.kg_sent_by_machine {
        eprintln!("  machine {machine}: {kg:.2} kg");
    }
}

// ============================================================================
// commit
// ============================================================================

pub fn cmd_commit(
    config: Option<&Path>,
    sheet: PathBuf,
    db: PathBuf,
    dyehouse: Option<String>,
    picks: Vec<String>,
    json: bool,
) -> Result<(), CliError> {
    let (config, _) = settings::load(config)?;
    let mut store = SqliteStore::open(&db)?;
    let (mut session, cache) = review(&sheet, &config, &store, &picks)?;

    let dyehouse = dyehouse.or(config.dyehouse);
    session.commit(&mut store, &cache, dyehouse.as_deref())?;
    let report = session
        .last_report()
        .ok_or_else(|| CliError::new(crate::exit_codes::EXIT_ERROR, "commit produced no report"))?;

    if json {
        println!("{}", to_json(report)?);
    } else {
        for o in &report.outcomes {
            let status = match o.status {
                OutcomeStatus::Committed => "committed",
                OutcomeStatus::Failed => "FAILED",
                OutcomeStatus::NotAttempted => "not attempted",
            };
            println!("{:>5}  {:<10} {}", o.record_id.0 + 1, o.dispatch_number, status);
        }
    }

    eprintln!(
        "{} of {} matched rows committed, {} rows left out",
        report.committed(),
        report.outcomes.len(),
        report.skipped,
    );

    commit_result(report)
}

fn commit_result(report: &CommitReport) -> Result<(), CliError> {
    match report.first_error() {
        None => Ok(()),
        Some(failed) => Err(CliError::new(
            EXIT_COMMIT_FAILED,
            format!(
                "commit stopped at row {} ({}): {}",
                failed.record_id.0 + 1,
                failed.dispatch_number,
                failed.error.as_deref().unwrap_or("write failed"),
            ),
        )
        .with_hint("rows reported as committed are stored; running the same sheet again appends them again")),
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CliError::new(crate::exit_codes::EXIT_ERROR, format!("JSON serialization error: {e}")))
}
