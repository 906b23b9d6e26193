//! Aggregation over saved result records

use epsilon_agent::{Modality, RunRecord};
use epsilon_error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;

/// Statistics for one (label, mode) group
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSummary {
    pub label: String,
    pub mode: Modality,
    pub runs: usize,
    pub wins: usize,
    pub avg_tokens: f64,
    pub min_tokens: usize,
    pub max_tokens: usize,
    pub avg_turns: f64,
}

impl GroupSummary {
    pub fn win_pct(&self) -> f64 {
        if self.runs == 0 {
            0.0
        } else {
            self.wins as f64 / self.runs as f64 * 100.0
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub label: String,
    pub mode: Modality,
    pub avg_tokens_to_win: f64,
    pub wins: usize,
}

/// Load every readable `*.json` record in `dir`; unreadable or incomplete files are skipped
pub fn load_records(dir: &Path) -> Result<Vec<RunRecord>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        Error::from(e)
            .with_operation("report::load_records")
            .with_context("dir", dir.display().to_string())
    })?;

    let mut paths: Vec<_> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut records = Vec::new();
    for path in paths {
        match RunRecord::load(&path) {
            Ok(record) => records.push(record),
            Err(err) => tracing::warn!(error = %err, "skipping result file"),
        }
    }
    Ok(records)
}

fn group(records: &[RunRecord]) -> BTreeMap<(String, Modality), Vec<&RunRecord>> {
    let mut groups: BTreeMap<(String, Modality), Vec<&RunRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry((record.label.clone(), record.mode))
            .or_default()
            .push(record);
    }
    groups
}

/// Groups ordered by label, then text before tools
pub fn summarize(records: &[RunRecord]) -> Vec<GroupSummary> {
    group(records)
        .into_iter()
        .map(|((label, mode), runs)| {
            let n = runs.len();
            let tokens: Vec<usize> = runs.iter().map(|r| r.total_tokens).collect();
            GroupSummary {
                label,
                mode,
                runs: n,
                wins: runs.iter().filter(|r| r.won).count(),
                avg_tokens: tokens.iter().sum::<usize>() as f64 / n as f64,
                min_tokens: tokens.iter().copied().min().unwrap_or(0),
                max_tokens: tokens.iter().copied().max().unwrap_or(0),
                avg_turns: runs.iter().map(|r| r.turns).sum::<usize>() as f64 / n as f64,
            }
        })
        .collect()
}

/// Average tokens among winning runs only, cheapest first
pub fn leaderboard(records: &[RunRecord]) -> Vec<LeaderboardEntry> {
    let mut board: Vec<LeaderboardEntry> = group(records)
        .into_iter()
        .filter_map(|((label, mode), runs)| {
            let winners: Vec<&&RunRecord> = runs.iter().filter(|r| r.won).collect();
            if winners.is_empty() {
                return None;
            }
            let total: usize = winners.iter().map(|r| r.total_tokens).sum();
            Some(LeaderboardEntry {
                label,
                mode,
                avg_tokens_to_win: total as f64 / winners.len() as f64,
                wins: winners.len(),
            })
        })
        .collect();

    board.sort_by(|a, b| a.avg_tokens_to_win.total_cmp(&b.avg_tokens_to_win));
    board
}

pub fn render_report(records: &[RunRecord]) -> String {
    let mut out = String::new();
    if records.is_empty() {
        out.push_str("No eval runs found.\n");
        return out;
    }

    let header = format!(
        "  {:<28} {:<6} {:>4} {:>4} {:>5} {:>8} {:>8} {:>8} {:>10}",
        "Model", "Mode", "Runs", "Wins", "Win%", "Avg Tok", "Min Tok", "Max Tok", "Avg Turns"
    );
    let rule = format!("  {}", "-".repeat(header.len() - 2));

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", "=".repeat(100));
    let _ = writeln!(out, "  EVALUATION REPORT");
    let _ = writeln!(out, "{}", "=".repeat(100));
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", header);
    let _ = writeln!(out, "{}", rule);

    let summaries = summarize(records);
    for (i, s) in summaries.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {:<28} {:<6} {:>4} {:>4} {:>4.0}% {:>8.0} {:>8} {:>8} {:>10.1}",
            s.label,
            s.mode.as_str(),
            s.runs,
            s.wins,
            s.win_pct(),
            s.avg_tokens,
            s.min_tokens,
            s.max_tokens,
            s.avg_turns
        );
        let last_of_label = summaries.get(i + 1).map_or(true, |next| next.label != s.label);
        if last_of_label {
            let _ = writeln!(out);
        }
    }

    let total_wins = records.iter().filter(|r| r.won).count();
    let total_tokens: usize = records.iter().map(|r| r.total_tokens).sum();
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(
        out,
        "  Total runs: {}   Total wins: {}   Total tokens: {}",
        records.len(),
        total_wins,
        total_tokens
    );

    let _ = writeln!(out);
    let _ = writeln!(out, "  LEADERBOARD (avg tokens to win, winners only)");
    let _ = writeln!(out, "  {}", "-".repeat(50));
    for (i, entry) in leaderboard(records).iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. {:<28} {:<6} {:>8.0} avg tokens  ({} wins)",
            i + 1,
            entry.label,
            entry.mode.as_str(),
            entry.avg_tokens_to_win,
            entry.wins
        );
    }
    out
}

/// Side-by-side text vs tools table for one batch
pub fn comparison_table(records: &[RunRecord]) -> String {
    let mut by_label: BTreeMap<&str, BTreeMap<Modality, &RunRecord>> = BTreeMap::new();
    for record in records {
        by_label
            .entry(record.label.as_str())
            .or_default()
            .insert(record.mode, record);
    }

    fn cell(record: Option<&&RunRecord>) -> String {
        match record {
            None => format!("{:<5} {:<8} {:<5}", "-", "-", "-"),
            Some(r) => {
                let outcome = if r.won {
                    "YES"
                } else if r.gave_up {
                    "QUIT"
                } else {
                    "NO"
                };
                format!("{:<5} {:<8} {:<5}", outcome, r.total_tokens, r.turns)
            }
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "\n{}", "=".repeat(72));
    let _ = writeln!(out, "  COMPARISON: text vs tools");
    let _ = writeln!(out, "{}", "=".repeat(72));
    let _ = writeln!(out, "  {:<24}   {:^18}   {:^18}", "Model", "--- text ---", "--- tools ---");
    let _ = writeln!(
        out,
        "  {:<24}   {:<5} {:<8} {:<5}   {:<5} {:<8} {:<5}",
        "", "Won", "Tokens", "Turns", "Won", "Tokens", "Turns"
    );
    let _ = writeln!(out, "  {}   {}   {}", "-".repeat(22), "-".repeat(18), "-".repeat(18));
    for (label, modes) in &by_label {
        let _ = writeln!(
            out,
            "  {:<24}   {}   {}",
            label,
            cell(modes.get(&Modality::Text)),
            cell(modes.get(&Modality::Tools))
        );
    }
    out
}
