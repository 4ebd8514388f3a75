use std::path::Path;

use super::write_atomic;
use crate::errors::PersistenceError;
use crate::models::GradedResult;

const ONCHAIN_NOTE: &str =
    "# Note: All values normalized to USDC (raw BigInt / 1e6). Users with 0 volume filtered out.";

/// Column layout of a grades file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeLayout {
    /// `wallet,profit,roi,volume,score`
    Profit,
    /// `wallet,pnl,win_rate,volume,roi,score`, preceded by a note row.
    Pnl,
}

impl GradeLayout {
    pub fn header(&self) -> &'static [&'static str] {
        match self {
            GradeLayout::Profit => &["wallet", "profit", "roi", "volume", "score"],
            GradeLayout::Pnl => &["wallet", "pnl", "win_rate", "volume", "roi", "score"],
        }
    }

    fn note(&self) -> Option<&'static str> {
        match self {
            GradeLayout::Profit => None,
            GradeLayout::Pnl => Some(ONCHAIN_NOTE),
        }
    }

    fn cells(&self, row: &GradedResult) -> Vec<String> {
        let score = format!("{:.1}", row.score);
        match self {
            GradeLayout::Profit => vec![
                row.wallet.clone(),
                row.profit.to_string(),
                row.roi.to_string(),
                row.volume.to_string(),
                score,
            ],
            GradeLayout::Pnl => vec![
                row.wallet.clone(),
                row.profit.to_string(),
                row.win_rate.to_string(),
                row.volume.to_string(),
                row.roi.to_string(),
                score,
            ],
        }
    }
}

/// Render rows as comma-separated text with a header line.
pub fn render_grades(layout: GradeLayout, rows: &[GradedResult]) -> String {
    let width = layout.header().len();
    let mut out = String::new();

    if let Some(note) = layout.note() {
        let mut cells = vec![note.to_string()];
        cells.resize(width, String::new());
        push_record(&mut out, &cells);
    }

    let header: Vec<String> = layout.header().iter().map(|h| h.to_string()).collect();
    push_record(&mut out, &header);

    for row in rows {
        push_record(&mut out, &layout.cells(row));
    }
    out
}

pub fn write_grades(path: &Path, layout: GradeLayout, rows: &[GradedResult]) -> Result<(), PersistenceError> {
    write_atomic(path, render_grades(layout, rows).as_bytes())
}

fn push_record(out: &mut String, cells: &[String]) {
    let line = cells
        .iter()
        .map(|c| escape(c))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&line);
    out.push_str("\r\n");
}

fn escape(cell: &str) -> String {
    if cell.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}
