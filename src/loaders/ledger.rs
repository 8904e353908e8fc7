// 📒 Ledger Loader - Income statement accounts tagged into overhead buckets

use super::{parse_amount, Loaded, SourceKind, SourceLoader};
use crate::config::LedgerExclusions;
use crate::entities::{LedgerAccount, LedgerBucket};
use crate::error::{AnalysisError, Result};
use crate::rules::TaggingEngine;
use crate::sheet::{Sheet, Workbook};

const NUMERIC_SCAN_ROWS: usize = 10;

pub struct LedgerLoader<'a> {
    sheet_name: &'a str,
    exclusions: &'a LedgerExclusions,
    tagger: &'a TaggingEngine,
}

impl<'a> LedgerLoader<'a> {
    pub fn new(
        sheet_name: &'a str,
        exclusions: &'a LedgerExclusions,
        tagger: &'a TaggingEngine,
    ) -> Self {
        LedgerLoader {
            sheet_name,
            exclusions,
            tagger,
        }
    }

    /// Header containing "total", else the right-most column holding a number near the top
    fn find_total_column(&self, sheet: &Sheet) -> Result<usize> {
        let header = sheet.row(0).unwrap_or_default();
        if let Some(col) = header
            .iter()
            .position(|h| h.to_lowercase().contains("total"))
        {
            return Ok(col);
        }

        let width = sheet.rows.iter().map(|r| r.len()).max().unwrap_or(0);
        let scan_end = sheet.row_count().min(NUMERIC_SCAN_ROWS + 1);

        (1..width)
            .rev()
            .find(|&col| {
                (1..scan_end).any(|row| sheet.cell(row, col).and_then(parse_amount).is_some())
            })
            .ok_or_else(|| {
                AnalysisError::missing_structure(
                    SourceKind::Ledger.name(),
                    "cannot find a totals column (no 'Total' header and no numeric column)",
                )
            })
    }
}

impl<'a> SourceLoader for LedgerLoader<'a> {
    type Output = Vec<LedgerAccount>;

    fn load(&self, workbook: &Workbook) -> Result<Loaded<Vec<LedgerAccount>>> {
        let kind = self.source_kind();
        let sheet = workbook
            .sheet(self.sheet_name)
            .ok_or_else(|| AnalysisError::MissingSheet {
                source_name: kind.name().to_string(),
                sheet: self.sheet_name.to_string(),
            })?;

        if sheet.row_count() == 0 {
            return Err(AnalysisError::missing_structure(
                kind.name(),
                format!("{} sheet is empty", self.sheet_name),
            ));
        }

        let total_col = self.find_total_column(sheet)?;
        let mut loaded = Loaded::new(Vec::new());
        let mut excluded = 0usize;
        let mut unmatched = 0usize;

        for row in 1..sheet.row_count() {
            let Some(account_name) = sheet.cell(row, 0) else {
                continue;
            };
            let amount = match sheet.cell(row, total_col).and_then(parse_amount) {
                Some(a) if a != 0.0 => a,
                _ => continue,
            };

            if self.exclusions.is_excluded(account_name) {
                excluded += 1;
                continue;
            }

            let tag = self.tagger.tag(account_name);
            let account = LedgerAccount {
                account_name: account_name.to_string(),
                amount,
                bucket: tag.bucket,
                matched_by: tag.matched_by,
            };
            if account.is_defaulted() {
                unmatched += 1;
            }
            loaded.records.push(account);
        }

        if excluded > 0 {
            loaded.log(
                kind,
                format!("Excluded {} income/subtotal lines from overhead pools", excluded),
            );
        }
        if unmatched > 0 {
            loaded.log(
                kind,
                format!("{} P&L accounts defaulted to SG&A (unmatched)", unmatched),
            );
        }

        for bucket in LedgerBucket::ALL {
            let (total, count) = loaded
                .records
                .iter()
                .filter(|a| a.bucket == bucket)
                .fold((0.0, 0usize), |(t, c), a| (t + a.amount, c + 1));
            loaded.log(
                kind,
                format!("{}: ${:.2} ({} accounts)", bucket.as_str(), total, count),
            );
        }

        Ok(loaded)
    }

    fn source_kind(&self) -> SourceKind {
        SourceKind::Ledger
    }
}
