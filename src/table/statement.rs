//! Statement post-processing of a reconstructed table.
//!
//! Bank statements carry more structure than a generic table: an account
//! header above the transactions, page headers repeated on every page, and
//! a running balance that must agree with the debits and credits. These
//! passes are opt-in (see [`StatementOptions`]) and run after slicing, on
//! the rectangular grid. Rows are only ever removed or edited in place, so
//! the grid stays rectangular and keeps source order.
//!
//! Passes (applied in order):
//! 1. Detect `Account Number` and `Opening Balance` in the raw lines
//! 2. Keep only the column-header row and transaction rows (date + amount)
//! 3. Drop exact duplicate rows, keeping the first occurrence
//! 4. Rewrite amount columns as plain decimals
//! 5. Recompute the running balance and report (or fix) mismatches

use super::{Grid, Row, Table};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Largest difference between stated and recomputed balance that is
/// still accepted.
pub const BALANCE_TOLERANCE: f64 = 0.01;

static RE_ACCOUNT_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Account Number[:\s]*([0-9A-Za-z-]+)").unwrap());
static RE_OPENING_BALANCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Opening Balance[:\s]*([\d,\.]+)").unwrap());
static RE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4}").unwrap());
static RE_AMOUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+\.\d{2}").unwrap());
static RE_CURRENCY: Lazy<Regex> = Lazy::new(|| Regex::new(r"[R$€£¥,]").unwrap());
static RE_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+\.?\d*").unwrap());

/// Column names that mark a row as the table's header.
const HEADER_NAMES: [&str; 11] = [
    "period",
    "date",
    "details",
    "description",
    "reference",
    "transaction",
    "debit",
    "credit",
    "amount",
    "balance",
    "cheque",
];

/// Whether and how to verify the running balance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceCheck {
    #[default]
    Off,
    /// Report rows whose stated balance disagrees with the recomputed one.
    Report,
    /// Report, then overwrite every balance cell with the recomputed value.
    Fix,
}

/// Which statement passes to run. Everything is off by default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementOptions {
    /// Write `Account Number:` / `Opening Balance:` rows above the table.
    pub header: bool,
    /// Drop exact duplicate rows (repeated page headers, double-printed lines).
    pub dedup: bool,
    /// Keep only the header row and rows holding a date and an amount.
    pub transactions_only: bool,
    /// Rewrite cells of amount columns as plain decimals (`R 1,200.00` → `1200.00`).
    pub clean_amounts: bool,
    pub balance: BalanceCheck,
    /// Opening balance to start the running balance from. When unset, the
    /// value found in the document text is used.
    pub opening_balance: Option<f64>,
}

impl StatementOptions {
    pub fn is_enabled(&self) -> bool {
        self.header
            || self.dedup
            || self.transactions_only
            || self.clean_amounts
            || self.balance != BalanceCheck::Off
    }
}

/// Account details found in the document text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementHeader {
    pub account_number: Option<String>,
    pub opening_balance: Option<f64>,
}

/// A row whose stated balance disagrees with the running balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceMismatch {
    /// Index into the table's rows.
    pub row: usize,
    pub stated: f64,
    pub expected: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceReport {
    pub opening_balance: f64,
    /// Rows whose balance cell held a number.
    pub checked_rows: usize,
    pub mismatches: Vec<BalanceMismatch>,
    /// Balance cells were overwritten with recomputed values.
    pub fixed: bool,
}

/// What the statement passes found and changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementReport {
    pub header: StatementHeader,
    pub duplicates_removed: usize,
    pub non_transactions_removed: usize,
    /// `None` when the check was off, or no opening balance or balance
    /// column was available.
    pub balance: Option<BalanceReport>,
}

/// Run the enabled passes over `table`. `lines` are the lines the table was
/// reconstructed from; they are searched for the account header.
pub fn apply<S: AsRef<str>>(
    table: &mut Table,
    lines: &[S],
    options: &StatementOptions,
) -> StatementReport {
    let mut report = StatementReport {
        header: detect_header(lines),
        ..StatementReport::default()
    };

    if options.transactions_only {
        report.non_transactions_removed = keep_transactions(&mut table.rows);
    }
    if options.dedup {
        report.duplicates_removed = dedup_rows(&mut table.rows);
    }
    if options.clean_amounts {
        clean_amount_columns(&mut table.rows);
    }
    if options.balance != BalanceCheck::Off {
        match options.opening_balance.or(report.header.opening_balance) {
            Some(opening) => {
                let fix = options.balance == BalanceCheck::Fix;
                report.balance = check_balances(&mut table.rows, opening, fix);
            }
            None => warn!("Balance check skipped: no opening balance found or configured"),
        }
    }

    debug!(
        duplicates_removed = report.duplicates_removed,
        non_transactions_removed = report.non_transactions_removed,
        mismatches = report.balance.as_ref().map_or(0, |b| b.mismatches.len()),
        "Statement passes applied"
    );
    report
}

/// Find `Account Number` and `Opening Balance` in the document text.
/// The first match of each wins.
pub fn detect_header<S: AsRef<str>>(lines: &[S]) -> StatementHeader {
    let mut header = StatementHeader::default();
    for line in lines.iter().map(AsRef::as_ref) {
        if header.account_number.is_none() {
            header.account_number = RE_ACCOUNT_NUMBER
                .captures(line)
                .map(|c| c[1].to_string());
        }
        if header.opening_balance.is_none() {
            header.opening_balance = RE_OPENING_BALANCE
                .captures(line)
                .and_then(|c| c[1].replace(',', "").parse().ok());
        }
    }
    header
}

/// The two rows written above the table when the header is enabled.
pub fn preamble(header: &StatementHeader) -> Grid {
    vec![
        vec![
            "Account Number:".to_string(),
            header
                .account_number
                .clone()
                .unwrap_or_else(|| "UNKNOWN".to_string()),
        ],
        vec![
            "Opening Balance:".to_string(),
            header
                .opening_balance
                .map(|b| format!("{b:.2}"))
                .unwrap_or_default(),
        ],
    ]
}

/// Parse a statement amount.
///
/// Whitespace, currency symbols and thousands separators are ignored, and
/// `(12.50)` is read as `-12.50`. Returns `None` when no number is present.
pub fn parse_amount(cell: &str) -> Option<f64> {
    let compact: String = cell.chars().filter(|c| !c.is_whitespace()).collect();
    let signed = match compact.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => format!("-{inner}"),
        None => compact,
    };
    let bare = RE_CURRENCY.replace_all(&signed, "");
    RE_NUMBER.find(&bare)?.as_str().parse().ok()
}

/// Index of the first row that looks like a column header: at least two
/// cells are well-known statement column names.
pub fn find_header_row(rows: &[Row]) -> Option<usize> {
    rows.iter().position(|row| {
        row.iter()
            .filter(|cell| {
                let cell = cell.trim().to_lowercase();
                HEADER_NAMES.contains(&cell.as_str())
            })
            .count()
            >= 2
    })
}

/// A transaction row mentions a date and an amount with two decimals.
pub fn is_transaction_row(row: &Row) -> bool {
    let text = row.join(" ");
    RE_DATE.is_match(&text) && RE_AMOUNT.is_match(&text)
}

/// Keep the header row and transaction rows. Returns how many rows were removed.
pub fn keep_transactions(rows: &mut Grid) -> usize {
    let header = find_header_row(rows);
    let before = rows.len();
    let mut idx = 0;
    rows.retain(|row| {
        let keep = Some(idx) == header || is_transaction_row(row);
        idx += 1;
        keep
    });
    before - rows.len()
}

/// Drop exact duplicate rows, keeping the first. Returns how many were removed.
pub fn dedup_rows(rows: &mut Grid) -> usize {
    let before = rows.len();
    let mut seen = HashSet::new();
    rows.retain(|row| seen.insert(row.clone()));
    before - rows.len()
}

/// Rewrite parseable cells of amount columns below the header as `{:.2}`.
pub fn clean_amount_columns(rows: &mut Grid) {
    let Some(header) = find_header_row(rows) else {
        return;
    };
    let columns: Vec<usize> = ["debit", "credit", "amount", "balance"]
        .iter()
        .filter_map(|name| column_index(&rows[header], name))
        .collect();

    for row in rows.iter_mut().skip(header + 1) {
        for &col in &columns {
            if let Some(value) = row.get(col).and_then(|c| parse_amount(c)) {
                row[col] = format!("{value:.2}");
            }
        }
    }
}

/// Recompute the running balance from `opening` and compare it with the
/// stated balance of every row below the header.
///
/// Uses `Debit`/`Credit` columns when present, otherwise a signed `Amount`
/// column. Cells that do not parse count as zero. Returns `None` when the
/// header row or the needed columns cannot be found.
pub fn check_balances(rows: &mut Grid, opening: f64, fix: bool) -> Option<BalanceReport> {
    let header = find_header_row(rows)?;
    let head = &rows[header];
    let balance_col = column_index(head, "balance")?;
    let debit_col = column_index(head, "debit");
    let credit_col = column_index(head, "credit");
    let amount_col = column_index(head, "amount");
    if debit_col.is_none() && credit_col.is_none() && amount_col.is_none() {
        return None;
    }

    let cell_amount = |row: &Row, col: Option<usize>| -> f64 {
        col.and_then(|c| row.get(c))
            .and_then(|c| parse_amount(c))
            .unwrap_or(0.0)
    };

    let mut report = BalanceReport {
        opening_balance: opening,
        checked_rows: 0,
        mismatches: Vec::new(),
        fixed: fix,
    };
    let mut running = opening;

    for (idx, row) in rows.iter_mut().enumerate().skip(header + 1) {
        running += if debit_col.is_some() || credit_col.is_some() {
            cell_amount(&*row, credit_col) - cell_amount(&*row, debit_col)
        } else {
            cell_amount(&*row, amount_col)
        };

        if let Some(stated) = row.get(balance_col).and_then(|c| parse_amount(c)) {
            report.checked_rows += 1;
            if (stated - running).abs() > BALANCE_TOLERANCE {
                report.mismatches.push(BalanceMismatch {
                    row: idx,
                    stated,
                    expected: running,
                });
            }
        }
        if fix {
            row[balance_col] = format!("{running:.2}");
        }
    }

    if !report.mismatches.is_empty() {
        warn!(
            "{} of {} balances disagree with the running balance",
            report.mismatches.len(),
            report.checked_rows
        );
    }
    Some(report)
}

fn column_index(header: &Row, name: &str) -> Option<usize> {
    header
        .iter()
        .position(|cell| cell.trim().eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Grid {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn ledger() -> Grid {
        grid(&[
            &["Date", "Details", "Debit", "Credit", "Balance"],
            &["01/03/2024", "Salary", "", "1,000.00", "1,500.00"],
            &["02/03/2024", "Rent", "700.00", "", "800.00"],
            &["03/03/2024", "Coffee", "12.50", "", "790.00"],
        ])
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,200.00"), Some(1200.0));
        assert_eq!(parse_amount("R 1 200.50"), Some(1200.5));
        assert_eq!(parse_amount("£35"), Some(35.0));
        assert_eq!(parse_amount("(12.50)"), Some(-12.5));
        assert_eq!(parse_amount("-3.10"), Some(-3.1));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("n/a"), None);
    }

    #[test]
    fn test_detect_header() {
        let lines = [
            "FIRST BANK",
            "Account Number: 1820-345112      Statement date 31/03/2024",
            "Opening Balance: 1,234.56",
            "Opening Balance: 9.99",
        ];
        let header = detect_header(&lines);
        assert_eq!(header.account_number.as_deref(), Some("1820-345112"));
        assert_eq!(header.opening_balance, Some(1234.56));
    }

    #[test]
    fn test_detect_header_absent() {
        let header = detect_header(&["Date   Amount"]);
        assert_eq!(header, StatementHeader::default());
    }

    #[test]
    fn test_preamble() {
        let header = StatementHeader {
            account_number: None,
            opening_balance: Some(500.0),
        };
        assert_eq!(
            preamble(&header),
            grid(&[&["Account Number:", "UNKNOWN"], &["Opening Balance:", "500.00"]])
        );
    }

    #[test]
    fn test_find_header_row_skips_title_lines() {
        let rows = grid(&[&["FIRST BANK", ""], &["Date", "Amount"], &["01/01/24", "5.00"]]);
        assert_eq!(find_header_row(&rows), Some(1));
        assert_eq!(find_header_row(&rows[2..]), None);
    }

    #[test]
    fn test_keep_transactions() {
        let mut rows = grid(&[
            &["FIRST BANK", "", ""],
            &["Date", "Details", "Amount"],
            &["01/03/2024", "Salary", "1000.00"],
            &["", "continued on next page", ""],
            &["02-03-24", "Rent", "-700.00"],
        ]);
        assert_eq!(keep_transactions(&mut rows), 2);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], "Date");
        assert_eq!(rows[2][1], "Rent");
    }

    #[test]
    fn test_dedup_keeps_first_and_order() {
        let mut rows = grid(&[&["Date", "Amount"], &["b", "1"], &["Date", "Amount"], &["a", "2"], &["b", "1"]]);
        assert_eq!(dedup_rows(&mut rows), 2);
        assert_eq!(rows, grid(&[&["Date", "Amount"], &["b", "1"], &["a", "2"]]));
    }

    #[test]
    fn test_clean_amount_columns() {
        let mut rows = ledger();
        clean_amount_columns(&mut rows);
        assert_eq!(rows[1], vec!["01/03/2024", "Salary", "", "1000.00", "1500.00"]);
        assert_eq!(rows[0][2], "Debit");
    }

    #[test]
    fn test_check_balances_reports_mismatch() {
        let mut rows = ledger();
        let report = check_balances(&mut rows, 500.0, false).unwrap();
        assert_eq!(report.checked_rows, 3);
        assert_eq!(report.mismatches.len(), 1);
        let m = &report.mismatches[0];
        assert_eq!(m.row, 3);
        assert_eq!(m.stated, 790.0);
        assert!((m.expected - 787.5).abs() < 1e-9);
        assert_eq!(rows[3][4], "790.00");
    }

    #[test]
    fn test_check_balances_fix_rewrites_cells() {
        let mut rows = ledger();
        let report = check_balances(&mut rows, 500.0, true).unwrap();
        assert!(report.fixed);
        assert_eq!(rows[1][4], "1500.00");
        assert_eq!(rows[3][4], "787.50");
    }

    #[test]
    fn test_check_balances_signed_amount_column() {
        let mut rows = grid(&[
            &["Date", "Amount", "Balance"],
            &["01/01/24", "-20.00", "80.00"],
            &["02/01/24", "5.00", "85.00"],
        ]);
        let report = check_balances(&mut rows, 100.0, false).unwrap();
        assert!(report.mismatches.is_empty());
        assert_eq!(report.checked_rows, 2);
    }

    #[test]
    fn test_check_balances_needs_columns() {
        let mut rows = grid(&[&["Date", "Details"], &["01/01/24", "x"]]);
        assert!(check_balances(&mut rows, 0.0, false).is_none());
    }

    #[test]
    fn test_apply_uses_detected_opening_balance() {
        let lines = ["Opening Balance: 500.00"];
        let mut table = Table {
            boundaries: vec![],
            strategy: crate::table::SliceStrategy::Columns,
            rows: ledger(),
        };
        let options = StatementOptions {
            balance: BalanceCheck::Report,
            ..StatementOptions::default()
        };
        let report = apply(&mut table, &lines, &options);
        assert_eq!(report.header.opening_balance, Some(500.0));
        assert_eq!(report.balance.unwrap().mismatches.len(), 1);
    }

    #[test]
    fn test_apply_off_changes_nothing() {
        let mut table = Table {
            boundaries: vec![0],
            strategy: crate::table::SliceStrategy::GapSplit,
            rows: ledger(),
        };
        let options = StatementOptions::default();
        assert!(!options.is_enabled());
        apply(&mut table, &["x"], &options);
        assert_eq!(table.rows, ledger());
    }
}
