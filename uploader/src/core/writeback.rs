//! Where results go in the sheet

use shared::RowOutcome;

use crate::core::validator::columns;
use crate::types::CellUpdate;

/// Status written for rows rejected by validation
pub const SKIPPED: &str = "SKIPPED";

/// 1-based column positions of the output columns.
///
/// Missing output headers are placed after the last existing column; the
/// header cells to create are kept in `header_updates`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub status: usize,
    pub error: usize,
    pub hash_id: usize,
    header_updates: Vec<CellUpdate>,
}

impl ColumnLayout {
    pub fn from_header(header: &[String]) -> Self {
        let mut next = header.len();
        let mut header_updates = Vec::new();

        let mut locate = |name: &str| -> usize {
            match header.iter().position(|h| h.trim().eq_ignore_ascii_case(name)) {
                Some(index) => index + 1,
                None => {
                    next += 1;
                    header_updates.push(CellUpdate {
                        row: 1,
                        column: next,
                        value: name.to_string(),
                    });
                    next
                }
            }
        };

        let status = locate(columns::STATUS);
        let error = locate(columns::ERROR);
        let hash_id = locate(columns::HASH_ID);

        Self {
            status,
            error,
            hash_id,
            header_updates,
        }
    }

    pub fn header_updates(&self) -> &[CellUpdate] {
        &self.header_updates
    }

    /// Status and error cells for a finished row, plus the hash id when the
    /// sheet did not already carry one
    pub fn outcome_cells(&self, row: usize, outcome: &RowOutcome, existing_hash_id: &str) -> Vec<CellUpdate> {
        let mut cells = vec![
            CellUpdate {
                row,
                column: self.status,
                value: outcome.status.sheet_value().to_string(),
            },
            CellUpdate {
                row,
                column: self.error,
                value: outcome.error_detail.clone(),
            },
        ];

        if existing_hash_id.is_empty() {
            if let Some(hash_id) = &outcome.hash_id {
                cells.push(CellUpdate {
                    row,
                    column: self.hash_id,
                    value: hash_id.clone(),
                });
            }
        }
        cells
    }

    pub fn skipped_cells(&self, row: usize, reason: &str) -> Vec<CellUpdate> {
        vec![
            CellUpdate {
                row,
                column: self.status,
                value: SKIPPED.to_string(),
            },
            CellUpdate {
                row,
                column: self.error,
                value: reason.to_string(),
            },
        ]
    }
}

/// A1-notation column letters: 1 -> A, 26 -> Z, 27 -> AA
pub fn column_letter(mut column: usize) -> String {
    let mut letters = Vec::new();
    while column > 0 {
        let rem = (column - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        column = (column - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A1 reference of one cell on a tab, e.g. `'19/10'!L2`
pub fn cell_reference(tab: &str, cell: &CellUpdate) -> String {
    format!("'{}'!{}{}", tab.replace('\'', "''"), column_letter(cell.column), cell.row)
}
