use super::{Row, RowStore, FIRST_DATA_ROW};
use crate::errors::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Sheet {
    rows: Vec<Row>,
    reads: usize,
    writes: usize,
}

/// Process-local [`RowStore`]. Counts reads and writes per sheet and can be
/// told to fail, which makes it the harness for exercising store outages.
#[derive(Debug, Default)]
pub struct MemoryRowStore {
    sheets: Mutex<HashMap<String, Sheet>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn read_count(&self, sheet: &str) -> usize {
        self.lock()
            .ok()
            .and_then(|sheets| sheets.get(sheet).map(|entry| entry.reads))
            .unwrap_or(0)
    }

    pub fn write_count(&self, sheet: &str) -> usize {
        self.lock()
            .ok()
            .and_then(|sheets| sheets.get(sheet).map(|entry| entry.writes))
            .unwrap_or(0)
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, HashMap<String, Sheet>>> {
        self.sheets
            .lock()
            .map_err(|_| AppError::Internal("memory store mutex poisoned".to_string()))
    }

    fn check_writable(&self, sheet: &str) -> AppResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::StoreUnavailable(format!("write to {} rejected", sheet)));
        }
        Ok(())
    }
}

impl RowStore for MemoryRowStore {
    fn read_rows(&self, sheet: &str) -> AppResult<Vec<Row>> {
        let mut sheets = self.lock()?;
        let entry = sheets.entry(sheet.to_string()).or_default();
        entry.reads += 1;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::StoreUnavailable(format!("read of {} rejected", sheet)));
        }
        Ok(entry.rows.clone())
    }

    fn append_row(&self, sheet: &str, row: Row) -> AppResult<()> {
        self.check_writable(sheet)?;
        let mut sheets = self.lock()?;
        let entry = sheets.entry(sheet.to_string()).or_default();
        entry.rows.push(row);
        entry.writes += 1;
        Ok(())
    }

    fn update_cell(&self, sheet: &str, row_index: usize, column: usize, value: &str) -> AppResult<()> {
        self.check_writable(sheet)?;
        let mut sheets = self.lock()?;
        let entry = sheets.entry(sheet.to_string()).or_default();
        let row = row_index
            .checked_sub(FIRST_DATA_ROW)
            .and_then(|offset| entry.rows.get_mut(offset))
            .ok_or_else(|| AppError::NotFound(format!("Row {} not present in {}", row_index, sheet)))?;
        set_cell(row, column, value);
        entry.writes += 1;
        Ok(())
    }

    /// Headers are not kept; only the sheet is registered.
    fn ensure_sheet(&self, sheet: &str, _headers: &[&str]) -> AppResult<()> {
        self.check_writable(sheet)?;
        self.lock()?.entry(sheet.to_string()).or_default();
        Ok(())
    }
}

fn set_cell(row: &mut Row, column: usize, value: &str) {
    if row.len() <= column {
        row.resize(column + 1, String::new());
    }
    row[column] = value.to_string();
}

#[cfg(test)]
mod tests {
    use super::MemoryRowStore;
    use crate::errors::AppError;
    use crate::store::RowStore;

    #[test]
    fn counts_reads_and_pads_short_rows_on_update() {
        let store = MemoryRowStore::new();
        store.append_row("Leads", vec!["a".to_string()]).expect("append");
        store.update_cell("Leads", 2, 3, "TRUE").expect("update");
        let rows = store.read_rows("Leads").expect("read");
        assert_eq!(rows[0], vec!["a", "", "", "TRUE"]);
        assert_eq!(store.read_count("Leads"), 1);
        assert_eq!(store.write_count("Leads"), 2);
    }

    #[test]
    fn injected_failures_surface_as_store_unavailable() {
        let store = MemoryRowStore::new();
        store.set_fail_writes(true);
        let err = store.append_row("Leads", Vec::new()).expect_err("should fail");
        assert!(matches!(err, AppError::StoreUnavailable(_)));
        assert_eq!(store.write_count("Leads"), 0);

        store.set_fail_reads(true);
        assert!(store.read_rows("Leads").is_err());
    }

    #[test]
    fn updating_a_missing_row_is_not_found() {
        let store = MemoryRowStore::new();
        let err = store.update_cell("Leads", 9, 0, "x").expect_err("missing row");
        assert!(matches!(err, AppError::NotFound(_)));
        store.ensure_sheet("Leads", &["Timestamp"]).expect("sheet");
        let err = store.update_cell("Leads", 1, 0, "x").expect_err("header row");
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
