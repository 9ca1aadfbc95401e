//! Row-oriented persistence boundary.
//!
//! The engine talks to its backing spreadsheet through [`RowStore`], which
//! exposes exactly the three operations a sheet offers: full scan, append and
//! single-cell write. Rows are 1-indexed with row 1 reserved for headers, so
//! the n-th element returned by [`RowStore::read_rows`] lives at row `n + 2`.
//! Column positions below are part of the wire contract and must not be
//! reordered; new columns are only ever appended.

pub mod leads;
pub mod memory;
pub mod sqlite;

use crate::errors::AppResult;

pub use leads::{LeadStore, SheetNames, StoredLead};
pub use memory::MemoryRowStore;
pub use sqlite::SqliteRowStore;

pub type Row = Vec<String>;

pub const HEADER_ROW: usize = 1;
pub const FIRST_DATA_ROW: usize = 2;

pub trait RowStore: Send + Sync {
    /// All data rows of `sheet`, header excluded. A missing sheet reads as empty.
    fn read_rows(&self, sheet: &str) -> AppResult<Vec<Row>>;

    fn append_row(&self, sheet: &str, row: Row) -> AppResult<()>;

    /// Writes one cell. `row_index` is 1-based, `column` is 0-based.
    fn update_cell(&self, sheet: &str, row_index: usize, column: usize, value: &str) -> AppResult<()>;

    /// Creates `sheet` if needed and (re)writes its header row.
    fn ensure_sheet(&self, sheet: &str, headers: &[&str]) -> AppResult<()>;
}

pub mod lead_cols {
    pub const TIMESTAMP: usize = 0;
    pub const AGENT_NAME: usize = 1;
    pub const AGENT_EMAIL: usize = 2;
    pub const FIRST_NAME: usize = 3;
    pub const LAST_NAME: usize = 4;
    pub const CLIENT_EMAIL: usize = 5;
    pub const CLIENT_PHONE: usize = 6;
    pub const PACKAGE: usize = 7;
    pub const COMPANY_NAME: usize = 8;
    pub const TEAM_SIZE: usize = 9;
    pub const PREFERRED_CONTACT: usize = 10;
    pub const BEST_TIME: usize = 11;
    pub const NOTES: usize = 12;
    pub const MEETING_DONE: usize = 13;
    pub const PAYMENT_RECEIVED: usize = 14;
    pub const STATUS: usize = 15;
    pub const LEAD_SOURCE: usize = 16;
    pub const LEAD_ID: usize = 17;
    pub const AGENT_ID: usize = 18;
    pub const WIDTH: usize = 19;
}

pub const LEAD_HEADERS: [&str; lead_cols::WIDTH] = [
    "Timestamp",
    "AgentName",
    "AgentEmail",
    "FirstName",
    "LastName",
    "ClientEmail",
    "ClientPhone",
    "Package",
    "CompanyName",
    "TeamSize",
    "PreferredContact",
    "BestTime",
    "Notes",
    "MeetingDone",
    "PaymentReceived",
    "Status",
    "LeadSource",
    "LeadId",
    "AgentId",
];

pub mod agent_cols {
    pub const AGENT_ID: usize = 0;
    pub const FULL_NAME: usize = 1;
    pub const EMAIL: usize = 2;
    pub const PHONE: usize = 3;
    pub const WIDTH: usize = 8;
}

pub const AGENT_HEADERS: [&str; agent_cols::WIDTH] = [
    "AgentID",
    "FullName",
    "Email",
    "Phone",
    "HashedPassword",
    "EmailPassword",
    "EmailConnected",
    "CreatedAt",
];

pub mod meeting_cols {
    pub const TIMESTAMP: usize = 0;
    pub const AGENT_NAME: usize = 1;
    pub const AGENT_EMAIL: usize = 2;
    pub const CLIENT_NAME: usize = 3;
    pub const CLIENT_EMAIL: usize = 4;
    pub const CLIENT_PHONE: usize = 5;
    pub const PACKAGE_INTEREST: usize = 6;
    pub const PREFERRED_DATE: usize = 7;
    pub const PREFERRED_TIME: usize = 8;
    pub const MEETING_TYPE: usize = 9;
    pub const NOTES: usize = 10;
    pub const STATUS: usize = 11;
    pub const WIDTH: usize = 12;
}

pub const MEETING_HEADERS: [&str; meeting_cols::WIDTH] = [
    "Timestamp",
    "AgentName",
    "AgentEmail",
    "ClientName",
    "ClientEmail",
    "ClientPhone",
    "PackageInterest",
    "PreferredDate",
    "PreferredTime",
    "MeetingType",
    "Notes",
    "Status",
];

/// Sheets drop trailing empty cells, so short rows are normal.
pub fn cell(row: &[String], column: usize) -> &str {
    row.get(column).map(String::as_str).unwrap_or("")
}

pub fn bool_cell(value: bool) -> &'static str {
    if value {
        "TRUE"
    } else {
        "FALSE"
    }
}

pub fn parse_bool_cell(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("TRUE")
}
