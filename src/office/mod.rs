//! Host office application access. Spreadsheets are exported to PDF through a
//! headless LibreOffice session that lives for exactly one batch.

pub mod session;

pub use session::{HostLauncher, OfficeLauncher, OfficeSession, SpreadsheetExporter};
