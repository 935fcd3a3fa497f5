//! Replace-insert statement construction for replacemodel.
//!
//! `replacemodel-query` is the **pure synthesis layer**. It decides which
//! columns of a record are written and turns them into SQL plus parameters;
//! nothing here touches a connection.
//!
//! # Role In The Architecture
//!
//! - **Field extraction**: `extract_row` / `extract_batch` apply the column
//!   skip rules and produce generated timestamps and version seeds.
//! - **Synthesis**: `build_single` / `build_batch` write `REPLACE INTO`
//!   statements for every supported dialect.
//! - **Options**: `InsertSpec` carries per-call column filters, source
//!   conditions and raw expression columns.
//!
//! The resulting statements execute through `replacemodel-session`.

pub mod autotime;
pub mod cond;
pub mod extract;
pub mod replace;
pub mod spec;
pub mod writer;

pub use autotime::AutoTime;
pub use cond::Cond;
pub use extract::{ExtractedRow, Hook, extract_batch, extract_row};
pub use replace::{Statement, build_batch, build_single};
pub use spec::InsertSpec;
pub use writer::SqlWriter;
