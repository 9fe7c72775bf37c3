pub mod legs;
pub mod table;

pub use legs::{format_timestamp, layover_minutes, parse_instant, parse_timestamp, LegColumns, Timestamp};
pub use table::{Column, DisplayRow, DisplayTable};
