pub mod icons;
pub mod output;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{error, header, info, section, severity_label, success, summary_row, warn};
pub use table::{repair_table, stats_table, violation_table};
pub use theme::{theme, Theme};
