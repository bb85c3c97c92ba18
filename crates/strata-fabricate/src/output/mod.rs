pub mod csv;
pub mod json;

pub use self::csv::{write_csv, write_table_csv};
pub use self::json::{write_json, write_table_json};
