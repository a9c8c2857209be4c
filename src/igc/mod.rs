//! # IGC Module
//!
//! Flight log format: record encoding, file naming and the append-only writer.

pub mod encoder;
pub mod filename;
pub mod protocol;
pub mod writer;

pub use encoder::{asset_code, declaration_records, header_records, point_record, HeaderInfo};
pub use filename::{log_file_date, log_file_is_older, next_log_path};
pub use writer::IgcWriter;
