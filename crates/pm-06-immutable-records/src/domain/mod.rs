//! Record chain domain.

pub mod activity;
pub mod integrity;

pub use activity::{seal_record, ActivityEvent, RecordHeader};
pub use integrity::{
    check_link, verify_record, ChainReport, ChainWalker, IntegrityFault, RecordFault,
};
