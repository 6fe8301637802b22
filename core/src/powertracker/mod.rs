pub mod assembler;
pub mod category;
pub mod record;
pub mod scanner;
pub mod sink;

pub use assembler::{
    Assembly, AssemblyReport, IncompletePolicy, SyncStrategy, SynchronizedRecordAssembler,
};
pub use category::PowerEventCategory;
pub use record::PowerRecord;
pub use scanner::{FieldMatch, FieldPatternScanner};
pub use sink::{write_records, write_records_to_path, PowerRecordWriter};
