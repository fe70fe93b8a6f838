mod importer;
mod op_reader;
mod summary_writer;

pub use importer::BatchImporter;
pub use op_reader::{OpReader, OpRecord, OpType};
pub use summary_writer::write_summaries;
