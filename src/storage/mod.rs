pub mod checkpoint;
pub mod collection;
pub mod file_lock;
pub mod handle;
pub mod layout;
pub mod segment;
pub mod segment_reader;
pub mod segment_writer;
pub mod store;
pub mod wal;
