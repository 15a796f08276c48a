pub mod cursor;
pub mod data_index;
