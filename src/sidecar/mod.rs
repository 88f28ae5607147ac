pub mod layout_reader;
pub mod types;
