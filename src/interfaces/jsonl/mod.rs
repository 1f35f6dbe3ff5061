pub mod payload_reader;
