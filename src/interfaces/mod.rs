//! Input adapters used by the command line tool.

pub mod jsonl;
