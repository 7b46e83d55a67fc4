pub mod cleanup;
pub mod output;
pub mod report;
