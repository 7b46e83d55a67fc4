pub mod cleanup;
pub mod cluster;
pub mod db;
pub mod error;
pub mod summary;
pub mod test_utils;
pub mod utils;
