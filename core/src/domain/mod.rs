pub mod common;
pub mod policy;
pub mod storage;
