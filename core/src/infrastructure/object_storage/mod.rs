pub mod mappers;
pub mod s3;
pub mod signing;

pub use s3::S3ObjectStorage;
