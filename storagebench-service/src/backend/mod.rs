pub mod common;
#[cfg(test)]
pub(crate) mod in_memory;
pub mod local_cache;
pub mod mounted_fs;
pub mod s3_compatible;
