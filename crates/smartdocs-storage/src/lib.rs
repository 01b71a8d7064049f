pub mod factory;
pub mod gateway;
pub mod local;

#[cfg(feature = "azure")]
pub mod azure;

#[cfg(feature = "s3")]
pub mod s3;
