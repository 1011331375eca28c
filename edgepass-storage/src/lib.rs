//! Storage boundary adapters
//!
//! Production implementations of the collaborator traits from
//! `edgepass-core`:
//!
//! - [`S3Presigner`]: SigV4 query presigning for uploads (and listing requests)
//! - [`S3ObjectLister`]: `ListObjectsV2` enumeration with pagination draining
//! - [`MemoryObjectLister`]: in-process listing for development and tests
//! - [`EdgeSigner`] / [`EdgeVerifier`]: canned-policy read authorizations

pub mod client;
pub mod edge;
pub mod memory;
pub mod s3;

pub use client::HttpClientConfig;
pub use edge::{EdgeSigner, EdgeVerifier, PolicyDocument, VerificationError};
pub use memory::MemoryObjectLister;
pub use s3::{BucketAddress, S3Credentials, S3ObjectLister, S3Presigner};
