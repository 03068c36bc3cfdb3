//! AWS Lambda layer publishing for layerpack.
//!
//! All calls go through the `aws` CLI via [`layerpack_core::CommandRunner`];
//! credentials travel in an explicit [`AwsSession`].

pub mod aws;
pub mod client;
pub mod session;

pub use aws::AwsError;
pub use client::{AwsClient, CallerIdentity, PublishError, PublishRequest, PublishedLayer};
pub use session::{AwsSession, CredentialsError};
