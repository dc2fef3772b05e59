// crates/workflow-sync-providers/src/s3_blob.rs
// ============================================================================
// Module: S3 Blob Store
// Description: Spec file source backed by an S3-compatible bucket.
// Purpose: List and read spec files with bounded time and size.
// Dependencies: workflow-sync-core, aws-config, aws-sdk-s3, tokio
// ============================================================================

//! ## Overview
//! [`S3BlobStore`] implements the blocking [`BlobStore`] port on top of the
//! async S3 SDK. It owns a private tokio runtime; calls made from inside a
//! multi-threaded runtime use `block_in_place`, and calls from a
//! current-thread runtime are moved to a helper thread. Listings follow
//! `ListObjectsV2` continuation tokens; reads stop at the configured limit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_config::Region;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_s3::Client;
use tokio::io::AsyncReadExt;
use tokio::runtime::Handle;
use tokio::runtime::Runtime;
use tokio::runtime::RuntimeFlavor;
use workflow_sync_core::BlobStore;
use workflow_sync_core::BlobStoreError;

use crate::paths::validate_object_path;
use crate::paths::validate_prefix;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum number of keys a single listing may return.
const MAX_LISTED_KEYS: usize = 100_000;
/// Read buffer size for object bodies.
const READ_CHUNK_BYTES: usize = 8192;

// ============================================================================
// SECTION: Options
// ============================================================================

/// Connection options for [`S3BlobStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3BlobStoreOptions {
    /// Bucket holding spec files.
    pub bucket: String,
    /// Region override; the default provider chain applies when unset.
    pub region: Option<String>,
    /// Endpoint override for S3-compatible services.
    pub endpoint: Option<String>,
    /// Use path-style addressing.
    pub force_path_style: bool,
    /// Per-operation timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum bytes returned for a single object.
    pub max_bytes: u64,
}

// ============================================================================
// SECTION: Runtime Helpers
// ============================================================================

/// Runs an S3 future to completion from blocking code.
fn block_on_with_runtime<F, T>(runtime: &Runtime, future: F) -> Result<T, BlobStoreError>
where
    F: Future<Output = Result<T, BlobStoreError>> + Send + 'static,
    T: Send + 'static,
{
    if let Ok(handle) = Handle::try_current() {
        if matches!(handle.runtime_flavor(), RuntimeFlavor::MultiThread) {
            return tokio::task::block_in_place(|| handle.block_on(future));
        }
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        std::thread::spawn(move || {
            let result = Runtime::new()
                .map_err(|err| BlobStoreError::Backend(err.to_string()))
                .and_then(|runtime| runtime.block_on(future));
            let _ = tx.send(result);
        });
        return rx
            .recv()
            .unwrap_or_else(|_| Err(BlobStoreError::Backend("s3 worker thread failed".to_string())));
    }
    runtime.block_on(future)
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Blob store backed by S3.
pub struct S3BlobStore {
    /// Underlying S3 client.
    client: Client,
    /// Bucket name.
    bucket: String,
    /// Maximum bytes returned for a single object.
    max_bytes: u64,
    /// Runtime driving SDK futures; dropped off-thread.
    runtime: Option<Arc<Runtime>>,
}

impl Drop for S3BlobStore {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            let _ = std::thread::spawn(move || drop(runtime));
        }
    }
}

impl S3BlobStore {
    /// Builds a store from `options`, resolving credentials from the
    /// default AWS provider chain.
    ///
    /// # Errors
    ///
    /// Returns [`BlobStoreError::Invalid`] for unusable options and
    /// [`BlobStoreError::Backend`] when the runtime cannot start.
    pub fn new(options: &S3BlobStoreOptions) -> Result<Self, BlobStoreError> {
        if options.bucket.trim().is_empty() {
            return Err(BlobStoreError::Invalid("bucket must be set".to_string()));
        }
        if options.timeout_ms == 0 {
            return Err(BlobStoreError::Invalid("timeout_ms must be positive".to_string()));
        }
        let runtime = Runtime::new().map_err(|err| BlobStoreError::Backend(err.to_string()))?;
        let region = options.region.clone();
        let endpoint = options.endpoint.clone();
        let timeout = Duration::from_millis(options.timeout_ms);
        let shared_config = block_on_with_runtime(&runtime, async move {
            let mut loader = aws_config::defaults(BehaviorVersion::latest())
                .timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build());
            if let Some(region) = region {
                loader = loader.region(Region::new(region));
            }
            if let Some(endpoint) = endpoint {
                loader = loader.endpoint_url(endpoint);
            }
            Ok(loader.load().await)
        })?;
        let mut s3_builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if options.force_path_style {
            s3_builder = s3_builder.force_path_style(true);
        }
        Ok(Self {
            client: Client::from_conf(s3_builder.build()),
            bucket: options.bucket.clone(),
            max_bytes: options.max_bytes,
            runtime: Some(Arc::new(runtime)),
        })
    }

    /// Returns the runtime or an error once shut down.
    fn runtime(&self) -> Result<&Runtime, BlobStoreError> {
        self.runtime
            .as_ref()
            .map(AsRef::as_ref)
            .ok_or_else(|| BlobStoreError::Backend("s3 runtime closed".to_string()))
    }
}

impl BlobStore for S3BlobStore {
    fn list_spec_files(&self, prefix: &str) -> Result<Vec<String>, BlobStoreError> {
        validate_prefix(prefix)?;
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let prefix = prefix.to_string();
        let mut keys = block_on_with_runtime(self.runtime()?, async move {
            let mut keys = Vec::new();
            let mut continuation: Option<String> = None;
            loop {
                let mut request = client.list_objects_v2().bucket(&bucket);
                if !prefix.is_empty() {
                    request = request.prefix(&prefix);
                }
                let output = request
                    .set_continuation_token(continuation.take())
                    .send()
                    .await
                    .map_err(|err| BlobStoreError::Backend(format!("list {bucket}: {err}")))?;
                for object in output.contents() {
                    let Some(key) = object.key() else {
                        continue;
                    };
                    if key.ends_with('/') {
                        continue;
                    }
                    if keys.len() >= MAX_LISTED_KEYS {
                        return Err(BlobStoreError::Backend(format!(
                            "listing exceeds {MAX_LISTED_KEYS} keys"
                        )));
                    }
                    keys.push(key.to_string());
                }
                match output.next_continuation_token() {
                    Some(token) if output.is_truncated().unwrap_or(false) => {
                        continuation = Some(token.to_string());
                    }
                    _ => break,
                }
            }
            Ok(keys)
        })?;
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    fn read_spec_file(&self, path: &str) -> Result<Vec<u8>, BlobStoreError> {
        validate_object_path(path)?;
        let client = self.client.clone();
        let bucket = self.bucket.clone();
        let key = path.to_string();
        let max_bytes = self.max_bytes;
        block_on_with_runtime(self.runtime()?, async move {
            let output = match client.get_object().bucket(&bucket).key(&key).send().await {
                Ok(output) => output,
                Err(err) => {
                    let missing =
                        err.as_service_error().is_some_and(|service| service.is_no_such_key());
                    if missing {
                        return Err(BlobStoreError::NotFound(key));
                    }
                    return Err(BlobStoreError::Backend(format!("get {key}: {err}")));
                }
            };
            let too_large = || BlobStoreError::TooLarge {
                path: key.clone(),
                limit: max_bytes,
            };
            if let Some(length) = output.content_length()
                && u64::try_from(length).unwrap_or(u64::MAX) > max_bytes
            {
                return Err(too_large());
            }
            let mut reader = output.body.into_async_read();
            let mut buffer = Vec::new();
            let mut chunk = [0u8; READ_CHUNK_BYTES];
            loop {
                let read = reader
                    .read(&mut chunk)
                    .await
                    .map_err(|err| BlobStoreError::Backend(format!("read {key}: {err}")))?;
                if read == 0 {
                    break;
                }
                buffer.extend_from_slice(&chunk[.. read]);
                if u64::try_from(buffer.len()).unwrap_or(u64::MAX) > max_bytes {
                    return Err(too_large());
                }
            }
            Ok(buffer)
        })
    }
}
