use std::fmt;

use bytes::{Bytes, BytesMut};
use futures_util::TryStreamExt;
use reqwest::{Body, RequestBuilder, StatusCode, Url};

use super::common::{Backend, BackendError, BackendResult, reqwest_client};

/// A remote object store speaking the path-style S3 protocol.
///
/// Objects live at `{endpoint}/{bucket}/{key}`, with every segment of the key percent-encoded.
/// Requests are sent as plain `PUT` and `GET`,
/// optionally carrying a bearer token for gateways that require one.
pub struct S3CompatibleBackend {
    client: reqwest::Client,

    endpoint: String,
    bucket: String,

    token: Option<String>,
}

impl S3CompatibleBackend {
    /// Creates a new backend bound to the given bucket.
    pub fn new(endpoint: &str, bucket: &str, token: Option<&str>) -> Self {
        Self {
            client: reqwest_client(),
            endpoint: endpoint.trim_end_matches('/').into(),
            bucket: bucket.into(),
            token: token.map(Into::into),
        }
    }

    /// Creates a new backend without authentication.
    pub fn without_token(endpoint: &str, bucket: &str) -> Self {
        Self::new(endpoint, bucket, None)
    }

    fn object_url(&self, key: &str) -> BackendResult<Url> {
        let invalid = || BackendError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
        };

        let mut url = Url::parse(&self.endpoint).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .push(&self.bucket)
            .extend(key.split('/'));

        Ok(url)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

impl fmt::Debug for S3CompatibleBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Compatible")
            .field("endpoint", &self.endpoint)
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Backend for S3CompatibleBackend {
    fn name(&self) -> &'static str {
        "s3-compatible"
    }

    #[tracing::instrument(level = "trace", fields(?key), skip_all)]
    async fn put_object(&self, key: &str, contents: Bytes) -> BackendResult<()> {
        tracing::debug!("Writing to s3_compatible backend");
        let builder = self.client.put(self.object_url(key)?);
        let response = self
            .authorize(builder)
            .body(Body::from(contents))
            .send()
            .await
            .map_err(|cause| BackendError::reqwest("failed to send put request", cause))?;

        if !response.status().is_success() {
            return Err(BackendError::Status {
                status: response.status(),
                key: key.into(),
            });
        }

        Ok(())
    }

    #[tracing::instrument(level = "trace", fields(?key), skip_all)]
    async fn get_object(&self, key: &str) -> BackendResult<Bytes> {
        tracing::debug!("Reading from s3_compatible backend");
        let builder = self.client.get(self.object_url(key)?);
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|cause| BackendError::reqwest("failed to send get request", cause))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                tracing::debug!("Object not found");
                return Err(BackendError::NotFound { key: key.into() });
            }
            status if !status.is_success() => {
                return Err(BackendError::Status {
                    status,
                    key: key.into(),
                });
            }
            _ => {}
        }

        let contents: BytesMut = response
            .bytes_stream()
            .try_collect()
            .await
            .map_err(|cause| BackendError::reqwest("failed to read response body", cause))?;

        Ok(contents.freeze())
    }

    /// The store is not asked for metadata: the object is fetched in full and its body length is
    /// the reported size.
    async fn stat_size(&self, key: &str) -> BackendResult<u64> {
        let contents = self.get_object(key).await?;
        Ok(contents.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use storagebench_test::server::FakeObjectStore;

    use super::*;

    #[tokio::test]
    async fn stores_objects() {
        storagebench_test::tracing::init();
        let server = FakeObjectStore::new().await;
        let backend = S3CompatibleBackend::without_token(&server.endpoint(), "test-bucket");

        backend
            .put_object("mnt/efs/a.bin", Bytes::from_static(b"oh hai!"))
            .await
            .unwrap();

        let contents = backend.get_object("mnt/efs/a.bin").await.unwrap();
        assert_eq!(contents.as_ref(), b"oh hai!");
        assert_eq!(backend.stat_size("mnt/efs/a.bin").await.unwrap(), 7);

        let stored = server.get("/test-bucket/mnt/efs/a.bin").unwrap();
        assert_eq!(stored.as_ref(), b"oh hai!");
    }

    #[tokio::test]
    async fn encodes_special_characters_in_keys() {
        let server = FakeObjectStore::new().await;
        let backend = S3CompatibleBackend::without_token(&server.endpoint(), "test-bucket");

        backend
            .put_object("a?1.bin", Bytes::from_static(b"first"))
            .await
            .unwrap();
        backend
            .put_object("a?2.bin", Bytes::from_static(b"second"))
            .await
            .unwrap();
        backend
            .put_object("b#c.bin", Bytes::from_static(b"third"))
            .await
            .unwrap();

        assert_eq!(backend.get_object("a?1.bin").await.unwrap().as_ref(), b"first");
        assert_eq!(backend.get_object("a?2.bin").await.unwrap().as_ref(), b"second");
        assert_eq!(backend.get_object("b#c.bin").await.unwrap().as_ref(), b"third");

        assert!(server.get("/test-bucket/a%3F1.bin").is_some());
        assert!(server.get("/test-bucket/b%23c.bin").is_some());
        assert!(server.get("/test-bucket/a").is_none());
    }

    #[tokio::test]
    async fn keeps_mount_prefix_in_keys() {
        let server = FakeObjectStore::new().await;
        let backend = S3CompatibleBackend::without_token(&server.endpoint(), "test-bucket");

        backend
            .put_object("/mnt/efs/a.bin", Bytes::from_static(b"data"))
            .await
            .unwrap();
        assert!(server.get("/test-bucket//mnt/efs/a.bin").is_some());
    }

    #[tokio::test]
    async fn invalid_endpoints_are_errors() {
        let backend = S3CompatibleBackend::without_token("not a url", "test-bucket");

        let err = backend
            .put_object("a.bin", Bytes::from_static(b"data"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidEndpoint { .. }));
    }

    #[tokio::test]
    async fn missing_objects_are_not_found() {
        let server = FakeObjectStore::new().await;
        let backend = S3CompatibleBackend::without_token(&server.endpoint(), "test-bucket");

        let err = backend.get_object("nope.bin").await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound { .. }));
    }

    #[tokio::test]
    async fn rejected_writes_are_errors() {
        let server = FakeObjectStore::new().await;
        server.fail_writes(true);
        let backend = S3CompatibleBackend::without_token(&server.endpoint(), "test-bucket");

        let err = backend
            .put_object("a.bin", Bytes::from_static(b"data"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Status { .. }));
        assert!(server.get("/test-bucket/a.bin").is_none());
    }

    #[tokio::test]
    async fn sends_bearer_token() {
        let server = FakeObjectStore::new().await;
        server.require_token("secret");

        let anonymous = S3CompatibleBackend::without_token(&server.endpoint(), "test-bucket");
        let err = anonymous
            .put_object("a.bin", Bytes::from_static(b"data"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Status { .. }));

        let backend = S3CompatibleBackend::new(&server.endpoint(), "test-bucket", Some("secret"));
        backend
            .put_object("a.bin", Bytes::from_static(b"data"))
            .await
            .unwrap();
        assert!(server.get("/test-bucket/a.bin").is_some());
    }
}
