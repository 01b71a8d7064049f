#[cfg(feature = "s3")]
mod inner {
    use async_trait::async_trait;
    use aws_sdk_s3::Client;
    use aws_sdk_s3::config::http::HttpResponse;
    use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
    use aws_sdk_s3::primitives::{ByteStream, DateTime as AwsDateTime};
    use bytes::Bytes;
    use chrono::{DateTime, Utc};

    use smartdocs_core::error::GatewayError;
    use smartdocs_core::keys::join_url;
    use smartdocs_core::types::ObjectRecord;

    use crate::gateway::{GatewayResult, StorageGateway};

    /// AWS S3 and S3-compatible gateway.
    ///
    /// Works with AWS S3, MinIO, RustFS, Garage, Ceph RGW, SeaweedFS,
    /// and any other service implementing the S3 API.
    pub struct S3Gateway {
        client: Client,
        bucket: String,
        base_url: String,
        name: String,
    }

    /// Options for creating an S3 gateway.
    pub struct S3Options<'a> {
        pub bucket: &'a str,
        pub region: Option<&'a str>,
        pub name: &'a str,
        /// Custom endpoint URL (e.g. `http://localhost:9000` for MinIO).
        pub endpoint_url: Option<&'a str>,
        /// Force path-style addressing (`http://host/bucket/key` instead of `http://bucket.host/key`).
        /// Most S3-compatible servers require this.
        pub path_style: bool,
        /// Explicit access key. If None, uses env/profile credentials.
        pub access_key: Option<&'a str>,
        /// Explicit secret key. If None, uses env/profile credentials.
        pub secret_key: Option<&'a str>,
    }

    impl S3Gateway {
        /// Create with full options.
        pub async fn with_options(opts: S3Options<'_>) -> Self {
            let region = opts.region.unwrap_or("us-east-1");
            let mut config_loader = aws_config::from_env()
                .region(aws_config::Region::new(region.to_string()));

            // If explicit credentials are provided, inject them
            if let (Some(ak), Some(sk)) = (opts.access_key, opts.secret_key) {
                let creds =
                    aws_sdk_s3::config::Credentials::new(ak, sk, None, None, "smartdocs-config");
                config_loader = config_loader.credentials_provider(creds);
            }

            let sdk_config = config_loader.load().await;

            let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&sdk_config);

            if let Some(endpoint) = opts.endpoint_url {
                s3_config_builder = s3_config_builder.endpoint_url(endpoint);
            }

            if opts.path_style {
                s3_config_builder = s3_config_builder.force_path_style(true);
            }

            let client = Client::from_conf(s3_config_builder.build());

            Self {
                client,
                bucket: opts.bucket.to_string(),
                base_url: base_url(opts.bucket, region, opts.endpoint_url, opts.path_style),
                name: opts.name.to_string(),
            }
        }

        pub fn with_public_base_url(mut self, url: Option<String>) -> Self {
            if let Some(url) = url {
                self.base_url = url;
            }
            self
        }

        fn record(
            &self,
            key: &str,
            last_modified: Option<&AwsDateTime>,
            size: Option<i64>,
        ) -> ObjectRecord {
            ObjectRecord {
                key: key.to_string(),
                last_modified: last_modified
                    .and_then(|t| DateTime::<Utc>::from_timestamp(t.secs(), t.subsec_nanos()))
                    .unwrap_or_default(),
                size_bytes: size.unwrap_or(0).max(0) as u64,
                access_url: self.resolve_access_url(key),
            }
        }
    }

    #[async_trait]
    impl StorageGateway for S3Gateway {
        async fn list(&self) -> GatewayResult<Vec<ObjectRecord>> {
            let mut records = Vec::new();
            let mut pages = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .into_paginator()
                .send();

            while let Some(page) = pages.next().await {
                let page = page.map_err(|e| classify(&e))?;
                for object in page.contents() {
                    if let Some(key) = object.key() {
                        records.push(self.record(key, object.last_modified(), object.size()));
                    }
                }
            }

            Ok(records)
        }

        async fn head(&self, key: &str) -> GatewayResult<ObjectRecord> {
            let resp = self
                .client
                .head_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| classify(&e))?;
            Ok(self.record(key, resp.last_modified(), resp.content_length()))
        }

        async fn write(&self, key: &str, data: Bytes, content_type: &str) -> GatewayResult<()> {
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .content_type(content_type)
                .body(ByteStream::from(data))
                .send()
                .await
                .map_err(|e| classify(&e))?;
            Ok(())
        }

        fn resolve_access_url(&self, key: &str) -> String {
            join_url(&self.base_url, key)
        }

        async fn test_connection(&self) -> GatewayResult<()> {
            self.client
                .head_bucket()
                .bucket(&self.bucket)
                .send()
                .await
                .map_err(|e| classify(&e))?;
            Ok(())
        }

        fn container(&self) -> &str {
            &self.bucket
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    fn base_url(bucket: &str, region: &str, endpoint_url: Option<&str>, path_style: bool) -> String {
        match endpoint_url {
            Some(endpoint) if path_style => {
                format!("{}/{bucket}", endpoint.trim_end_matches('/'))
            }
            Some(endpoint) => {
                let endpoint = endpoint.trim_end_matches('/');
                match endpoint.split_once("://") {
                    Some((scheme, host)) => format!("{scheme}://{bucket}.{host}"),
                    None => format!("https://{bucket}.{endpoint}"),
                }
            }
            None => format!("https://{bucket}.s3.{region}.amazonaws.com"),
        }
    }

    fn classify<E>(err: &SdkError<E, HttpResponse>) -> GatewayError
    where
        E: std::error::Error + 'static,
    {
        let message = DisplayErrorContext(err).to_string();
        match err {
            SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
                GatewayError::NetworkFailure(message)
            }
            _ => match err.raw_response() {
                Some(resp) => GatewayError::from_status(resp.status().as_u16(), message),
                None => GatewayError::NetworkFailure(message),
            },
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn virtual_hosted_urls() {
            assert_eq!(
                base_url("rawinvoices", "eu-west-1", None, false),
                "https://rawinvoices.s3.eu-west-1.amazonaws.com"
            );
        }

        #[test]
        fn path_style_urls() {
            assert_eq!(
                base_url("rawinvoices", "us-east-1", Some("http://localhost:9000/"), true),
                "http://localhost:9000/rawinvoices"
            );
            assert_eq!(
                join_url(&base_url("b", "us-east-1", Some("http://minio:9000"), true), "1-a b.pdf"),
                "http://minio:9000/b/1-a%20b.pdf"
            );
        }

        #[test]
        fn custom_virtual_host_endpoint() {
            assert_eq!(
                base_url("b", "auto", Some("https://r2.example.com"), false),
                "https://b.r2.example.com"
            );
        }
    }
}

#[cfg(feature = "s3")]
pub use inner::{S3Gateway, S3Options};
