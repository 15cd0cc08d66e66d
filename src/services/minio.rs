use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::{primitives::ByteStream, Client};
use tracing::instrument;

use crate::{archive::ArchiveStore, config::MinioConfig, error::Error};

const ARCHIVE_PREFIX: &str = "packages/";

#[instrument(name = "create_client", skip_all)]
pub async fn create_client(config: &MinioConfig) -> Result<Client> {
    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .credentials_provider(config.credentials())
        .region(Region::new("us-east-1"))
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .endpoint_url(&config.url)
        .force_path_style(true)
        .build();

    Ok(Client::from_conf(s3_config))
}

#[instrument(name = "ensure_bucket", skip(client))]
pub async fn ensure_bucket(client: &Client, bucket_name: &str) -> Result<()> {
    if client.head_bucket().bucket(bucket_name).send().await.is_ok() {
        return Ok(());
    }

    tracing::info!(bucket = bucket_name, "Creating archive bucket");
    client
        .create_bucket()
        .bucket(bucket_name)
        .send()
        .await
        .with_context(|| format!("Failed to create bucket {}", bucket_name))?;

    Ok(())
}

/// Archives kept in a MinIO (S3-compatible) bucket.
#[derive(Debug, Clone)]
pub struct S3ArchiveStore {
    client: Client,
    bucket_name: String,
}

impl S3ArchiveStore {
    pub fn new(client: Client, bucket_name: String) -> Self {
        Self {
            client,
            bucket_name,
        }
    }
}

#[async_trait]
impl ArchiveStore for S3ArchiveStore {
    #[instrument(name = "put_archive", skip(self, content), fields(bytes = content.len()))]
    async fn put(&self, key: &str, content: Vec<u8>) -> Result<(), Error> {
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type("application/zip")
            .body(ByteStream::from(content))
            .send()
            .await
            .with_context(|| format!("Failed to store archive {}", key))?;

        Ok(())
    }

    #[instrument(name = "get_archive", skip(self))]
    async fn get(&self, key: &str) -> Result<Vec<u8>, Error> {
        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|service_err| service_err.is_no_such_key()) =>
            {
                return Err(Error::NotFound(format!("Archive {} not found", key)));
            }
            Err(err) => {
                return Err(anyhow::Error::new(err)
                    .context(format!("Failed to fetch archive {}", key))
                    .into())
            }
        };

        let data = response
            .body
            .collect()
            .await
            .with_context(|| format!("Failed to read archive {}", key))?;

        Ok(data.into_bytes().to_vec())
    }

    #[instrument(name = "clear_archives", skip(self))]
    async fn clear(&self) -> Result<(), Error> {
        let mut continuation_token = None;
        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket_name)
                .prefix(ARCHIVE_PREFIX)
                .set_continuation_token(continuation_token)
                .send()
                .await
                .context("Failed to list archives")?;

            for key in page.contents().iter().filter_map(|object| object.key()) {
                self.client
                    .delete_object()
                    .bucket(&self.bucket_name)
                    .key(key)
                    .send()
                    .await
                    .with_context(|| format!("Failed to delete archive {}", key))?;
            }

            match page.next_continuation_token() {
                Some(token) => continuation_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(())
    }
}
