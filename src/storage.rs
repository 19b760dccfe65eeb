use opendal::services::{Memory, S3};
use opendal::Operator;
use secrecy::ExposeSecret;

use crate::config::StorageSettings;

/// S3-compatible object store used by the admin upload endpoints. Writes go
/// through the configured bucket; the returned URL is what the public site
/// serves the file from.
#[derive(Clone)]
pub struct FileStore {
    operator: Operator,
    public_base_url: String,
}

impl FileStore {
    pub fn new(settings: &StorageSettings) -> Result<FileStore, opendal::Error> {
        let builder = S3::default()
            .endpoint(&settings.endpoint)
            .bucket(&settings.bucket)
            .region(&settings.region)
            .access_key_id(settings.access_key_id.expose_secret())
            .secret_access_key(settings.secret_access_key.expose_secret());

        Ok(FileStore {
            operator: Operator::new(builder)?.finish(),
            public_base_url: settings.public_base_url.clone(),
        })
    }

    /// Backed by process memory; only for tests.
    pub fn in_memory(public_base_url: String) -> FileStore {
        let operator = Operator::new(Memory::default())
            .expect("Failed to build the in-memory operator")
            .finish();

        FileStore {
            operator,
            public_base_url,
        }
    }

    #[tracing::instrument(name = "Store an uploaded file", skip(self, bytes), fields(size = bytes.len()))]
    pub async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, opendal::Error> {
        self.operator
            .write_with(key, bytes)
            .content_type(content_type)
            .await?;

        Ok(format!(
            "{}/{}",
            self.public_base_url.trim_end_matches('/'),
            key
        ))
    }
}
