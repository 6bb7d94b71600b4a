use crate::paths::{self, LocationKind};
use common::Result;
use common::config::StorageSettings;
use datafusion::execution::context::SessionContext;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Builds object stores from the run's storage settings and registers them
/// with the engine session.
pub struct StorageManager<'a> {
    settings: &'a StorageSettings,
}

impl<'a> StorageManager<'a> {
    pub fn new(settings: &'a StorageSettings) -> Self {
        Self { settings }
    }

    pub fn build_s3_store(&self, bucket: &str) -> Result<AmazonS3> {
        // The standard AWS environment fills in whatever the settings leave out.
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(bucket)
            .with_region(&self.settings.region)
            .with_allow_http(self.settings.allow_http);

        if self.settings.has_static_credentials() {
            builder = builder
                .with_access_key_id(&self.settings.access_key_id)
                .with_secret_access_key(&self.settings.secret_access_key);
        }

        if let Some(endpoint) = &self.settings.endpoint {
            builder = builder.with_endpoint(endpoint);
        }

        Ok(builder.build()?)
    }

    /// Makes `location` resolvable by the session. Local paths need nothing.
    pub fn register_location(&self, ctx: &SessionContext, location: &str) -> Result<()> {
        match paths::classify(location)? {
            LocationKind::S3 { scheme, bucket } => {
                let store = self.build_s3_store(&bucket)?;
                let url = Url::parse(&format!("{}://{}", scheme, bucket))?;
                ctx.register_object_store(&url, Arc::new(store));
                info!(%url, "Registered object store");
            }
            LocationKind::Local => {
                debug!(location, "Using local filesystem");
            }
        }
        Ok(())
    }
}
