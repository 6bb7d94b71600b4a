use common::{Error, Result};
use url::Url;

/// Where a root location lives. Object-store URLs keep their bucket so a
/// store can be registered for them; everything else is read through the
/// engine's local filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationKind {
    S3 { scheme: String, bucket: String },
    Local,
}

pub fn classify(location: &str) -> Result<LocationKind> {
    match Url::parse(location) {
        Ok(url) => match url.scheme() {
            "s3" | "s3a" => {
                let bucket = url.host_str().filter(|b| !b.is_empty()).ok_or_else(|| {
                    Error::InvalidUri(format!("Location '{}' has no bucket", location))
                })?;
                Ok(LocationKind::S3 {
                    scheme: url.scheme().to_string(),
                    bucket: bucket.to_string(),
                })
            }
            "file" => Ok(LocationKind::Local),
            // A single-letter scheme is a Windows drive, not a URL.
            scheme if scheme.len() == 1 => Ok(LocationKind::Local),
            scheme => Err(Error::InvalidUri(format!(
                "Unsupported scheme '{}' in location '{}'",
                scheme, location
            ))),
        },
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(LocationKind::Local),
        Err(e) => Err(e.into()),
    }
}

/// Joins a root and a relative path with exactly one separator between them.
pub fn join(root: &str, relative: &str) -> String {
    let relative = relative.trim_start_matches('/');
    if root.is_empty() {
        return relative.to_string();
    }
    format!("{}/{}", root.trim_end_matches('/'), relative)
}

/// Destination directory of a table under the output root. The trailing
/// slash makes the engine treat it as a directory even without partitions.
pub fn table_destination(output_root: &str, table_name: &str) -> String {
    format!("{}/", join(output_root, &format!("{}.parquet", table_name)))
}
