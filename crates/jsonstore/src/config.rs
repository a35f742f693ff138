use crate::Result;
use std::fmt;
use url::Url;

/// Kind of document store behind a connection URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// A generic HTTP endpoint accepting JSON documents
    Json,

    AmazonS3,

    GoogleStorage,
}

impl StoreKind {
    /// Prefix identifying the store in a connection URL.
    pub fn key(self) -> &'static str {
        match self {
            StoreKind::Json => "json",
            StoreKind::AmazonS3 => "amazons3",
            StoreKind::GoogleStorage => "googlestorage",
        }
    }

    pub fn from_key(key: &str) -> Option<StoreKind> {
        match key {
            "json" => Some(StoreKind::Json),
            "amazons3" => Some(StoreKind::AmazonS3),
            "googlestorage" => Some(StoreKind::GoogleStorage),
            _ => None,
        }
    }

    /// Cloud stores address objects inside a bucket and create them with
    /// `PUT`.
    pub fn is_cloud(self) -> bool {
        !matches!(self, StoreKind::Json)
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Access key pair of a cloud store.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// Where documents are stored.
#[derive(Debug, Clone)]
pub struct Config {
    kind: StoreKind,
    endpoint: Url,
    bucket: Option<String>,
    credentials: Option<Credentials>,
}

impl Config {
    /// Parses a connection URL of the form `<store key>:<endpoint url>`, for
    /// example `json:http://localhost:8080/api`.
    pub fn parse(connection_url: &str) -> Result<Config> {
        let Some((key, endpoint)) = connection_url.split_once(':') else {
            return Err(anyhow::anyhow!("connection URL `{connection_url}` has no store key").into());
        };

        let Some(kind) = StoreKind::from_key(key) else {
            return Err(anyhow::anyhow!("unsupported store; key={key}; url={connection_url}").into());
        };

        let endpoint = Url::parse(endpoint)
            .map_err(|err| anyhow::anyhow!("invalid endpoint `{endpoint}`: {err}"))?;

        Ok(Config {
            kind,
            endpoint,
            bucket: None,
            credentials: None,
        })
    }

    pub fn kind(&self) -> StoreKind {
        self.kind
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn set_bucket(&mut self, bucket: impl Into<String>) -> &mut Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn set_credentials(
        &mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> &mut Self {
        self.credentials = Some(Credentials {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        });
        self
    }

    /// Full URL of a per-object or per-model path. The endpoint and the path
    /// are joined by exactly one `/`. Cloud stores address paths inside the
    /// bucket.
    pub fn url_for(&self, path: &str) -> String {
        let path = match (&self.bucket, self.kind.is_cloud()) {
            (Some(bucket), true) => format!("{bucket}/{}", path.trim_start_matches('/')),
            _ => path.to_string(),
        };
        let base = self.endpoint.as_str();

        match (base.ends_with('/'), path.starts_with('/')) {
            (true, true) => format!("{base}{}", &path[1..]),
            (false, false) => format!("{base}/{path}"),
            _ => format!("{base}{path}"),
        }
    }

    /// Checks settings that depend on the store kind.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.kind.is_cloud() && self.bucket.is_none() {
            return Err(anyhow::anyhow!("{} store requires a bucket", self.kind).into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_store_keys() {
        let config = Config::parse("json:http://localhost:8080/api").unwrap();
        assert_eq!(config.kind(), StoreKind::Json);
        assert_eq!(config.endpoint().as_str(), "http://localhost:8080/api");

        let config = Config::parse("amazons3:https://s3.amazonaws.com").unwrap();
        assert_eq!(config.kind(), StoreKind::AmazonS3);
        assert!(config.kind().is_cloud());
    }

    #[test]
    fn unknown_store_key() {
        let err = Config::parse("mongodb://localhost").unwrap_err();
        assert!(err.to_string().contains("unsupported store"));
    }

    #[test]
    fn paths_join_with_one_slash() {
        // `Url` normalizes an empty path to `/`
        let root = Config::parse("json:http://localhost:8080").unwrap();
        assert_eq!(root.url_for("Person/1"), "http://localhost:8080/Person/1");
        assert_eq!(root.url_for("/Person/1"), "http://localhost:8080/Person/1");

        let api = Config::parse("json:http://localhost:8080/api").unwrap();
        assert_eq!(api.url_for("Person/1"), "http://localhost:8080/api/Person/1");
        assert_eq!(api.url_for("/Person/1"), "http://localhost:8080/api/Person/1");
    }

    #[test]
    fn cloud_stores_need_a_bucket() {
        let mut config = Config::parse("googlestorage:https://storage.googleapis.com").unwrap();
        assert!(config.validate().is_err());

        config.set_bucket("photos").set_credentials("key", "secret");
        config.validate().unwrap();
        assert_eq!(
            config.url_for("Photo/1"),
            "https://storage.googleapis.com/photos/Photo/1"
        );
        assert!(!format!("{:?}", config).contains("secret\""));
    }
}
