use crate::{Backend, Config, Session};
use jsonstore_core::{
    schema::{self, app, ModelBuilder},
    Converters, Result, Schema, TypeConverter,
};
use jsonstore_json::{IdentityCodec, IdentityFormat, Reconstructor, Reconstructors};
use std::sync::Arc;

/// A configured document store. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    pub(crate) shared: Arc<Shared>,
}

/// State shared by every session of a store.
pub(crate) struct Shared {
    pub(crate) schema: Schema,
    pub(crate) converters: Converters,
    pub(crate) reconstructors: Reconstructors,
    pub(crate) identities: IdentityCodec,
    pub(crate) config: Config,
    pub(crate) backend: Box<dyn Backend>,
}

impl Store {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn schema(&self) -> &Schema {
        &self.shared.schema
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Opens a session with an empty identity map.
    pub fn session(&self) -> Session {
        Session::new(self.clone())
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("config", &self.shared.config)
            .field("backend", &self.shared.backend)
            .finish()
    }
}

pub struct Builder {
    /// Schema builder
    core: schema::Builder,

    converters: Converters,

    reconstructors: Reconstructors,

    identity_format: IdentityFormat,

    /// Bucket of a cloud store
    bucket: Option<String>,

    credentials: Option<(String, String)>,
}

impl Default for Builder {
    fn default() -> Builder {
        Builder {
            core: schema::Builder::default(),
            converters: Converters::new(),
            reconstructors: Reconstructors::new(),
            identity_format: IdentityFormat::default(),
            bucket: None,
            credentials: None,
        }
    }
}

impl Builder {
    /// Reserves a model identifier by name. See [`schema::Builder::model`].
    pub fn model(&mut self, name: &str) -> app::ModelId {
        self.core.model(name)
    }

    /// Defines a root model, stored as its own document.
    pub fn root(&mut self, name: &str, f: impl FnOnce(&mut ModelBuilder)) -> app::ModelId {
        self.core.root(name, f)
    }

    /// Defines a model whose objects are embedded in their owner's document.
    pub fn embedded(&mut self, name: &str, f: impl FnOnce(&mut ModelBuilder)) -> app::ModelId {
        self.core.embedded(name, f)
    }

    /// Registers a value type that nested documents can be rebuilt into.
    pub fn bean(&mut self, bean: app::BeanType) -> &mut Self {
        self.core.bean(bean);
        self
    }

    /// Set the table name prefix for all tables
    pub fn table_name_prefix(&mut self, prefix: &str) -> &mut Self {
        self.core.table_name_prefix(prefix);
        self
    }

    pub fn converter(&mut self, converter: impl TypeConverter) -> &mut Self {
        self.converters.register(converter);
        self
    }

    pub fn reconstructor(&mut self, type_name: &str, handler: impl Reconstructor) -> &mut Self {
        self.reconstructors.register(type_name, handler);
        self
    }

    /// Selects how references to other objects are written. Both forms are
    /// always accepted on read.
    pub fn identity_format(&mut self, format: IdentityFormat) -> &mut Self {
        self.identity_format = format;
        self
    }

    pub fn bucket(&mut self, bucket: &str) -> &mut Self {
        self.bucket = Some(bucket.to_string());
        self
    }

    pub fn credentials(&mut self, access_key: &str, secret_key: &str) -> &mut Self {
        self.credentials = Some((access_key.to_string(), secret_key.to_string()));
        self
    }

    /// Parses `connection_url` and builds the store over `backend`.
    pub fn connect(self, connection_url: &str, backend: impl Backend) -> Result<Store> {
        let config = Config::parse(connection_url)?;
        self.build(config, backend)
    }

    pub fn build(self, mut config: Config, backend: impl Backend) -> Result<Store> {
        if let Some(bucket) = &self.bucket {
            config.set_bucket(bucket.as_str());
        }
        if let Some((access_key, secret_key)) = &self.credentials {
            config.set_credentials(access_key.as_str(), secret_key.as_str());
        }
        config.validate()?;

        let schema = self.core.build(&self.converters)?;

        tracing::debug!(
            store = %config.kind(),
            endpoint = %config.endpoint(),
            models = schema.app.models.len(),
            "store configured"
        );

        Ok(Store {
            shared: Arc::new(Shared {
                schema,
                converters: self.converters,
                reconstructors: self.reconstructors,
                identities: IdentityCodec::new(self.identity_format),
                config,
                backend: Box::new(backend),
            }),
        })
    }
}
