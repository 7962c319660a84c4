//! MongoDB client wrapper that names collections by convention.

use std::sync::Arc;

use bson::{Document, doc};
use mongodb::{Client, Collection, Database};
use tracing::{debug, info};

use crate::config::MongoConfig;
use crate::context::IncludeContext;
use crate::entity::Entity;
use crate::error::{IncludeError, IncludeResult};
use crate::queryable::AggregateQueryable;

/// A MongoDB client bound to one database and one include context.
///
/// Connection pooling is handled by the driver. Collections handed out by
/// [`MongoClient::collection`] are named by the context's collection name
/// convention, so they match the `from` of every `$lookup` an include emits.
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    database: Database,
    config: Arc<MongoConfig>,
    context: Arc<IncludeContext>,
}

impl MongoClient {
    /// Create a client using the process-wide include context.
    pub async fn new(config: MongoConfig) -> IncludeResult<Self> {
        Self::with_context(config, IncludeContext::global()).await
    }

    /// Create a client resolving names through `context`.
    pub async fn with_context(
        config: MongoConfig,
        context: Arc<IncludeContext>,
    ) -> IncludeResult<Self> {
        let options = config.to_client_options().await?;

        let client = Client::with_options(options)
            .map_err(|e| IncludeError::config(format!("failed to create client: {}", e)))?;

        let database = client.database(&config.database);

        info!(
            uri = %config.uri,
            database = %config.database,
            "MongoDB client created"
        );

        Ok(Self {
            client,
            database,
            config: Arc::new(config),
            context,
        })
    }

    /// Create a builder for the client.
    pub fn builder() -> MongoClientBuilder {
        MongoClientBuilder::new()
    }

    /// The collection holding `T`, named by convention.
    pub fn collection<T: Entity>(&self) -> Collection<T> {
        let name = self.context.collection_name(T::schema());
        debug!(entity = T::schema().name(), collection = %name, "resolved collection");
        self.database.collection(&name)
    }

    /// A collection of raw documents by explicit name.
    pub fn collection_doc(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }

    /// An aggregate queryable over the collection holding `T`.
    pub fn aggregate_queryable<T: Entity>(&self) -> IncludeResult<AggregateQueryable<T>> {
        AggregateQueryable::from_collection(
            &self.collection::<T>(),
            None,
            Arc::clone(&self.context),
        )
    }

    /// The underlying database.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// The underlying driver client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// The configuration.
    pub fn config(&self) -> &MongoConfig {
        &self.config
    }

    /// The include context.
    pub fn context(&self) -> &Arc<IncludeContext> {
        &self.context
    }

    /// Check if the server answers a ping.
    pub async fn is_healthy(&self) -> bool {
        self.database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .is_ok()
    }
}

/// Builder for [`MongoClient`].
#[derive(Debug, Default)]
pub struct MongoClientBuilder {
    uri: Option<String>,
    database: Option<String>,
    app_name: Option<String>,
    max_pool_size: Option<u32>,
    direct_connection: Option<bool>,
    context: Option<Arc<IncludeContext>>,
}

impl MongoClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the MongoDB URI.
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Set the database name.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Set the maximum pool size.
    pub fn max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    /// Enable direct connection (bypass replica set discovery).
    pub fn direct_connection(mut self, enabled: bool) -> Self {
        self.direct_connection = Some(enabled);
        self
    }

    /// Resolve names through `context` instead of the global one.
    pub fn context(mut self, context: Arc<IncludeContext>) -> Self {
        self.context = Some(context);
        self
    }

    /// Build the client.
    pub async fn build(self) -> IncludeResult<MongoClient> {
        let mut config_builder = MongoConfig::builder();

        if let Some(uri) = self.uri {
            config_builder = config_builder.uri(uri);
        }
        if let Some(database) = self.database {
            config_builder = config_builder.database(database);
        }
        if let Some(app_name) = self.app_name {
            config_builder = config_builder.app_name(app_name);
        }
        if let Some(max_pool) = self.max_pool_size {
            config_builder = config_builder.max_pool_size(max_pool);
        }
        if let Some(direct) = self.direct_connection {
            config_builder = config_builder.direct_connection(direct);
        }

        let config = config_builder.build()?;
        let context = self.context.unwrap_or_else(IncludeContext::global);
        MongoClient::with_context(config, context).await
    }
}
