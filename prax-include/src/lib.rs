//! # prax-include
//!
//! Eager loading of related documents for MongoDB, expressed as aggregation
//! pipelines.
//!
//! This crate provides:
//! - Static entity metadata describing members, identifiers and relationship
//!   annotations
//! - Convention-driven collection and foreign key naming
//! - Resolution of the key member behind every navigation
//! - `include` / `then_include`, which emit `$lookup` stages
//! - Standard query operators mirrored onto the same pipeline
//! - Async terminal operators with cancellation support
//!
//! ## Example
//!
//! ```rust,ignore
//! use prax_include::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Blog {
//!     #[serde(rename = "_id")]
//!     id: ObjectId,
//!     name: String,
//! }
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Post {
//!     #[serde(rename = "_id")]
//!     id: ObjectId,
//!     title: String,
//!     blog_id: ObjectId,
//!     #[serde(default)]
//!     blog: Option<Blog>,
//! }
//!
//! entity!(Blog, EntitySchema::builder::<Blog>("Blog")
//!     .id(MemberInfo::property("id", ValueType::scalar("ObjectId")).element("_id"))
//!     .member(MemberInfo::property("name", ValueType::scalar("String")))
//!     .build());
//!
//! entity!(Post, EntitySchema::builder::<Post>("Post")
//!     .id(MemberInfo::property("id", ValueType::scalar("ObjectId")).element("_id"))
//!     .member(MemberInfo::property("title", ValueType::scalar("String")))
//!     .member(MemberInfo::property("blog_id", ValueType::scalar("ObjectId")))
//!     .member(MemberInfo::property("blog", ValueType::entity::<Blog>()))
//!     .build());
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = MongoClient::builder()
//!         .uri("mongodb://localhost:27017")
//!         .database("blogging")
//!         .build()
//!         .await?;
//!
//!     // $lookup from "blogs" on blog_id = _id, first match written to "blog"
//!     let posts = client
//!         .aggregate_queryable::<Post>()?
//!         .include(Navigation::<Post, Option<Blog>>::member("blog"))?
//!         .order_by("title")?
//!         .to_list()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Conventions
//!
//! Collection names default to the camel-cased plural of the type name
//! (`CategoryPerson` -> `categoryPeople`); foreign keys default to
//! `<navigation>_<id>` (`blog` -> `blog_id`). Both are swappable per
//! [`IncludeContext`] or process-wide, and configurable through
//! `PRAX_INCLUDE_COLLECTION_CONVENTION` / `PRAX_INCLUDE_FOREIGN_KEY_CONVENTION`.

pub mod cache;
pub mod client;
pub mod config;
pub mod context;
pub mod conventions;
pub mod entity;
pub mod entry;
pub mod error;
pub mod execute;
pub mod extractor;
pub mod include;
pub mod inflection;
pub mod logging;
pub mod mapping;
pub mod navigation;
pub mod numeric;
pub mod pipeline;
pub mod provider;
pub mod query;
pub mod queryable;
mod resolver;
pub mod source;
pub mod stages;
pub mod standard;

pub use bson::oid::ObjectId;
pub use bson::{Bson, Document, doc};
pub use cache::{CacheStats, ResolutionCache, ResolutionCaches};
pub use client::{MongoClient, MongoClientBuilder};
pub use config::{ExtractorKind, IncludeConfig, IncludeConfigBuilder, MongoConfig, MongoConfigBuilder};
pub use context::{
    IncludeContext, default_collection_name_convention, default_foreign_key_convention,
    set_default_collection_name_convention, set_default_foreign_key_convention,
};
pub use conventions::{
    CollectionNameConvention, CollectionNaming, Conventions, ForeignKeyNameConvention,
    ForeignKeyNaming,
};
pub use entity::{Entity, EntitySchema, Member, MemberInfo, MemberKey, MemberKind, ValueType};
pub use entry::AsAggregateQueryable;
pub use error::{IncludeError, IncludeResult};
pub use execute::AggregateQueryableExt;
pub use extractor::{CommandExtractor, StageExtractor, StructuredExtractor};
pub use include::{IncludeExt, IncludedQueryable};
pub use navigation::{Navigable, Navigation, NavigationPath};
pub use numeric::{NumericAggregateExt, NumericKind, NumericValue};
pub use pipeline::AggregatePipeline;
pub use provider::AggregateQueryProvider;
pub use query::{QueryExpr, QueryOp, SortDirection};
pub use queryable::{AggregateQuery, AggregateQueryable, OrderedAggregateQueryable, QueryableExt};
pub use source::{AggregateSource, DocumentStream};
pub use standard::MongoQueryable;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::client::{MongoClient, MongoClientBuilder};
    pub use crate::config::{IncludeConfig, MongoConfig};
    pub use crate::context::IncludeContext;
    pub use crate::conventions::{CollectionNaming, ForeignKeyNaming};
    pub use crate::entity;
    pub use crate::entity::{Entity, EntitySchema, MemberInfo, ValueType};
    pub use crate::entry::AsAggregateQueryable;
    pub use crate::error::{IncludeError, IncludeResult};
    pub use crate::execute::AggregateQueryableExt;
    pub use crate::include::{IncludeExt, IncludedQueryable};
    pub use crate::navigation::Navigation;
    pub use crate::numeric::NumericAggregateExt;
    pub use crate::pipeline::AggregatePipeline;
    pub use crate::queryable::{AggregateQueryable, QueryableExt};
    pub use crate::standard::MongoQueryable;
    pub use bson::oid::ObjectId;
    pub use bson::{Bson, Document, doc};
}
