//! Entity fixtures.
//!
//! - `reference`: a post references its blog by foreign key, or is listed
//!   in a blog's `PostIds` (inverse).
//! - `many`: blogs and posts referencing each other through id arrays.
//! - `nested`: snake_case entities relying on the naming conventions.

use bson::oid::ObjectId;
use prax_include::{EntitySchema, MemberInfo, ValueType, entity};
use serde::{Deserialize, Serialize};

fn object_id() -> ValueType {
    ValueType::scalar("ObjectId")
}

fn string() -> ValueType {
    ValueType::scalar("String")
}

pub mod reference {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Blog {
        #[serde(rename = "_id")]
        pub id: ObjectId,
        #[serde(rename = "BlogName")]
        pub name: String,
        #[serde(rename = "Post_List", default)]
        pub post_ids: Vec<ObjectId>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Post {
        #[serde(rename = "_id")]
        pub id: ObjectId,
        #[serde(rename = "PostName")]
        pub name: String,
        #[serde(rename = "BlogId_FK", default)]
        pub blog_id: Option<ObjectId>,
        #[serde(rename = "Blog", default)]
        pub blog: Option<Blog>,
        #[serde(rename = "BlogInverse", default)]
        pub blog_inverse: Option<Blog>,
    }

    entity!(
        Blog,
        EntitySchema::builder::<Blog>("Blog")
            .table("blogs1")
            .id(MemberInfo::property("Id", object_id()).element("_id"))
            .member(MemberInfo::property("Name", string()).element("BlogName"))
            .member(
                MemberInfo::property("PostIds", ValueType::scalar_collection("ObjectId"))
                    .element("Post_List"),
            )
            .build()
    );

    entity!(
        Post,
        EntitySchema::builder::<Post>("Post")
            .table("posts1")
            .id(MemberInfo::property("Id", object_id()).element("_id"))
            .member(MemberInfo::property("Name", string()).element("PostName"))
            .member(MemberInfo::property("BlogId", object_id()).element("BlogId_FK"))
            .member(MemberInfo::property("Blog", ValueType::entity::<Blog>()).foreign_key("BlogId"))
            .member(
                MemberInfo::property("BlogInverse", ValueType::entity::<Blog>())
                    .inverse_property("PostIds"),
            )
            .build()
    );
}

pub mod many {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Blog {
        #[serde(rename = "_id")]
        pub id: ObjectId,
        #[serde(rename = "BlogName")]
        pub name: String,
        #[serde(rename = "PostIds_FK", default)]
        pub post_ids: Vec<ObjectId>,
        #[serde(rename = "Posts", default)]
        pub posts: Vec<Post>,
        #[serde(rename = "PostsInverse", default)]
        pub posts_inverse: Vec<Post>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Post {
        #[serde(rename = "_id")]
        pub id: ObjectId,
        #[serde(rename = "PostName")]
        pub name: String,
        #[serde(rename = "BlogIds_FK", default)]
        pub blog_ids: Vec<ObjectId>,
        #[serde(rename = "Blogs", default)]
        pub blogs: Vec<Blog>,
        #[serde(rename = "BlogsInverse", default)]
        pub blogs_inverse: Vec<Blog>,
    }

    entity!(
        Blog,
        EntitySchema::builder::<Blog>("Blog")
            .table("blogs2")
            .id(MemberInfo::property("Id", object_id()).element("_id"))
            .member(MemberInfo::property("Name", string()).element("BlogName"))
            .member(
                MemberInfo::property("PostIds", ValueType::scalar_collection("ObjectId"))
                    .element("PostIds_FK"),
            )
            .member(
                MemberInfo::property("Posts", ValueType::collection_of::<Post>())
                    .foreign_key("PostIds"),
            )
            .member(
                MemberInfo::property("PostsInverse", ValueType::collection_of::<Post>())
                    .inverse_property("BlogIds"),
            )
            .build()
    );

    entity!(
        Post,
        EntitySchema::builder::<Post>("Post")
            .table("posts2")
            .id(MemberInfo::property("Id", object_id()).element("_id"))
            .member(MemberInfo::property("Name", string()).element("PostName"))
            .member(
                MemberInfo::property("BlogIds", ValueType::scalar_collection("ObjectId"))
                    .element("BlogIds_FK"),
            )
            .member(
                MemberInfo::property("Blogs", ValueType::collection_of::<Blog>())
                    .foreign_key("BlogIds"),
            )
            .member(
                MemberInfo::property("BlogsInverse", ValueType::collection_of::<Blog>())
                    .inverse_property("PostIds"),
            )
            .build()
    );
}

pub mod nested {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Author {
        #[serde(rename = "_id")]
        pub id: ObjectId,
        pub name: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Blog {
        #[serde(rename = "_id")]
        pub id: ObjectId,
        pub name: String,
        #[serde(default)]
        pub owner_id: Option<ObjectId>,
        #[serde(default)]
        pub owner: Option<Author>,
        #[serde(default)]
        pub posts: Vec<Post>,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Post {
        #[serde(rename = "_id")]
        pub id: ObjectId,
        pub title: String,
        pub rating: i32,
        #[serde(default)]
        pub score: Option<f64>,
        #[serde(default)]
        pub blog_id: Option<ObjectId>,
        #[serde(default)]
        pub blog: Option<Blog>,
    }

    entity!(
        Author,
        EntitySchema::builder::<Author>("Author")
            .id(MemberInfo::field("id", object_id()).element("_id"))
            .member(MemberInfo::field("name", string()))
            .build()
    );

    entity!(
        Blog,
        EntitySchema::builder::<Blog>("Blog")
            .id(MemberInfo::field("id", object_id()).element("_id"))
            .member(MemberInfo::field("name", string()))
            .member(MemberInfo::field("owner_id", object_id()))
            .member(MemberInfo::field("owner", ValueType::entity::<Author>()))
            .member(
                MemberInfo::field("posts", ValueType::collection_of::<Post>())
                    .inverse_property("blog_id"),
            )
            .build()
    );

    entity!(
        Post,
        EntitySchema::builder::<Post>("Post")
            .id(MemberInfo::field("id", object_id()).element("_id"))
            .member(MemberInfo::field("title", string()))
            .member(MemberInfo::field("rating", ValueType::scalar("i32")))
            .member(MemberInfo::field("score", ValueType::scalar("f64")))
            .member(MemberInfo::field("blog_id", object_id()))
            .member(MemberInfo::field("blog", ValueType::entity::<Blog>()))
            .build()
    );
}
