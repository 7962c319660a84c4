//! Reference navigations: a post's blog, joined by foreign key or by the
//! blog's list of post ids.

mod common;

use std::sync::Arc;

use bson::oid::ObjectId;
use bson::{Document, doc};
use pretty_assertions::assert_eq;
use prax_include::prelude::*;

use common::MemoryDatabase;
use common::model::reference::{Blog, Post};

struct Seeded {
    db: MemoryDatabase,
    blogs: [ObjectId; 2],
}

fn seed() -> Seeded {
    let db = MemoryDatabase::new();
    let blogs = [ObjectId::new(), ObjectId::new()];
    let posts: Vec<ObjectId> = (0..5).map(|_| ObjectId::new()).collect();

    db.insert(
        "blogs1",
        [
            doc! { "_id": blogs[0], "BlogName": "Blog1", "Post_List": [] },
            doc! { "_id": blogs[1], "BlogName": "Blog2", "Post_List": [posts[2], posts[3]] },
        ],
    );
    db.insert(
        "posts1",
        posts.iter().enumerate().map(|(i, id)| {
            let blog_id = if i < 2 { bson::Bson::ObjectId(blogs[0]) } else { bson::Bson::Null };
            doc! { "_id": *id, "PostName": format!("Post{}", i + 1), "BlogId_FK": blog_id }
        }),
    );

    Seeded { db, blogs }
}

fn posts(db: &MemoryDatabase) -> AggregateQueryable<Post> {
    AggregatePipeline::<Post>::new(db.collection("posts1"), None)
        .as_aggregate_queryable_with(Arc::new(IncludeContext::default()))
        .unwrap()
}

fn blog_names(posts: &[Post], pick: impl Fn(&Post) -> Option<&Blog>) -> Vec<Option<String>> {
    posts
        .iter()
        .map(|post| pick(post).map(|blog| blog.name.clone()))
        .collect()
}

#[test]
fn test_foreign_key_stages() {
    let seeded = seed();
    let query = posts(&seeded.db)
        .include(Navigation::<Post, Option<Blog>>::member("Blog"))
        .unwrap();

    assert_eq!(query.navigation_element_name(), "Blog");
    assert_eq!(
        query.stages().to_vec(),
        vec![
            doc! {
                "$lookup": {
                    "from": "blogs1",
                    "localField": "BlogId_FK",
                    "foreignField": "_id",
                    "as": "__Blog__"
                }
            },
            doc! { "$addFields": { "Blog": { "$arrayElemAt": ["$__Blog__", 0] } } },
            doc! { "$project": { "__Blog__": 0 } },
        ]
    );
}

#[test]
fn test_inverse_property_stages() {
    let seeded = seed();
    let query = posts(&seeded.db)
        .include(Navigation::<Post, Option<Blog>>::member("BlogInverse"))
        .unwrap();

    assert_eq!(
        query.stages()[0],
        doc! {
            "$lookup": {
                "from": "blogs1",
                "localField": "_id",
                "foreignField": "Post_List",
                "as": "__BlogInverse__"
            }
        }
    );
}

#[tokio::test]
async fn test_include_by_foreign_key() {
    let seeded = seed();
    let posts = posts(&seeded.db)
        .include(Navigation::<Post, Option<Blog>>::member("Blog"))
        .unwrap()
        .to_list()
        .await
        .unwrap();

    assert_eq!(posts.len(), 5);
    assert_eq!(
        blog_names(&posts, |post| post.blog.as_ref()),
        vec![Some("Blog1".to_string()), Some("Blog1".to_string()), None, None, None]
    );
    assert_eq!(posts[0].blog.as_ref().map(|blog| blog.id), Some(seeded.blogs[0]));
    assert!(posts.iter().all(|post| post.blog_inverse.is_none()));
}

#[tokio::test]
async fn test_include_by_inverse_property() {
    let seeded = seed();
    let posts = posts(&seeded.db)
        .include(Navigation::<Post, Option<Blog>>::member("BlogInverse"))
        .unwrap()
        .to_list()
        .await
        .unwrap();

    assert_eq!(
        blog_names(&posts, |post| post.blog_inverse.as_ref()),
        vec![None, None, Some("Blog2".to_string()), Some("Blog2".to_string()), None]
    );
    assert!(posts.iter().all(|post| post.blog.is_none()));
}

#[tokio::test]
async fn test_include_both_navigations() {
    let seeded = seed();
    let posts = posts(&seeded.db)
        .include(Navigation::<Post, Option<Blog>>::member("Blog"))
        .unwrap()
        .include(Navigation::<Post, Option<Blog>>::member("BlogInverse"))
        .unwrap()
        .to_list()
        .await
        .unwrap();

    let both: Vec<(bool, bool)> = posts
        .iter()
        .map(|post| (post.blog.is_some(), post.blog_inverse.is_some()))
        .collect();
    assert_eq!(
        both,
        vec![(true, false), (true, false), (false, true), (false, true), (false, false)]
    );
}

#[tokio::test]
async fn test_temporary_field_is_removed() {
    let seeded = seed();
    let pipeline = posts(&seeded.db)
        .include(Navigation::<Post, Option<Blog>>::member("Blog"))
        .unwrap()
        .into_inner()
        .pipeline()
        .as_type::<Document>();
    let documents = pipeline.to_list().await.unwrap();

    assert_eq!(documents.len(), 5);
    assert!(documents.iter().all(|document| !document.contains_key("__Blog__")));
    assert!(documents[0].contains_key("Blog"));
    assert!(!documents[4].contains_key("Blog"));
}

#[tokio::test]
async fn test_include_then_filter_and_order() {
    let seeded = seed();
    let posts = posts(&seeded.db)
        .include(Navigation::<Post, Option<Blog>>::member("Blog"))
        .unwrap()
        .r#where(doc! { "Blog": { "$exists": true } })
        .unwrap()
        .order_by_descending("PostName")
        .unwrap()
        .to_list()
        .await
        .unwrap();

    let names: Vec<&str> = posts.iter().map(|post| post.name.as_str()).collect();
    assert_eq!(names, vec!["Post2", "Post1"]);
}
