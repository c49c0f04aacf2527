//! Shared models and fixtures for the integration tests
#![allow(dead_code)]

use strata_orm::prelude::*;
use tracing_subscriber::EnvFilter;

/// Route crate logs to the test output; `RUST_LOG=strata_orm=debug` shows compiled SQL
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct Category;

impl Model for Category {
    fn table_name() -> &'static str {
        "categories"
    }

    fn attributes() -> Vec<AttributeDef> {
        vec![AttributeDef::new("name")]
    }

    fn relationships() -> Vec<(&'static str, RelationshipDescriptor)> {
        vec![
            ("subjects", RelationshipDescriptor::has_many(Subject::model_ref(), "category_id")),
            (
                "tags",
                RelationshipDescriptor::belongs_to_many(
                    Tag::model_ref(),
                    "category_tag",
                    "category_id",
                    "tag_id",
                ),
            ),
            (
                "votes",
                RelationshipDescriptor::has_many_through(
                    Vote::model_ref(),
                    Subject::model_ref(),
                    "category_id",
                    "subject_id",
                ),
            ),
        ]
    }
}

pub struct Subject;

impl Model for Subject {
    fn table_name() -> &'static str {
        "subjects"
    }

    fn attributes() -> Vec<AttributeDef> {
        vec![AttributeDef::new("category_id"), AttributeDef::new("title")]
    }

    fn relationships() -> Vec<(&'static str, RelationshipDescriptor)> {
        vec![
            ("votes", RelationshipDescriptor::has_many(Vote::model_ref(), "subject_id")),
            ("category", RelationshipDescriptor::belongs_to(Category::model_ref(), "category_id")),
            ("top_vote", RelationshipDescriptor::has_one(Vote::model_ref(), "subject_id")),
            (
                "comments",
                RelationshipDescriptor::morph_many(Comment::model_ref(), "commentable", "subject"),
            ),
        ]
    }
}

pub struct Vote;

impl Model for Vote {
    fn table_name() -> &'static str {
        "votes"
    }

    fn attributes() -> Vec<AttributeDef> {
        vec![AttributeDef::new("subject_id"), AttributeDef::new("vote")]
    }
}

pub struct Tag;

impl Model for Tag {
    fn table_name() -> &'static str {
        "tags"
    }
}

pub struct Comment;

impl Model for Comment {
    fn table_name() -> &'static str {
        "comments"
    }

    fn attributes() -> Vec<AttributeDef> {
        vec![
            AttributeDef::new("body"),
            AttributeDef::new("commentable_type"),
            AttributeDef::new("commentable_id"),
        ]
    }

    fn relationships() -> Vec<(&'static str, RelationshipDescriptor)> {
        vec![(
            "commentable",
            RelationshipDescriptor::morph_to(
                "commentable",
                &[("subject", Subject::model_ref()), ("category", Category::model_ref())],
            ),
        )]
    }
}

pub struct Member;

impl Model for Member {
    fn table_name() -> &'static str {
        "members"
    }

    fn attributes() -> Vec<AttributeDef> {
        vec![
            AttributeDef::new("name"),
            AttributeDef::new("email").inbound(AttributeTransform::Lowercase),
            AttributeDef::new("password").guarded(),
        ]
    }

    fn uses_soft_deletes() -> bool {
        true
    }

    fn uses_timestamps() -> bool {
        true
    }
}

/// In-memory database holding the category/subject/vote fixture:
///
/// - category 1 has subject 10 (votes 2 and 0) and subject 11 (no votes)
/// - category 2 has no subjects and no tags; category 1 has tags 1 and 2
/// - subject 10 carries one comment, category 1 carries one comment and a
///   third comment points at category 10, which does not exist
pub fn forum() -> SqliteConnection {
    init_tracing();
    let conn = SqliteConnection::open_in_memory().expect("open in-memory database");
    conn.execute_batch(
        "CREATE TABLE categories (id INTEGER PRIMARY KEY, name TEXT);
         CREATE TABLE subjects (id INTEGER PRIMARY KEY, category_id INTEGER, title TEXT);
         CREATE TABLE votes (id INTEGER PRIMARY KEY, subject_id INTEGER, vote INTEGER);
         CREATE TABLE tags (id INTEGER PRIMARY KEY, label TEXT);
         CREATE TABLE category_tag (category_id INTEGER, tag_id INTEGER);
         CREATE TABLE comments (
             id INTEGER PRIMARY KEY,
             body TEXT,
             commentable_type TEXT,
             commentable_id INTEGER
         );
         CREATE TABLE members (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             name TEXT,
             email TEXT,
             password TEXT,
             created_at TEXT,
             updated_at TEXT,
             deleted_at TEXT
         );

         INSERT INTO categories (id, name) VALUES (1, 'Science'), (2, 'Empty');
         INSERT INTO subjects (id, category_id, title) VALUES (10, 1, 'Physics'), (11, 1, 'Biology');
         INSERT INTO votes (id, subject_id, vote) VALUES (100, 10, 2), (101, 10, 0);
         INSERT INTO tags (id, label) VALUES (1, 'stem'), (2, 'lab');
         INSERT INTO category_tag (category_id, tag_id) VALUES (1, 1), (1, 2);
         INSERT INTO comments (id, body, commentable_type, commentable_id) VALUES
             (1, 'nice subject', 'subject', 10),
             (2, 'nice category', 'category', 1),
             (3, 'dangling', 'category', 10);",
    )
    .expect("create fixture");
    conn
}

/// Number of numbered placeholders (`?N` or `$N`) in a statement
pub fn placeholder_count(sql: &str) -> usize {
    let bytes = sql.as_bytes();
    bytes
        .windows(2)
        .filter(|pair| (pair[0] == b'?' || pair[0] == b'$') && pair[1].is_ascii_digit())
        .count()
}

pub fn int(value: Option<DatabaseValue>) -> Option<i64> {
    value.and_then(|v| v.as_i64())
}
