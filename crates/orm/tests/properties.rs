//! Observable guarantees of the compiler, aggregates, eager loading,
//! hydration and soft deletes, checked against an in-memory SQLite database.

mod common;

use common::*;
use strata_orm::prelude::*;
use strata_orm::sql::Grammar;
use strata_orm::SqlDialect;

#[test]
fn test_placeholders_match_binding_count() {
    let recent = QueryBuilder::table("votes").where_gt("id", 50).select(&["subject_id"]);
    let archived = QueryBuilder::table("archived_subjects")
        .select(&["id", "title"])
        .where_eq("category_id", 3);

    let query = Subject::query()
        .with_cte("recent", recent)
        .select(&["subjects.id", "subjects.title"])
        .with_count_where("votes", "vote", 2)
        .join_on("categories", |join| {
            join.on("categories.id", "=", "subjects.category_id")
                .where_ne("categories.name", "hidden")
        })
        .where_in("subjects.category_id", vec![1, 2, 3])
        .where_group(|group| group.where_like("title", "%ph%").or_where_eq("title", "Biology"))
        .group_by(&["subjects.id", "subjects.title"])
        .having_raw("COUNT(*) > ?", vec![DatabaseValue::Int64(0)])
        .union(archived)
        .order_by_raw("CASE WHEN subjects.id = ? THEN 0 ELSE 1 END", vec![DatabaseValue::Int64(10)]);

    for dialect in [SqlDialect::SQLite, SqlDialect::PostgreSQL] {
        let compiled = query.compile(&Grammar::new(dialect)).unwrap();
        assert_eq!(placeholder_count(&compiled.sql), compiled.bindings.len(), "{}", compiled.sql);
        assert_eq!(compiled.bindings.len(), 11);
    }
}

#[test]
fn test_placeholders_are_numbered_by_binding_position() {
    let compiled = Subject::query()
        .with_count_where("votes", "vote", 9)
        .where_eq("title", "Physics")
        .compile(&Grammar::new(SqlDialect::PostgreSQL))
        .unwrap();

    assert!(compiled.sql.contains("\"title\" = $1"), "{}", compiled.sql);
    assert!(compiled.sql.contains("\"vote\" = $2"), "{}", compiled.sql);
    assert_eq!(
        compiled.bindings,
        vec![DatabaseValue::from("Physics"), DatabaseValue::Int32(9)]
    );
}

#[test]
fn test_update_binds_set_values_before_where_values() {
    let compiled = QueryBuilder::table("votes")
        .where_eq("id", 100)
        .update([("vote", 5)])
        .compile(&Grammar::default())
        .unwrap();

    assert_eq!(compiled.sql, "UPDATE \"votes\" SET \"vote\" = ?1 WHERE \"id\" = ?2");
    assert_eq!(compiled.bindings, vec![DatabaseValue::Int32(5), DatabaseValue::Int32(100)]);
}

#[test]
fn test_subject_vote_counts() {
    let mut conn = forum();
    let subject = Subject::query()
        .with_count("votes")
        .with_count_where("votes", "vote", 2)
        .with_count_where("votes", "vote", 9)
        .find(&mut conn, 10)
        .unwrap()
        .unwrap();

    assert_eq!(int(subject.get("votes_count")), Some(2));
    assert_eq!(int(subject.get("votes_count_2")), Some(1));
    assert_eq!(int(subject.get("votes_count_9")), Some(0));
}

#[test]
fn test_category_counts_across_every_relation_kind() {
    let mut conn = forum();
    let categories = Category::query()
        .with_count("subjects")
        .with_count("tags")
        .with_count("votes")
        .with_aggregate_where("subjects", None, "count", Some("titled_p"), |c| {
            c.where_like("title", "P%")
        })
        .order_by("id")
        .get(&mut conn)
        .unwrap();

    let counts: Vec<_> = categories
        .iter()
        .map(|c| {
            (
                int(c.get("subjects_count")),
                int(c.get("tags_count")),
                int(c.get("votes_count")),
                int(c.get("titled_p")),
            )
        })
        .collect();

    assert_eq!(
        counts,
        vec![
            (Some(2), Some(2), Some(2), Some(1)),
            (Some(0), Some(0), Some(0), Some(0)),
        ]
    );
}

#[test]
fn test_many_to_many_count_is_zero_not_null() {
    let mut conn = forum();
    let empty = Category::query().with_count("tags").find(&mut conn, 2).unwrap().unwrap();
    assert_eq!(empty.get("tags_count"), Some(DatabaseValue::Int64(0)));
}

#[test]
fn test_eager_loading_distinguishes_empty_list_from_null() {
    for strategy in [EagerLoadStrategy::Batched, EagerLoadStrategy::PerParent] {
        let mut conn = forum();

        let categories = Category::query()
            .with("subjects")
            .eager_strategy(strategy)
            .order_by("id")
            .get(&mut conn)
            .unwrap();
        let empty = categories[1].relation("subjects").unwrap();
        assert_eq!(empty.as_many().map(<[Entity]>::len), Some(0), "{}", strategy);
        assert_eq!(empty.to_json(), serde_json::json!([]));

        let subjects = Subject::query()
            .with("top_vote")
            .eager_strategy(strategy)
            .order_by("id")
            .get(&mut conn)
            .unwrap();
        assert!(matches!(subjects[0].relation("top_vote").unwrap().as_one(), Some(Some(_))));
        let missing = subjects[1].relation("top_vote").unwrap();
        assert!(matches!(missing.as_one(), Some(None)), "{}", strategy);
        assert_eq!(missing.to_json(), serde_json::Value::Null);
    }
}

#[test]
fn test_hydration_round_trips_identity_attributes() {
    let mut conn = forum();
    let rows = QueryBuilder::table("subjects").order_by("id").get_rows(&mut conn).unwrap();
    let subjects = Subject::query().order_by("id").get(&mut conn).unwrap();

    assert_eq!(rows.len(), subjects.len());
    for (row, subject) in rows.iter().zip(&subjects) {
        for (column, value) in row.iter() {
            assert_eq!(subject.get(column).as_ref(), Some(value), "column {}", column);
        }
        assert_eq!(subject.existence(), Existence::Persisted);
        assert!(!subject.is_dirty());
    }
}

#[test]
fn test_soft_delete_then_restore_toggles_default_scope() {
    let mut conn = forum();
    let mut member = Member::new_entity();
    member.fill([("name", "Ann"), ("email", "ANN@EXAMPLE.COM")]);
    member.save(&mut conn).unwrap();

    assert_eq!(Member::query().count(&mut conn).unwrap(), 1);

    member.delete(&mut conn).unwrap();
    assert!(member.is_trashed());
    assert_eq!(Member::query().count(&mut conn).unwrap(), 0);
    assert_eq!(Member::query().with_trashed().count(&mut conn).unwrap(), 1);
    assert_eq!(Member::query().only_trashed().count(&mut conn).unwrap(), 1);

    member.restore(&mut conn).unwrap();
    assert_eq!(Member::query().count(&mut conn).unwrap(), 1);
    assert_eq!(Member::query().only_trashed().count(&mut conn).unwrap(), 0);

    let found = Member::find(&mut conn, member.key().cloned().unwrap()).unwrap().unwrap();
    assert_eq!(found.get("email"), Some("ann@example.com".into()));
}
