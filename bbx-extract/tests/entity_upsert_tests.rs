//! Descriptor-driven upserts for the simpler entities

mod helpers;

use bbx_common::{Cell, UnorderedTable};
use bbx_extract::reconcile::{ATTENDANCE, ENROLLMENT, PARENTS, TRANSCRIPT_COMMENTS};
use bbx_extract::{reconcile_entity, ReconcilePhase};
use helpers::*;

fn table(columns: &[&str], rows: Vec<Vec<Cell>>) -> UnorderedTable {
    let mut t = UnorderedTable::with_columns(columns.iter().copied());
    for row in rows {
        t.push_row(row).unwrap();
    }
    t
}

#[tokio::test]
async fn test_parents_update_on_conflict() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let columns = ["email", "first_name", "last_name", "grades"];

    let first = table(
        &columns,
        vec![vec![
            Cell::from("a@example.org"),
            Cell::from("Ann"),
            Cell::from("Lee"),
            Cell::from("9"),
        ]],
    );
    reconcile_entity(&pool, &PARENTS, &first).await.unwrap();

    let second = table(
        &columns,
        vec![vec![
            Cell::from("a@example.org"),
            Cell::from("Ann"),
            Cell::from("Lee-Park"),
            Cell::from("9,11"),
        ]],
    );
    let outcome = reconcile_entity(&pool, &PARENTS, &second).await.unwrap();
    assert_eq!(outcome.written, 1);

    let (last, grades): (String, String) =
        sqlx::query_as("SELECT last_name, grades FROM parents WHERE email = 'a@example.org'")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(last, "Lee-Park");
    assert_eq!(grades, "9,11");
    assert_eq!(count_rows(&pool, "parents").await.unwrap(), 1);
}

#[tokio::test]
async fn test_attendance_is_append_only() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let columns = ["id", "student_user_id", "comment", "vendor_only_field"];

    let first = table(
        &columns,
        vec![vec![
            Cell::Int(1),
            Cell::Int(42),
            Cell::from("late"),
            Cell::Bool(true),
        ]],
    );
    let outcome = reconcile_entity(&pool, &ATTENDANCE, &first).await.unwrap();
    assert_eq!(outcome.written, 1);
    assert_eq!(outcome.dropped_columns, vec!["vendor_only_field"]);

    let replay = table(
        &columns,
        vec![
            vec![Cell::Int(1), Cell::Int(42), Cell::from("edited"), Cell::Null],
            vec![Cell::Int(2), Cell::Int(42), Cell::from("absent"), Cell::Null],
        ],
    );
    let outcome = reconcile_entity(&pool, &ATTENDANCE, &replay).await.unwrap();
    assert_eq!(outcome.attempted, 2);
    assert_eq!(outcome.written, 1);

    let comment: String = sqlx::query_scalar("SELECT comment FROM attendance WHERE id = 1")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(comment, "late");
}

#[tokio::test]
async fn test_rows_with_null_key_are_dropped() {
    let (_dir, pool) = create_test_db().await.unwrap();

    let enrollment = table(
        &["student_user_id", "student_first", "grad_year"],
        vec![
            vec![Cell::Int(7), Cell::from("Sam"), Cell::Int(2027)],
            vec![Cell::Null, Cell::from("Ghost"), Cell::Int(2027)],
        ],
    );
    let outcome = reconcile_entity(&pool, &ENROLLMENT, &enrollment).await.unwrap();

    assert_eq!(outcome.written, 1);
    assert_eq!(outcome.dropped_null_key, 1);
    assert_eq!(count_rows(&pool, "enrollment").await.unwrap(), 1);
}

#[tokio::test]
async fn test_comments_keyed_on_student() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let columns = ["student_user_id", "school_year", "comment"];

    for comment in ["first draft", "final"] {
        let t = table(
            &columns,
            vec![vec![Cell::Int(7), Cell::from(PRIOR), Cell::from(comment)]],
        );
        reconcile_entity(&pool, &TRANSCRIPT_COMMENTS, &t).await.unwrap();
    }

    let comment: String =
        sqlx::query_scalar("SELECT comment FROM transcript_comments WHERE student_user_id = 7")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(comment, "final");
}

#[tokio::test]
async fn test_missing_primary_key_column_is_upsert_error() {
    let (_dir, pool) = create_test_db().await.unwrap();

    let t = table(&["first_name"], vec![vec![Cell::from("Ann")]]);
    let err = reconcile_entity(&pool, &PARENTS, &t).await.unwrap_err();

    assert_eq!(err.phase, ReconcilePhase::Upsert);
    assert_eq!(count_rows(&pool, "parents").await.unwrap(), 0);
}

#[tokio::test]
async fn test_empty_table_is_a_no_op() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let outcome = reconcile_entity(&pool, &PARENTS, &UnorderedTable::new())
        .await
        .unwrap();
    assert_eq!(outcome.attempted, 0);
}
