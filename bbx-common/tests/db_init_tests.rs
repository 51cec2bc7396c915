//! Integration tests for warehouse initialisation

use bbx_common::db::init::init_database;
use tempfile::TempDir;

#[tokio::test]
async fn test_database_creation_when_missing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("warehouse.db");

    let result = init_database(&db_path).await;

    assert!(result.is_ok(), "Database initialization failed: {:?}", result.err());
    assert!(db_path.exists(), "Database file was not created");
}

#[tokio::test]
async fn test_database_opens_existing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("warehouse.db");

    let pool1 = init_database(&db_path).await.unwrap();
    sqlx::query("INSERT INTO course_codes (course_prefix, transcript_category) VALUES ('MATH', 'Mathematics')")
        .execute(&pool1)
        .await
        .unwrap();
    pool1.close().await;

    // Second open must keep existing rows (CREATE TABLE IF NOT EXISTS)
    let pool2 = init_database(&db_path).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM course_codes")
        .fetch_one(&pool2)
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_all_entity_tables_created() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("warehouse.db")).await.unwrap();

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    assert_eq!(
        tables,
        vec![
            "attendance",
            "course_codes",
            "enrollment",
            "gpa",
            "parents",
            "transcript_comments",
            "transcripts",
        ]
    );
}

#[tokio::test]
async fn test_transcript_key_rejects_null_grade_id() {
    let dir = TempDir::new().unwrap();
    let pool = init_database(&dir.path().join("warehouse.db")).await.unwrap();

    let result = sqlx::query(
        "INSERT INTO transcripts (student_user_id, term_id, group_id, course_id, grade_id) VALUES (1, 2, 3, 4, NULL)",
    )
    .execute(&pool)
    .await;

    assert!(result.is_err(), "NULL grade_id must violate the key");
}
