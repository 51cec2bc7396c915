//! A failing phase must leave the warehouse exactly as it was

mod helpers;

use bbx_extract::reconcile::corrections::CorrectionStep;
use bbx_extract::ReconcilePhase;
use helpers::*;

#[tokio::test]
async fn test_failure_in_nonstandard_step_rolls_back_everything() {
    let (_dir, pool) = create_test_db().await.unwrap();

    // State from an earlier run: a scheduled placeholder and a tag inside
    // the cleanup window, both of which cleanup would remove
    seed(&pool, &Line::new(1, 10, 1, None, "Spring Term Grades", helpers::CURRENT))
        .await
        .unwrap();
    seed(
        &pool,
        &Line::new(2, 11, 1, Some(888_888), "no_yearlong_possible", PRIOR),
    )
    .await
    .unwrap();
    seed(
        &pool,
        &Line::new(3, 12, 1, Some(4100), "Semester Grades", PRIOR),
    )
    .await
    .unwrap();

    fail_updates_to_grade_id(&pool, 777_777).await.unwrap();
    let before = snapshot(&pool).await.unwrap();

    let lines = vec![
        // New rows the upsert would add
        Line::new(5, 20, 1, Some(5100), "Semester Grades", PRIOR),
        // Overwrite of an existing row
        Line::new(3, 12, 1, Some(4100), "Semester Grades", PRIOR).grade("C"),
        // Mixed pair that sends step 2 into the failing trigger
        Line::new(6, 21, 1, Some(2_154_180), "Fall Term Grades YL", PRIOR).grade("A"),
        Line::new(6, 21, 2, Some(2_154_181), "Spring Term Grades YL", PRIOR).grade("NC"),
    ];
    let err = reconcile_lines(&pool, &lines, current_year())
        .await
        .unwrap_err();

    assert_eq!(
        err.phase,
        ReconcilePhase::Correction(CorrectionStep::FixNonstandardGrades)
    );
    assert!(err.to_string().contains("fix_nonstandard_grades"));

    let after = snapshot(&pool).await.unwrap();
    assert_eq!(before, after);
    assert_eq!(count_rows(&pool, "transcripts").await.unwrap(), 3);
}

#[tokio::test]
async fn test_missing_key_column_fails_in_upsert_phase() {
    let (_dir, pool) = create_test_db().await.unwrap();
    seed(&pool, &Line::new(1, 10, 1, None, "Spring Term Grades", PRIOR))
        .await
        .unwrap();
    let before = snapshot(&pool).await.unwrap();

    let mut table = raw_table(&[Line::new(2, 11, 1, Some(1), "Semester Grades", PRIOR)]);
    let idx = table.column_index("term_id").unwrap();
    table.columns.remove(idx);
    for row in &mut table.rows {
        row.remove(idx);
    }

    let err = bbx_extract::reconcile_transcripts(&pool, &table, current_year())
        .await
        .unwrap_err();

    assert_eq!(err.phase, ReconcilePhase::Upsert);
    assert!(matches!(err.source, bbx_common::Error::InvalidInput(_)));
    // Cleanup had already deleted the placeholder inside the transaction
    assert_eq!(snapshot(&pool).await.unwrap(), before);
}
