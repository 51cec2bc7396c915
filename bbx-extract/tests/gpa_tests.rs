//! GPA recomputation over stored transcripts

mod helpers;

use bbx_extract::db::{load_gpa, recalculate_gpa};
use helpers::*;

#[tokio::test]
async fn test_gpa_weights_year_long_grades_double() {
    let (_dir, pool) = create_test_db().await.unwrap();

    for line in [
        Line::new(7, 10, 3, Some(2_154_182), "Year-Long Grades", PRIOR)
            .grade("A-")
            .score(Some(90.0)),
        Line::new(7, 11, 3, Some(2_154_182), "Year-Long Grades", PRIOR)
            .grade("B-")
            .score(Some(80.0)),
        Line::new(7, 12, 2, Some(3_000_001), "Spring Term Grades", PRIOR)
            .grade("A+")
            .score(Some(100.0)),
        // Excluded: year-long half, scheduled placeholder, non-GPA grade
        Line::new(7, 10, 1, Some(2_154_180), "Fall Term Grades YL", PRIOR)
            .grade("F")
            .score(Some(0.0)),
        Line::new(7, 13, 1, None, "Spring Term Grades", CURRENT)
            .grade("A")
            .score(Some(0.0)),
        Line::new(7, 14, 1, Some(3_000_002), "Semester Grades", PRIOR)
            .grade("CR")
            .score(Some(0.0)),
    ] {
        seed(&pool, &line).await.unwrap();
    }

    let students = recalculate_gpa(&pool).await.unwrap();

    assert_eq!(students, 1);
    // (90*2 + 80*2 + 100*1) / (2 + 2 + 1)
    assert_eq!(load_gpa(&pool, 7).await.unwrap(), Some(88.0));
}

#[tokio::test]
async fn test_gpa_rounds_and_updates_in_place() {
    let (_dir, pool) = create_test_db().await.unwrap();

    for (course, score) in [(10, 90.0), (11, 85.0), (12, 80.0)] {
        seed(
            &pool,
            &Line::new(8, course, 1, Some(4000 + course), "Semester Grades", PRIOR)
                .grade("B")
                .score(Some(score)),
        )
        .await
        .unwrap();
    }
    recalculate_gpa(&pool).await.unwrap();
    assert_eq!(load_gpa(&pool, 8).await.unwrap(), Some(85.0));

    seed(
        &pool,
        &Line::new(8, 13, 1, Some(4013), "Semester Grades", PRIOR)
            .grade("P")
            .score(Some(100.0)),
    )
    .await
    .unwrap();
    recalculate_gpa(&pool).await.unwrap();

    // 355 / 4 = 88.75
    assert_eq!(load_gpa(&pool, 8).await.unwrap(), Some(88.75));
    assert_eq!(count_rows(&pool, "gpa").await.unwrap(), 1);

    seed(
        &pool,
        &Line::new(8, 14, 1, Some(4014), "Semester Grades", PRIOR)
            .grade("B")
            .score(Some(81.0)),
    )
    .await
    .unwrap();
    recalculate_gpa(&pool).await.unwrap();

    // 436 / 5 = 87.2
    assert_eq!(load_gpa(&pool, 8).await.unwrap(), Some(87.2));
}

#[tokio::test]
async fn test_student_without_qualifying_rows_has_no_gpa() {
    let (_dir, pool) = create_test_db().await.unwrap();
    seed(
        &pool,
        &Line::new(9, 10, 1, None, "Spring Term Grades", CURRENT).score(None),
    )
    .await
    .unwrap();

    assert_eq!(recalculate_gpa(&pool).await.unwrap(), 0);
    assert_eq!(load_gpa(&pool, 9).await.unwrap(), None);
}
