//! Sentinel grade ids and grade-description labels
//!
//! `grade_id` is part of the transcript key, so rows without a vendor grade
//! carry a reserved value instead. Each reserved value tags one state of a
//! row's reconciliation workflow:
//!
//! ```text
//! vendor id -> (no row) -> Scheduled -> NoYearlong | NonstandardPairing
//!           -> PromotedFall (current year only) -> reverted or deleted
//! ```
//!
//! Integers only appear at the storage boundary (`to_db` / `from_db`).

use std::fmt;

pub const SCHEDULED_GRADE_ID: i64 = 999_999;
pub const NO_YEARLONG_GRADE_ID: i64 = 888_888;
pub const NONSTANDARD_PAIRING_GRADE_ID: i64 = 777_777;
pub const PROMOTED_FALL_GRADE_ID: i64 = 666_666;

/// Vendor grade_id of the fall half of a year-long course
pub const FALL_TERM_YL_GRADE_ID: i64 = 2_154_180;

/// Vendor and workflow grade-description labels
pub mod labels {
    pub const FALL_TERM_YL: &str = "Fall Term Grades YL";
    pub const SPRING_TERM_YL: &str = "Spring Term Grades YL";
    pub const YEAR_LONG: &str = "Year-Long Grades";
    pub const SENIOR_MID_TERM: &str = "Senior Mid-Term Grades";
    pub const NO_YEARLONG_POSSIBLE: &str = "no_yearlong_possible";
    pub const CURRENT_FALL_YL: &str = "current_fall_yl";

    /// Labels of the year-long family
    pub const YEAR_LONG_FAMILY: [&str; 3] = [FALL_TERM_YL, SPRING_TERM_YL, YEAR_LONG];

    /// Half-year labels of a year-long course
    pub const YEAR_LONG_HALVES: [&str; 2] = [FALL_TERM_YL, SPRING_TERM_YL];
}

/// Grades that are not letter grades (credit/no credit, incomplete,
/// withdrawals, audit)
pub const NON_LETTER_GRADES: [&str; 6] = ["NC", "CR", "I", "WF", "WP", "AU"];

/// Placeholder transcript category for rows awaiting a prefix lookup
pub const MISSING_CATEGORY: &str = "NaN";

/// A transcript grade_id: either a vendor value or a workflow tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GradeId {
    /// Real vendor-issued grade id
    Vendor(i64),
    /// Scheduled, not yet graded
    Scheduled,
    /// Half of a year-long course with no matching second half
    NoYearlong,
    /// Year-long halves graded on incompatible scales
    NonstandardPairing,
    /// Current-year fall grade exposed before the year-long grade exists
    PromotedFall,
}

impl GradeId {
    /// Key component for a raw vendor value; absence means scheduled
    pub fn from_raw(raw: Option<i64>) -> Self {
        match raw {
            Some(value) => Self::from_db(value),
            None => GradeId::Scheduled,
        }
    }

    pub fn from_db(value: i64) -> Self {
        match value {
            SCHEDULED_GRADE_ID => GradeId::Scheduled,
            NO_YEARLONG_GRADE_ID => GradeId::NoYearlong,
            NONSTANDARD_PAIRING_GRADE_ID => GradeId::NonstandardPairing,
            PROMOTED_FALL_GRADE_ID => GradeId::PromotedFall,
            other => GradeId::Vendor(other),
        }
    }

    pub fn to_db(self) -> i64 {
        match self {
            GradeId::Vendor(value) => value,
            GradeId::Scheduled => SCHEDULED_GRADE_ID,
            GradeId::NoYearlong => NO_YEARLONG_GRADE_ID,
            GradeId::NonstandardPairing => NONSTANDARD_PAIRING_GRADE_ID,
            GradeId::PromotedFall => PROMOTED_FALL_GRADE_ID,
        }
    }

    pub fn is_sentinel(self) -> bool {
        !matches!(self, GradeId::Vendor(_))
    }

    /// grade_description written alongside a corrective tag
    pub fn workflow_label(self) -> Option<&'static str> {
        match self {
            GradeId::NoYearlong | GradeId::NonstandardPairing => Some(labels::NO_YEARLONG_POSSIBLE),
            GradeId::PromotedFall => Some(labels::CURRENT_FALL_YL),
            GradeId::Vendor(_) | GradeId::Scheduled => None,
        }
    }

    /// True if a vendor value would be read back as a sentinel
    pub fn collides_with_sentinel(raw: i64) -> bool {
        Self::from_db(raw).is_sentinel()
    }
}

impl fmt::Display for GradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradeId::Vendor(value) => write!(f, "{}", value),
            GradeId::Scheduled => write!(f, "scheduled({})", SCHEDULED_GRADE_ID),
            GradeId::NoYearlong => write!(f, "no_yearlong({})", NO_YEARLONG_GRADE_ID),
            GradeId::NonstandardPairing => {
                write!(f, "nonstandard_pairing({})", NONSTANDARD_PAIRING_GRADE_ID)
            }
            GradeId::PromotedFall => write!(f, "promoted_fall({})", PROMOTED_FALL_GRADE_ID),
        }
    }
}

/// Render string constants as a SQL literal list: `'a', 'b'`
pub(crate) fn sql_literal_list(values: &[&str]) -> String {
    values
        .iter()
        .map(|v| format!("'{}'", v.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_raw_value_is_scheduled() {
        assert_eq!(GradeId::from_raw(None), GradeId::Scheduled);
        assert_eq!(GradeId::from_raw(None).to_db(), 999_999);
    }

    #[test]
    fn test_vendor_value_passes_through() {
        let id = GradeId::from_raw(Some(2_154_180));
        assert_eq!(id, GradeId::Vendor(2_154_180));
        assert!(!id.is_sentinel());
        assert_eq!(id.to_db(), 2_154_180);
    }

    #[test]
    fn test_sentinels_translate_both_ways() {
        for tag in [
            GradeId::Scheduled,
            GradeId::NoYearlong,
            GradeId::NonstandardPairing,
            GradeId::PromotedFall,
        ] {
            assert!(tag.is_sentinel());
            assert_eq!(GradeId::from_db(tag.to_db()), tag);
        }
    }

    #[test]
    fn test_workflow_labels() {
        assert_eq!(GradeId::NoYearlong.workflow_label(), Some("no_yearlong_possible"));
        assert_eq!(
            GradeId::NonstandardPairing.workflow_label(),
            Some("no_yearlong_possible")
        );
        assert_eq!(GradeId::PromotedFall.workflow_label(), Some("current_fall_yl"));
        assert_eq!(GradeId::Scheduled.workflow_label(), None);
    }

    #[test]
    fn test_collision_detection() {
        assert!(GradeId::collides_with_sentinel(888_888));
        assert!(!GradeId::collides_with_sentinel(42));
    }

    #[test]
    fn test_sql_literal_list_escapes_quotes() {
        assert_eq!(sql_literal_list(&["A", "it's"]), "'A', 'it''s'");
    }
}
