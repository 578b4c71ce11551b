use super::*;
use crate::scoring::ScoringError;

fn rating(a: u8, p: u8, c: u8, r: u8) -> RatingInput {
    RatingInput {
        appearance: a,
        personality: p,
        communication: c,
        reliability: r,
    }
}

#[test]
fn test_trait_vector_coverage_ignores_gaps_and_non_finite() {
    let v = TraitVector::new(vec![Some(0.2), None, Some(f64::NAN), Some(-0.4)]);
    assert_eq!(v.dimensions(), 4);
    assert_eq!(v.answered(), 2);
    assert_eq!(v.get(1), None);
    assert_eq!(v.get(2), None);
    assert_eq!(v.get(3), Some(-0.4));
    assert_eq!(v.get(10), None);
}

#[test]
fn test_quiz_answers_empty_when_all_skipped() {
    assert!(QuizAnswers(vec![None, None]).is_empty());
    assert!(!QuizAnswers(vec![None, Some(2)]).is_empty());
}

#[test]
fn test_record_folds_running_average() {
    let mut summary = RatingSummary::default();
    summary.record(&rating(8, 6, 10, 4), 10).unwrap();
    summary.record(&rating(6, 8, 8, 6), 10).unwrap();

    assert_eq!(summary.count, 2);
    assert_eq!(summary.sub_ratings(), [7.0, 7.0, 9.0, 5.0]);
}

#[test]
fn test_record_rejects_out_of_range() {
    let mut summary = RatingSummary::new([5.0, 5.0, 5.0, 5.0], 4);

    let err = summary.record(&rating(5, 11, 5, 5), 10).unwrap_err();
    assert!(matches!(err, ScoringError::InvalidRating { value: 11, max: 10 }));

    let err = summary.record(&rating(0, 5, 5, 5), 10).unwrap_err();
    assert!(matches!(err, ScoringError::InvalidRating { value: 0, .. }));

    assert_eq!(summary.count, 4);
    assert_eq!(summary.sub_ratings(), [5.0, 5.0, 5.0, 5.0]);
}

#[test]
fn test_record_rejects_count_overflow() {
    let mut summary = RatingSummary::new([5.0, 5.0, 5.0, 5.0], u32::MAX);

    let err = summary.record(&rating(6, 6, 6, 6), 10).unwrap_err();
    assert!(matches!(err, ScoringError::RatingCountOverflow));
    assert_eq!(summary.count, u32::MAX);
    assert_eq!(summary.sub_ratings(), [5.0, 5.0, 5.0, 5.0]);
}

#[test]
fn test_bundle_deserializes_with_only_id() {
    let bundle: FeatureBundle = serde_json::from_str(r#"{"id": 42}"#).unwrap();
    assert_eq!(bundle, FeatureBundle::new(42));
}

#[test]
fn test_bundle_deserializes_camel_case_fields() {
    let json = r#"{
        "id": 7,
        "interests": ["hiking", "jazz"],
        "traits": [0.1, null, 0.3],
        "quiz": [1, 2, null],
        "ratings": {"appearance": 7.0, "personality": 8.0, "communication": 6.0, "reliability": 9.0, "count": 12},
        "location": {"lat": 35.0, "lon": 139.0},
        "updatedAt": "2024-05-01T00:00:00Z"
    }"#;
    let bundle: FeatureBundle = serde_json::from_str(json).unwrap();

    assert_eq!(bundle.id, UserId(7));
    assert_eq!(bundle.interests.len(), 2);
    assert_eq!(bundle.traits.as_ref().map(TraitVector::answered), Some(2));
    assert_eq!(bundle.quiz.as_ref().and_then(|q| q.get(1)), Some(2));
    assert_eq!(bundle.ratings.map(|r| r.count), Some(12));
    assert!(bundle.created_at.is_none());
    assert_eq!(bundle.last_active(), bundle.updated_at);
}
