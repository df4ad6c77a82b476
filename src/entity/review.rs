// external
use serde::{Deserialize, Serialize};
use serde_json::Number;

// project
use crate::error::{IngestError, Result};

/// One review as it appears in the input file. Every field is optional at
/// parse time; presence is checked by [`ReviewRecord::validate`].
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct ReviewRecord {
    /// Free-text review body; this is what gets embedded.
    pub reviews: Option<String>,
    /// Professor name, used as the vector id.
    pub professor: Option<String>,
    pub subject: Option<String>,
    /// Kept as the original JSON number so `5` does not become `5.0`.
    pub stars: Option<Number>,
}

/// A record with every required field present.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Review<'a> {
    pub text: &'a str,
    pub professor: &'a str,
    pub subject: &'a str,
    pub stars: &'a Number,
}

impl ReviewRecord {
    /// Check required fields; `position` is the record's index in the file.
    pub fn validate(&self, position: usize) -> Result<Review<'_>> {
        let id = self.professor.as_deref().unwrap_or("<no professor>");
        let missing = |field| IngestError::Validation {
            position,
            id: id.to_string(),
            field,
        };

        let professor = self
            .professor
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| missing("professor"))?;
        let text = self.reviews.as_deref().ok_or_else(|| missing("reviews"))?;
        let subject = self.subject.as_deref().ok_or_else(|| missing("subject"))?;
        let stars = self.stars.as_ref().ok_or_else(|| missing("stars"))?;

        Ok(Review { text, professor, subject, stars })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(v: serde_json::Value) -> ReviewRecord {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn complete_record_validates() {
        let r = record(json!({
            "reviews": "Great lectures",
            "professor": "Dr. Smith",
            "subject": "Physics",
            "stars": 5
        }));
        let v = r.validate(0).unwrap();
        assert_eq!(v.professor, "Dr. Smith");
        assert_eq!(v.text, "Great lectures");
        assert_eq!(v.stars.to_string(), "5");
    }

    #[test]
    fn missing_subject_is_reported_with_position() {
        let r = record(json!({"reviews": "ok", "professor": "Dr. Lee", "stars": 3}));
        match r.validate(7) {
            Err(IngestError::Validation { position, id, field }) => {
                assert_eq!(position, 7);
                assert_eq!(id, "Dr. Lee");
                assert_eq!(field, "subject");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn blank_professor_is_rejected() {
        let r = record(json!({"reviews": "ok", "professor": "  ", "subject": "Math", "stars": 1}));
        assert!(matches!(
            r.validate(0),
            Err(IngestError::Validation { field: "professor", .. })
        ));
    }

    #[test]
    fn null_stars_counts_as_missing() {
        let r = record(json!({"reviews": "ok", "professor": "Dr. A", "subject": "Art", "stars": null}));
        assert!(matches!(
            r.validate(0),
            Err(IngestError::Validation { field: "stars", .. })
        ));
    }
}
