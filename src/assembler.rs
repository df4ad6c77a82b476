// project
use crate::entity::{Embedding, Review, ReviewMetadata, UpsertEntry};

/// Join a validated review with its embedding into an upsert entry.
///
/// Field presence is checked by [`ReviewRecord::validate`](crate::entity::ReviewRecord::validate),
/// which produces the `Review` this takes.
pub fn assemble(review: Review<'_>, values: Embedding) -> UpsertEntry {
    UpsertEntry {
        id: review.professor.to_owned(),
        values,
        metadata: ReviewMetadata {
            review: review.text.to_owned(),
            subject: review.subject.to_owned(),
            stars: review.stars.clone(),
        },
    }
}
