//! Annotation creation and lookup.
//!
//! The annotation body lives outside this system; the engine gates the
//! moderation-relevant act of creating one (enforcement state, book
//! policy, rate limit) and records the anchor.

use stet_core::{
  actor::UserState,
  annotation::{Annotation, NewAnnotation},
  book::AnnotationPolicy,
  store::ModerationStore,
};
use uuid::Uuid;

use crate::{limiter, Engine, EngineResult, Reject};

impl<S: ModerationStore> Engine<S> {
  /// Create an annotation on behalf of `author`.
  ///
  /// Muted and banned authors are refused, as are annotations on books
  /// whose owner has locked annotation activity. Admission is capped per
  /// author by the annotation rate limit.
  pub async fn create_annotation(
    &self,
    author: &UserState,
    input: NewAnnotation,
  ) -> EngineResult<Annotation> {
    let now = chrono::Utc::now();
    if author.is_banned() {
      return Err(Reject::Enforcement("banned"));
    }
    if author.is_muted(now) {
      return Err(Reject::Enforcement("muted"));
    }
    if input.author_id != author.user_id {
      return Err(Reject::Permission("author_mismatch"));
    }

    let book = self
      .store
      .get_book(input.book_id)
      .await
      .map_err(Reject::store)?
      .ok_or(Reject::NotFound("book"))?;
    if book.policy == AnnotationPolicy::Locked {
      return Err(Reject::Permission("annotations_locked"));
    }

    limiter::admit(
      &self.store,
      format!("annotate:{}", author.user_id),
      self.policy.annotation_rate,
      now,
      "annotation_rate",
    )
    .await?;

    self
      .store
      .insert_annotation(input)
      .await
      .map_err(Reject::store)
  }

  pub async fn annotation(&self, id: Uuid) -> EngineResult<Annotation> {
    self
      .store
      .get_annotation(id)
      .await
      .map_err(Reject::store)?
      .ok_or(Reject::NotFound("annotation"))
  }
}
