use testimonial_core::{
    merge_recommendations, BuiltinRecommendation, Recommendation, ValidatedSubmission,
    ValidationError,
};
use testimonial_store::{KeyValueStore, LocalStore, StoreError};
use time::OffsetDateTime;
use tracing::info;

/// Source of submission timestamps.
pub type Clock = fn() -> OffsetDateTime;

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Built-in recommendations merged with the ones saved in the local store.
#[derive(Debug)]
pub struct RecommendationRepository<S> {
    builtins: &'static [BuiltinRecommendation],
    store: LocalStore<S>,
    clock: Clock,
}

impl<S: KeyValueStore> RecommendationRepository<S> {
    pub fn new(builtins: &'static [BuiltinRecommendation], store: LocalStore<S>) -> Self {
        Self { builtins, store, clock: OffsetDateTime::now_utc }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn builtins(&self) -> &'static [BuiltinRecommendation] {
        self.builtins
    }

    pub fn store(&self) -> &LocalStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut LocalStore<S> {
        &mut self.store
    }

    pub fn into_store(self) -> LocalStore<S> {
        self.store
    }

    /// Every recommendation, newest first. Built-ins precede stored records
    /// when dates tie.
    pub fn all(&mut self) -> Vec<Recommendation> {
        merge_recommendations(self.builtins, self.store.load())
    }

    #[must_use]
    pub fn is_builtin(&self, record: &Recommendation) -> bool {
        record.is_builtin()
    }

    /// Validate and persist a visitor's recommendation.
    ///
    /// # Errors
    /// Returns [`SubmitError::Validation`] when either field is blank after
    /// trimming, or [`SubmitError::Store`] when the write fails.
    pub fn submit(&mut self, name: &str, text: &str) -> Result<Recommendation, SubmitError> {
        let submission = ValidatedSubmission::parse(name, text)?;
        self.submit_validated(submission).map_err(SubmitError::from)
    }

    /// Persist input that has already passed validation.
    ///
    /// # Errors
    /// Returns a [`StoreError`] when the record cannot be written; nothing is
    /// stored in that case.
    pub fn submit_validated(
        &mut self,
        submission: ValidatedSubmission,
    ) -> Result<Recommendation, StoreError> {
        let record = Recommendation::submitted(submission, (self.clock)());
        self.store.append(&record)?;
        info!(name = %record.name, date = %record.date, "recommendation submitted");
        Ok(record)
    }
}
