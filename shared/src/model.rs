use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

use crate::config::GatewayConfig;
use crate::error::AppError;

pub const MAX_TITLE_CHARS: usize = 30;
pub const MAX_BODY_CHARS: usize = 240;
pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(ReviewId);

// --- Draft validation ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DraftFieldName {
    Title,
    Body,
    Rating,
}

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("{field:?} is required")]
    Required { field: DraftFieldName },

    #[error("{field:?} is too long ({len} > {max} characters)")]
    TooLong {
        field: DraftFieldName,
        len: usize,
        max: usize,
    },

    #[error("rating {0} must be between 1 and 5")]
    RatingOutOfRange(u8),
}

impl ValidationError {
    pub fn field(&self) -> DraftFieldName {
        match self {
            Self::Required { field } | Self::TooLong { field, .. } => *field,
            Self::RatingOutOfRange(_) => DraftFieldName::Rating,
        }
    }
}

/// Non-empty text of at most `MAX` characters.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BoundedText<const MAX: usize>(String);

impl<const MAX: usize> BoundedText<MAX> {
    pub fn new(field: DraftFieldName, s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        if s.trim().is_empty() {
            return Err(ValidationError::Required { field });
        }
        let len = s.chars().count();
        if len > MAX {
            return Err(ValidationError::TooLong {
                field,
                len,
                max: MAX,
            });
        }
        Ok(Self(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub type ReviewTitle = BoundedText<MAX_TITLE_CHARS>;
pub type ReviewBody = BoundedText<MAX_BODY_CHARS>;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: u8) -> Result<Self, ValidationError> {
        if !(MIN_RATING..=MAX_RATING).contains(&value) {
            return Err(ValidationError::RatingOutOfRange(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// In-progress review held only in form state.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct ReviewDraft {
    pub title: String,
    pub body: String,
    pub rating: u8,
    /// `data:` string produced by the image pipeline.
    pub image: Option<String>,
}

/// A draft that passed every field check and may be sent to the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidDraft {
    pub title: ReviewTitle,
    pub body: ReviewBody,
    pub rating: Rating,
    pub image: Option<String>,
}

impl ReviewDraft {
    /// Checks every field and reports all failures, not just the first.
    pub fn validate(&self) -> Result<ValidDraft, Vec<ValidationError>> {
        let title = ReviewTitle::new(DraftFieldName::Title, self.title.as_str());
        let body = ReviewBody::new(DraftFieldName::Body, self.body.as_str());
        let rating = Rating::new(self.rating);

        match (title, body, rating) {
            (Ok(title), Ok(body), Ok(rating)) => Ok(ValidDraft {
                title,
                body,
                rating,
                image: self.image.clone(),
            }),
            (title, body, rating) => Err([title.err(), body.err(), rating.err()]
                .into_iter()
                .flatten()
                .collect()),
        }
    }
}

// --- Persisted records ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Review {
    pub id: ReviewId,
    pub title: String,
    pub body: String,
    pub rating: u8,
    pub image: Option<String>,
    pub date: String,
}

impl From<&Review> for ReviewDraft {
    fn from(review: &Review) -> Self {
        Self {
            title: review.title.clone(),
            body: review.body.clone(),
            rating: review.rating,
            image: review.image.clone(),
        }
    }
}

/// One record of the remote detail catalog.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: u32,
    pub name: String,
    pub image_url: String,
    pub tags: Vec<String>,
}

// --- Review list view state ---

#[derive(Clone, Debug, Default)]
pub struct ReviewListState {
    pub items: Vec<Review>,
    pub loading: bool,
    pub error: Option<AppError>,
    /// Awaiting a yes/no answer before anything is sent.
    pub pending_delete: Option<ReviewId>,
    pub deleting: Option<ReviewId>,
    generation: u64,
}

impl ReviewListState {
    /// Starts a fetch and returns its generation. Only the newest
    /// generation's response is applied.
    pub fn begin_fetch(&mut self) -> u64 {
        self.loading = true;
        self.error = None;
        self.generation += 1;
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub fn finish_fetch(&mut self, items: Vec<Review>) {
        self.items = items;
        self.loading = false;
        self.error = None;
    }

    pub fn fail_fetch(&mut self, error: AppError) {
        self.loading = false;
        self.error = Some(error);
    }

    pub fn find(&self, id: &ReviewId) -> Option<&Review> {
        self.items.iter().find(|r| &r.id == id)
    }

    /// Replaces the record with the same id, or appends it.
    pub fn upsert(&mut self, review: Review) {
        match self.items.iter_mut().find(|r| r.id == review.id) {
            Some(existing) => *existing = review,
            None => self.items.push(review),
        }
    }

    pub fn remove(&mut self, id: &ReviewId) -> bool {
        let before = self.items.len();
        self.items.retain(|r| &r.id != id);
        self.items.len() != before
    }
}

// --- Review form state ---

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub enum FormMode {
    #[default]
    Create,
    Editing(ReviewId),
}

impl FormMode {
    pub fn editing_id(&self) -> Option<&ReviewId> {
        match self {
            Self::Create => None,
            Self::Editing(id) => Some(id),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ReviewForm {
    pub draft: ReviewDraft,
    pub mode: FormMode,
    pub submitting: bool,
    pub validation_errors: Vec<ValidationError>,
    pub error: Option<AppError>,
}

impl ReviewForm {
    pub fn begin_edit(&mut self, review: &Review) {
        *self = Self {
            draft: ReviewDraft::from(review),
            mode: FormMode::Editing(review.id.clone()),
            ..Self::default()
        };
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_valid(&self) -> bool {
        self.validation_errors.is_empty()
    }
}

// --- Catalog paging state ---

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PageIntent {
    /// Load the page at the cursor and append it to the accumulated list.
    Append,
    /// Fetch an arbitrary page without touching the accumulated list.
    Standalone { offset: u32, limit: u32 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageFetch {
    pub id: u64,
    pub intent: PageIntent,
    pub offset: u32,
    pub limit: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogPage {
    pub offset: u32,
    pub limit: u32,
    pub entries: Vec<CatalogEntry>,
}

#[derive(Clone, Debug, Default)]
pub struct CatalogState {
    pub accumulated: Vec<CatalogEntry>,
    pub next_offset: u32,
    pub error: Option<AppError>,
    pub last_page: Option<CatalogPage>,
    pub in_flight: Option<PageFetch>,
    pub queue: VecDeque<PageIntent>,
    next_fetch_id: u64,
}

impl CatalogState {
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn enqueue(&mut self, intent: PageIntent) {
        self.queue.push_back(intent);
    }

    /// Starts the next queued fetch unless one is already running.
    pub fn start_next(&mut self, page_size: u32) -> Option<PageFetch> {
        if self.in_flight.is_some() {
            return None;
        }
        let intent = self.queue.pop_front()?;
        let (offset, limit) = match &intent {
            PageIntent::Append => (self.next_offset, page_size),
            PageIntent::Standalone { offset, limit } => (*offset, *limit),
        };
        self.next_fetch_id += 1;
        self.error = None;
        let fetch = PageFetch {
            id: self.next_fetch_id,
            intent,
            offset,
            limit,
        };
        self.in_flight = Some(fetch.clone());
        Some(fetch)
    }

    /// Takes the in-flight fetch if `fetch_id` is the one running.
    pub fn settle(&mut self, fetch_id: u64) -> Option<PageFetch> {
        match &self.in_flight {
            Some(fetch) if fetch.id == fetch_id => self.in_flight.take(),
            _ => None,
        }
    }

    pub fn apply_page(&mut self, fetch: &PageFetch, entries: Vec<CatalogEntry>) {
        match fetch.intent {
            PageIntent::Append => {
                self.accumulated.extend(entries);
                self.next_offset = fetch.offset + fetch.limit;
            }
            PageIntent::Standalone { .. } => {
                self.last_page = Some(CatalogPage {
                    offset: fetch.offset,
                    limit: fetch.limit,
                    entries,
                });
            }
        }
    }

    /// Records the failure and drops queued appends; the user retries by
    /// asking for more again.
    pub fn fail_page(&mut self, error: AppError) {
        self.error = Some(error);
        self.queue.retain(|intent| !matches!(intent, PageIntent::Append));
    }

    pub fn queued_appends(&self) -> usize {
        self.queue
            .iter()
            .filter(|intent| matches!(intent, PageIntent::Append))
            .count()
    }
}

// --- Root model ---

#[derive(Clone, Debug, Default)]
pub struct Model {
    pub config: GatewayConfig,
    pub config_error: Option<AppError>,
    pub reviews: ReviewListState,
    pub form: ReviewForm,
    pub catalog: CatalogState,
}
