use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::model::{
    CatalogEntry, CatalogPage, CatalogState, DraftFieldName, Model, Review, ReviewForm,
    ReviewListState, MAX_BODY_CHARS, MAX_RATING, MAX_TITLE_CHARS,
};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UserFacingError {
    pub message: String,
    pub is_retryable: bool,
    pub error_code: String,
}

impl From<&AppError> for UserFacingError {
    fn from(e: &AppError) -> Self {
        Self {
            message: e.user_facing_message(),
            is_retryable: e.is_retryable(),
            error_code: e.code().to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ReviewView {
    pub id: String,
    pub title: String,
    pub body: String,
    pub rating: u8,
    pub stars: String,
    pub image: Option<String>,
    pub date: String,
    pub is_deleting: bool,
}

fn stars(rating: u8) -> String {
    let filled = usize::from(rating.min(MAX_RATING));
    let empty = usize::from(MAX_RATING) - filled;
    format!("{}{}", "★".repeat(filled), "☆".repeat(empty))
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FieldErrorView {
    pub field: DraftFieldName,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FormView {
    pub title: String,
    pub body: String,
    pub rating: u8,
    pub image_preview: Option<String>,
    pub editing_id: Option<String>,
    pub submitting: bool,
    pub can_submit: bool,
    pub title_chars_left: i64,
    pub body_chars_left: i64,
    pub field_errors: Vec<FieldErrorView>,
    pub error: Option<UserFacingError>,
}

fn chars_left(text: &str, max: usize) -> i64 {
    let used = i64::try_from(text.chars().count()).unwrap_or(i64::MAX);
    i64::try_from(max).unwrap_or(i64::MAX).saturating_sub(used)
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CatalogView {
    pub entries: Vec<CatalogEntry>,
    pub loading: bool,
    pub error: Option<UserFacingError>,
    pub next_offset: u32,
    pub queued_requests: usize,
    pub last_page: Option<CatalogPage>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub reviews: Vec<ReviewView>,
    pub reviews_loading: bool,
    pub reviews_error: Option<UserFacingError>,
    /// Set while the shell should show a delete confirmation.
    pub pending_delete: Option<String>,
    pub form: FormView,
    pub catalog: CatalogView,
    pub config_error: Option<UserFacingError>,
}

impl ReviewView {
    fn build(review: &Review, list: &ReviewListState) -> Self {
        Self {
            id: review.id.to_string(),
            title: review.title.clone(),
            body: review.body.clone(),
            rating: review.rating,
            stars: stars(review.rating),
            image: review.image.clone(),
            date: review.date.clone(),
            is_deleting: list.deleting.as_ref() == Some(&review.id),
        }
    }
}

impl From<&ReviewForm> for FormView {
    fn from(form: &ReviewForm) -> Self {
        let draft = &form.draft;
        Self {
            title: draft.title.clone(),
            body: draft.body.clone(),
            rating: draft.rating,
            image_preview: draft.image.clone(),
            editing_id: form.mode.editing_id().map(ToString::to_string),
            submitting: form.submitting,
            can_submit: !form.submitting && form.is_valid(),
            title_chars_left: chars_left(&draft.title, MAX_TITLE_CHARS),
            body_chars_left: chars_left(&draft.body, MAX_BODY_CHARS),
            field_errors: form
                .validation_errors
                .iter()
                .map(|e| FieldErrorView {
                    field: e.field(),
                    message: e.to_string(),
                })
                .collect(),
            error: form.error.as_ref().map(UserFacingError::from),
        }
    }
}

impl From<&CatalogState> for CatalogView {
    fn from(catalog: &CatalogState) -> Self {
        Self {
            entries: catalog.accumulated.clone(),
            loading: catalog.is_loading(),
            error: catalog.error.as_ref().map(UserFacingError::from),
            next_offset: catalog.next_offset,
            queued_requests: catalog.queue.len(),
            last_page: catalog.last_page.clone(),
        }
    }
}

impl From<&Model> for ViewModel {
    fn from(model: &Model) -> Self {
        let list = &model.reviews;
        Self {
            reviews: list
                .items
                .iter()
                .map(|review| ReviewView::build(review, list))
                .collect(),
            reviews_loading: list.loading,
            reviews_error: list.error.as_ref().map(UserFacingError::from),
            pending_delete: list.pending_delete.as_ref().map(ToString::to_string),
            form: FormView::from(&model.form),
            catalog: CatalogView::from(&model.catalog),
            config_error: model.config_error.as_ref().map(UserFacingError::from),
        }
    }
}
