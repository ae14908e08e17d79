use serde::{Deserialize, Serialize};

use crate::capabilities::HttpResult;
use crate::config::GatewayConfig;
use crate::error::AppResult;
use crate::model::{CatalogEntry, FormMode, ReviewDraft, ReviewId};

/// A single keystroke-level change to the review draft.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum DraftField {
    Title(String),
    Body(String),
    Rating(u8),
}

impl DraftField {
    pub fn apply(self, draft: &mut ReviewDraft) {
        match self {
            Self::Title(title) => draft.title = title,
            Self::Body(body) => draft.body = body,
            Self::Rating(rating) => draft.rating = rating,
        }
    }
}

// --- Event enum: large variants boxed ---

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Event {
    Configure(Box<GatewayConfig>),
    DismissError,

    // Review store sync
    ListRequested,
    FormEdited(DraftField),
    EditRequested {
        id: ReviewId,
    },
    EditCancelled,
    SubmitRequested,
    ImageAttached {
        bytes: Vec<u8>,
        mime_type: Option<String>,
    },
    ImageCleared,
    DeleteRequested {
        id: ReviewId,
    },
    DeleteConfirmed,
    DeleteCancelled,

    // Catalog paging
    LoadPage {
        offset: u32,
        limit: u32,
    },
    LoadMore,

    // Capability responses
    ListResponse {
        generation: u64,
        result: Box<HttpResult>,
    },
    SubmitResponse {
        mode: FormMode,
        result: Box<HttpResult>,
    },
    DeleteResponse {
        id: ReviewId,
        result: Box<HttpResult>,
    },
    PageIndexResponse {
        fetch_id: u64,
        result: Box<HttpResult>,
    },
    /// Every detail of one page, joined. Sent by the composed fan-out task.
    PageDetailsResponse {
        fetch_id: u64,
        result: Box<AppResult<Vec<CatalogEntry>>>,
    },
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Configure(_) => "configure",
            Self::DismissError => "dismiss_error",
            Self::ListRequested => "list_requested",
            Self::FormEdited(_) => "form_edited",
            Self::EditRequested { .. } => "edit_requested",
            Self::EditCancelled => "edit_cancelled",
            Self::SubmitRequested => "submit_requested",
            Self::ImageAttached { .. } => "image_attached",
            Self::ImageCleared => "image_cleared",
            Self::DeleteRequested { .. } => "delete_requested",
            Self::DeleteConfirmed => "delete_confirmed",
            Self::DeleteCancelled => "delete_cancelled",
            Self::LoadPage { .. } => "load_page",
            Self::LoadMore => "load_more",
            Self::ListResponse { .. } => "list_response",
            Self::SubmitResponse { .. } => "submit_response",
            Self::DeleteResponse { .. } => "delete_response",
            Self::PageIndexResponse { .. } => "page_index_response",
            Self::PageDetailsResponse { .. } => "page_details_response",
        }
    }

    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Self::DismissError
                | Self::ListRequested
                | Self::FormEdited(_)
                | Self::EditRequested { .. }
                | Self::EditCancelled
                | Self::SubmitRequested
                | Self::ImageAttached { .. }
                | Self::ImageCleared
                | Self::DeleteRequested { .. }
                | Self::DeleteConfirmed
                | Self::DeleteCancelled
                | Self::LoadPage { .. }
                | Self::LoadMore
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_field_edits_one_field() {
        let mut draft = ReviewDraft::default();
        DraftField::Title("Nice".into()).apply(&mut draft);
        DraftField::Rating(4).apply(&mut draft);
        assert_eq!(draft.title, "Nice");
        assert_eq!(draft.rating, 4);
        assert!(draft.body.is_empty());
    }

    #[test]
    fn responses_are_not_user_initiated() {
        assert!(Event::LoadMore.is_user_initiated());
        assert!(!Event::PageDetailsResponse {
            fetch_id: 1,
            result: Box::new(Ok(vec![])),
        }
        .is_user_initiated());
        assert_eq!(Event::DeleteConfirmed.name(), "delete_confirmed");
    }

    #[test]
    fn event_survives_serde() {
        let event = Event::EditRequested {
            id: ReviewId::new("r-1"),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(serde_json::from_str::<Event>(&json).unwrap(), event);
    }

    #[test]
    fn event_size_is_reasonable() {
        let size = std::mem::size_of::<Event>();
        assert!(
            size <= 64,
            "Event is {size} bytes; box the larger variants"
        );
    }
}
