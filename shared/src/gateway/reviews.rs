use crux_http::http::Method;
use crux_http::RequestBuilder;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{ensure_success, json};
use crate::capabilities::{AppHttp, HttpResult};
use crate::config::GatewayConfig;
use crate::error::{AppError, AppResult, ErrorKind};
use crate::event::Event;
use crate::model::{Review, ReviewId, ValidDraft, MAX_RATING, MIN_RATING};

const DEFAULT_REJECTION: &str = "the review store rejected the request";

/// How the review store answered a create, update or delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The store echoed back the complete persisted record.
    Record(Review),
    /// The store accepted the change without returning a usable record.
    Acknowledged,
}

#[derive(Serialize)]
struct ReviewPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    title: &'a str,
    review: &'a str,
    rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    image: Option<&'a str>,
}

impl<'a> ReviewPayload<'a> {
    fn new(id: Option<&'a ReviewId>, draft: &'a ValidDraft) -> Self {
        Self {
            id: id.map(ReviewId::as_str),
            title: draft.title.as_str(),
            review: draft.body.as_str(),
            rating: draft.rating.value(),
            image: draft.image.as_deref(),
        }
    }
}

#[derive(Serialize)]
struct DeletePayload<'a> {
    id: &'a str,
}

fn store_request(
    http: &AppHttp,
    config: &GatewayConfig,
    method: Method,
) -> AppResult<RequestBuilder<Event>> {
    Ok(http.request(method, config.reviews_url()?.into_url()))
}

pub fn list_request(http: &AppHttp, config: &GatewayConfig) -> AppResult<RequestBuilder<Event>> {
    store_request(http, config, Method::Get)
}

pub fn create_request(
    http: &AppHttp,
    config: &GatewayConfig,
    draft: &ValidDraft,
) -> AppResult<RequestBuilder<Event>> {
    Ok(store_request(http, config, Method::Post)?.body_json(&ReviewPayload::new(None, draft))?)
}

pub fn update_request(
    http: &AppHttp,
    config: &GatewayConfig,
    id: &ReviewId,
    draft: &ValidDraft,
) -> AppResult<RequestBuilder<Event>> {
    Ok(store_request(http, config, Method::Put)?
        .body_json(&ReviewPayload::new(Some(id), draft))?)
}

/// The store identifies the record to delete through the request body.
pub fn delete_request(
    http: &AppHttp,
    config: &GatewayConfig,
    id: &ReviewId,
) -> AppResult<RequestBuilder<Event>> {
    Ok(store_request(http, config, Method::Delete)?
        .body_json(&DeletePayload { id: id.as_str() })?)
}

// --- Wire decoding ---

/// Any JSON value the store may put in a record field.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireScalar {
    Integer(i64),
    Float(f64),
    Flag(bool),
    Text(String),
    Other(IgnoredAny),
}

impl WireScalar {
    fn into_text(self) -> Option<String> {
        match self {
            Self::Integer(n) => Some(n.to_string()),
            Self::Float(f) => Some(f.to_string()),
            Self::Flag(b) => Some(b.to_string()),
            Self::Text(s) => Some(s),
            Self::Other(_) => None,
        }
    }

    fn as_rating(&self) -> Option<u8> {
        match self {
            Self::Integer(n) => u8::try_from(*n).ok(),
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Self::Float(f) if f.fract() == 0.0 && (0.0..=255.0).contains(f) => Some(*f as u8),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Float(_) | Self::Flag(_) | Self::Other(_) => None,
        }
    }
}

#[derive(Deserialize)]
struct WireReview {
    #[serde(default)]
    id: Option<WireScalar>,
    #[serde(default)]
    title: Option<WireScalar>,
    #[serde(default)]
    review: Option<WireScalar>,
    #[serde(default)]
    rating: Option<WireScalar>,
    #[serde(default)]
    image: Option<WireScalar>,
    #[serde(default)]
    date: Option<WireScalar>,
}

fn text(field: Option<WireScalar>) -> String {
    field.and_then(WireScalar::into_text).unwrap_or_default()
}

impl WireReview {
    fn into_review(self) -> Option<Review> {
        let id = self
            .id
            .and_then(WireScalar::into_text)
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())?;

        let rating = match &self.rating {
            Some(rating) => rating.as_rating().unwrap_or_else(|| {
                warn!(review_id = %id, "review carries an unreadable rating");
                0
            }),
            None => 0,
        };

        Some(Review {
            id: ReviewId::new(id),
            title: text(self.title),
            body: text(self.review),
            rating,
            image: self.image.and_then(WireScalar::into_text).filter(|image| !image.is_empty()),
            date: text(self.date),
        })
    }
}

fn decode_record(value: Value) -> Option<Review> {
    if !value.is_object() {
        warn!(kind = json_kind(&value), "skipped review record that is not an object");
        return None;
    }
    match serde_json::from_value::<WireReview>(value) {
        Ok(wire) => {
            let review = wire.into_review();
            if review.is_none() {
                warn!("skipped review record without an id");
            }
            review
        }
        Err(e) => {
            warn!(error = %e, "skipped unreadable review record");
            None
        }
    }
}

/// Only a record with every user-entered field can replace a listed review.
fn is_complete(review: &Review) -> bool {
    !review.title.trim().is_empty()
        && !review.body.trim().is_empty()
        && (MIN_RATING..=MAX_RATING).contains(&review.rating)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Text of a present, non-empty `error` field. `false`, `null` and empty
/// values count as absent.
fn rejection_text(value: &Value) -> Option<String> {
    match value.get("error")? {
        Value::Null | Value::Bool(false) => None,
        Value::Bool(true) => Some(DEFAULT_REJECTION.to_string()),
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) if items.is_empty() => None,
        Value::Object(fields) if fields.is_empty() => None,
        Value::Object(fields) => Some(
            ["message", "error"]
                .iter()
                .find_map(|key| fields.get(*key).and_then(Value::as_str))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map_or_else(|| Value::Object(fields.clone()).to_string(), String::from),
        ),
        other => Some(other.to_string()),
    }
}

fn is_blank(body: &[u8]) -> bool {
    body.iter().all(u8::is_ascii_whitespace)
}

/// Normalizes a list response into persisted reviews.
///
/// An empty body, `null` or `[]` is an empty list. A bare object counts as a
/// one-element list. Records without an id are dropped.
pub fn decode_list(body: &[u8]) -> AppResult<Vec<Review>> {
    if is_blank(body) {
        return Ok(Vec::new());
    }

    let value: Value = json(body)?;
    let records = match value {
        Value::Null => Vec::new(),
        Value::Array(records) => records,
        Value::Object(_) => {
            if let Some(text) = rejection_text(&value) {
                return Err(AppError::new(ErrorKind::Rejected, text));
            }
            vec![value]
        }
        other => {
            return Err(AppError::new(
                ErrorKind::Deserialization,
                "review list is neither an array nor an object",
            )
            .with_internal(other.to_string()));
        }
    };

    let total = records.len();
    let reviews: Vec<Review> = records.into_iter().filter_map(decode_record).collect();
    if reviews.len() != total {
        warn!(dropped = total - reviews.len(), total, "review list had unusable records");
    }
    debug!(count = reviews.len(), "decoded review list");
    Ok(reviews)
}

/// Applies one contract to every mutation response.
///
/// A non-2xx status is an error. A 2xx body carrying `ok: true` succeeds; any
/// other body with a non-empty `error` is a rejection. A body holding a
/// complete review is returned as the record, and anything else is a plain
/// acknowledgement that calls for a refresh.
pub fn interpret_mutation(result: HttpResult) -> AppResult<MutationOutcome> {
    let body = ensure_success(result)?;
    if is_blank(&body) {
        return Ok(MutationOutcome::Acknowledged);
    }

    let Ok(value) = serde_json::from_slice::<Value>(&body) else {
        debug!(len = body.len(), "mutation body is not JSON");
        return Ok(MutationOutcome::Acknowledged);
    };

    let ok = value.get("ok").and_then(Value::as_bool) == Some(true);
    if !ok {
        if let Some(text) = rejection_text(&value) {
            return Err(AppError::new(ErrorKind::Rejected, text));
        }
    }

    if !value.is_object() {
        return Ok(MutationOutcome::Acknowledged);
    }

    Ok(match serde_json::from_value::<WireReview>(value) {
        Ok(wire) => match wire.into_review() {
            Some(review) if is_complete(&review) => MutationOutcome::Record(review),
            Some(review) => {
                debug!(review_id = %review.id, "mutation echoed a partial record");
                MutationOutcome::Acknowledged
            }
            None => MutationOutcome::Acknowledged,
        },
        Err(_) => MutationOutcome::Acknowledged,
    })
}
