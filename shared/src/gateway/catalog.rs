use std::future::Future;

use crux_http::http::Method;
use crux_http::RequestBuilder;
use futures::future;
use serde::Deserialize;
use tracing::debug;

use super::{json, read_success, url};
use crate::capabilities::{AppHttp, ValidatedUrl};
use crate::config::GatewayConfig;
use crate::error::AppResult;
use crate::event::Event;
use crate::model::CatalogEntry;

const ARTWORK_VARIANT: &str = "official-artwork";

/// `GET <endpoint>/<collection>?limit=<limit>&offset=<offset>`
pub fn page_request(
    http: &AppHttp,
    config: &GatewayConfig,
    offset: u32,
    limit: u32,
) -> AppResult<RequestBuilder<Event>> {
    let page_url = config
        .catalog_url()?
        .join_segment(config.catalog_collection.trim())?
        .with_query(&[("limit", limit.to_string()), ("offset", offset.to_string())])?;
    Ok(http.request(Method::Get, page_url.into_url()))
}

#[derive(Deserialize)]
struct WirePageIndex {
    results: Vec<WireIndexEntry>,
}

#[derive(Deserialize)]
struct WireIndexEntry {
    url: String,
}

/// Reads the detail URLs out of a page index, in listed order.
pub fn decode_page_index(body: &[u8]) -> AppResult<Vec<ValidatedUrl>> {
    let index: WirePageIndex = json(body)?;
    index
        .results
        .iter()
        .map(|entry| url(&entry.url))
        .collect()
}

#[derive(Deserialize)]
struct WireDetail {
    id: u32,
    name: String,
    #[serde(default)]
    sprites: Option<WireSprites>,
    types: Vec<WireTypeSlot>,
}

#[derive(Deserialize)]
struct WireSprites {
    #[serde(default)]
    other: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Deserialize)]
struct WireTypeSlot {
    #[serde(rename = "type")]
    kind: WireNamed,
}

#[derive(Deserialize)]
struct WireNamed {
    name: String,
}

impl WireDetail {
    fn artwork(&self) -> String {
        self.sprites
            .as_ref()
            .and_then(|sprites| sprites.other.as_ref())
            .and_then(|other| other.get(ARTWORK_VARIANT))
            .and_then(|artwork| artwork.get("front_default"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_string()
    }
}

pub fn decode_detail(body: &[u8]) -> AppResult<CatalogEntry> {
    let detail: WireDetail = json(body)?;
    let image_url = detail.artwork();
    Ok(CatalogEntry {
        id: detail.id,
        name: detail.name,
        image_url,
        tags: detail.types.into_iter().map(|slot| slot.kind.name).collect(),
    })
}

/// Requests every detail of one page at once and resolves when all of them
/// have answered. The requests go out on the first poll.
pub fn fetch_details(
    http: &AppHttp,
    urls: Vec<ValidatedUrl>,
) -> impl Future<Output = AppResult<Vec<CatalogEntry>>> + Send + 'static {
    let pending: Vec<_> = urls
        .into_iter()
        .map(|detail_url| http.request(Method::Get, detail_url.into_url()).send_async())
        .collect();

    async move {
        let bodies = future::join_all(
            pending
                .into_iter()
                .map(|response| async move { read_success(response.await).await }),
        )
        .await;
        join_details(bodies)
    }
}

/// Decodes the detail bodies of one page in listed order. Any failed or
/// unreadable detail fails the whole page.
pub fn join_details(bodies: Vec<AppResult<Vec<u8>>>) -> AppResult<Vec<CatalogEntry>> {
    let entries = bodies
        .into_iter()
        .map(|body| body.and_then(|body| decode_detail(&body)))
        .collect::<AppResult<Vec<_>>>()?;
    debug!(count = entries.len(), "joined page details");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, ErrorKind};

    const DETAIL: &str = r#"{
        "id": 25,
        "name": "pikachu",
        "sprites": {
            "front_default": "small.png",
            "other": {
                "dream_world": {"front_default": "dream.svg"},
                "official-artwork": {"front_default": "https://img.example/25.png", "front_shiny": null}
            }
        },
        "types": [{"slot": 1, "type": {"name": "electric", "url": "https://x/type/13"}}],
        "weight": 60
    }"#;

    #[test]
    fn page_index_lists_urls_in_order() {
        let body = r#"{"count": 2, "next": null, "results": [
            {"name": "a", "url": "https://pokeapi.co/api/v2/pokemon/1/"},
            {"name": "b", "url": "https://pokeapi.co/api/v2/pokemon/2/"}
        ]}"#;
        let urls = decode_page_index(body.as_bytes()).unwrap();
        assert_eq!(urls.len(), 2);
        assert!(urls[1].as_str().ends_with("/pokemon/2/"));
    }

    #[test]
    fn page_index_rejects_bad_urls() {
        let body = r#"{"results": [{"name": "a", "url": "javascript:alert(1)"}]}"#;
        let err = decode_page_index(body.as_bytes()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidState);
    }

    #[test]
    fn detail_normalizes_artwork_and_tags() {
        let entry = decode_detail(DETAIL.as_bytes()).unwrap();
        assert_eq!(entry.id, 25);
        assert_eq!(entry.name, "pikachu");
        assert_eq!(entry.image_url, "https://img.example/25.png");
        assert_eq!(entry.tags, vec!["electric"]);
    }

    #[test]
    fn missing_artwork_becomes_empty_string() {
        let body = r#"{"id": 1, "name": "x", "sprites": {"other": {"official-artwork": {"front_default": null}}},
            "types": [{"type": {"name": "grass"}}, {"type": {"name": "poison"}}]}"#;
        let entry = decode_detail(body.as_bytes()).unwrap();
        assert_eq!(entry.image_url, "");
        assert_eq!(entry.tags, vec!["grass", "poison"]);

        let entry =
            decode_detail(br#"{"id": 2, "name": "y", "types": []}"#).unwrap();
        assert_eq!(entry.image_url, "");
    }

    #[test]
    fn one_bad_detail_fails_the_page() {
        let bodies = vec![
            Ok(DETAIL.as_bytes().to_vec()),
            Ok(br#"{"name": "no id"}"#.to_vec()),
        ];
        let err = join_details(bodies).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Deserialization);

        let bodies = vec![
            Ok(DETAIL.as_bytes().to_vec()),
            Err(AppError::from_http_status(503, None)),
        ];
        assert_eq!(join_details(bodies).unwrap_err().kind, ErrorKind::Server);
    }

    #[test]
    fn empty_page_joins_to_nothing() {
        assert!(join_details(vec![]).unwrap().is_empty());
    }
}
