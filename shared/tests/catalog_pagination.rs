mod common;

use common::{fail, http_requests, operation, resolve, respond, Tester};
use crux_core::Request;
use crux_http::protocol::HttpRequest;
use shared::{ErrorKind, Event, GatewayConfig, Model};

const PAGE_SIZE: u32 = 3;

fn configured() -> (Tester, Model) {
    let app = Tester::default();
    let mut model = Model::default();
    let config = GatewayConfig {
        page_size: PAGE_SIZE,
        ..GatewayConfig::default()
    };
    app.update(Event::Configure(Box::new(config)), &mut model);
    assert!(model.config_error.is_none());
    (app, model)
}

fn detail_url(id: u32) -> String {
    format!("https://pokeapi.co/api/v2/pokemon/{id}/")
}

fn index_body(offset: u32, limit: u32) -> String {
    let results: Vec<_> = (offset + 1..=offset + limit)
        .map(|id| serde_json::json!({"name": format!("mon-{id}"), "url": detail_url(id)}))
        .collect();
    serde_json::json!({"count": 1000, "results": results}).to_string()
}

fn detail_body(id: u32) -> String {
    serde_json::json!({
        "id": id,
        "name": format!("mon-{id}"),
        "sprites": {"other": {"official-artwork": {"front_default": format!("https://img/{id}.png")}}},
        "types": [{"type": {"name": "normal"}}]
    })
    .to_string()
}

fn id_from_url(request: &Request<HttpRequest>) -> u32 {
    operation(request)
        .url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|segment| segment.parse().ok())
        .expect("detail url ends in an id")
}

/// Answers the page index, then every detail in reverse order. Returns the
/// requests emitted once the page settles.
fn serve_page(
    app: &Tester,
    model: &mut Model,
    index: &mut Request<HttpRequest>,
    offset: u32,
    limit: u32,
) -> Vec<Request<HttpRequest>> {
    let mut details = resolve(app, model, index, respond(200, &index_body(offset, limit)));
    assert_eq!(details.len(), limit as usize, "one detail request per result");

    let mut emitted = Vec::new();
    for detail in details.iter_mut().rev() {
        let id = id_from_url(detail);
        emitted.extend(resolve(app, model, detail, respond(200, &detail_body(id))));
    }
    emitted
}

fn assert_page_url(request: &Request<HttpRequest>, offset: u32, limit: u32) {
    assert_eq!(
        operation(request).url,
        format!("https://pokeapi.co/api/v2/pokemon?limit={limit}&offset={offset}")
    );
}

#[test]
fn sequential_load_more_accumulates_in_order() {
    let (app, mut model) = configured();

    for k in 0..3 {
        let mut requests = http_requests(app.update(Event::LoadMore, &mut model).effects);
        assert_eq!(requests.len(), 1);
        assert_page_url(&requests[0], k * PAGE_SIZE, PAGE_SIZE);
        assert!(model.catalog.is_loading());

        let follow_ups = serve_page(&app, &mut model, &mut requests[0], k * PAGE_SIZE, PAGE_SIZE);
        assert!(follow_ups.is_empty());
        assert!(!model.catalog.is_loading());
    }

    let ids: Vec<u32> = model.catalog.accumulated.iter().map(|e| e.id).collect();
    assert_eq!(ids, (1..=9).collect::<Vec<_>>());
    assert_eq!(model.catalog.next_offset, 3 * PAGE_SIZE);
    assert_eq!(model.catalog.accumulated[0].image_url, "https://img/1.png");
    assert_eq!(model.catalog.accumulated[0].tags, vec!["normal"]);
}

#[test]
fn one_failed_detail_discards_the_page() {
    let (app, mut model) = configured();

    let mut requests = http_requests(app.update(Event::LoadMore, &mut model).effects);
    let mut details = resolve(&app, &mut model, &mut requests[0], respond(200, &index_body(0, 3)));
    assert_eq!(details.len(), 3);

    resolve(&app, &mut model, &mut details[0], respond(200, &detail_body(1)));
    resolve(&app, &mut model, &mut details[1], respond(500, ""));
    assert!(model.catalog.is_loading(), "page waits for every detail");
    resolve(&app, &mut model, &mut details[2], respond(200, &detail_body(3)));

    assert!(!model.catalog.is_loading());
    assert!(model.catalog.accumulated.is_empty());
    assert_eq!(model.catalog.next_offset, 0);
    assert_eq!(model.catalog.error.as_ref().map(|e| e.kind), Some(ErrorKind::Server));

    let view = app.view(&model);
    assert!(view.catalog.error.expect("error shown").is_retryable);

    let requests = http_requests(app.update(Event::LoadMore, &mut model).effects);
    assert_page_url(&requests[0], 0, PAGE_SIZE);
    assert!(model.catalog.error.is_none());
}

#[test]
fn undecodable_detail_discards_the_page() {
    let (app, mut model) = configured();

    let mut requests = http_requests(app.update(Event::LoadMore, &mut model).effects);
    let mut details = resolve(&app, &mut model, &mut requests[0], respond(200, &index_body(0, 2)));
    resolve(&app, &mut model, &mut details[0], respond(200, r#"{"name": "broken"}"#));
    resolve(&app, &mut model, &mut details[1], respond(200, &detail_body(2)));

    assert!(model.catalog.accumulated.is_empty());
    assert_eq!(
        model.catalog.error.as_ref().map(|e| e.kind),
        Some(ErrorKind::Deserialization)
    );
}

#[test]
fn overlapping_load_more_is_queued_behind_the_running_page() {
    let (app, mut model) = configured();

    let mut first = http_requests(app.update(Event::LoadMore, &mut model).effects);
    let queued = http_requests(app.update(Event::LoadMore, &mut model).effects);
    assert!(queued.is_empty(), "second page waits for the first");
    assert_eq!(app.view(&model).catalog.queued_requests, 1);

    let mut next = serve_page(&app, &mut model, &mut first[0], 0, PAGE_SIZE);
    assert_eq!(next.len(), 1);
    assert_page_url(&next[0], PAGE_SIZE, PAGE_SIZE);

    serve_page(&app, &mut model, &mut next[0], PAGE_SIZE, PAGE_SIZE);
    let ids: Vec<u32> = model.catalog.accumulated.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn failed_index_drops_queued_load_more_but_runs_queued_load_page() {
    let (app, mut model) = configured();

    let mut first = http_requests(app.update(Event::LoadMore, &mut model).effects);
    app.update(Event::LoadMore, &mut model);
    app.update(Event::LoadPage { offset: 10, limit: 2 }, &mut model);
    assert_eq!(model.catalog.queue.len(), 2);

    let next = resolve(
        &app,
        &mut model,
        &mut first[0],
        fail(crux_http::Error::Io("offline".into())),
    );

    assert_eq!(next.len(), 1);
    assert_page_url(&next[0], 10, 2);
    assert!(model.catalog.queue.is_empty());
    assert_eq!(model.catalog.next_offset, 0);
}

#[test]
fn load_page_twice_runs_two_full_cycles_and_leaves_accumulation_alone() {
    let (app, mut model) = configured();

    for _ in 0..2 {
        let mut requests =
            http_requests(app.update(Event::LoadPage { offset: 0, limit: 20 }, &mut model).effects);
        assert_eq!(requests.len(), 1, "nothing is cached between calls");
        assert_page_url(&requests[0], 0, 20);
        serve_page(&app, &mut model, &mut requests[0], 0, 20);
    }

    let page = model.catalog.last_page.as_ref().expect("standalone page kept");
    assert_eq!(page.offset, 0);
    assert_eq!(page.entries.len(), 20);
    assert!(model.catalog.accumulated.is_empty());
    assert_eq!(model.catalog.next_offset, 0);
}

#[test]
fn empty_page_succeeds_without_detail_requests() {
    let (app, mut model) = configured();

    let mut requests = http_requests(app.update(Event::LoadMore, &mut model).effects);
    let follow_ups = resolve(
        &app,
        &mut model,
        &mut requests[0],
        respond(200, r#"{"count": 0, "results": []}"#),
    );

    assert!(follow_ups.is_empty());
    assert!(!model.catalog.is_loading());
    assert!(model.catalog.error.is_none());
    assert!(model.catalog.accumulated.is_empty());
}

#[test]
fn malformed_index_fails_the_cycle() {
    let (app, mut model) = configured();

    let mut requests = http_requests(app.update(Event::LoadMore, &mut model).effects);
    resolve(&app, &mut model, &mut requests[0], respond(200, "not json"));

    assert!(!model.catalog.is_loading());
    assert_eq!(
        model.catalog.error.as_ref().map(|e| e.kind),
        Some(ErrorKind::Deserialization)
    );
}

#[test]
fn configured_collection_and_endpoint_shape_the_url() {
    let app = Tester::default();
    let mut model = Model::default();
    let config = GatewayConfig {
        catalog_endpoint: "https://catalog.example/v1/".into(),
        catalog_collection: "berry".into(),
        page_size: 5,
        ..GatewayConfig::default()
    };
    app.update(Event::Configure(Box::new(config)), &mut model);

    let requests = http_requests(app.update(Event::LoadMore, &mut model).effects);
    assert_eq!(
        operation(&requests[0]).url,
        "https://catalog.example/v1/berry?limit=5&offset=0"
    );
}

#[test]
fn every_detail_of_a_page_is_requested_at_once() {
    let (app, mut model) = configured();

    let mut requests = http_requests(app.update(Event::LoadMore, &mut model).effects);
    let details = resolve(&app, &mut model, &mut requests[0], respond(200, &index_body(0, 3)));

    let urls: Vec<&str> = details.iter().map(|r| operation(r).url.as_str()).collect();
    assert_eq!(urls, vec![detail_url(1), detail_url(2), detail_url(3)]);
    assert!(details.iter().all(|r| operation(r).method == "GET"));
}

#[test]
fn transport_failure_on_a_detail_fails_the_page() {
    let (app, mut model) = configured();

    let mut requests = http_requests(app.update(Event::LoadMore, &mut model).effects);
    let mut details = resolve(&app, &mut model, &mut requests[0], respond(200, &index_body(0, 2)));
    resolve(&app, &mut model, &mut details[0], fail(crux_http::Error::Timeout));
    resolve(&app, &mut model, &mut details[1], respond(200, &detail_body(2)));

    assert!(!model.catalog.is_loading());
    assert!(model.catalog.accumulated.is_empty());
    assert_eq!(model.catalog.error.as_ref().map(|e| e.kind), Some(ErrorKind::Timeout));
}
