#![allow(dead_code)]

use crux_core::testing::AppTester;
use crux_core::Request;
use crux_http::protocol::{HttpRequest, HttpResponse, HttpResult};
use shared::{App, Effect, Model};

pub type Tester = AppTester<App, Effect>;

pub fn http_requests(effects: Vec<Effect>) -> Vec<Request<HttpRequest>> {
    effects.into_iter().filter_map(Effect::into_http).collect()
}

pub fn operation(request: &Request<HttpRequest>) -> &HttpRequest {
    &request.operation
}

pub fn body_json(request: &Request<HttpRequest>) -> serde_json::Value {
    serde_json::from_slice(&operation(request).body).expect("body is JSON")
}

pub fn respond(status: u16, body: &str) -> HttpResult {
    HttpResult::Ok(HttpResponse::status(status).body(body.as_bytes()).build())
}

pub fn fail(error: crux_http::Error) -> HttpResult {
    HttpResult::Err(error)
}

/// Resolves one request, feeds the resulting events back into the app and
/// returns every HTTP request emitted along the way.
pub fn resolve(
    app: &Tester,
    model: &mut Model,
    request: &mut Request<HttpRequest>,
    result: HttpResult,
) -> Vec<Request<HttpRequest>> {
    let update = app.resolve(request, result).expect("request should resolve");
    let mut emitted = http_requests(update.effects);
    for event in update.events {
        let update = app.update(event, model);
        emitted.extend(http_requests(update.effects));
    }
    emitted
}
