mod http;

pub use self::http::{HttpResult, InvalidUrl, ValidatedUrl, MAX_URL_LENGTH};

// Crux's built-in capabilities cover view updates and the detail fan-out as-is.
pub use crux_core::compose::Compose;
pub use crux_core::render::{Render, RenderOperation};
pub use crux_http::Http;

use crux_core::capability::{Never, ProtoContext};
use crux_core::Request;
use serde::Serialize;

use crate::app::App;
use crate::event::Event;

pub type AppHttp = Http<Event>;
pub type AppRender = Render<Event>;
pub type AppCompose = Compose<Event>;

pub struct Capabilities {
    pub http: AppHttp,
    pub render: AppRender,
    pub compose: AppCompose,
}

/// Side effects the shell must carry out. `Compose` only orchestrates the
/// other capabilities, so it never surfaces here.
#[derive(Debug)]
pub enum Effect {
    Http(Request<crux_http::protocol::HttpRequest>),
    Render(Request<RenderOperation>),
}

#[derive(Serialize)]
#[serde(rename = "Effect")]
pub enum EffectFfi {
    Http(crux_http::protocol::HttpRequest),
    Render(RenderOperation),
}

impl Effect {
    pub fn is_render(&self) -> bool {
        matches!(self, Effect::Render(_))
    }

    pub fn into_http(self) -> Option<Request<crux_http::protocol::HttpRequest>> {
        match self {
            Effect::Http(request) => Some(request),
            Effect::Render(_) => None,
        }
    }
}

impl crux_core::Effect for Effect {
    type Ffi = EffectFfi;

    fn serialize(self) -> (EffectFfi, crux_core::bridge::ResolveSerialized) {
        match self {
            Effect::Http(request) => request.serialize(EffectFfi::Http),
            Effect::Render(request) => request.serialize(EffectFfi::Render),
        }
    }
}

impl crux_core::WithContext<App, Effect> for Capabilities {
    fn new_with_context(context: ProtoContext<Effect, Event>) -> Capabilities {
        Capabilities {
            http: Http::new(context.specialize(Effect::Http)),
            render: Render::new(context.specialize(Effect::Render)),
            compose: Compose::new(context.specialize(|request: Request<Never>| {
                match request.operation {}
            })),
        }
    }
}
