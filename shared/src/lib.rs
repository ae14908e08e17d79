// Headless core for a review board and a paged remote catalog.

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod event;
pub mod gateway;
pub mod image_processing;
pub mod message_store;
pub mod model;
pub mod view;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::GatewayConfig;
pub use crux_core::{render::Render, App as CruxApp};
pub use error::{AppError, AppResult, ErrorKind};
pub use event::{DraftField, Event};
pub use message_store::{MessageStore, SharedStore};
pub use model::Model;
pub use view::ViewModel;

/// Largest attachment accepted before decoding.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
/// Longest side of an attached image after downscaling.
pub const MAX_OUTPUT_DIMENSION: u32 = 300;
