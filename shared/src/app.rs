use tracing::{debug, info, warn};

use crate::capabilities::{Capabilities, HttpResult};
use crate::config::MAX_PAGE_SIZE;
use crate::error::{AppError, AppResult, ErrorKind};
use crate::event::Event;
use crate::gateway::{self, MutationOutcome};
use crate::image_processing::ImageProcessor;
use crate::model::{CatalogEntry, FormMode, Model, PageIntent, ReviewId};
use crate::view::ViewModel;

#[derive(Default)]
pub struct App {
    images: ImageProcessor,
}

impl App {
    // --- Review store sync ---

    fn request_list(model: &mut Model, caps: &Capabilities) {
        let generation = model.reviews.begin_fetch();
        match gateway::list_request(&caps.http, &model.config) {
            Ok(request) => {
                debug!(generation, "fetching review list");
                request.send(move |result| Event::ListResponse {
                    generation,
                    result: Box::new(result),
                });
            }
            Err(e) => {
                warn!(error = %e, "could not build list request");
                model.reviews.fail_fetch(e);
            }
        }
    }

    fn handle_list_response(generation: u64, result: HttpResult, model: &mut Model) {
        if !model.reviews.is_current(generation) {
            debug!(generation, "dropping superseded list response");
            return;
        }

        match gateway::ensure_success(result).and_then(|body| gateway::decode_list(&body)) {
            Ok(items) => {
                info!(count = items.len(), "review list loaded");
                model.reviews.finish_fetch(items);
            }
            Err(e) => {
                warn!(error = %e, "review list failed");
                model.reviews.fail_fetch(e);
            }
        }
    }

    fn submit(model: &mut Model, caps: &Capabilities) {
        if model.form.submitting {
            warn!("submit ignored while another submission is in flight");
            return;
        }

        model.form.error = None;
        let valid = match model.form.draft.validate() {
            Ok(valid) => valid,
            Err(errors) => {
                debug!(count = errors.len(), "draft failed validation");
                model.form.validation_errors = errors;
                return;
            }
        };
        model.form.validation_errors.clear();

        let mode = model.form.mode.clone();
        let request = match &mode {
            FormMode::Create => gateway::create_request(&caps.http, &model.config, &valid),
            FormMode::Editing(id) => {
                gateway::update_request(&caps.http, &model.config, id, &valid)
            }
        };

        match request {
            Ok(request) => {
                info!(editing = mode.editing_id().map(ReviewId::as_str), "submitting review");
                model.form.submitting = true;
                request.send(move |result| Event::SubmitResponse {
                    mode,
                    result: Box::new(result),
                });
            }
            Err(e) => {
                warn!(error = %e, "could not build submit request");
                model.form.error = Some(e);
            }
        }
    }

    fn handle_submit_response(
        mode: &FormMode,
        result: HttpResult,
        model: &mut Model,
        caps: &Capabilities,
    ) {
        model.form.submitting = false;

        match gateway::interpret_mutation(result) {
            Ok(outcome) => {
                info!(editing = mode.editing_id().map(ReviewId::as_str), "review saved");
                model.form.reset();
                match outcome {
                    MutationOutcome::Record(review) => model.reviews.upsert(review),
                    MutationOutcome::Acknowledged => Self::request_list(model, caps),
                }
            }
            Err(e) => {
                warn!(error = %e, "review submission failed");
                model.form.error = Some(e);
            }
        }
    }

    fn attach_image(&self, bytes: &[u8], mime_type: Option<&str>, model: &mut Model) {
        match self.images.prepare_attachment(bytes, mime_type) {
            Ok(encoded) => {
                model.form.draft.image = Some(encoded.data_url);
                model.form.error = None;
            }
            Err(e) => model.form.error = Some(AppError::from(e)),
        }
    }

    fn confirm_delete(model: &mut Model, caps: &Capabilities) {
        let Some(id) = model.reviews.pending_delete.take() else {
            debug!("delete confirmed with nothing pending");
            return;
        };

        match gateway::delete_request(&caps.http, &model.config, &id) {
            Ok(request) => {
                info!(review_id = %id, "deleting review");
                model.reviews.error = None;
                model.reviews.deleting = Some(id.clone());
                request.send(move |result| Event::DeleteResponse {
                    id,
                    result: Box::new(result),
                });
            }
            Err(e) => {
                warn!(error = %e, "could not build delete request");
                model.reviews.error = Some(e);
            }
        }
    }

    fn handle_delete_response(id: &ReviewId, result: HttpResult, model: &mut Model) {
        if model.reviews.deleting.as_ref() == Some(id) {
            model.reviews.deleting = None;
        }

        match gateway::interpret_mutation(result) {
            Ok(_) => {
                info!(review_id = %id, "review deleted");
                model.reviews.remove(id);
                if model.form.mode.editing_id() == Some(id) && !model.form.submitting {
                    model.form.reset();
                }
            }
            Err(e) => {
                warn!(review_id = %id, error = %e, "delete failed");
                model.reviews.error = Some(e);
            }
        }
    }

    // --- Catalog paging ---

    /// Starts queued page fetches until one is in flight or the queue is empty.
    fn pump_catalog(model: &mut Model, caps: &Capabilities) {
        while let Some(fetch) = model.catalog.start_next(model.config.page_size) {
            match gateway::page_request(&caps.http, &model.config, fetch.offset, fetch.limit) {
                Ok(request) => {
                    info!(offset = fetch.offset, limit = fetch.limit, "fetching catalog page");
                    let fetch_id = fetch.id;
                    request.send(move |result| Event::PageIndexResponse {
                        fetch_id,
                        result: Box::new(result),
                    });
                    return;
                }
                Err(e) => {
                    warn!(error = %e, "could not build page request");
                    model.catalog.settle(fetch.id);
                    model.catalog.fail_page(e);
                }
            }
        }
    }

    fn handle_page_index(fetch_id: u64, result: HttpResult, model: &mut Model, caps: &Capabilities) {
        let in_flight = model.catalog.in_flight.as_ref().map(|fetch| fetch.id);
        if in_flight != Some(fetch_id) {
            warn!(fetch_id, "page index for a fetch that is not running");
            return;
        }

        let urls =
            gateway::ensure_success(result).and_then(|body| gateway::decode_page_index(&body));

        match urls {
            Ok(urls) if urls.is_empty() => {
                Self::finish_page(fetch_id, Ok(Vec::new()), model, caps);
            }
            Ok(urls) => {
                debug!(fetch_id, count = urls.len(), "fetching page details");
                let details = gateway::fetch_details(&caps.http, urls);
                caps.compose.spawn(move |ctx| async move {
                    let result = details.await;
                    ctx.update_app(Event::PageDetailsResponse {
                        fetch_id,
                        result: Box::new(result),
                    });
                });
            }
            Err(e) => Self::finish_page(fetch_id, Err(e), model, caps),
        }
    }

    fn finish_page(
        fetch_id: u64,
        outcome: AppResult<Vec<CatalogEntry>>,
        model: &mut Model,
        caps: &Capabilities,
    ) {
        let Some(fetch) = model.catalog.settle(fetch_id) else {
            warn!(fetch_id, "page result for a fetch that is not running");
            return;
        };

        match outcome {
            Ok(entries) => {
                info!(offset = fetch.offset, count = entries.len(), "catalog page loaded");
                model.catalog.apply_page(&fetch, entries);
            }
            Err(e) => {
                warn!(offset = fetch.offset, error = %e, "catalog page failed");
                model.catalog.fail_page(e);
            }
        }

        Self::pump_catalog(model, caps);
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        let event_name = event.name();
        if event.is_user_initiated() {
            info!(event = event_name, "user action");
        } else {
            debug!(event = event_name, "handling event");
        }

        match event {
            Event::Configure(config) => match config.validate() {
                Ok(()) => {
                    info!(page_size = config.page_size, "gateway configured");
                    model.config = *config;
                    model.config_error = None;
                }
                Err(e) => {
                    warn!(error = %e, "configuration rejected");
                    model.config_error = Some(e.into());
                }
            },

            Event::DismissError => {
                model.reviews.error = None;
                model.form.error = None;
                model.catalog.error = None;
                model.config_error = None;
            }

            Event::ListRequested => Self::request_list(model, caps),

            Event::ListResponse { generation, result } => {
                Self::handle_list_response(generation, *result, model);
            }

            Event::FormEdited(field) => {
                field.apply(&mut model.form.draft);
                if !model.form.validation_errors.is_empty() {
                    model.form.validation_errors =
                        model.form.draft.validate().err().unwrap_or_default();
                }
            }

            Event::EditRequested { id } => {
                if model.form.submitting {
                    warn!(review_id = %id, "edit ignored while submitting");
                } else if let Some(review) = model.reviews.find(&id).cloned() {
                    model.form.begin_edit(&review);
                } else {
                    model.form.error = Some(
                        AppError::new(ErrorKind::NotFound, "review is no longer listed")
                            .with_context("review_id", id.as_str()),
                    );
                }
            }

            Event::EditCancelled => {
                if !model.form.submitting {
                    model.form.reset();
                }
            }

            Event::SubmitRequested => Self::submit(model, caps),

            Event::SubmitResponse { mode, result } => {
                Self::handle_submit_response(&mode, *result, model, caps);
            }

            Event::ImageAttached { bytes, mime_type } => {
                self.attach_image(&bytes, mime_type.as_deref(), model);
            }

            Event::ImageCleared => model.form.draft.image = None,

            Event::DeleteRequested { id } => {
                if model.reviews.deleting.is_some() {
                    warn!(review_id = %id, "delete ignored while another delete is in flight");
                } else {
                    model.reviews.pending_delete = Some(id);
                }
            }

            Event::DeleteConfirmed => Self::confirm_delete(model, caps),

            Event::DeleteCancelled => model.reviews.pending_delete = None,

            Event::DeleteResponse { id, result } => {
                Self::handle_delete_response(&id, *result, model);
            }

            Event::LoadPage { offset, limit } => {
                if limit == 0 || limit > MAX_PAGE_SIZE {
                    model.catalog.error = Some(
                        AppError::new(
                            ErrorKind::Validation,
                            format!("page size must be between 1 and {MAX_PAGE_SIZE}"),
                        )
                        .with_context("limit", limit.to_string()),
                    );
                } else {
                    model.catalog.enqueue(PageIntent::Standalone { offset, limit });
                    Self::pump_catalog(model, caps);
                }
            }

            Event::LoadMore => {
                model.catalog.enqueue(PageIntent::Append);
                Self::pump_catalog(model, caps);
            }

            Event::PageIndexResponse { fetch_id, result } => {
                Self::handle_page_index(fetch_id, *result, model, caps);
            }

            Event::PageDetailsResponse { fetch_id, result } => {
                Self::finish_page(fetch_id, *result, model, caps);
            }
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel::from(model)
    }
}
