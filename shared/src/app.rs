use serde::Serialize;

use crate::capabilities::{
    decode, encode, into_raw_response, read_result, write_result, Capabilities, PersistedSlot,
    StorageError,
};
use crate::event::{Event, HttpOutcome};
use crate::fetch::{normalize_key, parse_detail, parse_list_page, DetailCache};
use crate::model::{FormField, FormStyle, FormValues, ListMode, Model, Submission, Theme};
use crate::pagination::{compose, page_offset, total_pages, QueryParams};
use crate::password;
use crate::selection::{CsvExport, SelectedItem, SelectionSet};
use crate::validation::{FieldErrors, FormSchema, ValidationOutcome};
use crate::{
    AppError, DetailView, ExplorerView, FormsView, ListItemView, SelectionView, SubmissionView,
    UserFacingError, ViewModel, ALLOWED_COUNTRIES,
};

#[derive(Default)]
pub struct App;

impl App {
    fn request_list(model: &mut Model, caps: &Capabilities) {
        let term = model.navigation.effective_search_term();

        if !term.is_empty() {
            // Any server page still in flight is now stale.
            if model.list.full_list.is_some() {
                model.list.seq.next();
                model.list.is_loading = false;
                model.list.error = None;
                return;
            }
            if let Some(pending) = model.list.pending_full_list {
                tracing::debug!(pending, "full list already in flight");
                model.list.seq.next();
                model.list.is_loading = true;
                model.list.error = None;
                return;
            }
        }

        let (mode, offset, limit) = if term.is_empty() {
            let size = model.config.page_size;
            let page = model.navigation.current_page();
            (ListMode::Server, page_offset(page, size), size)
        } else {
            (ListMode::FullList, 0, model.config.full_list_limit)
        };

        let url = match model.config.endpoints() {
            Ok(endpoints) => endpoints.list(offset, limit),
            Err(e) => {
                tracing::error!(error = %e, "cannot build list URL");
                model.set_error(e.into());
                return;
            }
        };

        let seq = model.list.seq.next();
        model.list.is_loading = true;
        model.list.error = None;
        if mode == ListMode::FullList {
            model.list.pending_full_list = Some(seq);
        }

        tracing::info!(seq, ?mode, offset, limit, "fetching list");
        caps.http.get(&url).send(move |result| Event::ListResponse {
            seq,
            mode,
            result: Box::new(into_raw_response(result)),
        });
    }

    /// Returns `false` when the response was stale and dropped.
    ///
    /// A server page must carry the latest sequence number. The full list is
    /// shared by every search, so it is kept as long as it answers the
    /// outstanding full-list request, and only drives loading and error
    /// state while a search is active.
    fn handle_list_response(
        model: &mut Model,
        seq: u64,
        mode: ListMode,
        result: HttpOutcome,
    ) -> bool {
        let expected = match mode {
            ListMode::Server => model.list.seq.is_current(seq),
            ListMode::FullList => model.list.pending_full_list == Some(seq),
        };
        if !expected {
            tracing::warn!(seq, ?mode, latest = model.list.seq.latest(), "dropping stale list response");
            return false;
        }
        if mode == ListMode::FullList {
            model.list.pending_full_list = None;
        }

        let searching = !model.navigation.effective_search_term().is_empty();
        let shown = searching == (mode == ListMode::FullList);
        if shown {
            model.list.is_loading = false;
        }

        match result.and_then(parse_list_page) {
            Ok(page) => {
                tracing::info!(seq, ?mode, count = page.results.len(), total = page.total, "list loaded");
                match mode {
                    ListMode::Server => {
                        model.list.items = page.results;
                        model.list.total = page.total;
                    }
                    ListMode::FullList => model.list.full_list = Some(page.results),
                }
                if shown {
                    model.list.error = None;
                }
            }
            Err(e) => {
                tracing::warn!(seq, ?mode, error = %e, "list fetch failed");
                if shown {
                    model.list.error = Some(e.into());
                }
            }
        }
        true
    }

    fn request_detail(key: String, model: &mut Model, caps: &Capabilities) {
        let url = match model.config.endpoints() {
            Ok(endpoints) => endpoints.detail(&key),
            Err(e) => {
                tracing::error!(error = %e, "cannot build detail URL");
                model.set_error(e.into());
                return;
            }
        };

        model.details.in_flight.insert(key.clone());
        tracing::info!(key = %key, "fetching detail");

        let request_url = url.clone();
        caps.http.get(&url).send(move |result| Event::DetailResponse {
            key,
            url: request_url,
            result: Box::new(into_raw_response(result)),
        });
    }

    fn select_item(id_or_name: &str, model: &mut Model, caps: &Capabilities) {
        let Some(key) = normalize_key(id_or_name) else {
            tracing::warn!("ignoring detail request with empty key");
            return;
        };

        model.details.selected_key = Some(key.clone());
        model.details.error = None;

        if model.details.cache.get(&key).is_some() {
            tracing::debug!(key = %key, "detail cache hit");
            return;
        }
        if model.details.in_flight.contains(&key) {
            tracing::debug!(key = %key, "detail request already in flight");
            return;
        }
        Self::request_detail(key, model, caps);
    }

    fn handle_detail_response(model: &mut Model, key: String, url: &str, result: HttpOutcome) {
        model.details.in_flight.remove(&key);
        let is_selected = model.details.selected_key.as_deref() == Some(key.as_str());

        match result.and_then(|response| parse_detail(response, url)) {
            Ok(item) => {
                tracing::info!(key = %key, id = item.id, "detail loaded");
                model.details.cache.insert(key, item);
                if is_selected {
                    model.details.error = None;
                }
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "detail fetch failed");
                if is_selected {
                    model.details.error = Some(e.into());
                }
            }
        }
    }

    fn load_persisted(caps: &Capabilities) {
        for slot in PersistedSlot::ALL {
            caps.kv.get(slot.kv_key(), move |result| Event::StorageLoaded {
                slot,
                result: read_result(slot, result),
            });
        }
    }

    fn persist<T: Serialize>(slot: PersistedSlot, value: &T, caps: &Capabilities) {
        match encode(slot, value) {
            Ok(bytes) => caps.kv.set(slot.kv_key(), bytes, move |result| Event::StorageWritten {
                slot,
                result: write_result(slot, result),
            }),
            Err(e) => tracing::warn!(error = %e, "skipping persist"),
        }
    }

    fn persist_draft(model: &Model, caps: &Capabilities) {
        if model.config.persist_drafts {
            Self::persist(
                PersistedSlot::FormDraft,
                &model.forms.controlled.values.draft_snapshot(),
                caps,
            );
        }
    }

    fn restore(
        model: &mut Model,
        slot: PersistedSlot,
        result: Result<Option<Vec<u8>>, StorageError>,
    ) -> Result<(), StorageError> {
        let Some(bytes) = result? else {
            tracing::debug!(key = %slot.kv_key(), "nothing stored");
            return Ok(());
        };

        match slot {
            _ if model.user_set.contains(&slot) => {
                tracing::debug!(key = %slot.kv_key(), "keeping value set during load");
            }
            PersistedSlot::LastSearch => {
                let term: String = decode(slot, &bytes)?;
                model.navigation.restore_persisted_term(term);
            }
            PersistedSlot::Theme => model.theme = decode::<Theme>(slot, &bytes)?,
            PersistedSlot::Selection => {
                let restored: SelectionSet = decode(slot, &bytes)?;
                model.selection.merge_restored(restored);
            }
            PersistedSlot::FormDraft => {
                let draft: FormValues = decode(slot, &bytes)?;
                if model.config.persist_drafts && model.forms.controlled.values.is_pristine() {
                    model.forms.controlled.values = draft.draft_snapshot();
                }
            }
        }
        Ok(())
    }

    fn submit(model: &mut Model, kind: FormStyle, outcome: ValidationOutcome) -> bool {
        match outcome {
            ValidationOutcome::Success(data) => {
                let submission = Submission::new(kind, data);
                tracing::info!(id = %submission.id, ?kind, "form submitted");
                model.forms.submissions.push(submission);
                true
            }
            ValidationOutcome::Failure(errors) => {
                tracing::debug!(?kind, fields = errors.len(), "form rejected");
                match kind {
                    FormStyle::Controlled => model.forms.controlled.errors = errors,
                    FormStyle::Uncontrolled => model.forms.uncontrolled_errors = errors,
                }
                false
            }
        }
    }

    fn explorer_view(model: &Model) -> ExplorerView {
        let page = model.navigation.current_page();
        let page_size = model.config.page_size;
        let term = model.navigation.effective_search_term();

        let (items, total) = if term.is_empty() {
            (model.list.items.clone(), model.list.total)
        } else {
            match &model.list.full_list {
                Some(full) => {
                    let slice = compose(full, term, page, page_size);
                    (slice.items, slice.total)
                }
                None => (Vec::new(), 0),
            }
        };

        ExplorerView {
            search_term: term.to_string(),
            remembered_search: model.navigation.persisted_term().to_string(),
            page,
            page_size,
            total,
            total_pages: total_pages(total, page_size),
            items: items
                .into_iter()
                .map(|item| {
                    let id = item.id();
                    ListItemView {
                        id,
                        is_selected: id.is_some_and(|id| model.selection.contains(id)),
                        name: item.name,
                        url: item.url,
                    }
                })
                .collect(),
            is_loading: model.list.is_loading,
            error: model.list.error.as_ref().map(UserFacingError::from),
        }
    }

    fn detail_view(model: &Model) -> DetailView {
        let Some(key) = &model.details.selected_key else {
            return DetailView::Hidden;
        };
        if let Some(item) = model.details.cache.peek(key) {
            return DetailView::Ready { item: item.clone() };
        }
        match &model.details.error {
            Some(error) => DetailView::Failed {
                key: key.clone(),
                error: error.into(),
            },
            None => DetailView::Loading { key: key.clone() },
        }
    }

    fn forms_view(model: &Model) -> FormsView {
        let controlled = &model.forms.controlled;
        FormsView {
            values: controlled.values.clone(),
            errors: controlled.errors.clone(),
            uncontrolled_errors: model.forms.uncontrolled_errors.clone(),
            password_strength: password::score(&controlled.values.password),
            countries: ALLOWED_COUNTRIES.iter().map(|c| (*c).to_string()).collect(),
            submissions: model.forms.submissions.iter().map(SubmissionView::from).collect(),
        }
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        tracing::debug!(event = event.name(), user = event.is_user_initiated(), "update");

        match event {
            Event::Noop => {}

            Event::AppStarted { query } => {
                model.navigation.sync_query(QueryParams::parse(&query));
                Self::load_persisted(caps);
                Self::request_list(model, caps);
                caps.render.render();
            }

            Event::Configure(config) => {
                if let Err(e) = config.validate() {
                    tracing::warn!(error = %e, "rejecting configuration");
                    model.set_error(AppError::from(e));
                    caps.render.render();
                    return;
                }

                let base_changed = config.api_base_url != model.config.api_base_url;
                if base_changed {
                    model.details.cache = DetailCache::with_capacity(config.detail_cache_capacity);
                } else if config.detail_cache_capacity != model.config.detail_cache_capacity {
                    model.details.cache.resize(config.detail_cache_capacity);
                }
                if base_changed || config.full_list_limit != model.config.full_list_limit {
                    model.list.full_list = None;
                    model.list.pending_full_list = None;
                }

                tracing::info!(?config, "configuration applied");
                model.config = config;
                Self::request_list(model, caps);
                caps.render.render();
            }

            Event::DismissError => {
                model.clear_error();
                model.list.error = None;
                caps.render.render();
            }

            Event::NavigationChanged { query } => {
                model.navigation.sync_query(QueryParams::parse(&query));
                Self::request_list(model, caps);
                caps.render.render();
            }

            Event::SearchSubmitted { term } => {
                let trimmed = model.navigation.handle_search(&term);
                model.user_set.insert(PersistedSlot::LastSearch);
                Self::persist(PersistedSlot::LastSearch, &trimmed, caps);
                Self::request_list(model, caps);
                caps.render.render();
            }

            Event::PageSelected { page } => {
                model.navigation.handle_page_change(page.max(1));
                Self::request_list(model, caps);
                caps.render.render();
            }

            Event::RetryRequested => {
                if model.list.error.is_some() {
                    Self::request_list(model, caps);
                }
                if model.details.error.is_some() {
                    if let Some(key) = model.details.selected_key.clone() {
                        model.details.error = None;
                        if !model.details.in_flight.contains(&key) {
                            Self::request_detail(key, model, caps);
                        }
                    }
                }
                caps.render.render();
            }

            Event::ItemSelected { id_or_name } => {
                Self::select_item(&id_or_name, model, caps);
                caps.render.render();
            }

            Event::DetailClosed => {
                model.details.selected_key = None;
                model.details.error = None;
                caps.render.render();
            }

            Event::ClearDetailCache => {
                model.details.cache.clear();
                tracing::info!("detail cache cleared");
                caps.render.render();
            }

            Event::ToggleSelection(item) => {
                let Some(selected) = SelectedItem::from_list_item(&item) else {
                    tracing::warn!(url = %item.url, "item has no numeric id, cannot select");
                    return;
                };
                model.selection.toggle(selected);
                model.export = None;
                Self::persist(PersistedSlot::Selection, &model.selection, caps);
                caps.render.render();
            }

            Event::ClearSelection => {
                model.selection.clear();
                model.export = None;
                Self::persist(PersistedSlot::Selection, &model.selection, caps);
                caps.render.render();
            }

            Event::ExportSelectionRequested => {
                model.export = CsvExport::from_selection(&model.selection);
                if model.export.is_none() {
                    tracing::info!("nothing selected to export");
                }
                caps.render.render();
            }

            Event::ExportDismissed => {
                model.export = None;
                caps.render.render();
            }

            Event::ToggleTheme => {
                model.theme = model.theme.toggle();
                model.user_set.insert(PersistedSlot::Theme);
                Self::persist(PersistedSlot::Theme, &model.theme, caps);
                caps.render.render();
            }

            Event::FormFieldChanged(update) => {
                let controlled = &mut model.forms.controlled;
                let field = controlled.values.apply(update);
                controlled.touched.insert(field);
                controlled.errors =
                    FormSchema::standard().errors_for(&controlled.values, &controlled.touched);
                Self::persist_draft(model, caps);
                caps.render.render();
            }

            Event::ControlledFormSubmitted => {
                let controlled = &mut model.forms.controlled;
                controlled.touched.extend(FormField::ALL);
                let outcome = FormSchema::standard().validate(&controlled.values);
                if Self::submit(model, FormStyle::Controlled, outcome) {
                    model.forms.controlled.reset();
                    Self::persist_draft(model, caps);
                }
                caps.render.render();
            }

            Event::UncontrolledFormSubmitted(values) => {
                let outcome = FormSchema::standard().validate(&values);
                if Self::submit(model, FormStyle::Uncontrolled, outcome) {
                    model.forms.uncontrolled_errors = FieldErrors::default();
                }
                caps.render.render();
            }

            Event::FormReset => {
                model.forms.controlled.reset();
                model.forms.uncontrolled_errors = FieldErrors::default();
                Self::persist_draft(model, caps);
                caps.render.render();
            }

            Event::ListResponse { seq, mode, result } => {
                if Self::handle_list_response(model, seq, mode, *result) {
                    caps.render.render();
                }
            }

            Event::DetailResponse { key, url, result } => {
                Self::handle_detail_response(model, key, &url, *result);
                caps.render.render();
            }

            Event::StorageLoaded { slot, result } => {
                match Self::restore(model, slot, result) {
                    Ok(()) => caps.render.render(),
                    Err(e) => tracing::warn!(error = %e, "ignoring persisted value"),
                }
            }

            Event::StorageWritten { slot, result } => {
                if let Err(e) = result {
                    tracing::warn!(key = %slot.kv_key(), error = %e, "persist failed");
                }
            }
        }
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel {
            query_string: model.navigation.query().to_query_string(),
            theme: model.theme,
            explorer: Self::explorer_view(model),
            detail: Self::detail_view(model),
            selection: SelectionView {
                count: model.selection.len(),
                items: model.selection.items().to_vec(),
                export: model.export.clone(),
            },
            forms: Self::forms_view(model),
            error: model.active_error.as_ref().map(UserFacingError::from),
        }
    }
}
