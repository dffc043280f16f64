// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{
    AdminEditor, AppMode, DurableStorage, FieldUpdate, Funnel, GalleryCursor, GenerationKind,
    GenerationOutcome, GenerationRequest, GenerationResolution, HandoffPayload, Inventory,
    Listing, ListingId, Site,
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Catalog,
    Detail(ListingId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: AppMode,
    pub view: View,
    pub gallery: GalleryCursor,
    pub funnel: Funnel,
    pub editor: Option<AdminEditor>,
    pub search_query: String,
    pub status_line: Option<String>,
    next_request_id: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: AppMode::Client,
            view: View::Catalog,
            gallery: GalleryCursor::default(),
            funnel: Funnel::Closed,
            editor: None,
            search_query: String::new(),
            status_line: None,
            next_request_id: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    ToggleMode,
    SetSearch(String),
    SelectListing(ListingId),
    Back,
    GalleryNext,
    GalleryPrevious,
    GallerySelect(usize),
    OpenFunnel,
    ConfirmDownPayment,
    ChooseLocation(Site),
    CancelFunnel,
    StartCreate,
    StartEdit(ListingId),
    UpdateField(FieldUpdate),
    AttachImage(String),
    RemoveImage(usize),
    AddFeature(String),
    RemoveFeature(usize),
    CommitEditor,
    DiscardEditor,
    DeleteListing(ListingId),
    RequestGeneration(GenerationKind),
    GenerationFinished {
        request_id: u64,
        outcome: GenerationOutcome,
    },
    SetMessagingDestination(String),
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    ViewChanged(View),
    GalleryMoved(usize),
    FunnelChanged,
    HandoffRequested(HandoffPayload),
    EditorOpened,
    EditorClosed,
    ListingSaved(ListingId),
    ListingRemoved(ListingId),
    GenerationRequested(GenerationRequest),
    GenerationResolved(GenerationResolution),
    MessagingUpdated(String),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn dispatch<S: DurableStorage>(
        &mut self,
        inventory: &mut Inventory<S>,
        command: AppCommand,
    ) -> Vec<AppEvent> {
        match command {
            AppCommand::ToggleMode => self.toggle_mode(),
            AppCommand::SetSearch(query) => {
                self.search_query = query;
                Vec::new()
            }
            AppCommand::SelectListing(id) => self.select_listing(inventory, id),
            AppCommand::Back => self.back(),
            AppCommand::GalleryNext => self.move_gallery(inventory, GalleryCursor::next),
            AppCommand::GalleryPrevious => self.move_gallery(inventory, GalleryCursor::previous),
            AppCommand::GallerySelect(index) => {
                self.move_gallery(inventory, |cursor, len| cursor.select(index, len))
            }
            AppCommand::OpenFunnel => {
                let listing = self.selected_listing(inventory).cloned();
                match self.funnel.open(listing.as_ref()) {
                    Ok(()) => vec![AppEvent::FunnelChanged],
                    Err(error) => vec![self.set_status(&error.to_string())],
                }
            }
            AppCommand::ConfirmDownPayment => {
                if !matches!(self.funnel, Funnel::ConfirmDownPayment { .. }) {
                    return Vec::new();
                }
                self.funnel.confirm();
                vec![AppEvent::FunnelChanged]
            }
            AppCommand::ChooseLocation(site) => self.choose_location(inventory, site),
            AppCommand::CancelFunnel => {
                if !self.funnel.is_open() {
                    return Vec::new();
                }
                self.funnel.cancel();
                vec![AppEvent::FunnelChanged]
            }
            AppCommand::StartCreate => {
                if let Some(denied) = self.require_admin() {
                    return denied;
                }
                self.editor = Some(AdminEditor::start_create());
                vec![AppEvent::EditorOpened]
            }
            AppCommand::StartEdit(id) => {
                if let Some(denied) = self.require_admin() {
                    return denied;
                }
                let Some(listing) = inventory.get(&id) else {
                    return vec![self.set_status("listing not found -- it may have been deleted")];
                };
                self.editor = Some(AdminEditor::start_edit(listing));
                vec![AppEvent::EditorOpened]
            }
            AppCommand::UpdateField(update) => {
                self.with_editor(|editor| editor.update_field(update))
            }
            AppCommand::AttachImage(reference) => {
                self.with_editor(|editor| editor.attach_image(reference))
            }
            AppCommand::RemoveImage(position) => self.with_editor(|editor| {
                editor.remove_image(position);
            }),
            AppCommand::AddFeature(tag) => self.with_editor(|editor| editor.add_feature(&tag)),
            AppCommand::RemoveFeature(position) => self.with_editor(|editor| {
                editor.remove_feature(position);
            }),
            AppCommand::CommitEditor => self.commit_editor(inventory),
            AppCommand::DiscardEditor => {
                if self.editor.take().is_none() {
                    return Vec::new();
                }
                vec![AppEvent::EditorClosed]
            }
            AppCommand::DeleteListing(id) => self.delete_listing(inventory, &id),
            AppCommand::RequestGeneration(kind) => self.request_generation(kind),
            AppCommand::GenerationFinished {
                request_id,
                outcome,
            } => self.finish_generation(request_id, outcome),
            AppCommand::SetMessagingDestination(destination) => {
                if let Some(denied) = self.require_admin() {
                    return denied;
                }
                match inventory.set_messaging_destination(&destination) {
                    Ok(()) => {
                        let saved = inventory.messaging().destination.clone();
                        let message = format!("messaging destination set to {saved}");
                        let status = self.set_status(&message);
                        vec![AppEvent::MessagingUpdated(saved), status]
                    }
                    Err(error) => vec![self.set_status(&format!("{error:#}"))],
                }
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    /// The listing the detail view points at. A reference to a listing that
    /// no longer exists sends the view back to the catalog.
    pub fn selected_listing<'a, S: DurableStorage>(
        &mut self,
        inventory: &'a Inventory<S>,
    ) -> Option<&'a Listing> {
        let View::Detail(id) = &self.view else {
            return None;
        };
        let listing = inventory.get(id);
        if listing.is_none() {
            tracing::debug!(listing = %id, "selected listing is gone; returning to catalog");
            self.return_to_catalog();
        }
        listing
    }

    pub fn visible_listings<'a, S: DurableStorage>(
        &self,
        inventory: &'a Inventory<S>,
    ) -> Vec<&'a Listing> {
        inventory.filter(&self.search_query)
    }

    fn toggle_mode(&mut self) -> Vec<AppEvent> {
        self.mode = match self.mode {
            AppMode::Client => AppMode::Admin,
            AppMode::Admin => AppMode::Client,
        };
        let mut events = vec![AppEvent::ModeChanged(self.mode)];
        if self.mode == AppMode::Client && self.editor.take().is_some() {
            events.push(AppEvent::EditorClosed);
        }
        events.push(self.set_status(&format!("{} mode", self.mode.label())));
        events
    }

    fn select_listing<S: DurableStorage>(
        &mut self,
        inventory: &Inventory<S>,
        id: ListingId,
    ) -> Vec<AppEvent> {
        if inventory.get(&id).is_none() {
            let mut events = Vec::new();
            if self.view != View::Catalog {
                self.return_to_catalog();
                events.push(AppEvent::ViewChanged(View::Catalog));
            }
            events.push(self.set_status("listing not found -- it may have been deleted"));
            return events;
        }
        self.gallery.reset();
        self.funnel.cancel();
        self.view = View::Detail(id);
        vec![AppEvent::ViewChanged(self.view.clone())]
    }

    fn back(&mut self) -> Vec<AppEvent> {
        if self.view == View::Catalog && !self.funnel.is_open() {
            return Vec::new();
        }
        self.return_to_catalog();
        vec![AppEvent::ViewChanged(View::Catalog)]
    }

    fn return_to_catalog(&mut self) {
        self.view = View::Catalog;
        self.gallery.reset();
        self.funnel.cancel();
    }

    fn move_gallery<S: DurableStorage>(
        &mut self,
        inventory: &Inventory<S>,
        step: impl FnOnce(&mut GalleryCursor, usize),
    ) -> Vec<AppEvent> {
        let Some(listing) = self.selected_listing(inventory) else {
            return Vec::new();
        };
        let len = listing.image_refs.len();
        step(&mut self.gallery, len);
        vec![AppEvent::GalleryMoved(self.gallery.index())]
    }

    fn choose_location<S: DurableStorage>(
        &mut self,
        inventory: &Inventory<S>,
        site: Site,
    ) -> Vec<AppEvent> {
        if !matches!(self.funnel, Funnel::ChooseLocation { .. }) {
            return Vec::new();
        }
        match self.funnel.choose_location(site, inventory) {
            Some(payload) => {
                tracing::info!(
                    make = %payload.make,
                    model = %payload.model,
                    site = payload.chosen_location.as_str(),
                    "appointment hand-off"
                );
                vec![AppEvent::FunnelChanged, AppEvent::HandoffRequested(payload)]
            }
            None => {
                let mut events = vec![AppEvent::FunnelChanged];
                if self.selected_listing(inventory).is_none() {
                    events.push(AppEvent::ViewChanged(View::Catalog));
                }
                events.push(self.set_status("that vehicle is no longer available"));
                events
            }
        }
    }

    fn with_editor(&mut self, edit: impl FnOnce(&mut AdminEditor)) -> Vec<AppEvent> {
        if let Some(editor) = self.editor.as_mut() {
            edit(editor);
        }
        Vec::new()
    }

    fn commit_editor<S: DurableStorage>(&mut self, inventory: &mut Inventory<S>) -> Vec<AppEvent> {
        let Some(editor) = self.editor.as_mut() else {
            return Vec::new();
        };
        match editor.commit(inventory) {
            Ok(id) => {
                self.editor = None;
                let title = inventory
                    .get(&id)
                    .map(Listing::title)
                    .unwrap_or_else(|| id.to_string());
                vec![
                    AppEvent::ListingSaved(id),
                    AppEvent::EditorClosed,
                    self.set_status(&format!("saved {title}")),
                ]
            }
            Err(error) => vec![self.set_status(&format!("{error:#}"))],
        }
    }

    fn delete_listing<S: DurableStorage>(
        &mut self,
        inventory: &mut Inventory<S>,
        id: &ListingId,
    ) -> Vec<AppEvent> {
        if let Some(denied) = self.require_admin() {
            return denied;
        }
        match inventory.remove(id) {
            Ok(Some(removed)) => {
                let mut events = vec![AppEvent::ListingRemoved(removed.id.clone())];
                if self.view == View::Detail(removed.id.clone()) {
                    self.return_to_catalog();
                    events.push(AppEvent::ViewChanged(View::Catalog));
                } else if self.funnel.listing() == Some(&removed.id) {
                    self.funnel.cancel();
                    events.push(AppEvent::FunnelChanged);
                }
                events.push(self.set_status(&format!("deleted {}", removed.title())));
                events
            }
            Ok(None) => Vec::new(),
            Err(error) => vec![self.set_status(&format!("{error:#}"))],
        }
    }

    fn request_generation(&mut self, kind: GenerationKind) -> Vec<AppEvent> {
        let request_id = self.next_request_id;
        let Some(editor) = self.editor.as_mut() else {
            return Vec::new();
        };
        match editor.begin_generation(kind, request_id) {
            Ok(request) => {
                self.next_request_id += 1;
                let status = self.set_status(&format!("generating {}...", kind.label()));
                vec![AppEvent::GenerationRequested(request), status]
            }
            Err(error) => vec![self.set_status(&error.to_string())],
        }
    }

    fn finish_generation(&mut self, request_id: u64, outcome: GenerationOutcome) -> Vec<AppEvent> {
        let Some(editor) = self.editor.as_mut() else {
            tracing::debug!(request_id, "generation finished after editor closed");
            return Vec::new();
        };
        let resolution = editor.finish_generation(request_id, outcome);
        let message = match &resolution {
            GenerationResolution::ImageAttached => "image generated and attached".to_owned(),
            GenerationResolution::DescriptionReplaced => "description generated".to_owned(),
            GenerationResolution::Failed(message) => message.clone(),
            GenerationResolution::Stale => {
                tracing::debug!(request_id, "ignoring stale generation result");
                return Vec::new();
            }
        };
        let status = self.set_status(&message);
        vec![AppEvent::GenerationResolved(resolution), status]
    }

    fn require_admin(&mut self) -> Option<Vec<AppEvent>> {
        if self.mode == AppMode::Admin {
            return None;
        }
        Some(vec![self.set_status("switch to admin mode to edit the inventory")])
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}
