// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};

use crate::{
    BodyKind, DurableStorage, FuelKind, Inventory, Listing, ListingId, ListingStatus, Site,
    Transmission, format_dollars,
};

const DEFAULT_YEAR: i32 = 2024;
const DEFAULT_DOWN_PAYMENT_CENTS: i64 = 130_000;

/// A listing-shaped record where every field may be absent. Absent fields
/// are left untouched when the draft is merged into a stored listing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListingDraft {
    pub id: Option<ListingId>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub mileage: Option<u32>,
    pub engine: Option<String>,
    pub transmission: Option<Transmission>,
    pub fuel: Option<FuelKind>,
    pub body: Option<BodyKind>,
    pub location: Option<Site>,
    pub price_cents: Option<i64>,
    pub down_payment_cents: Option<i64>,
    pub description: Option<String>,
    pub image_refs: Option<Vec<String>>,
    pub features: Option<Vec<String>>,
    pub status: Option<ListingStatus>,
}

impl ListingDraft {
    pub fn with_defaults() -> Self {
        Self {
            id: None,
            make: Some(String::new()),
            model: Some(String::new()),
            year: Some(DEFAULT_YEAR),
            mileage: Some(0),
            engine: Some(String::new()),
            transmission: Some(Transmission::Automatic),
            fuel: Some(FuelKind::Gasoline),
            body: Some(BodyKind::Sedan),
            location: Some(Site::Houston),
            price_cents: Some(0),
            down_payment_cents: Some(DEFAULT_DOWN_PAYMENT_CENTS),
            description: Some(String::new()),
            image_refs: Some(Vec::new()),
            features: Some(Vec::new()),
            status: Some(ListingStatus::Available),
        }
    }

    pub fn from_listing(listing: &Listing) -> Self {
        Self {
            id: Some(listing.id.clone()),
            make: Some(listing.make.clone()),
            model: Some(listing.model.clone()),
            year: Some(listing.year),
            mileage: Some(listing.mileage),
            engine: Some(listing.engine.clone()),
            transmission: Some(listing.transmission),
            fuel: Some(listing.fuel),
            body: Some(listing.body),
            location: Some(listing.location),
            price_cents: Some(listing.price_cents),
            down_payment_cents: Some(listing.down_payment_cents),
            description: Some(listing.description.clone()),
            image_refs: Some(listing.image_refs.clone()),
            features: Some(listing.features.clone()),
            status: Some(listing.status),
        }
    }

    pub fn apply(&mut self, update: FieldUpdate) {
        match update {
            FieldUpdate::Make(value) => self.make = Some(value),
            FieldUpdate::Model(value) => self.model = Some(value),
            FieldUpdate::Year(value) => self.year = Some(value),
            FieldUpdate::Mileage(value) => self.mileage = Some(value),
            FieldUpdate::Engine(value) => self.engine = Some(value),
            FieldUpdate::Transmission(value) => self.transmission = Some(value),
            FieldUpdate::Fuel(value) => self.fuel = Some(value),
            FieldUpdate::Body(value) => self.body = Some(value),
            FieldUpdate::Location(value) => self.location = Some(value),
            FieldUpdate::PriceCents(value) => self.price_cents = Some(value),
            FieldUpdate::DownPaymentCents(value) => self.down_payment_cents = Some(value),
            FieldUpdate::Description(value) => self.description = Some(value),
            FieldUpdate::Status(value) => self.status = Some(value),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.make.as_deref().is_none_or(|make| make.trim().is_empty()) {
            bail!("make is required -- enter a make and retry");
        }
        if self
            .model
            .as_deref()
            .is_none_or(|model| model.trim().is_empty())
        {
            bail!("model is required -- enter a model and retry");
        }
        if let Some(price) = self.price_cents
            && price < 0
        {
            bail!("price cannot be negative");
        }
        if let Some(down_payment) = self.down_payment_cents
            && down_payment < 0
        {
            bail!("down payment cannot be negative");
        }
        Ok(())
    }

    /// Overwrites the fields this draft carries; the id never changes.
    pub fn merge_into(&self, listing: &mut Listing) {
        if let Some(make) = &self.make {
            listing.make = make.trim().to_owned();
        }
        if let Some(model) = &self.model {
            listing.model = model.trim().to_owned();
        }
        if let Some(year) = self.year {
            listing.year = year;
        }
        if let Some(mileage) = self.mileage {
            listing.mileage = mileage;
        }
        if let Some(engine) = &self.engine {
            listing.engine = engine.clone();
        }
        if let Some(transmission) = self.transmission {
            listing.transmission = transmission;
        }
        if let Some(fuel) = self.fuel {
            listing.fuel = fuel;
        }
        if let Some(body) = self.body {
            listing.body = body;
        }
        if let Some(location) = self.location {
            listing.location = location;
        }
        if let Some(price) = self.price_cents {
            listing.price_cents = price;
        }
        if let Some(down_payment) = self.down_payment_cents {
            listing.down_payment_cents = down_payment;
        }
        if let Some(description) = &self.description {
            listing.description = description.clone();
        }
        if let Some(image_refs) = &self.image_refs {
            listing.image_refs = image_refs.clone();
        }
        if let Some(features) = &self.features {
            listing.features = features.clone();
        }
        if let Some(status) = self.status {
            listing.status = status;
        }
    }

    /// Builds a brand-new listing, filling absent fields with the create
    /// defaults.
    pub fn to_new_listing(&self, id: ListingId) -> Result<Listing> {
        self.validate()?;
        let mut listing = Listing {
            id,
            make: String::new(),
            model: String::new(),
            year: DEFAULT_YEAR,
            mileage: 0,
            engine: String::new(),
            transmission: Transmission::Automatic,
            fuel: FuelKind::Gasoline,
            body: BodyKind::Sedan,
            location: Site::Houston,
            price_cents: 0,
            down_payment_cents: DEFAULT_DOWN_PAYMENT_CENTS,
            description: String::new(),
            image_refs: Vec::new(),
            features: Vec::new(),
            status: ListingStatus::Available,
        };
        self.merge_into(&mut listing);
        Ok(listing)
    }

    pub fn image_refs(&self) -> &[String] {
        self.image_refs.as_deref().unwrap_or(&[])
    }

    pub fn features(&self) -> &[String] {
        self.features.as_deref().unwrap_or(&[])
    }

    pub fn display_field(&self, field: DraftField) -> String {
        fn text(value: &Option<String>) -> String {
            value.clone().unwrap_or_default()
        }
        match field {
            DraftField::Make => text(&self.make),
            DraftField::Model => text(&self.model),
            DraftField::Year => self.year.map(|y| y.to_string()).unwrap_or_default(),
            DraftField::Mileage => self.mileage.map(|m| m.to_string()).unwrap_or_default(),
            DraftField::Engine => text(&self.engine),
            DraftField::Transmission => self
                .transmission
                .map(|t| t.as_str().to_owned())
                .unwrap_or_default(),
            DraftField::Fuel => self
                .fuel
                .map(|f| f.as_str().to_owned())
                .unwrap_or_default(),
            DraftField::Body => self
                .body
                .map(|b| b.as_str().to_owned())
                .unwrap_or_default(),
            DraftField::Location => self
                .location
                .map(|s| s.as_str().to_owned())
                .unwrap_or_default(),
            DraftField::Price => self.price_cents.map(format_dollars).unwrap_or_default(),
            DraftField::DownPayment => self
                .down_payment_cents
                .map(format_dollars)
                .unwrap_or_default(),
            DraftField::Description => text(&self.description),
            DraftField::Status => self
                .status
                .map(|s| s.as_str().to_owned())
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    Make(String),
    Model(String),
    Year(i32),
    Mileage(u32),
    Engine(String),
    Transmission(Transmission),
    Fuel(FuelKind),
    Body(BodyKind),
    Location(Site),
    PriceCents(i64),
    DownPaymentCents(i64),
    Description(String),
    Status(ListingStatus),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Make,
    Model,
    Year,
    Mileage,
    Engine,
    Transmission,
    Fuel,
    Body,
    Location,
    Price,
    DownPayment,
    Description,
    Status,
}

impl DraftField {
    pub const ALL: [Self; 13] = [
        Self::Make,
        Self::Model,
        Self::Year,
        Self::Mileage,
        Self::Engine,
        Self::Transmission,
        Self::Fuel,
        Self::Body,
        Self::Location,
        Self::Price,
        Self::DownPayment,
        Self::Description,
        Self::Status,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Make => "make",
            Self::Model => "model",
            Self::Year => "year",
            Self::Mileage => "mileage",
            Self::Engine => "engine",
            Self::Transmission => "transmission",
            Self::Fuel => "fuel",
            Self::Body => "body",
            Self::Location => "location",
            Self::Price => "price",
            Self::DownPayment => "down payment",
            Self::Description => "description",
            Self::Status => "status",
        }
    }

    /// Turns raw text from an input box into a typed update. Parse errors
    /// are returned so the draft is never left half-edited.
    pub fn parse_input(self, raw: &str) -> Result<FieldUpdate> {
        let trimmed = raw.trim();
        let lowered = trimmed.to_ascii_lowercase();
        let update = match self {
            Self::Make => FieldUpdate::Make(trimmed.to_owned()),
            Self::Model => FieldUpdate::Model(trimmed.to_owned()),
            Self::Year => FieldUpdate::Year(
                trimmed
                    .parse()
                    .with_context(|| format!("year {trimmed:?} is not a number"))?,
            ),
            Self::Mileage => FieldUpdate::Mileage(
                trimmed
                    .replace(',', "")
                    .parse()
                    .with_context(|| format!("mileage {trimmed:?} is not a whole number"))?,
            ),
            Self::Engine => FieldUpdate::Engine(trimmed.to_owned()),
            Self::Transmission => FieldUpdate::Transmission(
                Transmission::parse(&lowered)
                    .ok_or_else(|| anyhow!("transmission must be automatic or manual"))?,
            ),
            Self::Fuel => FieldUpdate::Fuel(FuelKind::parse(&lowered).ok_or_else(|| {
                anyhow!("fuel must be one of gasoline, diesel, electric, hybrid")
            })?),
            Self::Body => FieldUpdate::Body(
                BodyKind::parse(&lowered)
                    .ok_or_else(|| anyhow!("body must be one of sedan, suv, truck"))?,
            ),
            Self::Location => FieldUpdate::Location(
                Site::parse(&lowered)
                    .ok_or_else(|| anyhow!("location must be houston or dallas"))?,
            ),
            Self::Price => FieldUpdate::PriceCents(parse_dollars(trimmed)?),
            Self::DownPayment => FieldUpdate::DownPaymentCents(parse_dollars(trimmed)?),
            Self::Description => FieldUpdate::Description(raw.to_owned()),
            Self::Status => FieldUpdate::Status(ListingStatus::parse(&lowered).ok_or_else(
                || anyhow!("status must be one of available, sold, reserved"),
            )?),
        };
        Ok(update)
    }
}

/// Parses `1300`, `$1,300` or `1300.50` into cents.
pub fn parse_dollars(raw: &str) -> Result<i64> {
    let cleaned = raw.trim().trim_start_matches('$').replace(',', "");
    if cleaned.is_empty() {
        bail!("amount is empty -- enter a dollar amount like 1300 or 1,300.50");
    }
    if cleaned.starts_with('-') {
        bail!("amount {raw:?} is negative -- enter a positive dollar amount");
    }
    let (whole, fraction) = match cleaned.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (cleaned.as_str(), ""),
    };
    if fraction.len() > 2 || !fraction.chars().all(|ch| ch.is_ascii_digit()) {
        bail!("amount {raw:?} has invalid cents -- use at most two decimal digits");
    }
    let dollars: i64 = whole
        .parse()
        .with_context(|| format!("amount {raw:?} is not a dollar value"))?;
    let cents: i64 = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<i64>()? * 10,
        _ => fraction.parse()?,
    };
    dollars
        .checked_mul(100)
        .and_then(|value| value.checked_add(cents))
        .ok_or_else(|| anyhow!("amount {raw:?} is too large"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationKind {
    Image,
    Description,
}

impl GenerationKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Description => "description",
        }
    }
}

/// Snapshot of the draft fields a generative call needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub request_id: u64,
    pub kind: GenerationKind,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub location: Site,
    pub down_payment_cents: i64,
    pub mileage: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Succeeded(String),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationResolution {
    ImageAttached,
    DescriptionReplaced,
    Failed(String),
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    request_id: u64,
    kind: GenerationKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminEditor {
    draft: ListingDraft,
    in_flight: Option<InFlight>,
    last_error: Option<String>,
}

impl AdminEditor {
    pub fn start_create() -> Self {
        Self {
            draft: ListingDraft::with_defaults(),
            in_flight: None,
            last_error: None,
        }
    }

    pub fn start_edit(listing: &Listing) -> Self {
        Self {
            draft: ListingDraft::from_listing(listing),
            in_flight: None,
            last_error: None,
        }
    }

    pub fn draft(&self) -> &ListingDraft {
        &self.draft
    }

    pub fn is_edit(&self) -> bool {
        self.draft.id.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn update_field(&mut self, update: FieldUpdate) {
        self.draft.apply(update);
    }

    pub fn attach_image(&mut self, reference: impl Into<String>) {
        let reference = reference.into();
        if reference.trim().is_empty() {
            return;
        }
        self.draft
            .image_refs
            .get_or_insert_with(Vec::new)
            .push(reference);
    }

    pub fn remove_image(&mut self, position: usize) -> bool {
        match self.draft.image_refs.as_mut() {
            Some(images) if position < images.len() => {
                images.remove(position);
                true
            }
            _ => false,
        }
    }

    pub fn add_feature(&mut self, tag: &str) {
        let tag = tag.trim();
        if tag.is_empty() {
            return;
        }
        let features = self.draft.features.get_or_insert_with(Vec::new);
        if !features.iter().any(|existing| existing == tag) {
            features.push(tag.to_owned());
        }
    }

    pub fn remove_feature(&mut self, position: usize) -> bool {
        match self.draft.features.as_mut() {
            Some(features) if position < features.len() => {
                features.remove(position);
                true
            }
            _ => false,
        }
    }

    /// Validates and upserts the draft. On failure the draft is kept as-is
    /// and the message is remembered for display.
    pub fn commit<S: DurableStorage>(&mut self, inventory: &mut Inventory<S>) -> Result<ListingId> {
        let result = self
            .draft
            .validate()
            .and_then(|()| inventory.upsert(&self.draft));
        match &result {
            Ok(_) => self.last_error = None,
            Err(error) => self.last_error = Some(error.to_string()),
        }
        result
    }

    pub fn generation_in_flight(&self) -> Option<GenerationKind> {
        self.in_flight.map(|in_flight| in_flight.kind)
    }

    pub fn begin_generation(
        &mut self,
        kind: GenerationKind,
        request_id: u64,
    ) -> Result<GenerationRequest> {
        if let Some(in_flight) = self.in_flight {
            bail!(
                "{} generation already running -- wait for it to finish",
                in_flight.kind.label()
            );
        }
        let make = self.draft.make.clone().unwrap_or_default();
        let model = self.draft.model.clone().unwrap_or_default();
        if make.trim().is_empty() || model.trim().is_empty() {
            bail!("make and model are required before generating an {}", kind.label());
        }

        self.in_flight = Some(InFlight { request_id, kind });
        self.last_error = None;
        Ok(GenerationRequest {
            request_id,
            kind,
            make: make.trim().to_owned(),
            model: model.trim().to_owned(),
            year: self.draft.year.unwrap_or(DEFAULT_YEAR),
            location: self.draft.location.unwrap_or(Site::Houston),
            down_payment_cents: self
                .draft
                .down_payment_cents
                .unwrap_or(DEFAULT_DOWN_PAYMENT_CENTS),
            mileage: self.draft.mileage.unwrap_or(0),
        })
    }

    pub fn finish_generation(
        &mut self,
        request_id: u64,
        outcome: GenerationOutcome,
    ) -> GenerationResolution {
        let Some(in_flight) = self.in_flight else {
            return GenerationResolution::Stale;
        };
        if in_flight.request_id != request_id {
            return GenerationResolution::Stale;
        }
        self.in_flight = None;

        match outcome {
            GenerationOutcome::Succeeded(content) => match in_flight.kind {
                GenerationKind::Image => {
                    self.attach_image(content);
                    GenerationResolution::ImageAttached
                }
                GenerationKind::Description => {
                    self.draft.description = Some(content);
                    GenerationResolution::DescriptionReplaced
                }
            },
            GenerationOutcome::Failed(message) => {
                self.last_error = Some(message.clone());
                GenerationResolution::Failed(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AdminEditor, DraftField, FieldUpdate, GenerationKind, GenerationOutcome,
        GenerationResolution, ListingDraft, parse_dollars,
    };
    use crate::{Inventory, ListingStatus, MemoryStorage, Site};
    use anyhow::Result;

    fn editor_with_names(make: &str, model: &str) -> AdminEditor {
        let mut editor = AdminEditor::start_create();
        editor.update_field(FieldUpdate::Make(make.to_owned()));
        editor.update_field(FieldUpdate::Model(model.to_owned()));
        editor
    }

    #[test]
    fn start_create_seeds_defaults_without_id() {
        let editor = AdminEditor::start_create();
        let draft = editor.draft();
        assert_eq!(draft.id, None);
        assert_eq!(draft.location, Some(Site::Houston));
        assert_eq!(draft.down_payment_cents, Some(130_000));
        assert_eq!(draft.status, Some(ListingStatus::Available));
        assert!(!editor.is_edit());
    }

    #[test]
    fn commit_rejects_missing_model_and_keeps_draft() {
        let mut inventory = Inventory::load(MemoryStorage::new());
        let before = inventory.list().len();
        let mut editor = editor_with_names("Honda", "  ");

        let error = editor
            .commit(&mut inventory)
            .expect_err("missing model should fail");
        assert!(error.to_string().contains("model is required"));
        assert_eq!(editor.draft().make.as_deref(), Some("Honda"));
        assert_eq!(editor.last_error(), Some(error.to_string().as_str()));
        assert_eq!(inventory.list().len(), before);
    }

    #[test]
    fn commit_inserts_new_listing() -> Result<()> {
        let mut inventory = Inventory::load(MemoryStorage::new());
        let mut editor = editor_with_names("Honda", "Civic");
        let id = editor.commit(&mut inventory)?;
        let stored = inventory.get(&id).expect("committed listing");
        assert_eq!(stored.title(), "Honda Civic");
        assert_eq!(editor.last_error(), None);
        Ok(())
    }

    #[test]
    fn parse_input_rejects_bad_values() {
        assert!(DraftField::Year.parse_input("twenty").is_err());
        assert!(DraftField::Location.parse_input("austin").is_err());
        assert_eq!(
            DraftField::Location.parse_input(" Dallas ").ok(),
            Some(FieldUpdate::Location(Site::Dallas))
        );
        assert_eq!(
            DraftField::DownPayment.parse_input("$1,300").ok(),
            Some(FieldUpdate::DownPaymentCents(130_000))
        );
    }

    #[test]
    fn parse_dollars_handles_cents() -> Result<()> {
        assert_eq!(parse_dollars("1300")?, 130_000);
        assert_eq!(parse_dollars("1,300.5")?, 130_050);
        assert_eq!(parse_dollars("$0.07")?, 7);
        assert!(parse_dollars("12.345").is_err());
        assert!(parse_dollars("").is_err());
        Ok(())
    }

    #[test]
    fn parse_dollars_rejects_negative_amounts() {
        for raw in ["-0.50", "-5", " -1,300", "$-20", "-$20"] {
            let error = parse_dollars(raw).expect_err("negative amount should fail");
            assert!(error.to_string().contains("is negative"));
        }
    }

    #[test]
    fn image_attach_and_remove_by_position() {
        let mut editor = AdminEditor::start_create();
        editor.attach_image("a");
        editor.attach_image("b");
        editor.attach_image("c");
        assert!(editor.remove_image(1));
        assert!(!editor.remove_image(5));
        assert_eq!(editor.draft().image_refs(), ["a".to_owned(), "c".to_owned()]);
    }

    #[test]
    fn features_are_deduplicated() {
        let mut editor = AdminEditor::start_create();
        editor.add_feature("Backup camera");
        editor.add_feature("Backup camera");
        editor.add_feature(" ");
        assert_eq!(editor.draft().features(), ["Backup camera".to_owned()]);
        assert!(editor.remove_feature(0));
        assert!(editor.draft().features().is_empty());
    }

    #[test]
    fn generation_requires_make_and_model() {
        let mut editor = AdminEditor::start_create();
        let error = editor
            .begin_generation(GenerationKind::Image, 1)
            .expect_err("blank draft should not generate");
        assert!(error.to_string().contains("make and model are required"));
        assert_eq!(editor.generation_in_flight(), None);
    }

    #[test]
    fn only_one_generation_in_flight() -> Result<()> {
        let mut editor = editor_with_names("Ford", "F-150");
        let request = editor.begin_generation(GenerationKind::Image, 7)?;
        assert_eq!(request.make, "Ford");
        assert_eq!(editor.generation_in_flight(), Some(GenerationKind::Image));
        assert!(
            editor
                .begin_generation(GenerationKind::Description, 8)
                .is_err()
        );

        let resolution = editor.finish_generation(
            7,
            GenerationOutcome::Succeeded("data:image/png;base64,AA".to_owned()),
        );
        assert_eq!(resolution, GenerationResolution::ImageAttached);
        assert_eq!(editor.generation_in_flight(), None);
        assert_eq!(editor.draft().image_refs().len(), 1);
        Ok(())
    }

    #[test]
    fn stale_or_failed_generation_leaves_draft_untouched() -> Result<()> {
        let mut editor = editor_with_names("Ford", "F-150");
        let snapshot = editor.draft().clone();
        editor.begin_generation(GenerationKind::Description, 3)?;

        assert_eq!(
            editor.finish_generation(2, GenerationOutcome::Succeeded("old".to_owned())),
            GenerationResolution::Stale
        );
        assert_eq!(
            editor.generation_in_flight(),
            Some(GenerationKind::Description)
        );

        let resolution =
            editor.finish_generation(3, GenerationOutcome::Failed("quota exceeded".to_owned()));
        assert_eq!(
            resolution,
            GenerationResolution::Failed("quota exceeded".to_owned())
        );
        assert_eq!(editor.draft(), &snapshot);
        assert_eq!(editor.generation_in_flight(), None);
        Ok(())
    }

    #[test]
    fn description_generation_replaces_text() -> Result<()> {
        let mut editor = editor_with_names("Toyota", "Camry");
        editor.begin_generation(GenerationKind::Description, 1)?;
        editor.finish_generation(1, GenerationOutcome::Succeeded("Clean and ready.".to_owned()));
        assert_eq!(
            editor.draft().description.as_deref(),
            Some("Clean and ready.")
        );
        Ok(())
    }

    #[test]
    fn empty_draft_merge_preserves_listing() {
        let inventory = Inventory::load(MemoryStorage::new());
        let original = inventory.list()[0].clone();
        let mut merged = original.clone();
        ListingDraft::default().merge_into(&mut merged);
        assert_eq!(merged, original);
    }
}
