// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use std::collections::BTreeSet;
use time::OffsetDateTime;

use crate::storage::{LISTINGS_KEY, load_messaging_config, save_messaging_config};
use crate::{
    BodyKind, DurableStorage, FuelKind, Listing, ListingDraft, ListingId, ListingStatus,
    MessagingConfig, Site, Transmission, normalize_destination,
};

/// The catalog every view reads from. Mutations write the whole collection
/// through to storage before they become visible in memory.
#[derive(Debug)]
pub struct Inventory<S> {
    storage: S,
    listings: Vec<Listing>,
    messaging: MessagingConfig,
}

impl<S: DurableStorage> Inventory<S> {
    pub fn load(storage: S) -> Self {
        Self::load_with_messaging_default(storage, MessagingConfig::default())
    }

    /// Never fails: absent, unreadable, or corrupt data falls back to the
    /// seed collection and the given messaging default.
    pub fn load_with_messaging_default(storage: S, messaging_default: MessagingConfig) -> Self {
        let listings = match storage.load(LISTINGS_KEY) {
            Ok(Some(raw)) => decode_collection(&raw).unwrap_or_else(|| {
                tracing::warn!("stored inventory is corrupt; using seed listings");
                seed_listings()
            }),
            Ok(None) => {
                tracing::info!("no stored inventory; using seed listings");
                seed_listings()
            }
            Err(error) => {
                tracing::warn!(error = ?error, "inventory storage unreadable; using seed listings");
                seed_listings()
            }
        };
        let messaging = load_messaging_config(&storage).unwrap_or(messaging_default);
        tracing::debug!(count = listings.len(), "inventory loaded");

        Self {
            storage,
            listings,
            messaging,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn list(&self) -> &[Listing] {
        &self.listings
    }

    pub fn filter(&self, query: &str) -> Vec<&Listing> {
        self.listings
            .iter()
            .filter(|listing| listing.matches_query(query))
            .collect()
    }

    pub fn get(&self, id: &ListingId) -> Option<&Listing> {
        self.listings.iter().find(|listing| &listing.id == id)
    }

    /// Merges into an existing listing when the draft's id is known,
    /// otherwise creates a new listing at the front of the collection.
    pub fn upsert(&mut self, draft: &ListingDraft) -> Result<ListingId> {
        let existing = draft
            .id
            .as_ref()
            .and_then(|id| self.listings.iter().position(|listing| &listing.id == id));

        let mut next = self.listings.clone();
        let id = match existing {
            Some(index) => {
                let mut merged = next[index].clone();
                draft.merge_into(&mut merged);
                validate_listing(&merged)?;
                let id = merged.id.clone();
                next[index] = merged;
                id
            }
            None => {
                let now_millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
                let id = ListingId::fresh(now_millis, |candidate| {
                    self.listings.iter().any(|listing| &listing.id == candidate)
                });
                let listing = draft.to_new_listing(id.clone())?;
                validate_listing(&listing)?;
                next.insert(0, listing);
                id
            }
        };

        self.persist(&next)?;
        self.listings = next;
        tracing::info!(
            listing = %id,
            created = existing.is_none(),
            "listing saved"
        );
        Ok(id)
    }

    /// Returns the removed listing, or `None` when nothing had that id.
    pub fn remove(&mut self, id: &ListingId) -> Result<Option<Listing>> {
        let Some(index) = self.listings.iter().position(|listing| &listing.id == id) else {
            return Ok(None);
        };
        let mut next = self.listings.clone();
        let removed = next.remove(index);
        self.persist(&next)?;
        self.listings = next;
        tracing::info!(listing = %id, "listing removed");
        Ok(Some(removed))
    }

    pub fn messaging(&self) -> &MessagingConfig {
        &self.messaging
    }

    /// Rejects anything that is not a phone number; the stored value is
    /// left alone on error.
    pub fn set_messaging_destination(&mut self, destination: &str) -> Result<()> {
        let config = MessagingConfig {
            destination: normalize_destination(destination)?,
        };
        save_messaging_config(&self.storage, &config)?;
        self.messaging = config;
        Ok(())
    }

    fn persist(&self, listings: &[Listing]) -> Result<()> {
        let encoded = serde_json::to_string(listings).context("encode inventory")?;
        self.storage
            .save(LISTINGS_KEY, &encoded)
            .context("persist inventory -- the change was not saved")
    }
}

pub fn validate_listing(listing: &Listing) -> Result<()> {
    if listing.make.trim().is_empty() {
        bail!("make is required -- enter a make and retry");
    }
    if listing.model.trim().is_empty() {
        bail!("model is required -- enter a model and retry");
    }
    if listing.price_cents < 0 {
        bail!("price cannot be negative");
    }
    if listing.down_payment_cents < 0 {
        bail!("down payment cannot be negative");
    }
    Ok(())
}

fn decode_collection(raw: &str) -> Option<Vec<Listing>> {
    let decoded: Vec<Listing> = match serde_json::from_str(raw) {
        Ok(decoded) => decoded,
        Err(error) => {
            tracing::warn!(%error, "decode stored inventory");
            return None;
        }
    };

    let mut seen = BTreeSet::new();
    let mut listings = Vec::with_capacity(decoded.len());
    for listing in decoded {
        if validate_listing(&listing).is_err() {
            tracing::warn!(listing = %listing.id, "dropping stored listing without make/model");
            continue;
        }
        if !seen.insert(listing.id.clone()) {
            tracing::warn!(listing = %listing.id, "dropping stored listing with duplicate id");
            continue;
        }
        listings.push(listing);
    }
    Some(listings)
}

pub fn seed_listings() -> Vec<Listing> {
    vec![
        Listing {
            id: ListingId::from("1"),
            make: "Chevrolet".to_owned(),
            model: "Silverado 1500".to_owned(),
            year: 2022,
            mileage: 32_000,
            engine: "5.3L V8".to_owned(),
            transmission: Transmission::Automatic,
            fuel: FuelKind::Gasoline,
            body: BodyKind::Truck,
            location: Site::Houston,
            price_cents: 4_500_000,
            down_payment_cents: 350_000,
            description: "Inspected and approved. Full-size V8 pickup with a refined cabin, \
                          ready for job sites and family road trips alike."
                .to_owned(),
            image_refs: vec![
                concat!(
                    "https://images.unsplash.com/photo-1583121274602-3e2820c69888",
                    "?auto=format&fit=crop&q=80&w=1200"
                )
                .to_owned(),
                concat!(
                    "https://images.unsplash.com/photo-1552519507-da3b142c6e3d",
                    "?auto=format&fit=crop&q=80&w=1200"
                )
                .to_owned(),
            ],
            features: Vec::new(),
            status: ListingStatus::Available,
        },
        Listing {
            id: ListingId::from("2"),
            make: "Toyota".to_owned(),
            model: "Camry SE".to_owned(),
            year: 2023,
            mileage: 12_000,
            engine: "2.5L I4".to_owned(),
            transmission: Transmission::Automatic,
            fuel: FuelKind::Gasoline,
            body: BodyKind::Sedan,
            location: Site::Dallas,
            price_cents: 2_800_000,
            down_payment_cents: 130_000,
            description: "Reliable sport-tuned sedan with class-leading fuel economy. \
                          Inspected and approved for same-day delivery."
                .to_owned(),
            image_refs: vec![
                concat!(
                    "https://images.unsplash.com/photo-1621007947382-bb3c3994e3fb",
                    "?auto=format&fit=crop&q=80&w=1200"
                )
                .to_owned(),
                concat!(
                    "https://images.unsplash.com/photo-1619767886558-efdc259cde1a",
                    "?auto=format&fit=crop&q=80&w=1200"
                )
                .to_owned(),
            ],
            features: Vec::new(),
            status: ListingStatus::Available,
        },
    ]
}
