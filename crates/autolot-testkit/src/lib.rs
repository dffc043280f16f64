// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use autolot_app::storage::LISTINGS_KEY;
use autolot_app::{
    BodyKind, FuelKind, Listing, ListingDraft, ListingId, ListingStatus, MemoryStorage, Site,
    Transmission,
};
use std::path::PathBuf;

const MAKES_AND_MODELS: [(&str, &[&str]); 8] = [
    ("Chevrolet", &["Silverado 1500", "Tahoe", "Malibu", "Equinox"]),
    ("Ford", &["F-150", "Explorer", "Mustang", "Escape"]),
    ("Toyota", &["Camry SE", "RAV4", "Tacoma", "Highlander"]),
    ("Honda", &["Civic", "Accord", "CR-V", "Pilot"]),
    ("Nissan", &["Altima", "Rogue", "Frontier"]),
    ("Ram", &["1500", "2500"]),
    ("GMC", &["Sierra", "Yukon", "Acadia"]),
    ("Jeep", &["Wrangler", "Grand Cherokee", "Compass"]),
];

const ENGINES: [&str; 8] = [
    "1.5L I4 Turbo",
    "2.0L I4",
    "2.5L I4",
    "2.7L V6 Turbo",
    "3.5L V6",
    "5.0L V8",
    "5.3L V8",
    "6.7L I6 Diesel",
];

const FEATURES: [&str; 10] = [
    "Backup camera",
    "Bluetooth",
    "Heated seats",
    "Leather interior",
    "Navigation",
    "Remote start",
    "Sunroof",
    "Tow package",
    "Third row",
    "Apple CarPlay",
];

const HIGHLIGHTS: [&str; 8] = [
    "one owner",
    "clean title",
    "new tires",
    "fresh oil change",
    "inspected and approved",
    "low miles",
    "dealer maintained",
    "financing available",
];

const QUERY_NOISE: [&str; 6] = ["tesla", "zz", "  ", "x9", "--", "civic accord"];

/// Seeded PCG-style generator; the same seed gives the same stream.
#[derive(Debug, Clone)]
pub struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    /// Uniform-ish value in `0..n`; zero when `n <= 1`.
    pub fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Reproducible vehicle fixtures. The same seed always yields the same
/// sequence of listings.
#[derive(Debug, Clone)]
pub struct LotFaker {
    rng: DeterministicRng,
    next_id: u64,
}

impl LotFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            next_id: 1_000,
        }
    }

    pub fn listing(&mut self) -> Listing {
        let id = ListingId::new(format!("fx-{}", self.next_id));
        self.next_id += 1;

        let draft = self.draft();
        Listing {
            id,
            make: draft.make.unwrap_or_default(),
            model: draft.model.unwrap_or_default(),
            year: draft.year.unwrap_or(2020),
            mileage: draft.mileage.unwrap_or(0),
            engine: draft.engine.unwrap_or_default(),
            transmission: draft.transmission.unwrap_or(Transmission::Automatic),
            fuel: draft.fuel.unwrap_or(FuelKind::Gasoline),
            body: draft.body.unwrap_or(BodyKind::Sedan),
            location: draft.location.unwrap_or(Site::Houston),
            price_cents: draft.price_cents.unwrap_or(0),
            down_payment_cents: draft.down_payment_cents.unwrap_or(0),
            description: draft.description.unwrap_or_default(),
            image_refs: draft.image_refs.unwrap_or_default(),
            features: draft.features.unwrap_or_default(),
            status: draft.status.unwrap_or(ListingStatus::Available),
        }
    }

    pub fn listings(&mut self, count: usize) -> Vec<Listing> {
        (0..count).map(|_| self.listing()).collect()
    }

    /// A fully populated draft with no id, ready to upsert as a new listing.
    pub fn draft(&mut self) -> ListingDraft {
        let (make, models) = MAKES_AND_MODELS[self.rng.int_n(MAKES_AND_MODELS.len())];
        let model = self.pick(models);
        let body = self.body_for(model);
        let price_cents = self.int_range_i64(120, 750) * 10_000;
        let down_payment_cents = (price_cents / 10 / 10_000).max(1) * 10_000;
        let image_count = self.rng.int_n(4);
        let year = 2015 + self.rng.int_n(11) as i32;

        ListingDraft {
            id: None,
            make: Some(make.to_owned()),
            model: Some(model.to_owned()),
            year: Some(year),
            mileage: Some((self.rng.int_n(120) as u32) * 1_000),
            engine: Some(self.pick(&ENGINES).to_owned()),
            transmission: Some(if self.rng.int_n(10) == 0 {
                Transmission::Manual
            } else {
                Transmission::Automatic
            }),
            fuel: Some(self.pick_copy(&FuelKind::ALL)),
            body: Some(body),
            location: Some(self.pick_copy(&Site::ALL)),
            price_cents: Some(price_cents),
            down_payment_cents: Some(down_payment_cents),
            description: Some(format!(
                "{year} {make} {model}, {} and {}.",
                self.pick(&HIGHLIGHTS),
                self.pick(&HIGHLIGHTS),
            )),
            image_refs: Some(
                (0..image_count)
                    .map(|index| format!("https://img.example.test/{make}-{model}-{index}.jpg"))
                    .map(|url| url.replace(' ', "-").to_ascii_lowercase())
                    .collect(),
            ),
            features: Some(self.features()),
            status: Some(self.pick_copy(&ListingStatus::ALL)),
        }
    }

    /// A search string the way people type them: a slice of a known make or
    /// model in random case, sometimes padded with spaces, sometimes empty or
    /// unrelated.
    pub fn query(&mut self) -> String {
        match self.rng.int_n(10) {
            0 => return String::new(),
            1 => return self.pick(&QUERY_NOISE).to_owned(),
            _ => {}
        }

        let (make, models) = MAKES_AND_MODELS[self.rng.int_n(MAKES_AND_MODELS.len())];
        let source = if self.rng.int_n(2) == 0 {
            make
        } else {
            self.pick(models)
        };
        let chars = source.chars().collect::<Vec<_>>();
        let start = self.rng.int_n(chars.len());
        let len = 1 + self.rng.int_n(chars.len() - start);
        let mut query = chars[start..start + len]
            .iter()
            .map(|ch| {
                if self.rng.int_n(2) == 0 {
                    ch.to_ascii_uppercase()
                } else {
                    ch.to_ascii_lowercase()
                }
            })
            .collect::<String>();

        if self.rng.int_n(4) == 0 {
            query.insert(0, ' ');
        }
        if self.rng.int_n(4) == 0 {
            query.push(' ');
        }
        query
    }

    /// An index in `0..len` from the faker's stream; zero when `len <= 1`.
    pub fn index(&mut self, len: usize) -> usize {
        self.rng.int_n(len)
    }

    fn features(&mut self) -> Vec<String> {
        let count = self.rng.int_n(4);
        let mut picked = Vec::with_capacity(count);
        for _ in 0..count {
            let feature = self.pick(&FEATURES).to_owned();
            if !picked.contains(&feature) {
                picked.push(feature);
            }
        }
        picked
    }

    fn body_for(&mut self, model: &str) -> BodyKind {
        const TRUCKS: [&str; 7] = [
            "Silverado 1500",
            "F-150",
            "Tacoma",
            "Frontier",
            "1500",
            "2500",
            "Sierra",
        ];
        const SEDANS: [&str; 6] = ["Malibu", "Mustang", "Camry SE", "Civic", "Accord", "Altima"];
        if TRUCKS.contains(&model) {
            BodyKind::Truck
        } else if SEDANS.contains(&model) {
            BodyKind::Sedan
        } else {
            BodyKind::Suv
        }
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn pick_copy<T: Copy>(&mut self, items: &[T]) -> T {
        items[self.rng.int_n(items.len())]
    }

    fn int_range_i64(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }
}

/// In-memory storage pre-populated with the given listings, as if a
/// previous session had saved them.
pub fn storage_with_listings(listings: &[Listing]) -> Result<MemoryStorage> {
    let encoded = serde_json::to_string(listings).context("encode fixture listings")?;
    Ok(MemoryStorage::with_entry(LISTINGS_KEY, &encoded))
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("autolot.db");
    Ok((dir, db_path))
}

pub fn temp_config_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let config_path = dir.path().join("config.toml");
    Ok((dir, config_path))
}

#[cfg(test)]
mod tests {
    use super::{DeterministicRng, LotFaker, storage_with_listings};
    use autolot_app::{Inventory, ListingStatus};
    use std::collections::BTreeSet;

    #[test]
    fn same_seed_same_listings() {
        let mut left = LotFaker::new(42);
        let mut right = LotFaker::new(42);
        assert_eq!(left.listings(5), right.listings(5));
    }

    #[test]
    fn listings_have_unique_ids_and_names() {
        let mut faker = LotFaker::new(7);
        let listings = faker.listings(20);
        let ids = listings
            .iter()
            .map(|listing| listing.id.clone())
            .collect::<BTreeSet<_>>();
        assert_eq!(ids.len(), 20);
        for listing in &listings {
            assert!(!listing.make.is_empty());
            assert!(!listing.model.is_empty());
            assert!(listing.down_payment_cents <= listing.price_cents);
            assert!((2015..=2025).contains(&listing.year));
        }
    }

    #[test]
    fn draft_is_valid_for_insert() {
        let mut faker = LotFaker::new(3);
        let draft = faker.draft();
        assert!(draft.id.is_none());
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn features_are_unique() {
        let mut faker = LotFaker::new(11);
        for _ in 0..50 {
            let listing = faker.listing();
            let unique = listing.features.iter().collect::<BTreeSet<_>>();
            assert_eq!(unique.len(), listing.features.len());
        }
    }

    #[test]
    fn statuses_vary_across_a_batch() {
        let mut faker = LotFaker::new(5);
        let statuses = faker
            .listings(40)
            .iter()
            .map(|listing| listing.status.as_str())
            .collect::<BTreeSet<_>>();
        assert!(statuses.contains(ListingStatus::Available.as_str()));
        assert!(statuses.len() > 1);
    }

    #[test]
    fn seeded_storage_loads_fixture_listings() -> anyhow::Result<()> {
        let mut faker = LotFaker::new(9);
        let listings = faker.listings(4);
        let inventory = Inventory::load(storage_with_listings(&listings)?);
        assert_eq!(inventory.list(), listings.as_slice());
        Ok(())
    }

    #[test]
    fn rng_is_reproducible_and_bounded() {
        let mut left = DeterministicRng::new(99);
        let mut right = DeterministicRng::new(99);
        for _ in 0..100 {
            assert_eq!(left.next_u64(), right.next_u64());
            assert!(left.int_n(7) < 7);
            right.int_n(7);
        }
        assert_eq!(left.int_n(1), 0);
        assert_eq!(left.int_n(0), 0);
    }

    #[test]
    fn queries_mix_case_and_padding() {
        let mut faker = LotFaker::new(21);
        let queries = (0..200).map(|_| faker.query()).collect::<Vec<_>>();
        assert!(queries.iter().any(String::is_empty));
        assert!(queries.iter().any(|query| query.starts_with(' ')));
        assert!(queries.iter().any(|query| query.ends_with(' ')));
        assert!(
            queries
                .iter()
                .any(|query| query.chars().any(|ch| ch.is_ascii_uppercase()))
        );
    }
}
