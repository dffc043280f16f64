// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use autolot_app::{Inventory, Listing, ListingId, MemoryStorage};
use autolot_testkit::{LotFaker, storage_with_listings};
use std::collections::BTreeSet;

fn ids(listings: &[&Listing]) -> Vec<ListingId> {
    listings.iter().map(|listing| listing.id.clone()).collect()
}

fn assert_unique_ids(inventory: &Inventory<MemoryStorage>) {
    let unique = inventory
        .list()
        .iter()
        .map(|listing| listing.id.clone())
        .collect::<BTreeSet<_>>();
    assert_eq!(unique.len(), inventory.list().len());
}

#[test]
fn filter_agrees_with_plain_substring_match() -> Result<()> {
    let mut faker = LotFaker::new(31);
    let listings = faker.listings(60);
    let inventory = Inventory::load(storage_with_listings(&listings)?);

    for _ in 0..300 {
        let query = faker.query();
        let needle = query.to_lowercase();
        let expected = inventory
            .list()
            .iter()
            .filter(|listing| {
                listing.make.to_lowercase().contains(&needle)
                    || listing.model.to_lowercase().contains(&needle)
            })
            .collect::<Vec<_>>();
        assert_eq!(
            ids(&inventory.filter(&query)),
            ids(&expected),
            "query {query:?}"
        );
    }
    Ok(())
}

#[test]
fn padded_queries_only_match_padded_names() -> Result<()> {
    let mut faker = LotFaker::new(8);
    let inventory = Inventory::load(storage_with_listings(&faker.listings(40))?);

    for query in ["1500 ", " tahoe", "camry ", " "] {
        for listing in inventory.filter(query) {
            let haystack = format!("{}\n{}", listing.make, listing.model).to_lowercase();
            assert!(haystack.contains(query), "{query:?} matched {}", listing.title());
        }
    }
    Ok(())
}

#[test]
fn ids_stay_unique_across_random_mutations() -> Result<()> {
    let mut faker = LotFaker::new(47);
    let mut inventory = Inventory::load(storage_with_listings(&faker.listings(10))?);
    assert_unique_ids(&inventory);

    for step in 0..200 {
        let before = inventory.list().len();
        match faker.index(4) {
            0 => {
                let id = inventory.upsert(&faker.draft())?;
                assert_eq!(inventory.list().len(), before + 1);
                assert_eq!(inventory.list()[0].id, id);
            }
            1 if before > 0 => {
                let target = inventory.list()[faker.index(before)].id.clone();
                let mut draft = faker.draft();
                draft.id = Some(target.clone());
                let id = inventory.upsert(&draft)?;
                assert_eq!(id, target);
                assert_eq!(inventory.list().len(), before);
            }
            2 => {
                let mut draft = faker.draft();
                draft.id = Some(ListingId::new(format!("gone-{step}")));
                let id = inventory.upsert(&draft)?;
                assert_ne!(id.as_str(), format!("gone-{step}"));
                assert_eq!(inventory.list().len(), before + 1);
            }
            _ if before > 0 => {
                let target = inventory.list()[faker.index(before)].id.clone();
                let removed = inventory.remove(&target)?;
                assert_eq!(removed.map(|listing| listing.id), Some(target));
                assert_eq!(inventory.list().len(), before - 1);
            }
            _ => {}
        }
        assert_unique_ids(&inventory);
    }
    Ok(())
}
