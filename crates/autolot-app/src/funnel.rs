// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};

use crate::{DurableStorage, HandoffPayload, Inventory, Listing, ListingId, Site};

/// Two-step appointment flow. Step two is only reachable after the down
/// payment was confirmed; closing discards everything.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Funnel {
    #[default]
    Closed,
    ConfirmDownPayment {
        listing: ListingId,
    },
    ChooseLocation {
        listing: ListingId,
    },
}

impl Funnel {
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }

    pub fn listing(&self) -> Option<&ListingId> {
        match self {
            Self::Closed => None,
            Self::ConfirmDownPayment { listing } | Self::ChooseLocation { listing } => {
                Some(listing)
            }
        }
    }

    /// Starts (or restarts) at the down payment step.
    pub fn open(&mut self, listing: Option<&Listing>) -> Result<()> {
        let Some(listing) = listing else {
            bail!("no listing selected -- open a vehicle before booking an appointment");
        };
        *self = Self::ConfirmDownPayment {
            listing: listing.id.clone(),
        };
        Ok(())
    }

    pub fn confirm(&mut self) {
        if let Self::ConfirmDownPayment { listing } = self {
            *self = Self::ChooseLocation {
                listing: listing.clone(),
            };
        }
    }

    /// Finishes the flow. The payload reads the listing as it is now, so
    /// edits made while the funnel was open are reflected; a listing that
    /// disappeared closes the funnel with nothing to hand off.
    pub fn choose_location<S: DurableStorage>(
        &mut self,
        site: Site,
        inventory: &Inventory<S>,
    ) -> Option<HandoffPayload> {
        let Self::ChooseLocation { listing } = self else {
            return None;
        };
        let payload = inventory.get(listing).map(|listing| HandoffPayload {
            make: listing.make.clone(),
            model: listing.model.clone(),
            year: listing.year,
            chosen_location: site,
            down_payment_cents: listing.down_payment_cents,
        });
        if payload.is_none() {
            tracing::warn!(listing = %listing, "listing vanished before hand-off");
        }
        *self = Self::Closed;
        payload
    }

    pub fn cancel(&mut self) {
        *self = Self::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::Funnel;
    use crate::{
        FieldUpdate, HandoffPayload, Inventory, ListingDraft, ListingId, MemoryStorage, Site,
    };
    use anyhow::Result;

    #[test]
    fn happy_path_emits_payload_from_store() -> Result<()> {
        let inventory = Inventory::load(MemoryStorage::new());
        let camry = inventory.get(&ListingId::from("2")).cloned();
        let mut funnel = Funnel::default();

        funnel.open(camry.as_ref())?;
        funnel.confirm();
        let payload = funnel.choose_location(Site::Dallas, &inventory);

        assert_eq!(
            payload,
            Some(HandoffPayload {
                make: "Toyota".to_owned(),
                model: "Camry SE".to_owned(),
                year: 2023,
                chosen_location: Site::Dallas,
                down_payment_cents: 130_000,
            })
        );
        assert_eq!(funnel, Funnel::Closed);
        Ok(())
    }

    #[test]
    fn choose_location_requires_confirmation() -> Result<()> {
        let inventory = Inventory::load(MemoryStorage::new());
        let listing = inventory.list()[0].clone();
        let mut funnel = Funnel::default();

        assert_eq!(funnel.choose_location(Site::Houston, &inventory), None);
        funnel.open(Some(&listing))?;
        assert_eq!(funnel.choose_location(Site::Houston, &inventory), None);
        assert!(matches!(funnel, Funnel::ConfirmDownPayment { .. }));
        Ok(())
    }

    #[test]
    fn open_without_listing_is_rejected() {
        let mut funnel = Funnel::default();
        assert!(funnel.open(None).is_err());
        assert_eq!(funnel, Funnel::Closed);
    }

    #[test]
    fn cancel_discards_progress() -> Result<()> {
        let inventory = Inventory::load(MemoryStorage::new());
        let listing = inventory.list()[0].clone();
        let mut funnel = Funnel::default();

        funnel.open(Some(&listing))?;
        funnel.confirm();
        funnel.cancel();
        assert!(!funnel.is_open());

        funnel.open(Some(&listing))?;
        assert!(matches!(funnel, Funnel::ConfirmDownPayment { .. }));
        Ok(())
    }

    #[test]
    fn reopening_restarts_at_first_step() -> Result<()> {
        let inventory = Inventory::load(MemoryStorage::new());
        let first = inventory.list()[0].clone();
        let second = inventory.list()[1].clone();
        let mut funnel = Funnel::default();

        funnel.open(Some(&first))?;
        funnel.confirm();
        funnel.open(Some(&second))?;
        assert_eq!(
            funnel,
            Funnel::ConfirmDownPayment {
                listing: second.id.clone()
            }
        );
        Ok(())
    }

    #[test]
    fn confirm_outside_first_step_is_noop() {
        let mut funnel = Funnel::default();
        funnel.confirm();
        assert_eq!(funnel, Funnel::Closed);
    }

    #[test]
    fn payload_reflects_edits_made_while_open() -> Result<()> {
        let mut inventory = Inventory::load(MemoryStorage::new());
        let listing = inventory.get(&ListingId::from("1")).cloned();
        let mut funnel = Funnel::default();
        funnel.open(listing.as_ref())?;
        funnel.confirm();

        let mut draft = ListingDraft {
            id: Some(ListingId::from("1")),
            ..ListingDraft::default()
        };
        draft.apply(FieldUpdate::DownPaymentCents(200_000));
        inventory.upsert(&draft)?;

        let payload = funnel.choose_location(Site::Houston, &inventory);
        assert_eq!(payload.map(|p| p.down_payment_cents), Some(200_000));
        Ok(())
    }

    #[test]
    fn vanished_listing_closes_without_payload() -> Result<()> {
        let mut inventory = Inventory::load(MemoryStorage::new());
        let listing = inventory.list()[0].clone();
        let mut funnel = Funnel::default();
        funnel.open(Some(&listing))?;
        funnel.confirm();

        inventory.remove(&listing.id)?;
        assert_eq!(funnel.choose_location(Site::Dallas, &inventory), None);
        assert_eq!(funnel, Funnel::Closed);
        Ok(())
    }
}
