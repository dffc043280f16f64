// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::ids::*;

pub const DEFAULT_MESSAGING_DESTINATION: &str = "12815555555";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transmission {
    Automatic,
    Manual,
}

impl Transmission {
    pub const ALL: [Self; 2] = [Self::Automatic, Self::Manual];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Automatic => "automatic",
            Self::Manual => "manual",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "automatic" => Some(Self::Automatic),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelKind {
    Gasoline,
    Diesel,
    Electric,
    Hybrid,
}

impl FuelKind {
    pub const ALL: [Self; 4] = [Self::Gasoline, Self::Diesel, Self::Electric, Self::Hybrid];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gasoline => "gasoline",
            Self::Diesel => "diesel",
            Self::Electric => "electric",
            Self::Hybrid => "hybrid",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "gasoline" => Some(Self::Gasoline),
            "diesel" => Some(Self::Diesel),
            "electric" => Some(Self::Electric),
            "hybrid" => Some(Self::Hybrid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    Sedan,
    Suv,
    Truck,
}

impl BodyKind {
    pub const ALL: [Self; 3] = [Self::Sedan, Self::Suv, Self::Truck];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sedan => "sedan",
            Self::Suv => "suv",
            Self::Truck => "truck",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "sedan" => Some(Self::Sedan),
            "suv" => Some(Self::Suv),
            "truck" => Some(Self::Truck),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Sedan => "Sedan",
            Self::Suv => "SUV",
            Self::Truck => "Truck",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Site {
    Houston,
    Dallas,
}

impl Site {
    pub const ALL: [Self; 2] = [Self::Houston, Self::Dallas];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Houston => "houston",
            Self::Dallas => "dallas",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "houston" => Some(Self::Houston),
            "dallas" => Some(Self::Dallas),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Houston => "Houston",
            Self::Dallas => "Dallas",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Available,
    Sold,
    Reserved,
}

impl ListingStatus {
    pub const ALL: [Self; 3] = [Self::Available, Self::Sold, Self::Reserved];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Sold => "sold",
            Self::Reserved => "reserved",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "available" => Some(Self::Available),
            "sold" => Some(Self::Sold),
            "reserved" => Some(Self::Reserved),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppMode {
    Client,
    Admin,
}

impl AppMode {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub mileage: u32,
    pub engine: String,
    pub transmission: Transmission,
    pub fuel: FuelKind,
    pub body: BodyKind,
    pub location: Site,
    pub price_cents: i64,
    pub down_payment_cents: i64,
    pub description: String,
    #[serde(default)]
    pub image_refs: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    pub status: ListingStatus,
}

impl Listing {
    pub fn title(&self) -> String {
        format!("{} {}", self.make, self.model)
    }

    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.make.to_lowercase().contains(&needle) || self.model.to_lowercase().contains(&needle)
    }
}

/// Everything the messaging collaborator needs to compose a lead message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffPayload {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub chosen_location: Site,
    pub down_payment_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagingConfig {
    pub destination: String,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            destination: DEFAULT_MESSAGING_DESTINATION.to_owned(),
        }
    }
}

/// Strips `+`, spaces, and dashes from a phone number and requires what is
/// left to be digits.
pub fn normalize_destination(raw: &str) -> Result<String> {
    let stripped: String = raw
        .chars()
        .filter(|ch| !matches!(ch, '+' | ' ' | '-'))
        .collect();
    if stripped.is_empty() {
        bail!("messaging destination is empty -- set a phone number with country code");
    }
    if !stripped.chars().all(|ch| ch.is_ascii_digit()) {
        bail!(
            "messaging destination {raw:?} must be a phone number -- \
             use digits with country code, like 12815555555"
        );
    }
    Ok(stripped)
}

/// Writes `value` with a comma between each group of three digits.
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Formats cents as dollars with thousands separators; cents are shown only
/// when non-zero so the amount is never rounded.
pub fn format_dollars(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let magnitude = cents.unsigned_abs();
    let dollars = magnitude / 100;
    let remainder = magnitude % 100;

    let grouped = group_thousands(dollars);

    if remainder == 0 {
        format!("{sign}${grouped}")
    } else {
        format!("{sign}${grouped}.{remainder:02}")
    }
}
