// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use autolot_app::{HandoffPayload, format_dollars};
use std::process::Command;
use url::Url;
use url::form_urlencoded;

const MESSAGING_BASE_URL: &str = "https://wa.me/";

/// The lead message the customer sends to the lot.
pub fn build_message(payload: &HandoffPayload) -> String {
    format!(
        "*APPOINTMENT REQUEST: INVENTORY APPROVED*\n\n\
         Unit: *{} {} {}*\n\
         Site: *{}*\n\
         Down payment: *{}*\n\n\
         *Please confirm whether I can come by today.*",
        payload.make,
        payload.model,
        payload.year,
        payload.chosen_location.label(),
        format_dollars(payload.down_payment_cents),
    )
}

/// Deep link that opens a chat with `destination` prefilled with the lead
/// message. Anything but digits is dropped from the destination.
pub fn build_link(destination: &str, payload: &HandoffPayload) -> Result<Url> {
    let digits: String = destination
        .chars()
        .filter(char::is_ascii_digit)
        .collect();
    if digits.is_empty() {
        bail!(
            "messaging destination {destination:?} has no digits -- \
             set it in admin mode or [messaging] destination"
        );
    }

    // form encoding writes spaces as `+`; literal pluses are already `%2B`
    let text: String = form_urlencoded::byte_serialize(build_message(payload).as_bytes())
        .collect::<String>()
        .replace('+', "%20");
    let mut link = Url::parse(MESSAGING_BASE_URL)
        .context("parse messaging base url")?
        .join(&digits)
        .context("build messaging link")?;
    link.set_query(Some(&format!("text={text}")));
    Ok(link)
}

/// Hands the link to the desktop's default handler.
pub fn open_link(link: &Url) -> Result<()> {
    let mut command = opener_command(link.as_str());
    let status = command
        .status()
        .with_context(|| format!("launch {:?}", command.get_program()))?;
    if !status.success() {
        bail!("{:?} exited with {status}", command.get_program());
    }
    Ok(())
}

#[cfg(target_os = "macos")]
fn opener_command(target: &str) -> Command {
    let mut command = Command::new("open");
    command.arg(target);
    command
}

#[cfg(target_os = "windows")]
fn opener_command(target: &str) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", "start", "", target]);
    command
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn opener_command(target: &str) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(target);
    command
}
