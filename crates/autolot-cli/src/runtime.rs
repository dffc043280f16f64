// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::handoff;
use anyhow::{Context, Result, anyhow, bail};
use autolot_app::{
    DurableStorage, GenerationKind, GenerationOutcome, GenerationRequest, HandoffPayload,
    Inventory, format_dollars,
};
use autolot_llm::{DescriptionRequest, ImageRequest};
use autolot_tui::{HandoffOutcome, InternalEvent};
use std::path::Path;
use std::sync::mpsc::Sender;
use std::thread;
use url::Url;

type Opener = Box<dyn FnMut(&Url) -> Result<()>>;

pub struct CliRuntime<S: DurableStorage> {
    inventory: Inventory<S>,
    llm_client: Option<autolot_llm::Client>,
    opener: Opener,
}

impl<S: DurableStorage> CliRuntime<S> {
    pub fn new(inventory: Inventory<S>, llm_client: Option<autolot_llm::Client>) -> Self {
        Self::with_opener(inventory, llm_client, Box::new(handoff::open_link))
    }

    pub fn with_opener(
        inventory: Inventory<S>,
        llm_client: Option<autolot_llm::Client>,
        opener: Opener,
    ) -> Self {
        Self {
            inventory,
            llm_client,
            opener,
        }
    }
}

impl<S: DurableStorage> autolot_tui::AppRuntime for CliRuntime<S> {
    type Storage = S;

    fn inventory(&mut self) -> &mut Inventory<S> {
        &mut self.inventory
    }

    fn hand_off(&mut self, payload: &HandoffPayload, destination: &str) -> Result<HandoffOutcome> {
        let link = handoff::build_link(destination, payload)?;
        tracing::info!(
            make = %payload.make,
            model = %payload.model,
            site = payload.chosen_location.as_str(),
            "handing appointment off to messaging"
        );
        match (self.opener)(&link) {
            Ok(()) => Ok(HandoffOutcome::Opened {
                link: link.to_string(),
            }),
            Err(error) => {
                let reason = format!("{error:#}");
                tracing::warn!(%reason, "could not open messaging link");
                Ok(HandoffOutcome::NotOpened {
                    link: link.to_string(),
                    reason,
                })
            }
        }
    }

    fn generation_enabled(&self) -> bool {
        self.llm_client.is_some()
    }

    fn run_generation(&mut self, request: &GenerationRequest) -> Result<String> {
        let client = self
            .llm_client
            .as_ref()
            .ok_or_else(|| anyhow!("generation is disabled -- set [llm] enabled = true"))?;
        generate(client, request)
    }

    fn spawn_generation(
        &mut self,
        request: GenerationRequest,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let client = self
            .llm_client
            .clone()
            .ok_or_else(|| anyhow!("generation is disabled -- set [llm] enabled = true"))?;
        tracing::info!(
            request_id = request.request_id,
            kind = request.kind.label(),
            "starting generation"
        );
        thread::Builder::new()
            .name(format!("generate-{}", request.request_id))
            .spawn(move || {
                let outcome = match generate(&client, &request) {
                    Ok(content) => GenerationOutcome::Succeeded(content),
                    Err(error) => {
                        tracing::warn!(
                            request_id = request.request_id,
                            error = %format!("{error:#}"),
                            "generation failed"
                        );
                        GenerationOutcome::Failed(error.to_string())
                    }
                };
                let _ = tx.send(InternalEvent::Generation {
                    request_id: request.request_id,
                    outcome,
                });
            })
            .context("spawn generation thread")?;
        Ok(())
    }

    fn resolve_image_reference(&mut self, raw: &str) -> Result<String> {
        resolve_image_reference(raw)
    }
}

fn generate(client: &autolot_llm::Client, request: &GenerationRequest) -> Result<String> {
    match request.kind {
        GenerationKind::Description => client.generate_description(&DescriptionRequest {
            make: request.make.clone(),
            model: request.model.clone(),
            year: request.year,
            location: request.location.label().to_owned(),
            down_payment: format_dollars(request.down_payment_cents),
            mileage: request.mileage,
        }),
        GenerationKind::Image => client.generate_image(&ImageRequest {
            make: request.make.clone(),
            model: request.model.clone(),
            year: request.year,
        }),
    }
}

/// Accepts links and inline data as typed; a local file becomes a
/// `file://` URL.
pub fn resolve_image_reference(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("image reference is empty -- paste a link or a file path");
    }
    let lowered = trimmed.to_ascii_lowercase();
    if lowered.starts_with("http://")
        || lowered.starts_with("https://")
        || lowered.starts_with("data:image/")
    {
        return Ok(trimmed.to_owned());
    }

    let path = Path::new(trimmed);
    if !path.is_file() {
        bail!(
            "{trimmed:?} is not a link or an existing file -- \
             paste an http(s) link or a file path"
        );
    }
    let absolute = path
        .canonicalize()
        .with_context(|| format!("resolve image path {}", path.display()))?;
    let url = Url::from_file_path(&absolute)
        .map_err(|()| anyhow!("cannot express {} as a file URL", absolute.display()))?;
    Ok(url.to_string())
}
