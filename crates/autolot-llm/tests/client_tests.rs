// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use autolot_llm::{Client, DescriptionRequest, ImageRequest};
use std::io::Read;
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Response, Server};

fn json_response(body: &str, status: u16) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(body)
        .with_status_code(status)
        .with_header(
            Header::from_bytes("Content-Type", "application/json")
                .expect("valid content type header"),
        )
}

fn description_request() -> DescriptionRequest {
    DescriptionRequest {
        make: "Toyota".to_owned(),
        model: "Camry SE".to_owned(),
        year: 2023,
        location: "Dallas".to_owned(),
        down_payment: "$1,300".to_owned(),
        mileage: 12_000,
    }
}

#[test]
fn ping_error_contains_actionable_remediation() {
    let client = Client::new(
        "http://127.0.0.1:1/v1",
        "gpt-4o-mini",
        "gpt-image-1",
        Duration::from_millis(50),
    )
    .expect("client should initialize");

    let error = client
        .ping()
        .expect_err("ping should fail for unreachable endpoint");
    let message = error.to_string();
    assert!(message.contains("check llm.base_url"));
}

#[test]
fn list_models_and_ping_work_against_mock_server() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/v1", server.server_addr());

    let handle = thread::spawn(move || {
        for _ in 0..2 {
            let request = server.recv().expect("request expected");
            assert_eq!(request.url(), "/v1/models");
            request
                .respond(json_response(r#"{"data":[{"id":"gpt-4o-mini"}]}"#, 200))
                .expect("response should succeed");
        }
    });

    let client = Client::new(&addr, "gpt-4o-mini", "gpt-image-1", Duration::from_secs(1))?;
    let models = client.list_models()?;
    assert_eq!(models, vec!["gpt-4o-mini".to_owned()]);
    client.ping()?;

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn generate_description_sends_prompt_and_bearer_token() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/v1", server.server_addr());

    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/v1/chat/completions");
        let auth = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("Authorization"))
            .map(|header| header.value.as_str().to_owned());
        assert_eq!(auth.as_deref(), Some("Bearer sk-test"));

        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .expect("read request body");
        assert!(body.contains("2023 Toyota Camry SE"));
        assert!(body.contains("\"model\":\"gpt-4o-mini\""));

        request
            .respond(json_response(
                r#"{"choices":[{"message":{"content":"\"Sporty and  efficient.\""}}]}"#,
                200,
            ))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, "gpt-4o-mini", "gpt-image-1", Duration::from_secs(1))?
        .with_api_key(Some("sk-test".to_owned()));
    let description = client.generate_description(&description_request())?;
    assert_eq!(description, "Sporty and efficient.");

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn generate_image_returns_data_uri() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/v1", server.server_addr());

    let handle = thread::spawn(move || {
        let mut request = server.recv().expect("request expected");
        assert_eq!(request.url(), "/v1/images/generations");
        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .expect("read request body");
        assert!(body.contains("\"response_format\":\"b64_json\""));
        assert!(body.contains("\"model\":\"gpt-image-1\""));

        request
            .respond(json_response(r#"{"data":[{"b64_json":"iVBORw0K"}]}"#, 200))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, "gpt-4o-mini", "gpt-image-1", Duration::from_secs(1))?;
    let reference = client.generate_image(&ImageRequest {
        make: "Ford".to_owned(),
        model: "F-150".to_owned(),
        year: 2021,
    })?;
    assert_eq!(reference, "data:image/png;base64,iVBORw0K");

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn server_errors_collapse_into_generation_failure() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/v1", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        request
            .respond(json_response(
                r#"{"error":{"message":"quota exceeded"}}"#,
                429,
            ))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, "gpt-4o-mini", "gpt-image-1", Duration::from_secs(1))?;
    let error = client
        .generate_description(&description_request())
        .expect_err("429 should fail");
    assert_eq!(
        error.to_string(),
        "description generation failed -- retry in a moment"
    );
    assert!(format!("{error:#}").contains("quota exceeded"));

    handle.join().expect("server thread should join");
    Ok(())
}

#[test]
fn empty_choices_are_a_failure() -> Result<()> {
    let server =
        Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
    let addr = format!("http://{}/v1", server.server_addr());

    let handle = thread::spawn(move || {
        let request = server.recv().expect("request expected");
        request
            .respond(json_response(r#"{"choices":[{"message":{"content":"  "}}]}"#, 200))
            .expect("response should succeed");
    });

    let client = Client::new(&addr, "gpt-4o-mini", "gpt-image-1", Duration::from_secs(1))?;
    let error = client
        .generate_description(&description_request())
        .expect_err("blank description should fail");
    assert!(format!("{error:#}").contains("empty description"));

    handle.join().expect("server thread should join");
    Ok(())
}
