use std::fs;

use sendgrid_http::{SendGridClient, SendGridError, DEFAULT_BASE_URL};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct SecretsFile {
    #[serde(rename = "SENDGRID_API_KEY")]
    sendgrid_api_key: Option<String>,
    #[serde(rename = "SENDGRID_BASE_URL")]
    sendgrid_base_url: Option<String>,
}

fn load_live_credentials() -> Result<(String, String), String> {
    if let Ok(api_key) = std::env::var("SENDGRID_API_KEY") {
        let base_url =
            std::env::var("SENDGRID_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_owned());
        return Ok((base_url, api_key));
    }

    let content = fs::read_to_string("secrets.json")
        .map_err(|_| "SENDGRID_API_KEY env or secrets.json is required".to_owned())?;
    let parsed: SecretsFile = serde_json::from_str(&content)
        .map_err(|err| format!("secrets.json could not be parsed: {err}"))?;

    let api_key = parsed
        .sendgrid_api_key
        .ok_or_else(|| "missing SENDGRID_API_KEY in secrets.json".to_owned())?;
    let base_url = parsed
        .sendgrid_base_url
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());

    Ok((base_url, api_key))
}

#[tokio::test]
async fn live_scopes_and_rejected_key() {
    let (base_url, api_key) = match load_live_credentials() {
        Ok(values) => values,
        Err(_) => {
            eprintln!("skipping live test: credentials not found in env or secrets.json");
            return;
        }
    };

    let client = SendGridClient::with_base_url(base_url.clone(), api_key);

    let response = client
        .get("/scopes")
        .send()
        .await
        .expect("scopes request must complete");
    assert!(response.rate_limit().is_some(), "SendGrid reports rate limits");

    let scopes: Vec<String> = response.json_field("scopes").expect("scopes must decode");
    assert!(!scopes.is_empty());

    let rejected = SendGridClient::with_base_url(base_url, "SG.not-a-real-key")
        .get("scopes")
        .as_json_field::<Vec<String>>("scopes")
        .await
        .expect_err("bogus key must be rejected");

    match rejected {
        SendGridError::Http { status, errors, .. } => {
            assert_eq!(status, 401);
            assert!(!errors.is_empty());
        }
        other => panic!("expected http 401, got {other:?}"),
    }
}
