use std::time::Duration;

use sendgrid_http::{CancellationSignal, RateLimitRetryStrategy, SendGridClient};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct Recipient {
    id: String,
    email: String,
    first_name: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let client = SendGridClient::from_env()?
        .with_retry_strategy(RateLimitRetryStrategy::default().with_max_retries(3));

    let count: u64 = client
        .get("contactdb/recipients/count")
        .as_json_field("recipient_count")
        .await?;
    println!("{count} recipients");

    client
        .post("contactdb/recipients")
        .json(&json!([{ "email": "kit@example.com", "first_name": "Kit" }]))
        .expect_success()
        .await?;

    // Give up on the search if rate limiting stalls it for more than 5 seconds.
    let signal = CancellationSignal::new();
    let deadline = signal.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        deadline.cancel();
    });

    let response = client
        .get("contactdb/recipients/search")
        .query("email", "kit@example.com")
        .cancel_on(&signal)
        .send()
        .await?;

    if let Some(limits) = response.rate_limit() {
        println!("{}/{} requests left", limits.remaining, limits.limit);
    }

    let recipients: Vec<Recipient> = response.json_field("recipients")?;
    for recipient in recipients {
        let name = recipient.first_name.as_deref().unwrap_or("-");
        println!("{} {} ({name})", recipient.id, recipient.email);
    }

    Ok(())
}
