use std::time::Duration;

use longpoll_http::LongPollClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let resource = std::env::var("LONGPOLL_RESOURCE")
        .unwrap_or_else(|_| "https://example.com/".to_owned());

    let poller = LongPollClient::new(resource)
        .with_interval(Duration::from_secs(5))
        .on_response(|outcome| match outcome {
            Ok(response) => println!("{} {}", response.url(), response.status()),
            Err(err) => eprintln!("poll failed: {err}"),
        });

    poller.start()?;
    tokio::time::sleep(Duration::from_secs(30)).await;
    poller.stop()?;
    poller.drain().await?;

    Ok(())
}
