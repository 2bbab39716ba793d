use newsletter_service::config::get_configuration;
use newsletter_service::startup::Application;
use newsletter_service::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let subscriber = get_subscriber(
        String::from("newsletter_service"),
        String::from("info"),
        std::io::stdout,
    );

    init_subscriber(subscriber);

    let config = get_configuration().map_err(|err| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Missing or invalid configuration: {}", err),
        )
    })?;
    let application = Application::build(config).await?;

    application.run_until_stop().await
}
