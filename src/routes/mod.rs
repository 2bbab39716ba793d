mod health_check;
mod newsletters;
mod subscriptions;
mod subscriptions_unsubscribe;

pub use health_check::health_check;
pub use newsletters::{get_audience, publish_newsletter};
pub use subscriptions::handle_create_subscription;
pub use subscriptions_unsubscribe::handle_unsubscribe;

/// Prints an error followed by every error in its source chain.
pub fn error_chain_fmt(
    err: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}", err)?;

    let mut current = err.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }

    Ok(())
}

fn error_body(message: &str) -> serde_json::Value {
    serde_json::json!({ "error": message })
}
