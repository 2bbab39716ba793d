use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time;
use uuid::Uuid;

use crate::domain::subscriber_email::SubscriberEmail;
use crate::ports::{DeliveryError, MailGateway, MessageId};

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);
const MESSAGE_ID_HEADER: &str = "X-Message-Id";

pub struct EmailClient {
    http_client: Client,
    base_url: String,
    sender: SubscriberEmail,
    api_key: Secret<String>,
    timeout: time::Duration,
}

#[derive(serde::Serialize)]
pub struct SendEmailBody {
    personalizations: Vec<SengridPersonalization>,
    from: SengridEmail,
    subject: String,
    content: Vec<SengridContent>,
}

#[derive(serde::Serialize)]
struct SengridEmail {
    email: String,
}

#[derive(serde::Serialize)]
struct SengridPersonalization {
    to: Vec<SengridEmail>,
}

#[derive(serde::Serialize)]
struct SengridContent {
    #[serde(rename = "type")]
    content_type: String,
    value: String,
}

impl EmailClient {
    pub fn new(
        base_url: String,
        sender: SubscriberEmail,
        api_key: Secret<String>,
        timeout: Option<time::Duration>,
    ) -> Result<EmailClient, reqwest::Error> {
        let timeout = timeout.unwrap_or(REQUEST_TIMEOUT);
        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(EmailClient {
            http_client,
            base_url,
            sender,
            api_key,
            timeout,
        })
    }
}

#[async_trait]
impl MailGateway for EmailClient {
    #[tracing::instrument(
        name = "Send an email through the mail gateway",
        skip(self, subject, html_content),
        fields(recipient = %recipient)
    )]
    async fn send(
        &self,
        recipient: &SubscriberEmail,
        subject: &str,
        html_content: &str,
    ) -> Result<MessageId, DeliveryError> {
        let url = format!("{}/mail/send", self.base_url);
        let body = SendEmailBody {
            from: SengridEmail {
                email: String::from(self.sender.as_ref()),
            },
            personalizations: vec![SengridPersonalization {
                to: vec![SengridEmail {
                    email: String::from(recipient.as_ref()),
                }],
            }],
            subject: String::from(subject),
            content: vec![SengridContent {
                content_type: String::from("text/html"),
                value: String::from(html_content),
            }],
        };

        let response = self
            .http_client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await
            .map_err(|err| self.classify(err))?
            .error_for_status()?; // return an error when server response status code is 4xx or 5xx

        // The gateway does not always hand back an id; keep one for the delivery report anyway.
        let message_id = response
            .headers()
            .get(MESSAGE_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(MessageId::new)
            .unwrap_or_else(|| MessageId::new(Uuid::new_v4().to_string()));

        Ok(message_id)
    }
}

impl EmailClient {
    fn classify(&self, err: reqwest::Error) -> DeliveryError {
        if err.is_timeout() {
            DeliveryError::TimedOut(self.timeout)
        } else {
            DeliveryError::Request(err)
        }
    }
}
