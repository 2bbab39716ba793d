use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use secrecy::Secret;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

use crate::config::{DatabaseSettings, Settings};
use crate::email_client::EmailClient;
use crate::ports::{MailGateway, SubscriberStore};
use crate::routes::{
    get_audience, handle_create_subscription, handle_unsubscribe, health_check, publish_newsletter,
};
use crate::services::{
    AudienceSelector, BroadcastDispatcher, BroadcastService, DeliveryAccounting, LifecycleManager,
};
use crate::storage::PostgresSubscriberStore;

pub struct AdminToken(pub Secret<String>);

pub struct Application {
    pub port: u16,
    pub server: Server,
}

impl Application {
    /// Production wiring: subscribers live in Postgres.
    pub async fn build(config: Settings) -> Result<Self, std::io::Error> {
        let db_pool = get_connection_db_pool(&config.database);
        let store = PostgresSubscriberStore::new(db_pool);

        store
            .migrate()
            .await
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;

        Self::build_with_store(config, Arc::new(store))
    }

    pub fn build_with_store(
        config: Settings,
        store: Arc<dyn SubscriberStore>,
    ) -> Result<Self, std::io::Error> {
        let sender_email = config
            .get_email_client_sender()
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?;
        let email_client = EmailClient::new(
            config.email_client.base_url.clone(),
            sender_email,
            config.email_client.api_key.clone(),
            Some(config.email_client.get_timeout()),
        )
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;
        let mail_gateway: Arc<dyn MailGateway> = Arc::new(email_client);

        let lifecycle = LifecycleManager::new(
            store.clone(),
            mail_gateway.clone(),
            config.newsletter.get_send_timeout(),
        );
        let broadcast = BroadcastService::new(
            AudienceSelector::new(store.clone()),
            BroadcastDispatcher::new(
                mail_gateway,
                config.newsletter.concurrency,
                config.newsletter.get_send_timeout(),
            ),
            DeliveryAccounting::new(store),
        );

        let listener = TcpListener::bind(config.get_address())?;
        let port = listener.local_addr()?.port();
        let server = run(
            listener,
            lifecycle,
            broadcast,
            AdminToken(config.application.admin_token.clone()),
        )?;

        tracing::info!("Server listening on {}:{}", config.application.get_host(), port);

        Ok(Self { port, server })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stop(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn run(
    listener: TcpListener,
    lifecycle: LifecycleManager,
    broadcast: BroadcastService,
    admin_token: AdminToken,
) -> Result<Server, std::io::Error> {
    let lifecycle = web::Data::new(lifecycle);
    let broadcast = web::Data::new(broadcast);
    let admin_token = web::Data::new(admin_token);

    let server = HttpServer::new(move || {
        // App is where your application logic lives: routing, middlewares, request handler, etc
        App::new()
            // 'wrap' method adds a middleware to the App. This specific middleware provide incoming
            // request logger
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/subscriptions", web::post().to(handle_create_subscription))
            .route(
                "/subscriptions/unsubscribe",
                web::post().to(handle_unsubscribe),
            )
            .route("/newsletters", web::post().to(publish_newsletter))
            .route("/newsletters/audience", web::get().to(get_audience))
            .app_data(lifecycle.clone())
            .app_data(broadcast.clone())
            .app_data(admin_token.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}

pub fn get_connection_db_pool(config: &DatabaseSettings) -> Pool<Postgres> {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(config.get_db_options())
}
