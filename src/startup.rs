use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Pool, Postgres};
use std::net::TcpListener;
use tracing_actix_web::TracingLogger;

use crate::config::{DatabaseSettings, Settings};
use crate::email_client::EmailClient;
use crate::newsletter::dispatch::NewsletterDispatcher;
use crate::routes::{
    handle_create_campaign, handle_delete_subscriber, handle_get_campaign, handle_list_campaigns,
    handle_list_subscribers, handle_resubscribe, handle_schedule_campaign, handle_send_campaign,
    handle_subscribe, handle_test_campaign, handle_unsubscribe, handle_update_campaign,
    handle_upload, health_check,
};
use crate::storage::FileStore;
use crate::store::{CampaignStore, SubscriberStore};

pub struct Application {
    pub port: u16,
    pub server: Server,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, std::io::Error> {
        let db_pool = PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_secs(2))
            .connect_lazy_with(config.get_db_options());
        let sender_email = config
            .get_email_client_sender()
            .expect("Sender email is not valid");
        let reply_to_email = config
            .get_email_client_reply_to()
            .expect("Reply-to email is not valid");
        let email_client = EmailClient::new(
            config.get_email_client_base_url(),
            sender_email,
            reply_to_email,
            config.get_email_client_api(),
            None,
        );
        let file_store = FileStore::new(&config.storage).expect("Failed to build the file store");

        let listener =
            TcpListener::bind(config.get_address()).expect("Failed to bind the address.");
        let port = listener.local_addr().unwrap().port();
        let server = run(listener, db_pool, email_client, file_store)?;

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
    db_pool: PgPool,
    email_client: EmailClient,
    file_store: FileStore,
) -> Result<Server, std::io::Error> {
    // Every client is built once here and handed to the handlers through the
    // application state.
    let subscriber_store = web::Data::new(SubscriberStore::new(db_pool.clone()));
    let campaign_store = web::Data::new(CampaignStore::new(db_pool.clone()));
    let dispatcher = web::Data::new(NewsletterDispatcher::new(email_client));
    let file_store = web::Data::new(file_store);
    let db_pool = web::Data::new(db_pool);

    let server = HttpServer::new(move || {
        // App is where your application logic lives: routing, middlewares, request handler, etc
        App::new()
            // 'wrap' method adds a middleware to the App. This specific middleware provide incoming
            // request logger
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/api/newsletter")
                    .route("/subscribe", web::post().to(handle_subscribe))
                    .route("/unsubscribe", web::post().to(handle_unsubscribe))
                    .route("/resubscribe", web::post().to(handle_resubscribe))
                    .route("/subscribers", web::get().to(handle_list_subscribers))
                    .route(
                        "/subscribers/{email}",
                        web::delete().to(handle_delete_subscriber),
                    ),
            )
            .service(
                web::scope("/api/newsletter-campaigns")
                    .route("/campaigns", web::post().to(handle_create_campaign))
                    .route("/campaigns", web::get().to(handle_list_campaigns))
                    .route("/campaigns/{id}", web::get().to(handle_get_campaign))
                    .route("/campaigns/{id}", web::put().to(handle_update_campaign))
                    .route(
                        "/campaigns/{id}/schedule",
                        web::post().to(handle_schedule_campaign),
                    )
                    .route("/campaigns/{id}/send", web::post().to(handle_send_campaign))
                    .route("/campaigns/{id}/test", web::post().to(handle_test_campaign)),
            )
            .route("/api/uploads", web::post().to(handle_upload))
            .app_data(db_pool.clone())
            .app_data(subscriber_store.clone())
            .app_data(campaign_store.clone())
            .app_data(dispatcher.clone())
            .app_data(file_store.clone())
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
