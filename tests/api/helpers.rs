use reqwest::Response;
use sqlx::{migrate, Connection, Executor, PgConnection, PgPool};
use uuid::Uuid;
use wiremock::MockServer;

use outreach_api::{
    config::{get_configuration, DatabaseSettings, Settings},
    startup::{get_connection_db_pool, Application},
};

pub struct TestApp {
    pub config: Settings,
    pub address: String,
    pub db_pool: PgPool,
    pub email_server: MockServer,
}

impl TestApp {
    pub async fn spawn_app() -> TestApp {
        let mut config = get_configuration().expect("Missing configuration file.");
        let db_test_name = format!("db_{}", Uuid::new_v4().to_string().replace('-', "_"));
        let email_server = MockServer::start().await;

        // We are using port 0 as way to define a different port per each test. Port 0 is a special case that operating systems
        // take into account: when port is 0, the OS will search for the first available port
        config.set_app_port(0);
        config.set_email_client_base_url(email_server.uri());

        let db_pool = configure_db(&mut config.database, db_test_name.clone()).await;

        let application = Application::build(config.clone())
            .await
            .expect("Failed to build application.");

        let address = format!("http://127.0.0.1:{}", application.get_port());

        tokio::spawn(application.run_until_stop());

        TestApp {
            address,
            config: config.clone(),
            db_pool,
            email_server,
        }
    }

    pub async fn post_subscription(&self, body: serde_json::Value) -> Response {
        self.post("/api/newsletter/subscribe", body).await
    }

    pub async fn post_unsubscribe(&self, body: serde_json::Value) -> Response {
        self.post("/api/newsletter/unsubscribe", body).await
    }

    pub async fn post_resubscribe(&self, body: serde_json::Value) -> Response {
        self.post("/api/newsletter/resubscribe", body).await
    }

    pub async fn get_subscribers(&self, query: &str) -> Response {
        let url = format!("{}/api/newsletter/subscribers{}", self.address, query);

        reqwest::Client::new()
            .get(&url)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn delete_subscriber(&self, email: &str) -> Response {
        let url = format!("{}/api/newsletter/subscribers/{}", self.address, email);

        reqwest::Client::new()
            .delete(&url)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_campaign(&self, body: serde_json::Value) -> Response {
        self.post("/api/newsletter-campaigns/campaigns", body).await
    }

    /// Creates a campaign and returns its generated id.
    pub async fn create_campaign(&self, body: serde_json::Value) -> String {
        let response = self.post_campaign(body).await;
        assert_eq!(response.status().as_u16(), 201);

        let campaign: serde_json::Value = response.json().await.unwrap();

        campaign["campaignId"].as_str().unwrap().to_string()
    }

    pub async fn get_campaign(&self, campaign_id: &str) -> Response {
        let url = format!(
            "{}/api/newsletter-campaigns/campaigns/{}",
            self.address, campaign_id
        );

        reqwest::Client::new()
            .get(&url)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_campaigns(&self, query: &str) -> Response {
        let url = format!("{}/api/newsletter-campaigns/campaigns{}", self.address, query);

        reqwest::Client::new()
            .get(&url)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn put_campaign(&self, campaign_id: &str, body: serde_json::Value) -> Response {
        let url = format!(
            "{}/api/newsletter-campaigns/campaigns/{}",
            self.address, campaign_id
        );

        reqwest::Client::new()
            .put(&url)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_schedule_campaign(
        &self,
        campaign_id: &str,
        body: serde_json::Value,
    ) -> Response {
        self.post(
            &format!("/api/newsletter-campaigns/campaigns/{}/schedule", campaign_id),
            body,
        )
        .await
    }

    pub async fn post_send_campaign(&self, campaign_id: &str) -> Response {
        let url = format!(
            "{}/api/newsletter-campaigns/campaigns/{}/send",
            self.address, campaign_id
        );

        reqwest::Client::new()
            .post(&url)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_test_campaign(&self, campaign_id: &str, body: serde_json::Value) -> Response {
        self.post(
            &format!("/api/newsletter-campaigns/campaigns/{}/test", campaign_id),
            body,
        )
        .await
    }

    async fn post(&self, path: &str, body: serde_json::Value) -> Response {
        let url = format!("{}{}", self.address, path);

        reqwest::Client::new()
            .post(&url)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

async fn configure_db(db_config: &mut DatabaseSettings, db_test_name: String) -> PgPool {
    // Create database
    let mut connection = PgConnection::connect_with(&db_config.get_db_options())
        .await
        .expect("Failed to connect to Postgres.");

    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, db_test_name))
        .await
        .expect("Failed to create database.");

    connection
        .close()
        .await
        .expect("Failed to close connection.");

    // Execute migrations
    db_config.set_name(db_test_name);

    let db_pool = get_connection_db_pool(db_config);

    migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run migrations.");

    db_pool
}
