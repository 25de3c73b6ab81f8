use mailing_list::{
    app::App,
    config::{get_configuration, DatabaseSettings, Settings},
    domain::subscriber::Subscriber,
    telemetry::get_subscriber,
};
use once_cell::sync::Lazy;
use serde_json::Value;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use tracing_subscriber::util::SubscriberInitExt;
use uuid::Uuid;

static TRACING: Lazy<()> = Lazy::new(|| {
    let env_filter = "mailing_list=trace,sqlx=trace,tower_http=trace,axum::rejection=trace";

    if std::env::var("TEST_LOG").is_ok() {
        get_subscriber(env_filter, std::io::stdout).init();
    } else {
        get_subscriber(env_filter, std::io::sink).init();
    };
});

pub struct TestApp {
    pub addr: String,
    pub db_pool: PgPool,
    client: reqwest::Client,
}

impl TestApp {
    pub async fn post_subscribers(&self, body: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/api/subscribers", &self.addr))
            .json(&serde_json::from_str::<Value>(body).unwrap())
            .send()
            .await
            .expect("The request should succeed.")
    }

    pub async fn post_subscribers_forwarded_for(
        &self,
        body: &str,
        forwarded_for: &str,
    ) -> reqwest::Response {
        self.client
            .post(format!("{}/api/subscribers", &self.addr))
            .header("X-Forwarded-For", forwarded_for)
            .json(&serde_json::from_str::<Value>(body).unwrap())
            .send()
            .await
            .expect("The request should succeed.")
    }

    pub async fn post_raw_subscribers(&self, body: &'static str) -> reqwest::Response {
        self.client
            .post(format!("{}/api/subscribers", &self.addr))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .expect("The request should succeed.")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", &self.addr, path))
            .send()
            .await
            .expect("The request should succeed.")
    }

    pub async fn subscribers(&self) -> Vec<Subscriber> {
        sqlx::query_as::<_, Subscriber>(
            "SELECT id, email, consent_given, source, subscribed_at, ip_address, is_active \
             FROM subscribers ORDER BY id",
        )
        .fetch_all(&self.db_pool)
        .await
        .expect("The subscribers should be readable.")
    }

    pub async fn deactivate(&self, email: &str) {
        sqlx::query("UPDATE subscribers SET is_active = FALSE WHERE email = $1")
            .bind(email)
            .execute(&self.db_pool)
            .await
            .expect("The subscriber should be deactivated.");
    }
}

/// Spawns the app with its configured limits, but a subscription budget large enough for
/// tests sending many requests from the same address.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(|config| config.rate_limit.subscription.permit_limit = 100).await
}

pub async fn spawn_app_with(customize: impl FnOnce(&mut Settings)) -> TestApp {
    Lazy::force(&TRACING);

    let mut config = get_configuration().expect("Failed to read configuration.");
    config.application.host = "127.0.0.1".into();
    config.application.port = 0;
    config.database.database_name = Uuid::new_v4().to_string();
    customize(&mut config);

    let connection_pool = configure_database(&config.database).await;
    let app = App::build(&config)
        .await
        .expect("The app should be built.");

    let test_app = TestApp {
        addr: format!("http://127.0.0.1:{}", app.port()),
        db_pool: connection_pool.clone(),
        client: reqwest::Client::new(),
    };

    let _ = tokio::spawn(async move {
        app.serve(connection_pool)
            .await
            .expect("The server should be running")
    });

    test_app
}

async fn configure_database(config: &DatabaseSettings) -> PgPool {
    // Create database
    let mut connection = PgConnection::connect_with(&config.without_db())
        .await
        .expect("A postgres connection should be created.");

    connection
        .execute(format!(r#"CREATE DATABASE "{}";"#, config.database_name).as_str())
        .await
        .expect("The database should be created.");

    // Migrate database
    let connection_pool = PgPool::connect_with(config.with_db())
        .await
        .expect("A postgres connection pool should be created.");

    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("The migrations should run without error.");

    connection_pool
}
