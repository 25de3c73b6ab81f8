use anyhow::Context;
use mailing_list::{app::App, config::get_configuration, telemetry::get_subscriber};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_configuration().context("Failed to read configuration.")?;

    get_subscriber(&config.log_level, std::io::stderr).init();

    let db = PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(config.database.with_db());

    let app = App::build(&config).await?;

    tracing::info!(
        port = app.port(),
        subscription_limit = config.rate_limit.subscription.permit_limit,
        general_limit = config.rate_limit.general.permit_limit,
        "starting server"
    );
    app.serve(db).await.context("The server stopped unexpectedly.")?;

    Ok(())
}
