use anyhow::Context;
use axum::extract::State;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;

use super::schema::{self, Subscription, CONSENT_REQUIRED};
use crate::{
    app::{
        error::{AppError, AppResult},
        extractor::{ClientIp, JsonBody},
        AppState,
    },
    domain::subscriber::{email::Email, NewSubscriber, Subscriber},
};

#[instrument(
    name = "Adding a new subscriber",
    skip(state, body),
    fields(email = %body.email, source = ?body.source)
)]
pub async fn subscribe(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    JsonBody(body): JsonBody<schema::SubscribeBody>,
) -> AppResult<Subscription> {
    if body.is_honeypot_filled() {
        // Same answer as a genuine signup, so bots can't tell they were caught.
        tracing::warn!("honeypot triggered, discarding submission");
        return Ok(Subscription::Created);
    }

    if !body.consent_given {
        return Err(AppError::ValidationError(CONSENT_REQUIRED.to_owned()));
    }

    let new_subscriber = NewSubscriber::try_from(body).map_err(AppError::ValidationError)?;

    save_subscriber(&state.db, &new_subscriber, client_ip.as_deref()).await
}

/// Inserts or reactivates a subscriber in a single transaction.
#[instrument(
    name = "Saving subscriber",
    skip(db, subscriber),
    fields(email = %subscriber.email, source = %subscriber.source)
)]
async fn save_subscriber(
    db: &PgPool,
    subscriber: &NewSubscriber,
    ip_address: Option<&str>,
) -> AppResult<Subscription> {
    let mut transaction = db
        .begin()
        .await
        .context("Failed to acquire a Postgres connection from the pool.")?;

    let existing = find_subscriber(&mut transaction, &subscriber.email)
        .await
        .context("Failed to look up an existing subscriber.")?;

    // Returning early drops the transaction, which rolls it back.
    let outcome = match existing {
        Some(existing) if existing.is_active => {
            tracing::info!("duplicate subscription attempt");
            return Ok(Subscription::AlreadySubscribed);
        }
        Some(existing) => {
            reactivate_subscriber(&mut transaction, existing.id, subscriber, ip_address)
                .await
                .context("Failed to reactivate subscriber.")?;
            tracing::info!(subscriber_id = existing.id, "reactivated subscriber");
            Subscription::Reactivated
        }
        None => match insert_subscriber(&mut transaction, subscriber, ip_address).await {
            Ok(subscriber_id) => {
                tracing::info!(subscriber_id, "new subscriber added");
                Subscription::Created
            }
            Err(e) if is_unique_violation(&e) => {
                // A concurrent request stored the same address first.
                tracing::info!("lost the race to insert subscriber");
                return Ok(Subscription::AlreadySubscribed);
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context("Failed to insert new subscriber.")
                    .into())
            }
        },
    };

    transaction
        .commit()
        .await
        .context("Failed to commit the transaction storing a subscriber.")?;

    Ok(outcome)
}

#[instrument(name = "Looking up subscriber by email", skip(transaction, email))]
async fn find_subscriber(
    transaction: &mut Transaction<'_, Postgres>,
    email: &Email,
) -> Result<Option<Subscriber>, sqlx::Error> {
    // `FOR UPDATE` serializes concurrent reactivations of the same row.
    sqlx::query_as::<_, Subscriber>(
        r#"
        SELECT id, email, consent_given, source, subscribed_at, ip_address, is_active
        FROM subscribers
        WHERE email = $1
        FOR UPDATE
        "#,
    )
    .bind(email.as_ref())
    .fetch_optional(&mut **transaction)
    .await
}

#[instrument(name = "Inserting new subscriber", skip(transaction, subscriber))]
async fn insert_subscriber(
    transaction: &mut Transaction<'_, Postgres>,
    subscriber: &NewSubscriber,
    ip_address: Option<&str>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO subscribers (email, consent_given, source, subscribed_at, ip_address, is_active)
        VALUES ($1, $2, $3, $4, $5, TRUE)
        RETURNING id
        "#,
    )
    .bind(subscriber.email.as_ref())
    .bind(subscriber.consent_given)
    .bind(subscriber.source.as_ref())
    .bind(Utc::now())
    .bind(ip_address)
    .fetch_one(&mut **transaction)
    .await
}

#[instrument(name = "Reactivating subscriber", skip(transaction, subscriber))]
async fn reactivate_subscriber(
    transaction: &mut Transaction<'_, Postgres>,
    subscriber_id: i64,
    subscriber: &NewSubscriber,
    ip_address: Option<&str>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE subscribers
        SET is_active = TRUE,
            consent_given = $2,
            subscribed_at = $3,
            ip_address = $4,
            source = $5
        WHERE id = $1
        "#,
    )
    .bind(subscriber_id)
    .bind(subscriber.consent_given)
    .bind(Utc::now())
    .bind(ip_address)
    .bind(subscriber.source.as_ref())
    .execute(&mut **transaction)
    .await?;

    Ok(())
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    matches!(error, sqlx::Error::Database(e) if e.is_unique_violation())
}
