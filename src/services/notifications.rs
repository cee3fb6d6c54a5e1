//! Notification dispatch for circulation events.
//!
//! The dispatcher contract is fire-and-forget: callers log failures and
//! carry on; a lost email never aborts a loan or queue mutation.

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox, Message, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    SmtpTransport, Transport,
};
use sqlx::{Pool, Postgres};
use std::str::FromStr;
use uuid::Uuid;

use crate::{
    config::NotificationConfig,
    error::{AppError, AppResult},
    models::{fee::Fee, loan::Loan, reservation::Reservation},
};

/// Outbound notification contract consumed by the circulation engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// A reservation was queued; the message carries the assigned position
    async fn send_reservation_created(&self, reservation: &Reservation) -> AppResult<()>;
    /// The book is waiting at the pickup desk until the deadline
    async fn send_reservation_ready(&self, reservation: &Reservation) -> AppResult<()>;
    /// The loan is overdue, please bring it back
    async fn send_return_reminder(&self, loan: &Loan) -> AppResult<()>;
    /// A fee is still unpaid
    async fn send_payment_reminder(&self, fee: &Fee) -> AppResult<()>;
}

/// SMTP-backed dispatcher; member email addresses come from the database
#[derive(Clone)]
pub struct EmailNotifier {
    config: NotificationConfig,
    pool: Pool<Postgres>,
}

impl EmailNotifier {
    pub fn new(config: NotificationConfig, pool: Pool<Postgres>) -> Self {
        Self { config, pool }
    }

    async fn member_email(&self, user_id: Uuid) -> AppResult<Option<String>> {
        let email: Option<String> =
            sqlx::query_scalar("SELECT email FROM members WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(email)
    }

    async fn send_to_member(&self, user_id: Uuid, subject: &str, body: &str) -> AppResult<()> {
        let Some(to) = self.member_email(user_id).await? else {
            tracing::warn!("No email address on file for member {}", user_id);
            return Ok(());
        };
        self.send_email(&to, subject, body)
    }

    /// Generic email sending function
    fn send_email(&self, to: &str, subject: &str, body: &str) -> AppResult<()> {
        let from_name = self.config.smtp_from_name.as_deref().unwrap_or("Velin");
        let from_mailbox = Mailbox::from_str(&format!("{} <{}>", from_name, self.config.smtp_from))
            .map_err(|e| AppError::Internal(format!("Invalid from address: {}", e)))?;

        let to_mailbox = Mailbox::from_str(to)
            .map_err(|e| AppError::Internal(format!("Invalid to address: {}", e)))?;

        let email = Message::builder()
            .from(from_mailbox)
            .to(to_mailbox)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(format!(
                                r#"<html><body><pre>{}</pre></body></html>"#,
                                body.replace('\n', "<br>")
                            )),
                    ),
            )
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        let mailer_builder = if self.config.smtp_use_tls {
            SmtpTransport::starttls_relay(&self.config.smtp_host)
                .map_err(|e| AppError::Internal(format!("Failed to create SMTP transport: {}", e)))?
        } else {
            SmtpTransport::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer_builder = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer_builder.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer_builder
        };

        let mailer = mailer_builder.build();

        mailer
            .send(&email)
            .map_err(|e| AppError::Internal(format!("Failed to send email: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl NotificationDispatcher for EmailNotifier {
    async fn send_reservation_created(&self, reservation: &Reservation) -> AppResult<()> {
        let subject = "Your reservation is confirmed";
        let body = format!(
            r#"
Your reservation has been placed.

You are currently number {position} in line. We will let you know as soon
as the book is ready for pickup.
"#,
            position = reservation.queue_position
        );
        self.send_to_member(reservation.user_id, subject, &body)
            .await
    }

    async fn send_reservation_ready(&self, reservation: &Reservation) -> AppResult<()> {
        let subject = "Your reserved book is ready for pickup";
        let deadline = reservation
            .pickup_deadline
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "soon".to_string());
        let body = format!(
            r#"
The book you reserved is now waiting for you at the desk.

Please pick it up before {deadline}, after which the reservation passes
to the next patron in line.
"#,
        );
        self.send_to_member(reservation.user_id, subject, &body)
            .await
    }

    async fn send_return_reminder(&self, loan: &Loan) -> AppResult<()> {
        let subject = "Your loan is overdue";
        let body = format!(
            r#"
A book you borrowed was due back on {due}.

Please return it as soon as possible. Late fees accrue per day until the
book is returned.
"#,
            due = loan.due_date.format("%Y-%m-%d")
        );
        self.send_to_member(loan.user_id, subject, &body).await
    }

    async fn send_payment_reminder(&self, fee: &Fee) -> AppResult<()> {
        let subject = "You have an outstanding fee";
        let body = format!(
            r#"
A fee of {amount} issued on {issued} is still unpaid.

Please settle it at the front desk or through your account page.
"#,
            amount = fee.amount,
            issued = fee.issued_date.format("%Y-%m-%d")
        );
        self.send_to_member(fee.user_id, subject, &body).await
    }
}
