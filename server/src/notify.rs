//! Booking confirmation mail.
//!
//! Notification is best effort: the booking flow spawns the send and never
//! lets a mail failure affect the stored booking.

use crate::types::{Booking, Room, User};
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;

/// Mail delivery error.
#[derive(Debug, Error)]
pub enum MailError {
    /// The message could not be assembled.
    #[error("mail message invalid: {0}")]
    Message(String),
    /// The transport failed to deliver.
    #[error("mail delivery failed: {0}")]
    Transport(String),
}

/// Outbound booking notifications.
#[async_trait]
pub trait BookingMailer: Send + Sync {
    /// Send a confirmation for a freshly created booking.
    async fn send_confirmation(
        &self,
        user: &User,
        booking: &Booking,
        room: &Room,
    ) -> Result<(), MailError>;
}

/// Logs confirmations instead of sending them. Used in local runs and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleMailer;

#[async_trait]
impl BookingMailer for ConsoleMailer {
    async fn send_confirmation(
        &self,
        user: &User,
        booking: &Booking,
        room: &Room,
    ) -> Result<(), MailError> {
        tracing::info!(
            booking_id = %booking.id,
            to = %user.email,
            room_type = %room.room_type,
            total = %booking.total_price,
            "booking confirmation (console mailer)"
        );
        Ok(())
    }
}

/// SMTP-backed mailer.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: String,
}

impl SmtpMailer {
    /// Build a mailer against an SMTP relay.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::Transport`] if the relay address is invalid.
    pub fn new(
        host: &str,
        user: &str,
        password: &str,
        sender: impl Into<String>,
    ) -> Result<Self, MailError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)
            .map_err(|e| MailError::Transport(e.to_string()))?
            .credentials(Credentials::new(user.to_string(), password.to_string()))
            .build();

        Ok(Self {
            transport,
            sender: sender.into(),
        })
    }
}

#[async_trait]
impl BookingMailer for SmtpMailer {
    async fn send_confirmation(
        &self,
        user: &User,
        booking: &Booking,
        room: &Room,
    ) -> Result<(), MailError> {
        let body = format!(
            "Hi {username},\n\n\
             Your booking is confirmed.\n\n\
             Room: {room_type}\n\
             Check-in: {check_in}\n\
             Check-out: {check_out}\n\
             Guests: {guests}\n\
             Total: {total}\n\n\
             We look forward to your stay.",
            username = user.username,
            room_type = room.room_type,
            check_in = booking.dates.check_in(),
            check_out = booking.dates.check_out(),
            guests = booking.guest_count,
            total = booking.total_price,
        );

        let message = Message::builder()
            .from(
                self.sender
                    .parse()
                    .map_err(|e| MailError::Message(format!("sender address: {e}")))?,
            )
            .to(user
                .email
                .parse()
                .map_err(|e| MailError::Message(format!("recipient address: {e}")))?)
            .subject("Your booking is confirmed")
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| MailError::Message(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(())
    }
}
