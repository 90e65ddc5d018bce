//! Email service for sending verification and reset codes.
//!
//! Uses SMTP via lettre for delivery. Messages are plain text; the codes are
//! short-lived and the bodies deliberately minimal.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use rand::Rng;
use rand::distr::Alphanumeric;
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::EmailConfig;

/// Length of generated verification and reset codes.
const CODE_LENGTH: usize = 10;

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_owned(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send the email verification code for a pending registration.
    ///
    /// # Errors
    ///
    /// Returns error if the message cannot be built or sent.
    pub async fn send_verification_code(&self, to: &str, code: &str) -> Result<(), EmailError> {
        self.send_plain_email(
            to,
            "Email Verification Code",
            &format!("Your verification code is: {code}"),
        )
        .await
    }

    /// Send a password reset code.
    ///
    /// # Errors
    ///
    /// Returns error if the message cannot be built or sent.
    pub async fn send_password_reset_code(&self, to: &str, code: &str) -> Result<(), EmailError> {
        self.send_plain_email(
            to,
            "Password Reset Code",
            &format!("Your password reset code is: {code}"),
        )
        .await
    }

    /// Send a plain text email.
    async fn send_plain_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_owned()))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_owned())?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

/// Generate a 10-character alphanumeric verification code.
///
/// `rand::rng()` is a CSPRNG, so the code carries ~59.5 bits of entropy.
#[must_use]
pub fn generate_verification_code() -> String {
    rand::rng()
        .sample_iter(Alphanumeric)
        .take(CODE_LENGTH)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_verification_code_format() {
        let code = generate_verification_code();
        assert_eq!(code.len(), CODE_LENGTH);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generate_verification_code_varies() {
        let codes: std::collections::HashSet<String> =
            (0..100).map(|_| generate_verification_code()).collect();
        // Collisions across 100 draws would indicate a broken generator.
        assert_eq!(codes.len(), 100);
    }
}
