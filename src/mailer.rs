use actix_web::rt;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use thiserror::Error;

use crate::config::SmtpConfig;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("mail could not be built: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("smtp delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("mail task was canceled")]
    Canceled,
}

/// Snapshot of a booking taken before the HTTP response goes out, owned by
/// the dispatch task so it can outlive the request.
#[derive(Clone, Debug)]
pub struct BookingMail {
    pub booking_id: String,
    pub date: String,
    pub time: String,
    pub duration: i64,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub plz: String,
    pub city: String,
    pub units: Option<i64>,
    pub note: Option<String>,
}

/// Best-effort notifier. `notify_*` spawn a task and return immediately;
/// failures are logged, never propagated, and the triggering request is
/// never blocked or rolled back.
#[derive(Clone)]
pub struct Mailer {
    config: SmtpConfig,
    brand: String,
}

impl Mailer {
    pub fn new(config: SmtpConfig, brand: String) -> Self {
        Self { config, brand }
    }

    pub fn enabled(&self) -> bool {
        self.config.host.is_some()
    }

    pub fn notify_booking_created(&self, mail: BookingMail) {
        if !self.enabled() {
            return;
        }
        let mailer = self.clone();
        rt::spawn(async move {
            let subject = format!("Terminbestätigung – {} {}", mail.date, mail.time);
            let table = mailer.details_table(&mail, None);
            let invitee_html = format!(
                r#"<div style="font-family:Arial,sans-serif;max-width:640px;margin:0 auto">
  <h2 style="margin:0 0 8px">{brand} – Terminbestätigung</h2>
  <p style="color:#555;margin:0 0 16px">Vielen Dank für Ihre Buchung!</p>
  {table}
  <p style="color:#666;font-size:12px">Falls Sie Rückfragen haben, antworten Sie bitte auf diese E-Mail.</p>
  <p style="color:#666;font-size:12px">{brand}</p>
</div>"#,
                brand = mailer.brand,
            );
            let admin_html = format!(
                r#"<div style="font-family:Arial,sans-serif;max-width:640px;margin:0 auto">
  <h2 style="margin:0 0 8px">{brand} – Neue Buchung</h2>
  <p style="color:#555;margin:0 0 16px">Ein Kunde hat soeben einen Termin gebucht.</p>
  {table}
</div>"#,
                brand = mailer.brand,
            );

            if let Err(err) = mailer.send(&mail.email, &subject, invitee_html).await {
                log::warn!("Booking confirmation mail failed: {err}");
            }
            let admin_to = mailer.config.admin_to.clone();
            let admin_subject = format!("Neue Buchung – {subject}");
            if let Err(err) = mailer.send(&admin_to, &admin_subject, admin_html).await {
                log::warn!("Booking admin mail failed: {err}");
            }
        });
    }

    pub fn notify_booking_canceled(&self, mail: BookingMail, reason: String) {
        if !self.enabled() {
            return;
        }
        let mailer = self.clone();
        rt::spawn(async move {
            let subject = format!("Terminabsage – {} {}", mail.date, mail.time);
            let table = mailer.details_table(&mail, Some(&reason));
            let invitee_html = format!(
                r#"<div style="font-family:Arial,sans-serif;max-width:640px;margin:0 auto">
  <h2 style="margin:0 0 8px">{brand} – Terminabsage</h2>
  <p style="color:#555;margin:0 0 16px">Ihr Termin wurde storniert.</p>
  {table}
  <p style="color:#666;font-size:12px">Falls Sie Rückfragen haben, antworten Sie bitte auf diese E-Mail.</p>
</div>"#,
                brand = mailer.brand,
            );
            let admin_html = format!(
                r#"<div style="font-family:Arial,sans-serif;max-width:640px;margin:0 auto">
  <h2 style="margin:0 0 8px">{brand} – Buchung storniert</h2>
  {table}
</div>"#,
                brand = mailer.brand,
            );

            if let Err(err) = mailer.send(&mail.email, &subject, invitee_html).await {
                log::warn!("Cancellation mail failed: {err}");
            }
            let admin_to = mailer.config.admin_to.clone();
            if let Err(err) = mailer.send(&admin_to, &subject, admin_html).await {
                log::warn!("Cancellation admin mail failed: {err}");
            }
        });
    }

    fn details_table(&self, mail: &BookingMail, reason: Option<&str>) -> String {
        let mut rows = vec![
            ("Buchungsnummer", mail.booking_id.clone()),
            ("Datum", mail.date.clone()),
            ("Uhrzeit", mail.time.clone()),
            ("Dauer", format!("{} Min.", mail.duration)),
            ("Name", mail.full_name.clone()),
            ("E-Mail", mail.email.clone()),
            ("Telefon", mail.phone.clone()),
            ("Adresse", mail.address.clone()),
            ("PLZ", mail.plz.clone()),
            ("Stadt", mail.city.clone()),
        ];
        if let Some(units) = mail.units {
            rows.push(("Einheiten", units.to_string()));
        }
        rows.push(("Notiz", mail.note.clone().unwrap_or_else(|| "–".to_string())));
        if let Some(reason) = reason {
            rows.push(("Stornogrund", reason.to_string()));
        }

        let cells = rows
            .iter()
            .map(|(label, value)| {
                format!(
                    r#"<tr><td style="padding:6px 10px;border:1px solid #e5e7eb"><b>{label}</b></td><td style="padding:6px 10px;border:1px solid #e5e7eb">{value}</td></tr>"#
                )
            })
            .collect::<String>();
        format!(
            r#"<table style="border-collapse:collapse;border:1px solid #e5e7eb;width:100%;margin:8px 0">{cells}</table>"#
        )
    }

    async fn send(&self, to: &str, subject: &str, html: String) -> Result<(), MailError> {
        let message = Message::builder()
            .from(self.config.from.parse()?)
            .to(to.parse()?)
            .reply_to(self.config.reply_to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html)?;

        let transport = self.transport()?;
        rt::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|_| MailError::Canceled)??;
        Ok(())
    }

    fn transport(&self) -> Result<SmtpTransport, MailError> {
        let host = self.config.host.as_deref().unwrap_or_default();
        let mut builder = SmtpTransport::relay(host)?.port(self.config.port);
        if !self.config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ));
        }
        Ok(builder.build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail() -> BookingMail {
        BookingMail {
            booking_id: "b-1".to_string(),
            date: "2025-04-01".to_string(),
            time: "08:00".to_string(),
            duration: 120,
            full_name: "Max Mustermann".to_string(),
            email: "max@example.com".to_string(),
            phone: "+49 170 1234567".to_string(),
            address: "Musterstr. 1".to_string(),
            plz: "10115".to_string(),
            city: "Berlin".to_string(),
            units: None,
            note: None,
        }
    }

    #[test]
    fn disabled_without_host() {
        let mailer = Mailer::new(SmtpConfig::default(), "Slotbook".to_string());
        assert!(!mailer.enabled());
        // Safe no-op without a runtime because the dispatch bails out first.
        mailer.notify_booking_created(mail());
    }

    #[test]
    fn details_table_covers_optional_fields() {
        let mailer = Mailer::new(SmtpConfig::default(), "Slotbook".to_string());

        let plain = mailer.details_table(&mail(), None);
        assert!(plain.contains("Buchungsnummer"));
        assert!(plain.contains("b-1"));
        assert!(plain.contains("2025-04-01"));
        assert!(plain.contains("120 Min."));
        assert!(plain.contains("Berlin"));
        assert!(!plain.contains("Einheiten"));
        assert!(plain.contains("Notiz"));
        assert!(!plain.contains("Stornogrund"));

        let mut full = mail();
        full.units = Some(3);
        full.note = Some("Hinterhof".to_string());
        let with_reason = mailer.details_table(&full, Some("Kunde verhindert"));
        assert!(with_reason.contains("Einheiten"));
        assert!(with_reason.contains("Hinterhof"));
        assert!(with_reason.contains("Stornogrund"));
        assert!(with_reason.contains("Kunde verhindert"));
    }
}
