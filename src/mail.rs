use crate::config::Mail as MailConfig;
use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Message, SmtpTransport, Transport,
};
use tracing::{debug, info};

/// Sends the report over an authenticated STARTTLS SMTP session.
pub struct SmtpMailer {
    from: String,
    to: Vec<String>,
    subject: String,
    host: String,
    port: Option<u16>,
    user: String,
    pass: String,
}

impl SmtpMailer {
    pub fn from_config(cfg: &MailConfig) -> Result<Self> {
        for (key, val) in [
            ("from", &cfg.from),
            ("to", &cfg.to),
            ("server", &cfg.server),
            ("user", &cfg.user),
        ] {
            if val.trim().is_empty() {
                return Err(anyhow!("mail.{key} is not set"));
            }
        }

        let to = split_recipients(&cfg.to);
        if to.is_empty() {
            return Err(anyhow!("mail.to has no recipients"));
        }
        let (host, port) = split_server(&cfg.server)?;

        Ok(Self {
            from: cfg.from.clone(),
            to,
            subject: cfg.subject.clone(),
            host,
            port,
            user: cfg.user.clone(),
            pass: decode_password(&cfg.pass)?,
        })
    }

    pub fn recipients(&self) -> &[String] {
        &self.to
    }

    pub fn build_message(&self, body: &str) -> Result<Message> {
        let from: Mailbox = self
            .from
            .parse()
            .with_context(|| format!("invalid mail.from: {}", self.from))?;
        let mut builder = Message::builder()
            .from(from)
            .subject(self.subject.clone())
            .header(ContentType::TEXT_PLAIN);
        for rcpt in &self.to {
            let mbox: Mailbox = rcpt
                .parse()
                .with_context(|| format!("invalid recipient: {rcpt}"))?;
            builder = builder.to(mbox);
        }
        builder
            .body(body.to_string())
            .with_context(|| "building message")
    }

    pub fn send(&self, body: &str) -> Result<()> {
        let message = self.build_message(body)?;

        let mut transport = SmtpTransport::starttls_relay(&self.host)
            .with_context(|| format!("smtp relay: {}", self.host))?
            .credentials(Credentials::new(self.user.clone(), self.pass.clone()));
        if let Some(port) = self.port {
            transport = transport.port(port);
        }
        debug!("smtp connect host={} port={:?}", self.host, self.port);

        transport
            .build()
            .send(&message)
            .with_context(|| format!("sending mail via {}", self.host))?;
        info!("report mailed to {}", self.to.join(", "));
        Ok(())
    }
}

/// Splits a `,`/`;` separated recipient list, ignoring spaces and empty entries.
pub fn split_recipients(raw: &str) -> Vec<String> {
    let compact = raw.replace(' ', "");
    compact
        .split([',', ';'])
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn decode_password(encoded: &str) -> Result<String> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .with_context(|| "mail.pass is not valid base64")?;
    String::from_utf8(bytes).with_context(|| "mail.pass is not valid UTF-8")
}

fn split_server(raw: &str) -> Result<(String, Option<u16>)> {
    match raw.trim().rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse()
                .with_context(|| format!("invalid mail.server port: {raw}"))?;
            Ok((host.to_string(), Some(port)))
        }
        None => Ok((raw.trim().to_string(), None)),
    }
}
