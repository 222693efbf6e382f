//! Visitor notification emails and the decision links they carry.
//!
//! `notify` mails the contact person an Approve and a Reject link. Following a link
//! lands on `decide`, which records the decision and renders a small HTML page.
//! Links are single-use: only a visitor that is still pending can be decided.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::{AuthUser, LinkAction, sign_link, verify_link},
    config::AppConfig,
    error::AppError,
    mailer::{MailerState, OutgoingEmail},
    models::{MessageResponse, NotifyVisitorRequest, Role, Visitor, VisitorStatus},
    policy::{Resource, authorize, resolve_scope},
    repository::RepositoryState,
};

pub const NOTIFICATION_SUBJECT: &str = "New Visitor Request - Action Required";

/// NotificationService
///
/// Composes and sends the decision email, and applies decisions coming back through
/// the links.
pub struct NotificationService {
    repo: RepositoryState,
    mailer: MailerState,
    config: AppConfig,
}

impl NotificationService {
    pub fn new(repo: RepositoryState, mailer: MailerState, config: AppConfig) -> Self {
        Self {
            repo,
            mailer,
            config,
        }
    }

    /// notify
    ///
    /// Sends the decision email for one visitor. The recipient is the request's
    /// `contactEmail`, falling back to the one stored on the visitor.
    pub async fn notify(
        &self,
        identity: &AuthUser,
        req: NotifyVisitorRequest,
    ) -> Result<MessageResponse, AppError> {
        authorize(identity, &[Role::Admin, Role::Receptionist])?;
        req.validate()?;
        let scope = resolve_scope(self.repo.as_ref(), identity, Resource::Visitors).await?;

        let visitor = self
            .repo
            .get_visitor(req.visitor_id)
            .await?
            .filter(|v| scope.admits(v))
            .ok_or_else(|| AppError::NotFound("Visitor not found".to_string()))?;

        let recipient = req
            .contact_email
            .map(|email| email.trim().to_string())
            .filter(|email| !email.is_empty())
            .or_else(|| visitor.contact_email.clone())
            .ok_or_else(|| AppError::Validation("Contact email is required".to_string()))?;

        let email = OutgoingEmail {
            from: self.config.mail_from.clone(),
            to: recipient,
            subject: NOTIFICATION_SUBJECT.to_string(),
            html: self.compose(&visitor)?,
        };
        let to = email.to.clone();

        if let Err(reason) = self.mailer.send(email).await {
            tracing::warn!(visitor_id = %visitor.id, %to, %reason, "notification email failed");
            return Err(AppError::Delivery(reason));
        }

        tracing::info!(visitor_id = %visitor.id, %to, "notification email sent");
        Ok(MessageResponse::new("Notification email sent"))
    }

    /// decision_link
    ///
    /// The absolute URL of an approve or reject link. With signed links enabled the URL
    /// carries a token bound to this visitor and action.
    pub fn decision_link(&self, visitor_id: Uuid, action: LinkAction) -> Result<String, AppError> {
        let base = format!(
            "{}/api/visitors/{}/{}",
            self.config.public_url.trim_end_matches('/'),
            action.as_str(),
            visitor_id
        );
        if !self.config.signed_links {
            return Ok(base);
        }
        let token = sign_link(visitor_id, action, &self.config)?;
        Ok(format!("{}?token={}", base, token))
    }

    fn compose(&self, visitor: &Visitor) -> Result<String, AppError> {
        let approve = self.decision_link(visitor.id, LinkAction::Approve)?;
        let reject = self.decision_link(visitor.id, LinkAction::Reject)?;

        Ok(format!(
            r#"<h2>New Visitor Request</h2>
<p>A new visitor has been added:</p>
<p><strong>Name:</strong> {name}</p>
<p><strong>Email:</strong> {email}</p>
<p><strong>Phone:</strong> {phone}</p>
<p>Please approve or reject this visitor:</p>
<p>
  <a href="{approve}" style="background-color: #4CAF50; color: white; padding: 10px 20px; text-decoration: none; border-radius: 5px;">Approve</a>
  <a href="{reject}" style="background-color: #f44336; color: white; padding: 10px 20px; text-decoration: none; border-radius: 5px; margin-left: 10px;">Reject</a>
</p>"#,
            name = escape_html(&visitor.name),
            email = escape_html(&visitor.email),
            phone = escape_html(&visitor.phone),
            approve = escape_html(&approve),
            reject = escape_html(&reject),
        ))
    }

    /// decide
    ///
    /// Applies the decision behind a followed link. The write is conditional on the
    /// visitor still being pending, so a second click (or the other link) changes nothing.
    pub async fn decide(
        &self,
        visitor_id: Uuid,
        action: LinkAction,
        token: Option<&str>,
    ) -> Result<DecisionPage, AppError> {
        if self.config.signed_links {
            let valid = token
                .map(|t| verify_link(t, visitor_id, action, &self.config.jwt_secret).is_ok())
                .unwrap_or(false);
            if !valid {
                tracing::warn!(%visitor_id, action = action.as_str(), "rejected decision link");
                return Ok(self.page(DecisionOutcome::InvalidLink));
            }
        }

        let status = match action {
            LinkAction::Approve => VisitorStatus::Allowed,
            LinkAction::Reject => VisitorStatus::Rejected,
        };

        // A visitor reset to pending between the write and the re-read gets another try.
        let mut attempts = 0;
        let outcome = loop {
            attempts += 1;
            if let Some(updated) = self
                .repo
                .set_visitor_status(visitor_id, status, Some(VisitorStatus::Pending))
                .await?
            {
                tracing::info!(%visitor_id, status = updated.status.as_str(), "visitor decided via link");
                break DecisionOutcome::Decided(updated, action);
            }
            match self.repo.get_visitor(visitor_id).await? {
                None => break DecisionOutcome::NotFound,
                Some(current) if current.status != VisitorStatus::Pending => {
                    break DecisionOutcome::AlreadyDecided(current);
                }
                Some(_) if attempts >= 3 => {
                    return Err(AppError::Internal(format!(
                        "visitor {} stayed pending but could not be decided",
                        visitor_id
                    )));
                }
                Some(_) => continue,
            }
        };
        Ok(self.page(outcome))
    }

    fn page(&self, outcome: DecisionOutcome) -> DecisionPage {
        outcome.render(&self.config.frontend_url)
    }
}

/// DecisionOutcome
///
/// What following a decision link amounted to.
#[derive(Debug)]
pub enum DecisionOutcome {
    Decided(Visitor, LinkAction),
    AlreadyDecided(Visitor),
    NotFound,
    InvalidLink,
}

impl DecisionOutcome {
    pub fn render(&self, frontend_url: &str) -> DecisionPage {
        let back = format!(
            r#"<p><a href="{}/visitors">Return to Visitors</a></p>"#,
            escape_html(frontend_url.trim_end_matches('/'))
        );

        let (status, body) = match self {
            DecisionOutcome::Decided(visitor, LinkAction::Approve) => (
                StatusCode::OK,
                format!(
                    "<h2>Visitor Approved</h2>\n<p>The visitor {} has been approved.</p>",
                    escape_html(&visitor.name)
                ),
            ),
            DecisionOutcome::Decided(visitor, LinkAction::Reject) => (
                StatusCode::OK,
                format!(
                    "<h2>Visitor Rejected</h2>\n<p>The visitor {} has been rejected.</p>",
                    escape_html(&visitor.name)
                ),
            ),
            DecisionOutcome::AlreadyDecided(visitor) => (
                StatusCode::CONFLICT,
                format!(
                    "<h2>Visitor Already Decided</h2>\n<p>The visitor {} has already been {}.</p>",
                    escape_html(&visitor.name),
                    visitor.status.as_str()
                ),
            ),
            DecisionOutcome::NotFound => (
                StatusCode::NOT_FOUND,
                "<h2>Visitor not found</h2>".to_string(),
            ),
            DecisionOutcome::InvalidLink => (
                StatusCode::FORBIDDEN,
                "<h2>Link invalid</h2>\n<p>This link is invalid or has expired.</p>".to_string(),
            ),
        };

        DecisionPage {
            status,
            html: format!("{}\n{}", body, back),
        }
    }
}

/// DecisionPage
///
/// A rendered HTML answer to a decision link.
#[derive(Debug, Clone)]
pub struct DecisionPage {
    pub status: StatusCode,
    pub html: String,
}

impl IntoResponse for DecisionPage {
    fn into_response(self) -> Response {
        (self.status, Html(self.html)).into_response()
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
