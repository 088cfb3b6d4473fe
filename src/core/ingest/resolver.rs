use tracing::{debug, warn};

use super::IngestError;
use crate::core::directory::{AccessKind, DirectoryClient, DirectoryError, Entity};

/// A free-form group reference as typed by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupReference {
    /// Private invite hash taken from a `t.me/+hash` or `t.me/joinchat/hash` link.
    Invite(String),
    /// Public username, with any link prefix or `@` removed.
    Handle(String),
}

impl GroupReference {
    pub fn parse(raw: &str) -> Self {
        let input = raw.trim();
        if !is_link(input) {
            return GroupReference::Handle(input.trim_start_matches('@').to_string());
        }

        let segment = last_path_segment(input);
        if input.contains('+') || input.contains("/joinchat/") {
            // `t.me/joinchat/` with nothing after it carries no token.
            let token = match segment.trim_start_matches('+') {
                "joinchat" => "",
                token => token,
            };
            GroupReference::Invite(token.to_string())
        } else {
            GroupReference::Handle(segment.trim_start_matches('@').to_string())
        }
    }
}

fn is_link(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://") || input.starts_with("t.me/")
}

fn last_path_segment(link: &str) -> String {
    let absolute = if link.starts_with("t.me/") {
        format!("https://{}", link)
    } else {
        link.to_string()
    };

    // A link with no path (`https://t.me/`) has no segment: never fall back to the host.
    match url::Url::parse(&absolute) {
        Ok(url) => url
            .path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
            .unwrap_or_default()
            .to_string(),
        Err(_) => link
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

/// Resolve a group reference to an entity the account can read.
///
/// Invites are imported (which implies membership). Handles are resolved and then joined
/// best-effort: a failed join is logged and ignored as long as the entity was obtained.
pub async fn resolve_and_join(
    client: &dyn DirectoryClient,
    reference: &str,
) -> Result<Entity, IngestError> {
    match GroupReference::parse(reference) {
        GroupReference::Invite(token) => {
            if token.is_empty() {
                return Err(IngestError::UnresolvableGroup(DirectoryError::InviteInvalid));
            }
            let mut entity = client
                .import_invite(&token)
                .await
                .map_err(IngestError::UnresolvableGroup)?;
            entity.access = AccessKind::InviteOnly;
            Ok(entity)
        }
        GroupReference::Handle(handle) => {
            if handle.is_empty() {
                return Err(IngestError::UnresolvableGroup(DirectoryError::NotFound(
                    "empty group reference".to_string(),
                )));
            }
            let entity = client
                .resolve(&handle)
                .await
                .map_err(IngestError::UnresolvableGroup)?;

            match client.join(&entity).await {
                Ok(()) => debug!("Joined '{}' ({})", entity.title, entity.id),
                Err(DirectoryError::AlreadyMember) => {
                    debug!("Already a participant of '{}'", entity.title)
                }
                Err(e) => warn!(
                    "Join of '{}' ({}) failed, continuing without it: {}",
                    entity.title, entity.id, e
                ),
            }
            Ok(entity)
        }
    }
}
