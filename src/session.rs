//! Who is looking at the dashboard and what they may see or approve.

use serde::{Deserialize, Serialize};

use crate::error::AccessError;
use crate::models::{Initiative, Subordinate, Supervisors};

/// Signed-in user plus the collaborator they are currently viewing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub email: String,
    #[serde(default)]
    pub role: Option<String>,
    /// Subordinate selected in the "view as" picker.
    #[serde(default)]
    pub view_as: Option<String>,
}

impl SessionContext {
    pub fn new(email: &str) -> Self {
        Self {
            email: email.trim().to_string(),
            ..Default::default()
        }
    }

    pub fn viewing(mut self, view_as: Option<&str>) -> Self {
        self.view_as = view_as
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        self
    }

    /// Whose data the dashboard shows.
    pub fn viewed_email(&self) -> &str {
        self.view_as.as_deref().unwrap_or(&self.email)
    }

    pub fn is_admin(&self, admin_email: &str) -> bool {
        same_email(&self.email, admin_email)
    }
}

fn same_email(a: &str, b: &str) -> bool {
    let a = a.trim();
    !a.is_empty() && a.eq_ignore_ascii_case(b.trim())
}

/// Whether the signed-in user may approve an initiative owned by `owner_email`.
///
/// Supervisors of the owner approve. An owner with no supervisor on record
/// approves their own work; the admin approves anything.
pub fn can_approve(
    session: &SessionContext,
    owner_email: &str,
    supervisors: Option<&Supervisors>,
    admin_email: &str,
) -> bool {
    if session.is_admin(admin_email) {
        return true;
    }

    let bosses: Vec<&str> = supervisors
        .into_iter()
        .flat_map(|s| [s.primary.as_deref(), s.secondary.as_deref()])
        .flatten()
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .collect();

    if bosses.is_empty() {
        return same_email(&session.email, owner_email);
    }
    bosses.iter().any(|boss| same_email(&session.email, boss))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewOption {
    pub label: String,
    pub value: String,
}

/// Entries of the "view as" picker: the user first, then each subordinate once.
pub fn view_options(session: &SessionContext, subordinates: &[Subordinate]) -> Vec<ViewOption> {
    let me = session.email.trim();
    let mut seen = vec![me.to_lowercase()];
    let mut options = vec![ViewOption {
        label: format!("Yo • {me}"),
        value: me.to_string(),
    }];

    for sub in subordinates {
        let email = sub.email.trim();
        if email.is_empty() {
            continue;
        }
        let key = email.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);

        let name = sub.name.trim();
        options.push(ViewOption {
            label: if name.is_empty() {
                email.to_string()
            } else {
                format!("{name} • {email}")
            },
            value: email.to_string(),
        });
    }
    options
}

/// Stories can only be opened on approved initiatives.
pub fn story_access(initiative: &Initiative) -> Result<(), AccessError> {
    if initiative.is_approved() {
        Ok(())
    } else {
        Err(AccessError::AwaitingApproval(initiative.id))
    }
}
