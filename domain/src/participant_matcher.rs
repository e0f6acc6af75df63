//! Matches Meet participant emails to program members.
//!
//! Three rules run in order: an exact directory hit, an operator-confirmed
//! mapping, and a local-part heuristic for addresses on the workspace domain.
//! Each rule carries its own confidence, and an ambiguous heuristic hit is
//! treated as no match at all. False attendance is worse than missed
//! attendance.

use crate::error::Error;
use email_address::EmailAddress;
use entity::{email_mappings, users, Id};
use entity_api::{email_mapping, user};
use log::*;
use sea_orm::DatabaseConnection;
use std::collections::HashMap;

/// Confidence assigned when the participant email is a member's directory email.
pub const EXACT_MATCH_CONFIDENCE: f64 = 1.0;

/// Confidence assigned by the workspace local-part heuristic.
pub const DOMAIN_MATCH_CONFIDENCE: f64 = 0.8;

/// Local parts shorter than this are too generic to compare.
const MIN_LOCAL_OVERLAP: usize = 3;

/// A participant resolved to a member, with how sure we are.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    pub user_id: Id,
    pub confidence: f64,
}

pub struct Matcher {
    users_by_email: HashMap<String, Id>,
    mappings_by_email: HashMap<String, Match>,
    // "@<workspace domain>", the eligibility gate for the local-part rule
    workspace_suffix: Option<String>,
    member_locals: Vec<(String, Id)>,
}

impl Matcher {
    pub fn new(
        users: &[users::Model],
        mappings: &[email_mappings::Model],
        workspace_domain: Option<String>,
    ) -> Self {
        let users_by_email: HashMap<String, Id> = users
            .iter()
            .map(|u| (u.email.to_lowercase(), u.id))
            .collect();

        let mappings_by_email: HashMap<String, Match> = mappings
            .iter()
            .map(|m| {
                (
                    m.external_email.to_lowercase(),
                    Match {
                        user_id: m.user_id,
                        confidence: m.confidence_level.score(),
                    },
                )
            })
            .collect();

        let member_locals = users
            .iter()
            .filter_map(|u| normalized_local(&u.email).map(|local| (local, u.id)))
            .collect();

        Self {
            users_by_email,
            mappings_by_email,
            workspace_suffix: workspace_domain.map(|d| format!("@{}", d.to_lowercase())),
            member_locals,
        }
    }

    /// Loads the full directory and mapping table for one run's worth of
    /// matching.
    pub async fn load(
        db: &DatabaseConnection,
        workspace_domain: Option<String>,
    ) -> Result<Self, Error> {
        let users = user::all(db).await?;
        let mappings = email_mapping::all(db).await?;
        info!(
            "Matcher loaded {} members and {} email mappings",
            users.len(),
            mappings.len()
        );
        Ok(Self::new(&users, &mappings, workspace_domain))
    }

    /// Resolves one participant email through the rule chain. `None` means no
    /// member could be attributed with acceptable confidence.
    pub fn match_email(&self, participant_email: &str) -> Option<Match> {
        let email = participant_email.to_lowercase();

        // Phone dial-ins arrive as bare numbers; they can never match.
        if !EmailAddress::is_valid(&email) {
            debug!("Participant identifier {email:?} is not an email address");
            return None;
        }

        if let Some(user_id) = self.users_by_email.get(&email) {
            return Some(Match {
                user_id: *user_id,
                confidence: EXACT_MATCH_CONFIDENCE,
            });
        }

        if let Some(matched) = self.mappings_by_email.get(&email) {
            debug!("Matched {email} through a confirmed mapping");
            return Some(*matched);
        }

        self.local_part_match(&email)
    }

    /// Workspace addresses the directory does not list verbatim, such as dot
    /// or send-as aliases, are attributed by local part when exactly one
    /// member's mailbox resembles them. Addresses outside the workspace
    /// domain only ever match through the directory or a curated mapping.
    fn local_part_match(&self, email: &str) -> Option<Match> {
        let suffix = self.workspace_suffix.as_deref()?;
        if !email.ends_with(suffix) {
            return None;
        }

        let local = normalized_local(email)?;
        if local.len() < MIN_LOCAL_OVERLAP {
            return None;
        }

        let mut candidates = self.member_locals.iter().filter(|(member_local, _)| {
            member_local.len() >= MIN_LOCAL_OVERLAP
                && (local.contains(member_local.as_str()) || member_local.contains(local.as_str()))
        });

        let (_, user_id) = candidates.next()?;
        if candidates.next().is_some() {
            debug!("Participant {email} resembles more than one member mailbox; leaving unmatched");
            return None;
        }

        debug!("Matched {email} to a member mailbox by local part");
        Some(Match {
            user_id: *user_id,
            confidence: DOMAIN_MATCH_CONFIDENCE,
        })
    }
}

/// The local part with dots and plus-tags stripped, lowercased. "Carol.Silva+meet"
/// and "carolsilva" normalize identically.
fn normalized_local(email: &str) -> Option<String> {
    let (local, _) = email.split_once('@')?;
    let local = local.split('+').next().unwrap_or(local);
    let cleaned: String = local
        .chars()
        .filter(|c| *c != '.')
        .map(|c| c.to_ascii_lowercase())
        .collect();
    (!cleaned.is_empty()).then_some(cleaned)
}
