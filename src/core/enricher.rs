//! Contributor and author enrichment from version-control history.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::adapters::HistorySource;
use crate::domain::{ContributorStat, Enrichment};
use crate::error::HistoryError;

use super::avatar::AvatarResolver;

/// A name/email pair parsed from a history line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub name: String,

    /// Lowercased
    pub email: String,
}

/// Parse `Name <email>`: the name is everything before the last `<`, the
/// email is the bracketed text after it.
pub fn parse_identity(text: &str) -> Result<Identity, HistoryError> {
    let malformed = || HistoryError::MalformedLine(text.to_string());

    let open = text.rfind('<').ok_or_else(malformed)?;
    let rest = &text[open + 1..];
    let close = rest.find('>').ok_or_else(malformed)?;

    let email = rest[..close].trim();
    if email.is_empty() {
        return Err(malformed());
    }

    Ok(Identity {
        name: text[..open].trim().to_string(),
        email: email.to_lowercase(),
    })
}

/// Parse a contribution summary line: `<count>\t<name> <<email>>`
pub fn parse_shortlog_line(line: &str) -> Result<(u64, Identity), HistoryError> {
    let malformed = || HistoryError::MalformedLine(line.to_string());

    let (count, identity) = line.trim().split_once('\t').ok_or_else(malformed)?;
    let count = count.trim().parse::<u64>().map_err(|_| malformed())?;

    Ok((count, parse_identity(identity)?))
}

/// Fold entries that share an email into one, summing their counts.
///
/// Shortlog groups by the exact `name <email>` text, so one person committing
/// under differently-cased addresses shows up on several lines. The first
/// name seen wins and first-seen order is kept.
pub fn merge_by_email(entries: Vec<(u64, Identity)>) -> Vec<(u64, Identity)> {
    let mut merged: Vec<(u64, Identity)> = Vec::with_capacity(entries.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for (count, identity) in entries {
        match positions.get(&identity.email) {
            Some(&i) => merged[i].0 += count,
            None => {
                positions.insert(identity.email.clone(), merged.len());
                merged.push((count, identity));
            }
        }
    }

    merged
}

/// Derives contributors and the original author for a source path
pub struct Enricher {
    history: Arc<dyn HistorySource>,
    avatars: AvatarResolver,
}

impl Enricher {
    pub fn new(history: Arc<dyn HistorySource>, avatars: AvatarResolver) -> Self {
        Self { history, avatars }
    }

    /// Compute the full enrichment snapshot for `path`.
    ///
    /// Each distinct contributor email and the author get their own avatar
    /// lookup; nothing is cached across calls.
    pub async fn enrich(&self, path: &Path) -> Result<Enrichment, HistoryError> {
        let lines = self.history.full_history(path).await?;

        // Parse everything before any network call so a bad line fails fast
        let parsed = lines
            .iter()
            .map(|line| parse_shortlog_line(line))
            .collect::<Result<Vec<_>, _>>()?;
        let parsed = merge_by_email(parsed);

        let mut contributors = Vec::with_capacity(parsed.len());
        for (contributions, identity) in parsed {
            let avatar = self.avatars.resolve(&identity.email).await;
            contributors.push(ContributorStat {
                name: identity.name,
                email: identity.email,
                contributions,
                avatar,
            });
        }

        let author_line = self
            .history
            .first_introducing_commit(path)
            .await?
            .ok_or_else(|| HistoryError::NoIntroducingCommit(path.display().to_string()))?;
        let author = parse_identity(&author_line)?;
        let author_avatar = self.avatars.resolve(&author.email).await;

        debug!(
            path = %path.display(),
            contributors = contributors.len(),
            author = %author.email,
            "Enriched from history"
        );

        Ok(Enrichment {
            contributors,
            author_name: author.name,
            author_email: author.email,
            author_avatar,
        })
    }
}
