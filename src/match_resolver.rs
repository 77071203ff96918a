//! Canonical match selection and row-cell formatting.

use log::{info, warn};

use crate::metadata_client::GameRecord;

pub const NO_MATCHING_GAMES: &str = "NO MATCHING GAMES";
pub const NO_EXACT_MATCHES: &str = "NO EXACT MATCHES";
pub const CHECK_MANUALLY: &str = "CHECK IGDB MANUALLY";

/// Outcome of matching one sheet title against search candidates.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched(GameRecord),
    /// More than one candidate matched the title exactly.
    Ambiguous,
    /// Several candidates, none named exactly like the title.
    NoExactMatch { candidate_names: Vec<String> },
    NoCandidates,
}

impl MatchOutcome {
    /// Serializes the outcome into the cells appended to a pending row.
    pub fn into_cells(self) -> Vec<String> {
        match self {
            Self::Matched(record) => format_record(&record),
            Self::Ambiguous => vec![CHECK_MANUALLY.to_string()],
            Self::NoExactMatch { candidate_names } => {
                vec![NO_EXACT_MATCHES.to_string(), candidate_names.join(",")]
            }
            Self::NoCandidates => vec![NO_MATCHING_GAMES.to_string()],
        }
    }
}

/// Picks the canonical record for `title`.
///
/// A lone candidate is accepted regardless of its name. With several
/// candidates only case-insensitive exact name matches survive.
pub fn resolve_match(title: &str, mut candidates: Vec<GameRecord>) -> MatchOutcome {
    if candidates.is_empty() {
        warn!("No matching games found for {title}");
        return MatchOutcome::NoCandidates;
    }

    if candidates.len() == 1 {
        let record = candidates.remove(0);
        info!("Adding game {} to sheet", record.name);
        return MatchOutcome::Matched(record);
    }

    info!("Multiple matches found for {title}, looking for exact matches");
    let wanted = title.to_uppercase();
    let candidate_names: Vec<String> = candidates
        .iter()
        .map(|record| record.name.clone())
        .collect();
    let mut exact: Vec<GameRecord> = candidates
        .into_iter()
        .filter(|record| record.name.to_uppercase() == wanted)
        .collect();

    match exact.len() {
        0 => {
            warn!("No exact matches found for {title}, update the title column with the correct name");
            MatchOutcome::NoExactMatch { candidate_names }
        }
        1 => {
            let record = exact.remove(0);
            info!("Adding game {} to sheet", record.name);
            MatchOutcome::Matched(record)
        }
        _ => {
            warn!("Multiple exact matches found for {title}, update sheet manually");
            MatchOutcome::Ambiguous
        }
    }
}

/// Formats a matched record as `[summary, genres, keywords, rating, storefront]`.
///
/// Missing summary or rating render as empty cells.
pub fn format_record(record: &GameRecord) -> Vec<String> {
    vec![
        record.summary.clone().unwrap_or_default(),
        record.genres.join(","),
        record.keywords.join(","),
        record
            .rating
            .map(|rating| rating.to_string())
            .unwrap_or_default(),
        record.storefront_links.join(","),
    ]
}
