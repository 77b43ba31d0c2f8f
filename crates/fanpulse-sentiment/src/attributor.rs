//! Keyword-based team attribution.
//!
//! Text and keywords go through the same normalisation: mojibake repair,
//! lower-casing, then folding Turkish and other extended Latin letters to
//! ASCII. A team matches when any of its keywords is a substring of the
//! normalised text. Teams are tried in configured order and the first match
//! wins.

use fanpulse_core::{EntityAssignment, TeamConfig};

/// UTF-8 Turkish letters that were decoded as Latin-1/CP1252 somewhere upstream.
const MOJIBAKE: &[(&str, &str)] = &[
    ("Ã§", "ç"),
    ("Ã‡", "Ç"),
    ("ÄŸ", "ğ"),
    ("Äž", "Ğ"),
    ("Ä±", "ı"),
    ("Ä°", "İ"),
    ("Ã¶", "ö"),
    ("Ã–", "Ö"),
    ("ÅŸ", "ş"),
    ("Åž", "Ş"),
    ("Ã¼", "ü"),
    ("Ãœ", "Ü"),
];

#[derive(Debug, Clone)]
struct TeamKeywords {
    slug: String,
    keywords: Vec<String>,
}

/// Immutable keyword table. Cheap to share behind an `Arc`.
#[derive(Debug, Clone)]
pub struct EntityAttributor {
    teams: Vec<TeamKeywords>,
}

impl EntityAttributor {
    #[must_use]
    pub fn new(teams: &[TeamConfig]) -> Self {
        let teams = teams
            .iter()
            .map(|team| TeamKeywords {
                slug: team.slug.clone(),
                keywords: team
                    .keywords
                    .iter()
                    .map(|k| normalize_for_match(k))
                    .filter(|k| !k.is_empty())
                    .collect(),
            })
            .collect();
        Self { teams }
    }

    /// Assign `text` to the first team whose keyword it contains.
    #[must_use]
    pub fn attribute(&self, text: &str) -> EntityAssignment {
        if text.trim().is_empty() {
            return EntityAssignment::Unassigned;
        }

        let normalized = normalize_for_match(text);
        self.teams
            .iter()
            .find(|team| team.keywords.iter().any(|k| normalized.contains(k.as_str())))
            .map_or(EntityAssignment::Unassigned, |team| {
                EntityAssignment::Team(team.slug.clone())
            })
    }

    #[must_use]
    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    #[must_use]
    pub fn contains_team(&self, slug: &str) -> bool {
        self.teams.iter().any(|team| team.slug == slug)
    }
}

/// Repair mojibake, lower-case, and fold to ASCII where a folding exists.
#[must_use]
pub fn normalize_for_match(text: &str) -> String {
    let repaired = repair_mojibake(text);
    let mut out = String::with_capacity(repaired.len());
    for c in repaired.chars() {
        // combining dot left behind by decomposed İ
        if c == '\u{0307}' {
            continue;
        }
        match fold_char(c) {
            Some(folded) => out.push(folded),
            None => out.extend(c.to_lowercase()),
        }
    }
    out
}

/// Replace known mis-decoded Turkish letter sequences with the real letters.
#[must_use]
pub fn repair_mojibake(text: &str) -> String {
    if !text.contains(['Ã', 'Ä', 'Å']) {
        return text.to_string();
    }
    MOJIBAKE
        .iter()
        .fold(text.to_string(), |acc, (broken, fixed)| acc.replace(broken, fixed))
}

fn fold_char(c: char) -> Option<char> {
    let folded = match c {
        'ç' | 'Ç' => 'c',
        'ğ' | 'Ğ' => 'g',
        'ı' | 'I' | 'İ' | 'î' | 'Î' => 'i',
        'ö' | 'Ö' => 'o',
        'ş' | 'Ş' => 's',
        'ü' | 'Ü' | 'û' | 'Û' => 'u',
        'â' | 'Â' => 'a',
        _ => return None,
    };
    Some(folded)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(slug: &str, keywords: &[&str]) -> TeamConfig {
        TeamConfig {
            name: slug.to_string(),
            slug: slug.to_string(),
            league: None,
            country: None,
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
            subreddits: vec![],
        }
    }

    fn attributor() -> EntityAttributor {
        EntityAttributor::new(&[
            team("galatasaray", &["galatasaray", "gala", "cimbom", "sarı-kırmızı"]),
            team("fenerbahce", &["fenerbahçe", "fener", "kanarya"]),
            team("besiktas", &["beşiktaş", "bjk", "kartal"]),
        ])
    }

    #[test]
    fn matches_plain_keyword() {
        assert_eq!(
            attributor().attribute("Cimbom bu akşam çok iyiydi"),
            EntityAssignment::Team("galatasaray".to_string())
        );
    }

    #[test]
    fn folding_matches_ascii_spelling_of_turkish_keyword() {
        assert_eq!(
            attributor().attribute("besiktas kazandi"),
            EntityAssignment::Team("besiktas".to_string())
        );
        assert_eq!(
            attributor().attribute("FENERBAHCE!!"),
            EntityAssignment::Team("fenerbahce".to_string())
        );
    }

    #[test]
    fn dotted_capital_i_folds() {
        assert_eq!(
            attributor().attribute("SARI-KIRMIZI GÜNLER"),
            EntityAssignment::Team("galatasaray".to_string())
        );
        assert_eq!(normalize_for_match("İSTANBUL"), "istanbul");
    }

    #[test]
    fn first_configured_team_wins_when_several_match() {
        assert_eq!(
            attributor().attribute("Fener ile Gala derbisi"),
            EntityAssignment::Team("galatasaray".to_string())
        );
    }

    #[test]
    fn no_match_is_unassigned() {
        assert_eq!(
            attributor().attribute("basketbol maçı berbattı"),
            EntityAssignment::Unassigned
        );
    }

    #[test]
    fn knows_configured_slugs() {
        let attributor = attributor();
        assert_eq!(attributor.team_count(), 3);
        assert!(attributor.contains_team("besiktas"));
        assert!(!attributor.contains_team("trabzonspor"));
    }

    #[test]
    fn empty_text_is_unassigned() {
        assert_eq!(attributor().attribute("   "), EntityAssignment::Unassigned);
        assert_eq!(attributor().attribute(""), EntityAssignment::Unassigned);
    }

    #[test]
    fn repairs_mojibake_before_matching() {
        assert_eq!(repair_mojibake("BeÅŸiktaÅŸ"), "Beşiktaş");
        assert_eq!(repair_mojibake("FenerbahÃ§e"), "Fenerbahçe");
        assert_eq!(
            attributor().attribute("BeÅŸiktaÅŸ iyi oynadÄ±"),
            EntityAssignment::Team("besiktas".to_string())
        );
    }

    #[test]
    fn plain_text_passes_through_repair() {
        assert_eq!(repair_mojibake("plain text"), "plain text");
    }

    #[test]
    fn is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EntityAttributor>();
    }
}
