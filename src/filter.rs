//! Query-time narrowing of aggregated context.
//!
//! [`filter_lines`] performs lexical inclusion over context lines: an item
//! survives when it contains the query or one of its significant tokens.
//! Headers always survive so the consumer can still tell which sections
//! exist. Output keeps input order.
//!
//! [`rank_projects`] orders the project list: it scores each project by the
//! number of distinct query tokens it contains and sorts by that score.
//! Ranking never removes a project; inclusion is left to [`filter_lines`].

use std::collections::HashSet;

use crate::content::Project;
use crate::models::ContextLine;

/// Tokens of this many characters or fewer are ignored.
const MAX_NOISE_TOKEN_CHARS: usize = 2;

/// Lowercased query tokens longer than two characters, deduplicated in
/// first-seen order.
pub fn query_tokens(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|t| t.chars().count() > MAX_NOISE_TOKEN_CHARS)
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Keep headers plus the items that mention the query.
///
/// An empty query returns the input unchanged. Repeated headers are emitted
/// once.
pub fn filter_lines(lines: &[ContextLine], query: &str) -> Vec<ContextLine> {
    let query = query.trim();
    if query.is_empty() {
        return lines.to_vec();
    }

    let needle = query.to_lowercase();
    let tokens = query_tokens(query);
    let mut seen_headers = HashSet::new();

    lines
        .iter()
        .filter(|line| match line {
            ContextLine::Header(section) => seen_headers.insert(*section),
            ContextLine::Item(text) => {
                let hay = text.to_lowercase();
                hay.contains(&needle) || tokens.iter().any(|t| hay.contains(t.as_str()))
            }
        })
        .cloned()
        .collect()
}

/// Relevance score of one project: distinct matching tokens, plus one when
/// the whole query appears verbatim.
pub fn project_score(project: &Project, query: &str, tokens: &[String]) -> usize {
    let hay = project.searchable_text();
    let token_hits = tokens.iter().filter(|t| hay.contains(t.as_str())).count();
    let exact = usize::from(hay.contains(&query.trim().to_lowercase()));
    token_hits + exact
}

/// Every project, best match first.
///
/// Equal scores keep their input order. An empty query returns the input
/// order unchanged.
pub fn rank_projects<'a>(projects: &'a [Project], query: &str) -> Vec<&'a Project> {
    if query.trim().is_empty() {
        return projects.iter().collect();
    }

    let tokens = query_tokens(query);
    let mut scored: Vec<(usize, &Project)> = projects
        .iter()
        .map(|p| (project_score(p, query, &tokens), p))
        .collect();

    // Vec::sort_by is stable, so ties stay in input order.
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, p)| p).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Section;

    fn item(s: &str) -> ContextLine {
        ContextLine::item(s)
    }

    fn project(title: &str, description: &str) -> Project {
        Project {
            title: title.to_string(),
            description: description.to_string(),
            category: None,
            budget: None,
            period: None,
            technologies: Vec::new(),
        }
    }

    #[test]
    fn empty_query_is_identity() {
        let lines = vec![
            ContextLine::Header(Section::Projects),
            item("apple pie"),
            ContextLine::Header(Section::Projects),
        ];
        assert_eq!(filter_lines(&lines, ""), lines);
        assert_eq!(filter_lines(&lines, "   "), lines);
    }

    #[test]
    fn headers_survive_without_matches() {
        let lines = vec![
            ContextLine::Header(Section::Projects),
            item("apple pie"),
            ContextLine::Header(Section::Songs),
            item("banana split"),
        ];
        let out = filter_lines(&lines, "apple");
        assert_eq!(
            out,
            vec![
                ContextLine::Header(Section::Projects),
                item("apple pie"),
                ContextLine::Header(Section::Songs),
            ]
        );
    }

    #[test]
    fn short_tokens_only_yield_headers() {
        let lines = vec![
            ContextLine::Header(Section::Projects),
            item("a tiny project"),
            ContextLine::Header(Section::Topics),
            item("go to the docs"),
        ];
        let out = filter_lines(&lines, "xy q");
        assert_eq!(
            out,
            vec![
                ContextLine::Header(Section::Projects),
                ContextLine::Header(Section::Topics),
            ]
        );
    }

    #[test]
    fn full_query_substring_matches_even_with_short_tokens() {
        let lines = vec![ContextLine::Header(Section::Songs), item("Song: Go Up")];
        let out = filter_lines(&lines, "go up");
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn token_match_is_case_insensitive() {
        let lines = vec![item("Built with SUPABASE and Next.js"), item("unrelated")];
        let out = filter_lines(&lines, "which supabase projects");
        assert_eq!(out, vec![item("Built with SUPABASE and Next.js")]);
    }

    #[test]
    fn duplicate_headers_are_collapsed() {
        let lines = vec![
            ContextLine::Header(Section::Songs),
            item("Song: Ember"),
            ContextLine::Header(Section::Songs),
            item("Song: Tide"),
        ];
        let out = filter_lines(&lines, "tide");
        assert_eq!(
            out,
            vec![ContextLine::Header(Section::Songs), item("Song: Tide")]
        );
    }

    #[test]
    fn order_is_preserved() {
        let lines = vec![
            item("zeta music"),
            item("alpha music"),
            item("beta music video"),
        ];
        let out = filter_lines(&lines, "music video");
        assert_eq!(out, lines);
    }

    #[test]
    fn tokens_drop_noise_and_duplicates() {
        assert_eq!(
            query_tokens("Is the API an API for me"),
            vec!["the".to_string(), "api".to_string(), "for".to_string()]
        );
    }

    #[test]
    fn rank_sorts_by_distinct_token_hits() {
        let projects = vec![
            project("Recipe app", "cooking"),
            project("Music site", "crowdfunding songs with votes"),
            project("Vote tracker", "songs"),
        ];
        let ranked = rank_projects(&projects, "songs votes crowdfunding");
        let titles: Vec<&str> = ranked.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Music site", "Vote tracker", "Recipe app"]);
    }

    #[test]
    fn rank_keeps_projects_with_no_hits() {
        let projects = vec![project("Recipe app", "cooking")];
        assert_eq!(rank_projects(&projects, "crowdfunding").len(), 1);
    }

    #[test]
    fn rank_ties_keep_input_order() {
        let projects = vec![
            project("First", "rust service"),
            project("Second", "rust cli"),
            project("Third", "rust parser"),
        ];
        let ranked = rank_projects(&projects, "rust");
        let titles: Vec<&str> = ranked.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn rank_with_empty_query_returns_all() {
        let projects = vec![project("A", ""), project("B", "")];
        assert_eq!(rank_projects(&projects, "").len(), 2);
    }
}
