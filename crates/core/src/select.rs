//! Default model choice.
//!
//! The pick runs as a fixed pipeline over the candidate list:
//! version gate, flash gate, version sort, thinking preference. Each stage
//! is a plain function over a slice of references so it can be checked on
//! its own; none of them ever empties the working set.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::llm::Model;

static VERSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\.(\d+)").unwrap());

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    pub const V2: Version = Version { major: 2, minor: 0 };
}

/// First `major.minor` found in `s`.
pub fn extract_version(s: &str) -> Option<Version> {
    let caps = VERSION_RE.captures(s)?;
    Some(Version {
        major: caps[1].parse().ok()?,
        minor: caps[2].parse().ok()?,
    })
}

/// Version of a candidate, read from its id first and then its name.
/// Candidates without one score zero.
pub fn model_version(m: &Model) -> Version {
    extract_version(&m.id)
        .or_else(|| m.name.as_deref().and_then(extract_version))
        .unwrap_or_default()
}

fn mentions(m: &Model, needle: &str) -> bool {
    m.id.to_lowercase().contains(needle)
        || m
            .name
            .as_deref()
            .map(|n| n.to_lowercase().contains(needle))
            .unwrap_or(false)
}

pub fn version_gate(candidates: &[Model]) -> Vec<&Model> {
    let modern: Vec<&Model> = candidates
        .iter()
        .filter(|m| model_version(m) >= Version::V2)
        .collect();
    if modern.is_empty() {
        candidates.iter().collect()
    } else {
        modern
    }
}

pub fn flash_gate<'a>(narrowed: &[&'a Model]) -> Vec<&'a Model> {
    narrowed
        .iter()
        .copied()
        .filter(|m| mentions(m, "flash"))
        .collect()
}

/// Highest version first. `sort_by` is stable, so ties keep list order.
pub fn sort_by_version_desc(models: &mut [&Model]) {
    models.sort_by(|a, b| model_version(b).cmp(&model_version(a)));
}

pub fn prefer_thinking<'a>(sorted: &[&'a Model]) -> Option<&'a Model> {
    sorted
        .iter()
        .copied()
        .find(|m| mentions(m, "think"))
        .or_else(|| sorted.first().copied())
}

/// Pick the default model id. Returns `None` only for an empty list.
pub fn choose_default(candidates: &[Model]) -> Option<&str> {
    let narrowed = version_gate(candidates);
    let mut flash = flash_gate(&narrowed);
    if flash.is_empty() {
        return narrowed.first().map(|m| m.id.as_str());
    }
    sort_by_version_desc(&mut flash);
    prefer_thinking(&flash).map(|m| m.id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<Model> {
        list.iter().map(|s| Model::bare(*s)).collect()
    }

    #[test]
    fn thinking_flash_wins_among_v2() {
        let c = ids(&[
            "gemini-1.5-flash",
            "gemini-2.0-flash-thinking-exp",
            "gemini-2.0-flash",
        ]);
        assert_eq!(choose_default(&c), Some("gemini-2.0-flash-thinking-exp"));
    }

    #[test]
    fn sole_legacy_model_falls_through() {
        let c = ids(&["gemini-1.0-pro"]);
        assert_eq!(choose_default(&c), Some("gemini-1.0-pro"));
    }

    #[test]
    fn no_flash_returns_first_of_narrowed_set() {
        let c = ids(&["gemini-1.5-pro", "gemini-2.5-pro", "gemini-2.0-pro"]);
        assert_eq!(choose_default(&c), Some("gemini-2.5-pro"));
    }

    #[test]
    fn newest_flash_without_thinking() {
        let c = ids(&["gemini-2.0-flash", "gemini-2.5-flash", "gemini-2.5-pro"]);
        assert_eq!(choose_default(&c), Some("gemini-2.5-flash"));
    }

    #[test]
    fn version_ties_keep_list_order() {
        let c = ids(&["gemini-2.0-flash-lite", "gemini-2.0-flash"]);
        assert_eq!(choose_default(&c), Some("gemini-2.0-flash-lite"));
    }

    #[test]
    fn flash_and_think_match_names_case_insensitively() {
        let c = vec![
            Model::new("model-a", "Gemini 2.0 Pro"),
            Model::new("model-b", "Gemini 2.0 FLASH"),
            Model::new("model-c", "Gemini 2.0 Think Flash"),
        ];
        assert_eq!(choose_default(&c), Some("model-c"));
    }

    #[test]
    fn version_comes_from_name_when_id_has_none() {
        let m = Model::new("experimental-x", "Gemini 3.0 Flash");
        assert_eq!(model_version(&m), Version { major: 3, minor: 0 });
        assert_eq!(model_version(&Model::bare("no-version")), Version::default());
    }

    #[test]
    fn minor_versions_compare_numerically() {
        assert!(extract_version("2.10").unwrap() > extract_version("2.5").unwrap());
    }

    #[test]
    fn empty_list_has_no_default() {
        assert_eq!(choose_default(&[]), None);
    }

    #[test]
    fn always_a_member_and_deterministic() {
        let lists = vec![
            ids(&["a", "b"]),
            ids(&["gemini-2.0-flash-exp", "gemini-2.0-flash-thinking-exp-01-21", "gemini-2.5-pro-exp-03-25", "gemini-3.0-flash-exp"]),
            ids(&["x-1.0", "y-think-1.5", "z-flash-0.9"]),
            ids(&["gemini-2.0-flash", "gemini-2.0-flash", "gemini-2.0-flash-think"]),
        ];
        for c in &lists {
            let first = choose_default(c).unwrap();
            assert!(c.iter().any(|m| m.id == first));
            for _ in 0..5 {
                assert_eq!(choose_default(c), Some(first));
            }
        }
    }
}
