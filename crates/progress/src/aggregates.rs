//! Derived aggregates over the catalog and a user's progress.
//!
//! All functions here are pure; the engine calls them on its current state.

use std::collections::{HashMap, HashSet};

use buildboard_core::{Catalog, Project, ProjectId, ProjectStatus, Time, UserProgress};
use serde::Serialize;

use crate::resolve::resolve_status;

/// Number of entries stored as completed.
pub fn completed_count(progress: &UserProgress) -> usize {
    progress.values().filter(|e| e.is_completed()).count()
}

fn is_completed(progress: &UserProgress, project: &Project) -> bool {
    progress.get(&project.id).is_some_and(|e| e.is_completed())
}

fn completed<'a>(catalog: &'a Catalog, progress: &'a UserProgress) -> impl Iterator<Item = &'a Project> {
    catalog.iter().filter(move |p| is_completed(progress, p))
}

fn dedup_first_seen<'a>(items: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen: HashSet<&'a String> = HashSet::new();
    items
        .filter(|item| seen.insert(*item))
        .cloned()
        .collect()
}

/// Tools of completed projects, deduplicated in catalog order.
pub fn unique_tools(catalog: &Catalog, progress: &UserProgress) -> Vec<String> {
    dedup_first_seen(completed(catalog, progress).flat_map(|p| p.tools.iter()))
}

/// Skills of completed projects, deduplicated in catalog order.
pub fn unique_skills(catalog: &Catalog, progress: &UserProgress) -> Vec<String> {
    dedup_first_seen(completed(catalog, progress).flat_map(|p| p.skills.iter()))
}

/// First project in step order that `status` reports as unlocked or in
/// progress.
pub fn next_unlocked_project<'a>(
    catalog: &'a Catalog,
    status: impl Fn(&ProjectId) -> ProjectStatus,
) -> Option<&'a Project> {
    catalog
        .iter()
        .find(|p| matches!(status(&p.id), ProjectStatus::Unlocked | ProjectStatus::InProgress))
}

/// `done / total` as a whole percentage, rounded half up.
pub fn percent(done: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((done as f64 / total as f64) * 100.0).round() as u32
}

/// How much of one skill the learner has covered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillCoverage {
    /// Skill name
    pub skill: String,
    /// Projects in the catalog teaching it
    pub total: usize,
    /// Of those, completed
    pub done: usize,
    /// Rounded percentage
    pub percent: u32,
}

/// Per-skill coverage across the whole catalog, highest percentage first.
/// Ties keep first-seen order.
pub fn skill_coverage(catalog: &Catalog, progress: &UserProgress) -> Vec<SkillCoverage> {
    let all_skills = dedup_first_seen(catalog.iter().flat_map(|p| p.skills.iter()));
    let mut coverage: Vec<SkillCoverage> = all_skills
        .into_iter()
        .map(|skill| {
            let teaching: Vec<&Project> = catalog.iter().filter(|p| p.skills.contains(&skill)).collect();
            let done = teaching.iter().filter(|p| is_completed(progress, p)).count();
            SkillCoverage {
                percent: percent(done, teaching.len()),
                total: teaching.len(),
                done,
                skill,
            }
        })
        .collect();
    coverage.sort_by(|a, b| b.percent.cmp(&a.percent));
    coverage
}

/// How often a tool was used across completed projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolUsage {
    /// Tool name
    pub tool: String,
    /// Completed projects using it
    pub count: usize,
}

/// Tool counts over completed projects, most used first.
/// Ties keep first-seen order.
pub fn tool_usage(catalog: &Catalog, progress: &UserProgress) -> Vec<ToolUsage> {
    let mut order: Vec<&String> = Vec::new();
    let mut counts: HashMap<&String, usize> = HashMap::new();
    for tool in completed(catalog, progress).flat_map(|p| p.tools.iter()) {
        let count = counts.entry(tool).or_insert(0);
        if *count == 0 {
            order.push(tool);
        }
        *count += 1;
    }

    let mut usage: Vec<ToolUsage> = order
        .into_iter()
        .map(|tool| ToolUsage {
            tool: tool.clone(),
            count: counts[tool],
        })
        .collect();
    usage.sort_by(|a, b| b.count.cmp(&a.count));
    usage
}

/// Completed projects, most recently completed first.
pub fn completed_projects<'a>(catalog: &'a Catalog, progress: &UserProgress) -> Vec<&'a Project> {
    let completed_at = |p: &Project| -> Option<Time> { progress.get(&p.id).and_then(|e| e.completed_at) };
    let mut done: Vec<&Project> = catalog.iter().filter(|p| is_completed(progress, p)).collect();
    // undated completions sort last
    done.sort_by(|a, b| completed_at(b).cmp(&completed_at(a)));
    done
}

/// Everything the dashboard shows, computed in one pass over the state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSummary {
    /// Entries stored as completed
    pub completed_count: usize,
    /// Projects on the board
    pub total: usize,
    /// Rounded completion percentage
    pub percent_complete: u32,
    /// Tools of completed projects
    pub unique_tools: Vec<String>,
    /// Skills of completed projects
    pub unique_skills: Vec<String>,
    /// Skill coverage, highest first
    pub skill_coverage: Vec<SkillCoverage>,
    /// Tool usage, most used first
    pub tool_usage: Vec<ToolUsage>,
    /// Completed projects, most recent first
    pub completed_projects: Vec<ProjectId>,
    /// Next project to work on
    pub next_project: Option<ProjectId>,
}

impl ProgressSummary {
    /// Compute the summary for a signed-in user.
    pub fn compute(catalog: &Catalog, progress: &UserProgress) -> Self {
        Self::compute_with(catalog, progress, |id| resolve_status(catalog, progress, id).status())
    }

    /// Compute the summary, picking the next project by `status`.
    pub fn compute_with(
        catalog: &Catalog,
        progress: &UserProgress,
        status: impl Fn(&ProjectId) -> ProjectStatus,
    ) -> Self {
        let completed_count = completed_count(progress);
        Self {
            completed_count,
            total: catalog.len(),
            percent_complete: percent(completed_count, catalog.len()),
            unique_tools: unique_tools(catalog, progress),
            unique_skills: unique_skills(catalog, progress),
            skill_coverage: skill_coverage(catalog, progress),
            tool_usage: tool_usage(catalog, progress),
            completed_projects: completed_projects(catalog, progress)
                .into_iter()
                .map(|p| p.id.clone())
                .collect(),
            next_project: next_unlocked_project(catalog, status).map(|p| p.id.clone()),
        }
    }

    /// Whether every project on the board is completed.
    pub fn is_journey_complete(&self) -> bool {
        self.completed_count >= self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{catalog, entry};
    use crate::resolve::resolve_signed_out;
    use buildboard_core::{EntryStatus, ProgressEntry};
    use chrono::{Duration, Utc};

    #[test]
    fn test_counts_grow_one_completion_at_a_time() {
        let catalog = catalog(3);
        let mut progress = UserProgress::new();
        assert_eq!(completed_count(&progress), 0);
        assert!(unique_tools(&catalog, &progress).is_empty());

        progress.insert("p1".into(), entry(EntryStatus::Completed));
        assert_eq!(completed_count(&progress), 1);
        assert_eq!(unique_tools(&catalog, &progress), vec!["tool-1", "shared-tool"]);
        assert_eq!(unique_skills(&catalog, &progress), vec!["skill-1", "shared-skill"]);

        progress.insert("p2".into(), entry(EntryStatus::Completed));
        assert_eq!(completed_count(&progress), 2);
        assert_eq!(unique_tools(&catalog, &progress), vec!["tool-1", "shared-tool", "tool-2"]);
        assert_eq!(
            unique_skills(&catalog, &progress),
            vec!["skill-1", "shared-skill", "skill-2"]
        );
    }

    #[test]
    fn test_unfinished_projects_contribute_nothing() {
        let catalog = catalog(3);
        let mut progress = UserProgress::new();
        progress.insert(
            "p1".into(),
            ProgressEntry {
                status: EntryStatus::InProgress,
                notes: "lots of notes".to_string(),
                ..Default::default()
            },
        );
        progress.insert("p2".into(), entry(EntryStatus::Unlocked));

        assert_eq!(completed_count(&progress), 0);
        assert!(unique_tools(&catalog, &progress).is_empty());
        assert!(unique_skills(&catalog, &progress).is_empty());
        assert!(tool_usage(&catalog, &progress).is_empty());
    }

    #[test]
    fn test_next_unlocked_project() {
        fn next(catalog: &Catalog, progress: &UserProgress) -> Option<String> {
            next_unlocked_project(catalog, |id| resolve_status(catalog, progress, id).status())
                .map(|p| p.id.to_string())
        }

        let catalog = catalog(3);
        let mut progress = UserProgress::new();
        assert_eq!(next(&catalog, &progress).as_deref(), Some("p1"));

        progress.insert("p1".into(), entry(EntryStatus::InProgress));
        assert_eq!(next(&catalog, &progress).as_deref(), Some("p1"));

        progress.insert("p1".into(), entry(EntryStatus::Completed));
        assert_eq!(next(&catalog, &progress).as_deref(), Some("p2"));

        for id in ["p2", "p3"] {
            progress.insert(id.into(), entry(EntryStatus::Completed));
        }
        assert!(next(&catalog, &progress).is_none());
    }

    #[test]
    fn test_next_unlocked_project_follows_given_status() {
        let catalog = catalog(3);
        let signed_out = next_unlocked_project(&catalog, |id| resolve_signed_out(&catalog, id).status());
        assert_eq!(signed_out.unwrap().id.as_str(), "p1");

        let only_p3 = next_unlocked_project(&catalog, |id| {
            if id.as_str() == "p3" {
                ProjectStatus::InProgress
            } else {
                ProjectStatus::Completed
            }
        });
        assert_eq!(only_p3.unwrap().id.as_str(), "p3");
    }

    #[test]
    fn test_skill_coverage() {
        let catalog = catalog(4);
        let mut progress = UserProgress::new();
        progress.insert("p1".into(), entry(EntryStatus::Completed));

        let coverage = skill_coverage(&catalog, &progress);
        assert_eq!(coverage.len(), 5);
        assert_eq!(
            coverage[0],
            SkillCoverage { skill: "skill-1".to_string(), total: 1, done: 1, percent: 100 }
        );
        assert_eq!(
            coverage[1],
            SkillCoverage { skill: "shared-skill".to_string(), total: 4, done: 1, percent: 25 }
        );
        assert!(coverage[2..].iter().all(|c| c.percent == 0));
        assert_eq!(coverage[2].skill, "skill-2");
    }

    #[test]
    fn test_tool_usage_sorted_by_count() {
        let catalog = catalog(3);
        let mut progress = UserProgress::new();
        progress.insert("p1".into(), entry(EntryStatus::Completed));
        progress.insert("p2".into(), entry(EntryStatus::Completed));

        let usage = tool_usage(&catalog, &progress);
        assert_eq!(usage[0], ToolUsage { tool: "shared-tool".to_string(), count: 2 });
        assert_eq!(usage[1].tool, "tool-1");
        assert_eq!(usage[2].tool, "tool-2");
    }

    #[test]
    fn test_percent_rounding() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(1, 12), 8);
        assert_eq!(percent(1, 8), 13);
        assert_eq!(percent(12, 12), 100);
    }

    #[test]
    fn test_summary() {
        let catalog = catalog(2);
        let mut progress = UserProgress::new();
        let now = Utc::now();
        progress.insert(
            "p1".into(),
            ProgressEntry {
                status: EntryStatus::Completed,
                completed_at: Some(now - Duration::days(1)),
                ..Default::default()
            },
        );
        progress.insert(
            "p2".into(),
            ProgressEntry {
                status: EntryStatus::Completed,
                completed_at: Some(now),
                ..Default::default()
            },
        );

        let summary = ProgressSummary::compute(&catalog, &progress);
        assert_eq!(summary.completed_count, 2);
        assert_eq!(summary.percent_complete, 100);
        assert!(summary.is_journey_complete());
        assert_eq!(summary.completed_projects, vec![ProjectId::from("p2"), ProjectId::from("p1")]);
        assert!(summary.next_project.is_none());
    }
}
