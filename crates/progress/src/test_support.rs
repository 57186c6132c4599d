//! Fixtures shared by the unit tests.

use buildboard_core::{Catalog, EntryStatus, ProgressEntry, Project, ProjectId, ProjectLevel};

/// Project `p{step}` with tools `tool-{step}`, `shared-tool` and skills
/// `skill-{step}`, `shared-skill`.
pub(crate) fn project(step: u32) -> Project {
    Project {
        id: ProjectId::new(format!("p{}", step)),
        step_index: step,
        title: format!("Project {}", step),
        level: ProjectLevel::Beginner,
        problem: String::new(),
        task: String::new(),
        tools: vec![format!("tool-{}", step), "shared-tool".to_string()],
        skills: vec![format!("skill-{}", step), "shared-skill".to_string()],
        deliverables: vec![],
        try_steps: vec![],
        resources: vec![],
    }
}

pub(crate) fn catalog(len: u32) -> Catalog {
    Catalog::new((1..=len).map(project).collect()).unwrap()
}

pub(crate) fn entry(status: EntryStatus) -> ProgressEntry {
    ProgressEntry {
        status,
        ..Default::default()
    }
}
