//! The fixed, ordered set of projects that make up the board.

use std::collections::HashSet;

use crate::id::ProjectId;
use crate::project::Project;

const BUILTIN_PROJECTS: &str = include_str!("../data/projects.json");

/// Errors raised while building a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// No projects at all
    #[error("catalog is empty")]
    Empty,

    /// Two projects share an id
    #[error("duplicate project id: {0}")]
    DuplicateId(ProjectId),

    /// Step indices must run 1..=n without gaps or repeats
    #[error("expected step index {expected}, found {found} on project {id}")]
    StepOutOfOrder {
        /// Project carrying the wrong index
        id: ProjectId,
        /// Index that should have come next
        expected: u32,
        /// Index actually found
        found: u32,
    },

    /// Embedded data could not be decoded
    #[error("invalid catalog data: {0}")]
    Json(#[from] serde_json::Error),
}

/// Ordered list of projects, sorted by step index.
///
/// Invariant: step indices are exactly `1..=len`, ids are unique.
#[derive(Debug, Clone)]
pub struct Catalog {
    projects: Vec<Project>,
}

impl Catalog {
    /// Build a catalog from an arbitrary list, sorting by step index and
    /// validating that the indices are contiguous from 1.
    pub fn new(mut projects: Vec<Project>) -> Result<Self, CatalogError> {
        if projects.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        for project in &projects {
            if !seen.insert(project.id.clone()) {
                return Err(CatalogError::DuplicateId(project.id.clone()));
            }
        }

        projects.sort_by_key(|p| p.step_index);
        for (expected, project) in (1u32..).zip(&projects) {
            if project.step_index != expected {
                return Err(CatalogError::StepOutOfOrder {
                    id: project.id.clone(),
                    expected,
                    found: project.step_index,
                });
            }
        }

        Ok(Self { projects })
    }

    /// The twelve-project board shipped with the application.
    pub fn builtin() -> Result<Self, CatalogError> {
        let projects: Vec<Project> = serde_json::from_str(BUILTIN_PROJECTS)?;
        Self::new(projects)
    }

    /// All projects in step order.
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    /// Iterate in step order.
    pub fn iter(&self) -> std::slice::Iter<'_, Project> {
        self.projects.iter()
    }

    /// Number of projects.
    pub fn len(&self) -> usize {
        self.projects.len()
    }

    /// Always false for a validated catalog.
    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Look a project up by id.
    pub fn get(&self, id: &ProjectId) -> Option<&Project> {
        self.projects.iter().find(|p| &p.id == id)
    }

    /// Look a project up by its step index.
    pub fn by_step(&self, step_index: u32) -> Option<&Project> {
        let pos = usize::try_from(step_index).ok()?.checked_sub(1)?;
        self.projects.get(pos)
    }

    /// The project whose step index is one less than `project`'s.
    pub fn previous(&self, project: &Project) -> Option<&Project> {
        self.by_step(project.step_index.checked_sub(1)?)
    }

    /// The entry point of the board.
    pub fn first(&self) -> &Project {
        // a validated catalog is never empty
        &self.projects[0]
    }

    /// Projects whose title, skills or tools contain `query`, ignoring case.
    /// A blank query matches nothing.
    pub fn search(&self, query: &str) -> Vec<&Project> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        self.projects
            .iter()
            .filter(|p| p.matches_lowercase(&query))
            .collect()
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Project;
    type IntoIter = std::slice::Iter<'a, Project>;

    fn into_iter(self) -> Self::IntoIter {
        self.projects.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::ProjectLevel;

    fn project(id: &str, step: u32) -> Project {
        Project {
            id: ProjectId::from(id),
            step_index: step,
            title: format!("Project {}", id),
            level: ProjectLevel::Beginner,
            problem: String::new(),
            task: String::new(),
            tools: vec!["Figma".to_string()],
            skills: vec!["Prototyping".to_string()],
            deliverables: vec![],
            try_steps: vec![],
            resources: vec![],
        }
    }

    #[test]
    fn test_builtin_catalog_is_valid() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.len(), 12);
        assert!(catalog.first().is_first_step());
        for (i, p) in catalog.iter().enumerate() {
            assert_eq!(p.step_index as usize, i + 1);
        }
    }

    #[test]
    fn test_new_sorts_by_step() {
        let catalog = Catalog::new(vec![project("b", 2), project("a", 1)]).unwrap();
        assert_eq!(catalog.first().id.as_str(), "a");
        assert_eq!(catalog.by_step(2).unwrap().id.as_str(), "b");
        assert!(catalog.by_step(0).is_none());
        assert!(catalog.by_step(3).is_none());
    }

    #[test]
    fn test_rejects_gap() {
        let err = Catalog::new(vec![project("a", 1), project("c", 3)]).unwrap_err();
        assert!(matches!(err, CatalogError::StepOutOfOrder { expected: 2, found: 3, .. }));
    }

    #[test]
    fn test_rejects_duplicate_step() {
        let err = Catalog::new(vec![project("a", 1), project("b", 1)]).unwrap_err();
        assert!(matches!(err, CatalogError::StepOutOfOrder { expected: 2, found: 1, .. }));
    }

    #[test]
    fn test_rejects_missing_entry_step() {
        let err = Catalog::new(vec![project("b", 2)]).unwrap_err();
        assert!(matches!(err, CatalogError::StepOutOfOrder { expected: 1, .. }));
    }

    #[test]
    fn test_rejects_duplicate_id_and_empty() {
        assert!(matches!(
            Catalog::new(vec![project("a", 1), project("a", 2)]),
            Err(CatalogError::DuplicateId(_))
        ));
        assert!(matches!(Catalog::new(vec![]), Err(CatalogError::Empty)));
    }

    #[test]
    fn test_previous() {
        let catalog = Catalog::new(vec![project("a", 1), project("b", 2)]).unwrap();
        let b = catalog.by_step(2).unwrap();
        assert_eq!(catalog.previous(b).unwrap().id.as_str(), "a");
        assert!(catalog.previous(catalog.first()).is_none());
    }

    #[test]
    fn test_search() {
        let catalog = Catalog::builtin().unwrap();
        let hits = catalog.search("FIGMA");
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|p| p.tools.iter().any(|t| t == "Figma")));

        let by_title = catalog.search("landing");
        assert_eq!(by_title.len(), 1);
        assert_eq!(by_title[0].id.as_str(), "landing-page");

        assert!(catalog.search("   ").is_empty());
        assert!(catalog.search("no such thing").is_empty());
    }
}
