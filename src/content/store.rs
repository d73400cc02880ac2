//! Content storage.
//!
//! # Responsibilities
//! - Define the read interface handlers use (`ContentStore`)
//! - Provide an in-memory store loaded from JSON or built-in sample content

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::models::{Contact, GamePlayed, Project, ProjectType, Repository, Review};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("resource not found: {0}")]
    NotFound(&'static str),

    #[error("failed to read content file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse content file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("content store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Read access to portfolio content.
///
/// Implementations may block; handlers call them on the blocking pool.
pub trait ContentStore: Send + Sync + 'static {
    fn contact(&self) -> Result<Contact, StoreError>;

    /// Project groups of one type, ordered by display priority.
    fn projects(&self, kind: ProjectType) -> Result<Vec<Project>, StoreError>;

    /// Reviews, highest rating first.
    fn reviews(&self) -> Result<Vec<Review>, StoreError>;

    /// Games played, in file order.
    fn games_played(&self) -> Result<Vec<GamePlayed>, StoreError>;
}

/// On-disk shape of the content file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContentData {
    pub contact: Option<Contact>,
    pub projects: Vec<Project>,
    pub reviews: Vec<Review>,
    pub games_played: Vec<GamePlayed>,
}

/// Content held in memory for the life of the process.
#[derive(Debug, Clone)]
pub struct StaticContentStore {
    data: ContentData,
}

impl StaticContentStore {
    pub fn new(data: ContentData) -> Self {
        Self { data }
    }

    /// Load content from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)?;
        let data: ContentData = serde_json::from_str(&raw)?;
        tracing::info!(
            path = %path.display(),
            projects = data.projects.len(),
            reviews = data.reviews.len(),
            "Loaded portfolio content"
        );
        Ok(Self::new(data))
    }

    /// Load from `path` if given, otherwise use the sample content.
    pub fn load(path: Option<&Path>) -> Result<Self, StoreError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::sample()),
        }
    }

    /// Built-in content for local runs and tests.
    pub fn sample() -> Self {
        let contact = Contact {
            name: "Portfolio Owner".to_string(),
            email: "owner@example.com".to_string(),
            linkedin: "https://www.linkedin.com/in/example".to_string(),
            github: "https://github.com/example".to_string(),
            credly: "https://www.credly.com/users/example".to_string(),
        };

        let projects = vec![
            Project {
                title: "Portfolio API".to_string(),
                description: "Rate limited, validated read API for this site".to_string(),
                project_type: ProjectType::Tech,
                link_to_project: "https://example.com/portfolio".to_string(),
                image_url: "https://example.com/img/api.png".to_string(),
                show_priority: 1,
                repositories: vec![Repository {
                    title: "portfolio-api".to_string(),
                    description: "Backend service".to_string(),
                    link_to_git: "https://github.com/example/portfolio-api".to_string(),
                }],
            },
            Project {
                title: "Market Dashboard".to_string(),
                description: "Portfolio tracking and charts".to_string(),
                project_type: ProjectType::Finance,
                link_to_project: "https://example.com/dashboard".to_string(),
                image_url: String::new(),
                show_priority: 2,
                repositories: Vec::new(),
            },
            Project {
                title: "Tiny Platformer".to_string(),
                description: "A weekend game jam entry".to_string(),
                project_type: ProjectType::Game,
                link_to_project: "https://example.com/platformer".to_string(),
                image_url: String::new(),
                show_priority: 3,
                repositories: Vec::new(),
            },
        ];

        let reviews = vec![
            Review::new(5, "Oof oof!", "Dog"),
            Review::new(5, "Such a good boy", "Grandparents"),
            Review::new(4, "He can be pretty tchill", "Siblings"),
            Review::new(4, "Not a great swimmer but he's a nice person", "Swimming Coach"),
            Review::new(3, "He can be a bit loud, but nice overall", "Neighbor"),
            Review::new(3, "He was kind of a pain", "Third Grade Teacher"),
            Review::new(2, "I'll beat him someday", "Childhood Rival"),
            Review::new(
                2,
                "Keeps preventing the disasters I'm trying to visit",
                "Time Traveler",
            ),
            Review::new(1, "I'll get you next time!", "James Bond Villain"),
            Review::new(1, "Keeps dodging our beam", "Alien"),
        ];

        let games_played = [
            ("Outer Wilds", "adventure", 5, "A solar system on a 22 minute loop"),
            ("Hades", "roguelike", 5, "Escaping the underworld, again"),
            ("Celeste", "platformer", 4, "Climbing a mountain one dash at a time"),
            ("Factorio", "simulation", 5, "The factory must grow"),
            ("Stardew Valley", "simulation", 4, "Parsnips and friendships"),
            ("Tetris Effect", "puzzle", 4, "Falling blocks, with feelings"),
        ]
        .into_iter()
        .map(|(title, genre, rating, description)| GamePlayed {
            title: title.to_string(),
            genre: genre.to_string(),
            rating,
            description: description.to_string(),
        })
        .collect();

        Self::new(ContentData {
            contact: Some(contact),
            projects,
            reviews,
            games_played,
        })
    }
}

impl ContentStore for StaticContentStore {
    fn contact(&self) -> Result<Contact, StoreError> {
        self.data.contact.clone().ok_or(StoreError::NotFound("contact"))
    }

    fn projects(&self, kind: ProjectType) -> Result<Vec<Project>, StoreError> {
        let mut projects: Vec<Project> = self
            .data
            .projects
            .iter()
            .filter(|p| p.project_type == kind)
            .cloned()
            .collect();
        projects.sort_by_key(|p| p.show_priority);
        Ok(projects)
    }

    fn reviews(&self) -> Result<Vec<Review>, StoreError> {
        let mut reviews = self.data.reviews.clone();
        // Stable: reviews with equal ratings keep file order.
        reviews.sort_by(|a, b| b.rating.cmp(&a.rating));
        Ok(reviews)
    }

    fn games_played(&self) -> Result<Vec<GamePlayed>, StoreError> {
        Ok(self.data.games_played.clone())
    }
}
