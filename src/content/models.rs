//! Content returned by the public routes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub linkedin: String,
    #[serde(default)]
    pub github: String,
    #[serde(default)]
    pub credly: String,
}

/// Category a project group is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    #[default]
    Tech,
    Game,
    Finance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub link_to_git: String,
}

/// A project group and the repositories it is made of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub project_type: ProjectType,
    #[serde(default)]
    pub link_to_project: String,
    #[serde(default)]
    pub image_url: String,
    /// Lower sorts first. Not exposed in responses.
    #[serde(default, skip_serializing)]
    pub show_priority: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<Repository>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub author: String,
    pub description: String,
    pub rating: u8,
}

impl Review {
    pub fn new(rating: u8, description: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            description: description.into(),
            rating,
        }
    }
}

/// A game shown in the "recently played" carousel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamePlayed {
    pub title: String,
    #[serde(default)]
    pub genre: String,
    pub rating: u8,
    #[serde(default)]
    pub description: String,
}
