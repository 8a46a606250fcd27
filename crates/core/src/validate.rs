use crate::errors::ValidationError;
use crate::model::SPEC_SECTIONS;

const DESCRIPTION_IDEA_CHARS: usize = 100;

pub fn validate_idea(idea: &str) -> Result<(), ValidationError> {
    if idea.trim().is_empty() {
        return Err(ValidationError::EmptyIdea);
    }
    Ok(())
}

/// Only blank names are rejected here; the hosting provider enforces its own
/// naming rules.
pub fn validate_project_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyProjectName);
    }
    Ok(())
}

/// Repository description: the first 100 characters of the idea.
pub fn describe_idea(idea: &str) -> String {
    let head: String = idea.chars().take(DESCRIPTION_IDEA_CHARS).collect();
    format!("Project: {head}")
}

/// Headings from [`SPEC_SECTIONS`] that do not appear anywhere in `text`
/// (case-insensitive).
pub fn missing_sections(text: &str) -> Vec<&'static str> {
    let lowered = text.to_lowercase();
    SPEC_SECTIONS
        .iter()
        .copied()
        .filter(|section| !lowered.contains(&section.to_lowercase()))
        .collect()
}
