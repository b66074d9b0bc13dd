use serde_json::Value;

use crate::episode::Episode;
use crate::errors::{ValidationError, ValidationIssue};
use crate::step::{Step, STEP_TAGS};

const UNKNOWN_EPISODE: &str = "<unknown>";

/// Decode a raw JSON record into an [`Episode`], reporting every structural
/// problem at once instead of stopping at the first serde error.
pub fn decode_episode(value: &Value) -> Result<Episode, ValidationError> {
    let Some(object) = value.as_object() else {
        return Err(ValidationError::new(
            UNKNOWN_EPISODE,
            vec![ValidationIssue::NotAnObject],
        ));
    };

    let episode_id = object
        .get("id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    let mut issues = Vec::new();
    if episode_id.is_none() {
        issues.push(ValidationIssue::MissingId);
    }

    let raw_steps = object
        .get("steps")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    if raw_steps.is_empty() {
        issues.push(ValidationIssue::EmptySteps);
    }

    for (index, raw) in raw_steps.iter().enumerate() {
        if let Some(issue) = step_shape_issue(index, raw) {
            issues.push(issue);
        }
    }

    let label = episode_id.as_deref().unwrap_or(UNKNOWN_EPISODE);
    if !issues.is_empty() {
        return Err(ValidationError::new(label, issues));
    }

    let episode: Episode = serde_json::from_value(value.clone()).map_err(|err| {
        ValidationError::new(
            label,
            vec![ValidationIssue::MalformedStep {
                index: 0,
                tag: "episode".to_string(),
                reason: err.to_string(),
            }],
        )
    })?;
    validate_episode(&episode)?;
    Ok(episode)
}

fn step_shape_issue(index: usize, raw: &Value) -> Option<ValidationIssue> {
    let tag = match raw.get("type") {
        Some(Value::String(tag)) => tag.as_str(),
        _ => return Some(ValidationIssue::MissingTag { index }),
    };
    if !STEP_TAGS.contains(&tag) {
        return Some(ValidationIssue::UnknownTag {
            index,
            tag: tag.to_string(),
        });
    }
    serde_json::from_value::<Step>(raw.clone())
        .err()
        .map(|err| ValidationIssue::MalformedStep {
            index,
            tag: tag.to_string(),
            reason: err.to_string(),
        })
}

/// Check the per-variant field rules of an already decoded episode.
pub fn validate_episode(episode: &Episode) -> Result<(), ValidationError> {
    let mut issues = Vec::new();
    if episode.id.trim().is_empty() {
        issues.push(ValidationIssue::MissingId);
    }
    if episode.steps.is_empty() {
        issues.push(ValidationIssue::EmptySteps);
    }
    for (index, step) in episode.steps.iter().enumerate() {
        collect_step_issues(index, step, &mut issues);
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(episode.id.clone(), issues))
    }
}

fn collect_step_issues(index: usize, step: &Step, issues: &mut Vec<ValidationIssue>) {
    let tag = step.tag();
    match step {
        Step::ApiAction(action) => {
            if action.function.trim().is_empty() {
                issues.push(ValidationIssue::EmptyField {
                    index,
                    tag,
                    field: "function",
                });
            }
        }
        Step::CodeAction(action) => {
            if action.language.trim().is_empty() {
                issues.push(ValidationIssue::EmptyField {
                    index,
                    tag,
                    field: "language",
                });
            }
        }
        Step::MessageAction(_) | Step::TextObservation(_) => {}
        Step::ImageObservation(image) => {
            if image.content.trim().is_empty() {
                issues.push(ValidationIssue::EmptyField {
                    index,
                    tag,
                    field: "content",
                });
            }
        }
        Step::WebObservation(web) => {
            if web.html.is_none() && web.axtree.is_none() && web.url.is_none() && web.image.is_none()
            {
                issues.push(ValidationIssue::EmptyWebObservation { index });
            }
            if let Some((width, height)) = web.viewport {
                if width == 0 || height == 0 {
                    issues.push(ValidationIssue::InvalidViewport {
                        index,
                        width,
                        height,
                    });
                }
            }
            if let Some(image) = &web.image {
                if image.content.trim().is_empty() {
                    issues.push(ValidationIssue::EmptyField {
                        index,
                        tag,
                        field: "image.content",
                    });
                }
            }
        }
    }
}
