//! Text rendering of page and image observations.

use element_resolver::ElementResolver;
use episode_model::{Annotation, ImageObservation, WebObservation};
use tracing::debug;

pub fn annotation_line(annotation: &Annotation) -> String {
    let [x, y, w, h] = annotation.bounding_box;
    format!(
        "[{}] {} @ ({x}, {y}, {w}, {h})",
        annotation.element_type, annotation.text
    )
}

pub fn image_text(image: &ImageObservation) -> String {
    let mut lines = vec![format!("Image: {}", image.content)];
    lines.extend(image.annotations.iter().map(annotation_line));
    lines.join("\n")
}

/// Text for one page observation. When only HTML was recorded, the tree is
/// built through `resolver`; a failed build leaves the tree out. A recorded
/// tree is used as is and the HTML is only staged for later locators.
pub fn page_text(
    episode_id: &str,
    observation: &WebObservation,
    focused: Option<&str>,
    resolver: &mut ElementResolver,
) -> String {
    let mut lines = Vec::new();
    if let Some(url) = observation.url.as_deref() {
        lines.push(format!("URL: {url}"));
    }

    let tree = match (observation.axtree.as_deref(), observation.html.as_deref()) {
        (Some(axtree), html) => {
            if let Some(html) = html {
                // locators that follow resolve against this page
                resolver.stage(html);
            }
            Some(axtree.to_string())
        }
        (None, Some(html)) => resolver.build_tree(episode_id, html).ok(),
        (None, None) => None,
    };
    match tree {
        Some(tree) if !tree.trim().is_empty() => lines.push(tree),
        Some(_) => {}
        None => debug!(episode = episode_id, "page rendered without tree"),
    }

    if let Some(bid) = focused {
        lines.push(format!("Currently focused element: bid={bid}"));
    }
    if let Some((width, height)) = observation.viewport {
        lines.push(format!("Viewport: {width}x{height}"));
    }
    if let Some(image) = observation.image.as_ref() {
        lines.extend(image.annotations.iter().map(annotation_line));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use episode_model::Source;

    #[test]
    fn image_lines_list_annotations() {
        let image = ImageObservation {
            content: "shots/0001.png".into(),
            annotations: vec![Annotation {
                text: "Submit".into(),
                element_type: "button".into(),
                bounding_box: [10.0, 20.5, 80.0, 24.0],
            }],
            source: Source::Environment,
        };
        assert_eq!(
            image_text(&image),
            "Image: shots/0001.png\n[button] Submit @ (10, 20.5, 80, 24)"
        );
    }
}
