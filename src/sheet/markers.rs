//! Marker projection
//!
//! Markers are a pure function of [`PanelState`]. Projecting the same state
//! twice leaves the document unchanged.

use crate::config::MarkerConfig;
use crate::core::PanelState;
use crate::dom::Document;

use super::regions::Regions;

/// Write the markers for `state` onto the container and content nodes
///
/// Returns true if any marker changed.
pub fn project(doc: &mut Document, regions: &Regions, state: PanelState, markers: &MarkerConfig) -> bool {
    let hidden = state == PanelState::Hidden;
    let entering = state == PanelState::Visible;
    let exiting = state == PanelState::Closing;

    let mut changed = false;
    changed |= doc.set_class(regions.container, &markers.hidden, hidden);
    changed |= doc.set_class(regions.content, &markers.hidden, hidden);
    changed |= doc.set_class(regions.content, &markers.entering, entering);
    changed |= doc.set_class(regions.content, &markers.exiting, exiting);
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegionConfig;
    use crate::dom::SheetTemplate;

    fn setup() -> (Document, Regions, MarkerConfig) {
        let mut doc = Document::new();
        let body = doc.body();
        let markers = MarkerConfig::default();
        SheetTemplate {
            hidden_class: &markers.hidden,
            backdrop_attr: "data-sheet-bg",
            content_attr: "data-sheet-content",
            hidden: true,
            backdrop: true,
            content: true,
        }
        .build(&mut doc, body);
        let container = doc.children(body)[0];
        let regions = Regions::resolve(&doc, container, &RegionConfig::default()).unwrap();
        (doc, regions, markers)
    }

    #[test]
    fn visible_clears_hidden_and_enters() {
        let (mut doc, regions, markers) = setup();
        assert!(project(&mut doc, &regions, PanelState::Visible, &markers));
        assert!(!doc.has_class(regions.container, &markers.hidden));
        assert!(!doc.has_class(regions.content, &markers.hidden));
        assert!(doc.has_class(regions.content, &markers.entering));
        assert!(!doc.has_class(regions.content, &markers.exiting));
    }

    #[test]
    fn closing_swaps_enter_for_exit_and_keeps_container_shown() {
        let (mut doc, regions, markers) = setup();
        project(&mut doc, &regions, PanelState::Visible, &markers);
        project(&mut doc, &regions, PanelState::Closing, &markers);
        assert!(!doc.has_class(regions.container, &markers.hidden));
        assert!(!doc.has_class(regions.content, &markers.entering));
        assert!(doc.has_class(regions.content, &markers.exiting));
    }

    #[test]
    fn hidden_clears_animation_markers() {
        let (mut doc, regions, markers) = setup();
        project(&mut doc, &regions, PanelState::Closing, &markers);
        project(&mut doc, &regions, PanelState::Hidden, &markers);
        assert!(doc.has_class(regions.container, &markers.hidden));
        assert!(doc.has_class(regions.content, &markers.hidden));
        assert_eq!(doc.classes(regions.content), vec![markers.hidden.clone()]);
    }

    #[test]
    fn projection_is_idempotent() {
        let (mut doc, regions, markers) = setup();
        // fixture already matches the hidden projection
        assert!(!project(&mut doc, &regions, PanelState::Hidden, &markers));
        project(&mut doc, &regions, PanelState::Visible, &markers);
        assert!(!project(&mut doc, &regions, PanelState::Visible, &markers));
    }

    #[test]
    fn backdrop_is_never_marked() {
        let (mut doc, regions, markers) = setup();
        project(&mut doc, &regions, PanelState::Visible, &markers);
        let backdrop = regions.backdrop.unwrap();
        assert!(doc.classes(backdrop).is_empty());
    }
}
