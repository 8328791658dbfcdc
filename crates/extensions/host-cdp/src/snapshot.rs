//! Point-in-time view of the browser's windows and tabs.

use tabwatch_protocols::{HostTab, HostWindow, LoadStatus, TabId, WindowId, WindowKind};

use crate::protocol::{PageInfo, WindowForTarget, WindowState};
use crate::targets::TargetMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostSnapshot {
    /// Windows in order of their most recently activated page.
    pub windows: Vec<HostWindow>,
    pub focused: Option<WindowId>,
}

impl HostSnapshot {
    /// Assemble a snapshot from pages in discovery order, each paired with
    /// the window it lives in.
    ///
    /// Discovery lists pages most recently activated first, so the first
    /// page seen in a window is its foreground tab and the first window
    /// that is not minimized holds focus.
    pub fn build(located: Vec<(PageInfo, WindowForTarget)>, targets: &mut TargetMap) -> Self {
        let mut windows: Vec<HostWindow> = Vec::new();
        let mut focused = None;

        for (page, placement) in located {
            let window_id = placement.window_id;
            let index = match windows.iter().position(|w| w.id == window_id) {
                Some(index) => index,
                None => {
                    let minimized = placement.bounds.window_state == Some(WindowState::Minimized);
                    if focused.is_none() && !minimized {
                        focused = Some(window_id);
                    }
                    windows.push(HostWindow {
                        id: window_id,
                        kind: WindowKind::Normal,
                        focused: false,
                        tabs: Vec::new(),
                    });
                    windows.len() - 1
                }
            };

            let window = &mut windows[index];
            let active = window.tabs.is_empty();
            window.tabs.push(HostTab {
                id: targets.id_for(&page.id),
                window_id,
                url: page.url,
                title: page.title,
                fav_icon_url: page.favicon_url,
                active,
                discarded: false,
                status: LoadStatus::Complete,
            });
        }

        for window in windows.iter_mut() {
            window.focused = Some(window.id) == focused;
        }
        Self { windows, focused }
    }

    pub fn tabs(&self) -> impl Iterator<Item = &HostTab> {
        self.windows.iter().flat_map(|w| w.tabs.iter())
    }

    pub fn tab(&self, tab_id: TabId) -> Option<&HostTab> {
        self.tabs().find(|t| t.id == tab_id)
    }

    pub fn window(&self, window_id: WindowId) -> Option<&HostWindow> {
        self.windows.iter().find(|w| w.id == window_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::WindowBounds;

    fn page(id: &str, url: &str) -> PageInfo {
        PageInfo {
            id: id.to_string(),
            page_type: "page".to_string(),
            title: format!("Title {}", id),
            url: url.to_string(),
            favicon_url: None,
        }
    }

    fn placed(window_id: i64, state: Option<WindowState>) -> WindowForTarget {
        WindowForTarget {
            window_id,
            bounds: WindowBounds {
                window_state: state,
            },
        }
    }

    #[test]
    fn test_first_page_per_window_is_foreground() {
        let mut targets = TargetMap::new();
        let snapshot = HostSnapshot::build(
            vec![
                (page("A", "https://a.example"), placed(10, None)),
                (page("B", "https://b.example"), placed(20, None)),
                (page("C", "https://c.example"), placed(10, None)),
            ],
            &mut targets,
        );

        assert_eq!(snapshot.windows.len(), 2);
        assert_eq!(snapshot.focused, Some(10));
        let first = snapshot.window(10).unwrap();
        assert!(first.focused);
        assert_eq!(first.foreground().unwrap().url, "https://a.example");
        assert_eq!(first.tabs.len(), 2);
        assert!(!first.tabs[1].active);
        assert!(snapshot.window(20).unwrap().foreground().is_some());
        assert_eq!(snapshot.tabs().count(), 3);
    }

    #[test]
    fn test_minimized_window_does_not_take_focus() {
        let mut targets = TargetMap::new();
        let snapshot = HostSnapshot::build(
            vec![
                (page("A", "https://a.example"), placed(1, Some(WindowState::Minimized))),
                (page("B", "https://b.example"), placed(2, Some(WindowState::Normal))),
            ],
            &mut targets,
        );
        assert_eq!(snapshot.focused, Some(2));
    }

    #[test]
    fn test_all_minimized_means_no_focus() {
        let mut targets = TargetMap::new();
        let snapshot = HostSnapshot::build(
            vec![(page("A", "https://a.example"), placed(1, Some(WindowState::Minimized)))],
            &mut targets,
        );
        assert_eq!(snapshot.focused, None);
        assert!(!snapshot.windows[0].focused);
    }

    #[test]
    fn test_ids_follow_target_map() {
        let mut targets = TargetMap::new();
        targets.id_for("B");
        let snapshot = HostSnapshot::build(
            vec![
                (page("A", "https://a.example"), placed(1, None)),
                (page("B", "https://b.example"), placed(1, None)),
            ],
            &mut targets,
        );
        assert_eq!(snapshot.tab(1).unwrap().url, "https://b.example");
        assert_eq!(snapshot.tab(2).unwrap().url, "https://a.example");
        assert_eq!(snapshot.tab(2).unwrap().title, "Title A");
    }
}
