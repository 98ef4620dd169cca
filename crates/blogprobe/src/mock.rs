//! In-memory page driver.
//!
//! [`MockDriver`] renders a [`MockApp`] into a small DOM tree of
//! [`MockNode`]s and resolves locators against it with the same matching
//! rules the CDP resolver script uses. Clicks and fills are routed back to the
//! app by the node's `key`, after which the app re-renders. This lets the
//! harness (and suites built on it) be tested without a browser.
//!
//! CSS support is limited to compound selectors made of a tag, an id and
//! classes (`button`, `#notification`, `div.blog.detail`).

use crate::dialog::{DialogSlot, DialogType};
use crate::driver::{ElementInfo, PageDriver, SessionFactory};
use crate::locator::{normalize_whitespace, text_matches, Locator, Role, Selector, Step};
use crate::result::{HarnessError, HarnessResult};
use async_trait::async_trait;
use std::collections::BTreeSet;

// =============================================================================
// DOM
// =============================================================================

/// One element of the in-memory DOM
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockNode {
    /// Tag name
    pub tag: String,
    /// Application identity used to route clicks and fills
    pub key: Option<String>,
    /// `id` attribute
    pub id: Option<String>,
    /// `class` list
    pub classes: Vec<String>,
    /// `data-testid` attribute
    pub test_id: Option<String>,
    /// Explicit `role` attribute
    pub role: Option<Role>,
    /// `type` attribute (inputs)
    pub input_type: Option<String>,
    /// `aria-label` attribute
    pub aria_label: Option<String>,
    /// Own text (text nodes directly under this element)
    pub text: String,
    /// Current value (form controls)
    pub value: Option<String>,
    /// Hidden via `display: none`
    pub hidden: bool,
    /// Child elements
    pub children: Vec<MockNode>,
}

impl MockNode {
    /// Create an element with a tag
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Set own text
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set the application key
    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the `id` attribute
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add a class
    #[must_use]
    pub fn class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Set `data-testid`
    #[must_use]
    pub fn test_id(mut self, id: impl Into<String>) -> Self {
        self.test_id = Some(id.into());
        self
    }

    /// Set explicit role
    #[must_use]
    pub const fn role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Set input `type`
    #[must_use]
    pub fn input_type(mut self, ty: impl Into<String>) -> Self {
        self.input_type = Some(ty.into());
        self
    }

    /// Set `aria-label`
    #[must_use]
    pub fn aria_label(mut self, label: impl Into<String>) -> Self {
        self.aria_label = Some(label.into());
        self
    }

    /// Set current value
    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Hide the element
    #[must_use]
    pub const fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Append a child
    #[must_use]
    pub fn child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }

    /// Append several children
    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = Self>) -> Self {
        self.children.extend(children);
        self
    }

    fn is_form_control(&self) -> bool {
        matches!(self.tag.as_str(), "input" | "textarea" | "select")
    }

    fn effective_role(&self) -> Option<Role> {
        self.role
            .or_else(|| Role::implicit(&self.tag, self.input_type.as_deref()))
    }
}

// =============================================================================
// RESOLUTION
// =============================================================================

struct Flat<'a> {
    node: &'a MockNode,
    parent: Option<usize>,
    /// One past the last index of this node's subtree
    end: usize,
    visible: bool,
    text: String,
}

/// Preorder-flattened view of a rendered tree.
struct Dom<'a> {
    nodes: Vec<Flat<'a>>,
}

impl<'a> Dom<'a> {
    fn new(root: &'a MockNode) -> Self {
        let mut dom = Self { nodes: Vec::new() };
        dom.push(root, None, true);
        dom
    }

    fn push(&mut self, node: &'a MockNode, parent: Option<usize>, parent_visible: bool) -> usize {
        let index = self.nodes.len();
        let visible = parent_visible && !node.hidden;
        self.nodes.push(Flat {
            node,
            parent,
            end: index + 1,
            visible,
            text: String::new(),
        });

        let mut parts = vec![node.text.clone()];
        for child in &node.children {
            let child_index = self.push(child, Some(index), visible);
            parts.push(self.nodes[child_index].text.clone());
        }
        self.nodes[index].end = self.nodes.len();
        self.nodes[index].text = normalize_whitespace(&parts.join(" "));
        index
    }

    fn info(&self, index: usize) -> ElementInfo {
        let flat = &self.nodes[index];
        let text = if flat.node.is_form_control() {
            flat.node.value.clone().unwrap_or_default()
        } else {
            flat.text.clone()
        };
        ElementInfo::new(flat.node.tag.to_ascii_lowercase(), text, flat.visible)
    }

    fn descendants(&self, index: usize) -> std::ops::Range<usize> {
        index + 1..self.nodes[index].end
    }

    fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.descendants(index)
            .filter(move |&j| self.nodes[j].parent == Some(index))
    }

    fn resolve(&self, locator: &Locator) -> HarnessResult<Vec<usize>> {
        // `None` is the document: the first selection searches every element.
        let mut current: Option<Vec<usize>> = None;

        for step in locator.steps() {
            let next: Vec<usize> = match step {
                Step::Select { selector } => {
                    let mut found = BTreeSet::new();
                    match &current {
                        None => {
                            for i in 0..self.nodes.len() {
                                self.select_into(selector, i, &mut found)?;
                            }
                        }
                        Some(scope) => {
                            for &s in scope {
                                for i in self.descendants(s) {
                                    self.select_into(selector, i, &mut found)?;
                                }
                            }
                        }
                    }
                    found.into_iter().collect()
                }
                Step::Parent => current
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|i| self.nodes[i].parent)
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect(),
                Step::HasText { text } => current
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|&i| text_matches(&self.nodes[i].text, text))
                    .collect(),
                Step::Nth { nth } => {
                    let set = current.unwrap_or_default();
                    nth.resolve(set.len())
                        .map(|i| vec![set[i]])
                        .unwrap_or_default()
                }
            };
            current = Some(next);
        }

        Ok(current.unwrap_or_default())
    }

    fn select_into(
        &self,
        selector: &Selector,
        index: usize,
        found: &mut BTreeSet<usize>,
    ) -> HarnessResult<()> {
        let node = self.nodes[index].node;
        match selector {
            Selector::Css { css } => {
                if css_matches(css, node)? {
                    found.insert(index);
                }
            }
            Selector::TestId { id } => {
                if node.test_id.as_deref() == Some(id.as_str()) {
                    found.insert(index);
                }
            }
            Selector::Text { text } => {
                let deepest = text_matches(&self.nodes[index].text, text)
                    && !self
                        .children(index)
                        .any(|c| text_matches(&self.nodes[c].text, text));
                if deepest {
                    found.insert(index);
                }
            }
            Selector::Label { text } => {
                if node.tag == "label" && text_matches(&self.nodes[index].text, text) {
                    if let Some(control) = self
                        .descendants(index)
                        .find(|&j| self.nodes[j].node.is_form_control())
                    {
                        found.insert(control);
                    }
                } else if node
                    .aria_label
                    .as_deref()
                    .is_some_and(|label| text_matches(label, text))
                {
                    found.insert(index);
                }
            }
            Selector::Role { role, name } => {
                if node.effective_role() == Some(*role) {
                    let accessible = node.aria_label.clone().unwrap_or_else(|| {
                        if node.is_form_control() {
                            String::new()
                        } else {
                            self.nodes[index].text.clone()
                        }
                    });
                    if name.as_deref().map_or(true, |n| text_matches(&accessible, n)) {
                        found.insert(index);
                    }
                }
            }
        }
        Ok(())
    }
}

fn css_matches(css: &str, node: &MockNode) -> HarnessResult<bool> {
    let css = css.trim();
    if css.is_empty() || css.contains(|c: char| c.is_whitespace() || "[]>+~:*,".contains(c)) {
        return Err(HarnessError::config(format!(
            "mock driver only supports compound selectors (tag#id.class), got {css:?}"
        )));
    }

    let mut tag = String::new();
    let mut id = None;
    let mut classes = Vec::new();
    let mut current = String::new();
    let mut kind = 't';
    for c in css.chars().chain(std::iter::once('\0')) {
        if c == '.' || c == '#' || c == '\0' {
            match kind {
                't' => tag = std::mem::take(&mut current),
                '#' => id = Some(std::mem::take(&mut current)),
                _ => classes.push(std::mem::take(&mut current)),
            }
            kind = c;
        } else {
            current.push(c);
        }
    }

    Ok((tag.is_empty() || node.tag.eq_ignore_ascii_case(&tag))
        && id.map_or(true, |id| node.id.as_deref() == Some(id.as_str()))
        && classes.iter().all(|c| node.classes.iter().any(|nc| nc == c)))
}

// =============================================================================
// APP + DRIVER
// =============================================================================

/// Page-side hooks available to an app while it handles an event.
#[derive(Debug)]
pub struct PageEvents<'a> {
    dialogs: &'a DialogSlot,
}

impl PageEvents<'_> {
    /// Open a native `confirm`; returns whether it was accepted
    pub fn confirm(&mut self, message: impl Into<String>) -> bool {
        self.dialogs
            .answer(DialogType::Confirm, message, None)
            .was_accepted()
    }

    /// Open a native `alert`
    pub fn alert(&mut self, message: impl Into<String>) {
        let _ = self.dialogs.answer(DialogType::Alert, message, None);
    }
}

/// An application simulated by [`MockDriver`].
pub trait MockApp: Send + Sync {
    /// Render the current UI
    fn render(&self) -> MockNode;

    /// Handle navigation (a fresh page load)
    fn navigate(&mut self, _url: &str) -> HarnessResult<()> {
        Ok(())
    }

    /// Handle a click on the element with `key`
    fn click(&mut self, key: &str, page: &mut PageEvents<'_>) -> HarnessResult<()>;

    /// Handle a fill of the form control with `key`
    fn fill(&mut self, key: &str, value: &str) -> HarnessResult<()>;
}

/// In-memory [`PageDriver`] over a [`MockApp`].
#[derive(Debug)]
pub struct MockDriver<A> {
    app: A,
    url: String,
    dialogs: DialogSlot,
    history: Vec<String>,
    closed: bool,
}

impl<A: MockApp> MockDriver<A> {
    /// Create a driver showing `about:blank`
    #[must_use]
    pub fn new(app: A) -> Self {
        Self {
            app,
            url: String::from("about:blank"),
            dialogs: DialogSlot::new(),
            history: Vec::new(),
            closed: false,
        }
    }

    /// Access the simulated app
    #[must_use]
    pub const fn app(&self) -> &A {
        &self.app
    }

    /// Calls made through the driver, in order (`goto:<url>`, `click:<key>`, ...)
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.history
    }

    /// Whether `close` has been called
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> HarnessResult<()> {
        if self.closed {
            return Err(HarnessError::InvalidState {
                message: "page is closed".to_string(),
            });
        }
        Ok(())
    }

    fn target_key(&self, locator: &Locator, index: usize) -> HarnessResult<(Option<String>, bool)> {
        let root = self.app.render();
        let dom = Dom::new(&root);
        let matches = dom.resolve(locator)?;
        let &i = matches.get(index).ok_or_else(|| HarnessError::ElementNotFound {
            locator: locator.to_string(),
            waited_ms: 0,
            observed: format!("{} match(es), wanted index {index}", matches.len()),
        })?;
        let flat = &dom.nodes[i];
        Ok((flat.node.key.clone(), flat.node.is_form_control()))
    }
}

#[async_trait]
impl<A: MockApp> PageDriver for MockDriver<A> {
    async fn goto(&mut self, url: &str) -> HarnessResult<()> {
        self.ensure_open()?;
        self.history.push(format!("goto:{url}"));
        self.app.navigate(url)?;
        self.url = url.to_string();
        Ok(())
    }

    async fn resolve(&self, locator: &Locator) -> HarnessResult<Vec<ElementInfo>> {
        self.ensure_open()?;
        let root = self.app.render();
        let dom = Dom::new(&root);
        Ok(dom
            .resolve(locator)?
            .into_iter()
            .map(|i| dom.info(i))
            .collect())
    }

    async fn click(&mut self, locator: &Locator, index: usize) -> HarnessResult<()> {
        self.ensure_open()?;
        let (key, _) = self.target_key(locator, index)?;
        let Some(key) = key else {
            self.history.push(format!("click:{locator}"));
            return Ok(());
        };
        self.history.push(format!("click:{key}"));
        let mut events = PageEvents {
            dialogs: &self.dialogs,
        };
        self.app.click(&key, &mut events)
    }

    async fn fill(&mut self, locator: &Locator, index: usize, value: &str) -> HarnessResult<()> {
        self.ensure_open()?;
        let (key, is_control) = self.target_key(locator, index)?;
        match key {
            Some(key) if is_control => {
                self.history.push(format!("fill:{key}"));
                self.app.fill(&key, value)
            }
            _ => Err(HarnessError::InvalidState {
                message: format!("{locator} is not a fillable form control"),
            }),
        }
    }

    async fn current_url(&self) -> HarnessResult<String> {
        Ok(self.url.clone())
    }

    fn dialogs(&self) -> &DialogSlot {
        &self.dialogs
    }

    async fn close(&mut self) -> HarnessResult<()> {
        self.history.push("close".to_string());
        self.dialogs.disarm();
        self.closed = true;
        Ok(())
    }
}

/// A fixed page: renders the same tree forever and ignores events.
#[derive(Debug, Clone)]
pub struct StaticPage {
    root: MockNode,
}

impl StaticPage {
    /// Create a static page from a tree
    #[must_use]
    pub const fn new(root: MockNode) -> Self {
        Self { root }
    }
}

impl MockApp for StaticPage {
    fn render(&self) -> MockNode {
        self.root.clone()
    }

    fn click(&mut self, _key: &str, _page: &mut PageEvents<'_>) -> HarnessResult<()> {
        Ok(())
    }

    fn fill(&mut self, key: &str, value: &str) -> HarnessResult<()> {
        fn set(node: &mut MockNode, key: &str, value: &str) -> bool {
            if node.key.as_deref() == Some(key) {
                node.value = Some(value.to_string());
                return true;
            }
            node.children.iter_mut().any(|c| set(c, key, value))
        }
        set(&mut self.root, key, value);
        Ok(())
    }
}

/// [`SessionFactory`] building a fresh [`MockDriver`] per scenario.
pub struct MockFactory<F> {
    make: F,
}

impl<F> MockFactory<F> {
    /// Create a factory from an app constructor
    pub const fn new(make: F) -> Self {
        Self { make }
    }
}

impl<F> std::fmt::Debug for MockFactory<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockFactory").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, A> SessionFactory for MockFactory<F>
where
    F: Fn() -> A + Send + Sync,
    A: MockApp + 'static,
{
    async fn open_page(&self) -> HarnessResult<Box<dyn PageDriver>> {
        Ok(Box::new(MockDriver::new((self.make)())))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn blog_list() -> MockNode {
        MockNode::new("div").id("root").children([
            MockNode::new("p").text("Matti Luukkainen logged in").child(
                MockNode::new("button").text("logout").key("logout"),
            ),
            MockNode::new("div").class("blog").children([
                MockNode::new("div")
                    .text("First Post Alice")
                    .child(MockNode::new("button").text("hide").key("toggle:1")),
                MockNode::new("div").class("detail").children([
                    MockNode::new("div")
                        .text("likes")
                        .child(MockNode::new("span").class("likes").text("4"))
                        .child(MockNode::new("button").text("like").key("like:1")),
                    MockNode::new("div").text("Alice"),
                    MockNode::new("button").text("delete").key("delete:1"),
                ]),
            ]),
            MockNode::new("div").class("blog").children([
                MockNode::new("div")
                    .text("Second Post Bob")
                    .child(MockNode::new("button").text("view").key("toggle:2")),
                MockNode::new("div").class("detail").hidden(true).children([
                    MockNode::new("div")
                        .text("likes")
                        .child(MockNode::new("span").class("likes").text("2"))
                        .child(MockNode::new("button").text("like").key("like:2")),
                ]),
            ]),
            MockNode::new("label").text("Title").child(
                MockNode::new("input").key("title").value("draft"),
            ),
            MockNode::new("input").test_id("username").key("username"),
        ])
    }

    fn resolve(locator: &Locator) -> Vec<ElementInfo> {
        let root = blog_list();
        let dom = Dom::new(&root);
        dom.resolve(locator)
            .unwrap()
            .into_iter()
            .map(|i| dom.info(i))
            .collect()
    }

    mod resolution_tests {
        use super::*;

        #[test]
        fn test_css_class() {
            let likes = resolve(&Locator::css(".likes"));
            assert_eq!(likes.len(), 2);
            assert_eq!(likes[0].text, "4");
            assert!(likes[0].visible);
            assert!(!likes[1].visible);
        }

        #[test]
        fn test_css_compound() {
            assert_eq!(resolve(&Locator::css("div.blog")).len(), 2);
            assert_eq!(resolve(&Locator::css("div#root")).len(), 1);
            assert!(resolve(&Locator::css("span.blog")).is_empty());
        }

        #[test]
        fn test_unsupported_css_is_error() {
            let root = blog_list();
            let dom = Dom::new(&root);
            assert!(dom.resolve(&Locator::css("div > span")).is_err());
        }

        #[test]
        fn test_role_with_name() {
            let likes = resolve(&Locator::button("like"));
            assert_eq!(likes.len(), 2);
            assert!(resolve(&Locator::button("login")).is_empty());
            assert_eq!(resolve(&Locator::button("LOGOUT")).len(), 1);
        }

        #[test]
        fn test_text_selects_deepest() {
            let hits = resolve(&Locator::text("First Post"));
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].tag, "div");
            assert!(hits[0].text.starts_with("First Post Alice"));
        }

        #[test]
        fn test_label_yields_control() {
            let hits = resolve(&Locator::label("title"));
            assert_eq!(hits.len(), 1);
            assert_eq!(hits[0].tag, "input");
            assert_eq!(hits[0].text, "draft");
        }

        #[test]
        fn test_test_id() {
            assert_eq!(resolve(&Locator::test_id("username")).len(), 1);
            assert!(resolve(&Locator::test_id("password")).is_empty());
        }

        #[test]
        fn test_parent_then_scoped_role() {
            let loc = Locator::text("Alice")
                .first()
                .parent()
                .get_by_role(Role::Button, "like");
            let hits = resolve(&loc);
            assert_eq!(hits.len(), 1);
        }

        #[test]
        fn test_parent_of_user_row_finds_delete() {
            let loc = Locator::css(".detail")
                .get_by_text("Alice")
                .parent()
                .get_by_role(Role::Button, "delete");
            assert_eq!(resolve(&loc).len(), 1);
        }

        #[test]
        fn test_filter_and_nth() {
            let loc = Locator::css(".blog").filter_has_text("Second");
            assert_eq!(resolve(&loc).len(), 1);
            let last_like = resolve(&Locator::button("like").last());
            assert_eq!(last_like.len(), 1);
            assert!(!last_like[0].visible);
            assert!(resolve(&Locator::button("like").nth(5)).is_empty());
        }
    }

    mod driver_tests {
        use super::*;

        #[derive(Default)]
        struct Counter {
            clicks: u32,
            confirmed: Vec<bool>,
        }

        impl MockApp for Counter {
            fn render(&self) -> MockNode {
                MockNode::new("div").children([
                    MockNode::new("span").class("count").text(self.clicks.to_string()),
                    MockNode::new("button").text("add").key("add"),
                    MockNode::new("button").text("remove").key("remove"),
                ])
            }

            fn click(&mut self, key: &str, page: &mut PageEvents<'_>) -> HarnessResult<()> {
                match key {
                    "add" => self.clicks += 1,
                    "remove" => {
                        let ok = page.confirm("Really?");
                        self.confirmed.push(ok);
                    }
                    _ => {}
                }
                Ok(())
            }

            fn fill(&mut self, _key: &str, _value: &str) -> HarnessResult<()> {
                Ok(())
            }
        }

        #[tokio::test]
        async fn test_click_routes_to_app() {
            let mut driver = MockDriver::new(Counter::default());
            driver.goto("http://app.local/").await.unwrap();
            driver.click(&Locator::button("add"), 0).await.unwrap();
            driver.click(&Locator::button("add"), 0).await.unwrap();
            let count = driver.resolve(&Locator::css(".count")).await.unwrap();
            assert_eq!(count[0].text, "2");
            assert_eq!(driver.history()[0], "goto:http://app.local/");
            assert_eq!(driver.current_url().await.unwrap(), "http://app.local/");
        }

        #[tokio::test]
        async fn test_confirm_uses_armed_handler() {
            let mut driver = MockDriver::new(Counter::default());
            driver.click(&Locator::button("remove"), 0).await.unwrap();
            let waiter = driver
                .dialogs()
                .arm(crate::dialog::DialogResponse::Accept)
                .unwrap();
            driver.click(&Locator::button("remove"), 0).await.unwrap();
            let dialog = waiter
                .wait(std::time::Duration::from_millis(50))
                .await
                .unwrap();
            assert_eq!(dialog.message(), "Really?");
            assert_eq!(driver.app().confirmed, vec![false, true]);
        }

        #[tokio::test]
        async fn test_fill_requires_control() {
            let mut driver = MockDriver::new(StaticPage::new(blog_list()));
            driver
                .fill(&Locator::test_id("username"), 0, "mluukkai")
                .await
                .unwrap();
            let hits = driver.resolve(&Locator::test_id("username")).await.unwrap();
            assert_eq!(hits[0].text, "mluukkai");
            assert!(driver.fill(&Locator::button("logout"), 0, "x").await.is_err());
        }

        #[tokio::test]
        async fn test_closed_driver_rejects_calls() {
            let mut driver = MockDriver::new(Counter::default());
            driver.close().await.unwrap();
            assert!(driver.is_closed());
            assert!(driver.resolve(&Locator::button("add")).await.is_err());
        }

        #[tokio::test]
        async fn test_factory_opens_fresh_pages() {
            let factory = MockFactory::new(Counter::default);
            let mut a = factory.open_page().await.unwrap();
            let b = factory.open_page().await.unwrap();
            a.click(&Locator::button("add"), 0).await.unwrap();
            assert_eq!(a.resolve(&Locator::css(".count")).await.unwrap()[0].text, "1");
            assert_eq!(b.resolve(&Locator::css(".count")).await.unwrap()[0].text, "0");
        }
    }
}
