//! # Document Model
//!
//! Just enough of a DOM for surfaces to live in: an element tree with ids,
//! attributes and a `display` style, a page title, the page location and a
//! document-wide click listener registry.
//!
//! ```text
//! Document
//! ├── location: Url            // resolves relative hrefs
//! ├── title: String
//! ├── body: Element            // root of the tree
//! └── click_listeners          // called for every click(), in order
//! ```
//!
//! Elements are shared handles (`Rc`); cloning an `Element` clones the
//! handle, not the node.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use reqwest::Url;

// ============================================================================
// Nodes
// ============================================================================

/// Surface content: plain text or a pre-built element.
#[derive(Debug, Clone)]
pub enum Content {
    Text(String),
    Element(Element),
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Content::Text(text.to_string())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Content::Text(text)
    }
}

impl From<Element> for Content {
    fn from(element: Element) -> Self {
        Content::Element(element)
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    Element(Element),
    Text(String),
}

struct ElementData {
    tag: String,
    attributes: Vec<(String, String)>,
    display: Option<String>,
    children: Vec<Node>,
    parent: Weak<RefCell<ElementData>>,
}

#[derive(Clone)]
pub struct Element(Rc<RefCell<ElementData>>);

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        f.debug_struct("Element")
            .field("tag", &data.tag)
            .field("id", &self.id())
            .field("display", &data.display)
            .field("children", &data.children.len())
            .finish()
    }
}

impl Element {
    /// A detached element. It becomes findable by id once appended under the
    /// document body.
    pub fn new(tag: &str) -> Self {
        Self(Rc::new(RefCell::new(ElementData {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
            display: None,
            children: Vec::new(),
            parent: Weak::new(),
        })))
    }

    pub fn with_id(tag: &str, id: &str) -> Self {
        let element = Self::new(tag);
        element.set_attribute("id", id);
        element
    }

    pub fn tag(&self) -> String {
        self.0.borrow().tag.clone()
    }

    pub fn id(&self) -> Option<String> {
        self.attribute("id")
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.0
            .borrow()
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }

    pub fn set_attribute(&self, name: &str, value: &str) {
        let mut data = self.0.borrow_mut();
        match data.attributes.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => data.attributes.push((name.to_string(), value.to_string())),
        }
    }

    /// The inline `display` style, if one was set.
    pub fn display(&self) -> Option<String> {
        self.0.borrow().display.clone()
    }

    pub fn set_display(&self, display: &str) {
        self.0.borrow_mut().display = Some(display.to_string());
    }

    /// False if this element or any ancestor has `display: none`.
    pub fn is_displayed(&self) -> bool {
        let mut current = Some(self.clone());
        while let Some(element) = current {
            if element.display().as_deref() == Some("none") {
                return false;
            }
            current = element.parent();
        }
        true
    }

    pub fn parent(&self) -> Option<Element> {
        self.0.borrow().parent.upgrade().map(Element)
    }

    pub fn children(&self) -> Vec<Node> {
        self.0.borrow().children.clone()
    }

    pub fn child_elements(&self) -> Vec<Element> {
        self.0
            .borrow()
            .children
            .iter()
            .filter_map(|node| match node {
                Node::Element(e) => Some(e.clone()),
                Node::Text(_) => None,
            })
            .collect()
    }

    /// Appends `child`, detaching it from its current parent first.
    pub fn append_child(&self, child: &Element) {
        child.remove();
        child.0.borrow_mut().parent = Rc::downgrade(&self.0);
        self.0
            .borrow_mut()
            .children
            .push(Node::Element(child.clone()));
    }

    pub fn append_text(&self, text: &str) {
        self.0
            .borrow_mut()
            .children
            .push(Node::Text(text.to_string()));
    }

    pub fn append_content(&self, content: &Content) {
        match content {
            Content::Text(text) => self.append_text(text),
            Content::Element(element) => self.append_child(element),
        }
    }

    /// Detaches this element from its parent. No-op if it has none.
    pub fn remove(&self) {
        let Some(parent) = self.parent() else {
            return;
        };
        parent.0.borrow_mut().children.retain(|node| match node {
            Node::Element(e) => !e.ptr_eq(self),
            Node::Text(_) => true,
        });
        self.0.borrow_mut().parent = Weak::new();
    }

    /// Concatenated text of this element and its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for node in self.children() {
            match node {
                Node::Text(text) => out.push_str(&text),
                Node::Element(e) => out.push_str(&e.text_content()),
            }
        }
        out
    }

    /// Depth-first search of this element and its descendants.
    pub fn find_by_id(&self, id: &str) -> Option<Element> {
        if self.id().as_deref() == Some(id) {
            return Some(self.clone());
        }
        self.child_elements()
            .iter()
            .find_map(|child| child.find_by_id(id))
    }

    /// Nearest element, starting with this one, whose tag is `tag`.
    pub fn closest(&self, tag: &str) -> Option<Element> {
        let mut current = Some(self.clone());
        while let Some(element) = current {
            if element.tag() == tag {
                return Some(element);
            }
            current = element.parent();
        }
        None
    }

    pub fn ptr_eq(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

// ============================================================================
// Events
// ============================================================================

pub struct ClickEvent {
    target: Element,
    default_prevented: Cell<bool>,
}

impl ClickEvent {
    pub fn target(&self) -> &Element {
        &self.target
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

type ClickListener = Rc<dyn Fn(&ClickEvent)>;

// ============================================================================
// Document
// ============================================================================

struct DocumentInner {
    location: Url,
    title: RefCell<String>,
    body: Element,
    click_listeners: RefCell<Vec<ClickListener>>,
}

#[derive(Clone)]
pub struct Document(Rc<DocumentInner>);

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("location", &self.0.location.as_str())
            .field("title", &*self.0.title.borrow())
            .finish()
    }
}

impl Document {
    pub fn new(location: Url, title: &str) -> Self {
        Self(Rc::new(DocumentInner {
            location,
            title: RefCell::new(title.to_string()),
            body: Element::new("body"),
            click_listeners: RefCell::new(Vec::new()),
        }))
    }

    pub fn location(&self) -> &Url {
        &self.0.location
    }

    pub fn body(&self) -> Element {
        self.0.body.clone()
    }

    pub fn title(&self) -> String {
        self.0.title.borrow().clone()
    }

    pub fn set_title(&self, title: &str) {
        *self.0.title.borrow_mut() = title.to_string();
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<Element> {
        self.0.body.find_by_id(id)
    }

    pub fn add_click_listener<F>(&self, listener: F)
    where
        F: Fn(&ClickEvent) + 'static,
    {
        self.0.click_listeners.borrow_mut().push(Rc::new(listener));
    }

    /// Dispatches a click on `target` to every listener.
    /// Returns `true` if the browser default action should still happen.
    pub fn click(&self, target: &Element) -> bool {
        let listeners: Vec<ClickListener> = self.0.click_listeners.borrow().clone();
        let event = ClickEvent {
            target: target.clone(),
            default_prevented: Cell::new(false),
        };
        for listener in listeners {
            listener(&event);
        }
        !event.default_prevented()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::new(Url::parse("http://localhost/").unwrap(), "Test")
    }

    #[test]
    fn test_get_element_by_id_searches_body() {
        let doc = doc();
        let outer = Element::with_id("div", "outer");
        let inner = Element::with_id("span", "inner");
        outer.append_child(&inner);
        assert!(doc.get_element_by_id("inner").is_none());

        doc.body().append_child(&outer);
        let found = doc.get_element_by_id("inner").unwrap();
        assert!(found.ptr_eq(&inner));
    }

    #[test]
    fn test_append_child_moves_element() {
        let a = Element::new("div");
        let b = Element::new("div");
        let child = Element::new("p");
        a.append_child(&child);
        b.append_child(&child);
        assert!(a.child_elements().is_empty());
        assert_eq!(b.child_elements().len(), 1);
        assert!(child.parent().unwrap().ptr_eq(&b));
    }

    #[test]
    fn test_remove_detaches() {
        let doc = doc();
        let el = Element::with_id("div", "gone");
        doc.body().append_child(&el);
        el.remove();
        assert!(doc.get_element_by_id("gone").is_none());
        assert!(el.parent().is_none());
        // second remove is harmless
        el.remove();
    }

    #[test]
    fn test_text_content_concatenates_descendants() {
        let el = Element::new("div");
        el.append_text("Hello ");
        let b = Element::new("b");
        b.append_text("world");
        el.append_child(&b);
        assert_eq!(el.text_content(), "Hello world");
    }

    #[test]
    fn test_is_displayed_checks_ancestors() {
        let parent = Element::new("div");
        let child = Element::new("div");
        parent.append_child(&child);
        assert!(child.is_displayed());
        parent.set_display("none");
        assert!(!child.is_displayed());
    }

    #[test]
    fn test_closest_finds_anchor_ancestor() {
        let a = Element::new("A");
        let span = Element::new("span");
        a.append_child(&span);
        assert!(span.closest("a").unwrap().ptr_eq(&a));
        assert!(a.closest("div").is_none());
    }

    #[test]
    fn test_click_reports_prevent_default() {
        let doc = doc();
        let target = Element::new("a");
        assert!(doc.click(&target));

        doc.add_click_listener(|e| e.prevent_default());
        assert!(!doc.click(&target));
    }

    #[test]
    fn test_set_attribute_overwrites() {
        let el = Element::new("a");
        el.set_attribute("href", "/one");
        el.set_attribute("href", "/two");
        assert_eq!(el.attribute("href").as_deref(), Some("/two"));
    }
}
