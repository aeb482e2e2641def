//! In-memory [`Host`] used by the test suite.
//!
//! Models just enough of a browser: an element tree with a small HTML
//! parser, listeners with bubbling, a mutation observer that batches records
//! until [`FakeHost::settle`] delivers them, canned HTTP responses, history and
//! a controllable live-reload socket. Spawned tasks run on a `LocalPool`.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use futures::channel::mpsc;
use futures::executor::{LocalPool, LocalSpawner};
use futures::future;
use futures::stream::LocalBoxStream;
use futures::task::LocalSpawnExt;
use futures::{FutureExt, StreamExt};

use super::{Host, HostFuture, HttpRequest, Listener, Location, Method, Mutation, MutationCallback, Query};
use crate::binder::EventKind;
use crate::error::RuntimeError;

const VOID_TAGS: [&str; 8] = ["area", "br", "hr", "img", "input", "link", "meta", "source"];

/// Handle to a node in the fake document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FakeNode(usize);

/// Event delivered to fake listeners.
#[derive(Clone, Debug)]
pub struct FakeEvent {
    pub kind: String,
    pub target: Option<FakeNode>,
    prevented: Rc<Cell<bool>>,
}

impl FakeEvent {
    pub fn default_prevented(&self) -> bool {
        self.prevented.get()
    }
}

#[derive(Debug)]
enum NodeData {
    Element { tag: String, attrs: Vec<(String, String)>, children: Vec<usize>, parent: Option<usize> },
    Text { text: String, parent: Option<usize> },
}

#[derive(Debug)]
enum Parsed {
    Element { tag: String, attrs: Vec<(String, String)>, children: Vec<Parsed> },
    Text(String),
}

type SharedListener = Rc<dyn Fn(FakeEvent)>;

/// Browser stand-in.
pub struct FakeHost {
    nodes: RefCell<Vec<NodeData>>,
    listeners: RefCell<Vec<(usize, String, SharedListener)>>,
    window_listeners: RefCell<Vec<(String, SharedListener)>>,
    bound: RefCell<HashSet<(usize, EventKind)>>,
    refuse_listeners: Cell<bool>,
    observer: RefCell<Option<Rc<dyn Fn(Vec<Mutation<FakeNode>>)>>>,
    pending: RefCell<Vec<Mutation<FakeNode>>>,
    responses: RefCell<HashMap<(Method, String), Result<String, u16>>>,
    requests: RefCell<Vec<HttpRequest>>,
    pool: RefCell<LocalPool>,
    spawner: LocalSpawner,
    location: RefCell<Location>,
    history: RefCell<Vec<String>>,
    reloads: Cell<usize>,
    now: Cell<u64>,
    sockets: RefCell<Vec<(String, mpsc::UnboundedSender<String>)>>,
    sleeps: RefCell<Vec<u32>>,
    supports_transitions: Cell<bool>,
    transitions: Cell<usize>,
}

impl FakeHost {
    /// A document `<html><head></head><body>{body}</body></html>` on `http://localhost:3000/`.
    pub fn with_body(body: &str) -> Rc<Self> {
        let pool = LocalPool::new();
        let spawner = pool.spawner();
        let host = Self {
            nodes: RefCell::new(Vec::new()),
            listeners: RefCell::new(Vec::new()),
            window_listeners: RefCell::new(Vec::new()),
            bound: RefCell::new(HashSet::new()),
            refuse_listeners: Cell::new(false),
            observer: RefCell::new(None),
            pending: RefCell::new(Vec::new()),
            responses: RefCell::new(HashMap::new()),
            requests: RefCell::new(Vec::new()),
            pool: RefCell::new(pool),
            spawner,
            location: RefCell::new(Location {
                protocol: "http:".to_owned(),
                host: "localhost:3000".to_owned(),
                pathname: "/".to_owned(),
            }),
            history: RefCell::new(Vec::new()),
            reloads: Cell::new(0),
            now: Cell::new(1_700_000_000_000),
            sockets: RefCell::new(Vec::new()),
            sleeps: RefCell::new(Vec::new()),
            supports_transitions: Cell::new(false),
            transitions: Cell::new(0),
        };
        {
            let mut nodes = host.nodes.borrow_mut();
            nodes.push(NodeData::Element { tag: "html".to_owned(), attrs: Vec::new(), children: vec![1, 2], parent: None });
            nodes.push(NodeData::Element { tag: "head".to_owned(), attrs: Vec::new(), children: Vec::new(), parent: Some(0) });
            nodes.push(NodeData::Element { tag: "body".to_owned(), attrs: Vec::new(), children: Vec::new(), parent: Some(0) });
        }
        host.insert_children(2, parse_html(body));
        Rc::new(host)
    }

    // --- Test setup ---

    /// Replace the `<head>` content without recording mutations.
    pub fn set_head(&self, html: &str) {
        self.detach_children(1);
        self.insert_children(1, parse_html(html));
    }

    pub fn respond(&self, method: Method, url: &str, body: &str) {
        self.responses.borrow_mut().insert((method, url.to_owned()), Ok(body.to_owned()));
    }

    pub fn respond_status(&self, method: Method, url: &str, status: u16) {
        self.responses.borrow_mut().insert((method, url.to_owned()), Err(status));
    }

    pub fn set_protocol(&self, protocol: &str) {
        self.location.borrow_mut().protocol = protocol.to_owned();
    }

    pub fn set_pathname(&self, path: &str) {
        self.location.borrow_mut().pathname = path.to_owned();
    }

    pub fn set_supports_transitions(&self, supported: bool) {
        self.supports_transitions.set(supported);
    }

    /// Make `listen` fail, as a browser does for a detached realm.
    pub fn set_refuse_listeners(&self, refuse: bool) {
        self.refuse_listeners.set(refuse);
    }

    pub fn set_now(&self, now: u64) {
        self.now.set(now);
    }

    // --- Driving ---

    /// Run spawned tasks and deliver mutation batches until both are quiet.
    pub fn settle(&self) {
        loop {
            self.pool.borrow_mut().run_until_stalled();
            let batch: Vec<_> = self.pending.borrow_mut().drain(..).collect();
            if batch.is_empty() {
                break;
            }
            let observer = self.observer.borrow().clone();
            if let Some(observer) = observer {
                observer(batch);
            }
        }
    }

    /// Dispatch a bubbling event of `kind` at `target`. Returns the event.
    pub fn fire(&self, target: FakeNode, kind: &str) -> FakeEvent {
        let event = FakeEvent { kind: kind.to_owned(), target: Some(target), prevented: Rc::new(Cell::new(false)) };
        let mut current = Some(target.0);
        while let Some(id) = current {
            let matching: Vec<SharedListener> = self
                .listeners
                .borrow()
                .iter()
                .filter(|(node, k, _)| *node == id && k == kind)
                .map(|(_, _, l)| Rc::clone(l))
                .collect();
            for listener in matching {
                listener(event.clone());
            }
            current = self.parent_of(id);
        }
        event
    }

    pub fn fire_window(&self, kind: &str) {
        let event = FakeEvent { kind: kind.to_owned(), target: None, prevented: Rc::new(Cell::new(false)) };
        let matching: Vec<SharedListener> = self
            .window_listeners
            .borrow()
            .iter()
            .filter(|(k, _)| k == kind)
            .map(|(_, l)| Rc::clone(l))
            .collect();
        for listener in matching {
            listener(event.clone());
        }
    }

    /// Deliver a message on the `index`th opened socket.
    pub fn socket_send(&self, index: usize, message: &str) {
        if let Some((_, tx)) = self.sockets.borrow().get(index) {
            tx.unbounded_send(message.to_owned()).unwrap_or_default();
        }
    }

    /// Close the `index`th opened socket.
    pub fn socket_close(&self, index: usize) {
        if let Some((_, tx)) = self.sockets.borrow().get(index) {
            tx.close_channel();
        }
    }

    // --- Inspection ---

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.borrow().clone()
    }

    pub fn requests_to(&self, url: &str) -> usize {
        self.requests.borrow().iter().filter(|r| r.url == url).count()
    }

    pub fn history(&self) -> Vec<String> {
        self.history.borrow().clone()
    }

    pub fn reloads(&self) -> usize {
        self.reloads.get()
    }

    pub fn socket_urls(&self) -> Vec<String> {
        self.sockets.borrow().iter().map(|(url, _)| url.clone()).collect()
    }

    /// Delays requested through `sleep`, in order.
    pub fn sleeps(&self) -> Vec<u32> {
        self.sleeps.borrow().clone()
    }

    pub fn transitions(&self) -> usize {
        self.transitions.get()
    }

    pub fn listener_count(&self, node: FakeNode, kind: &str) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|(id, k, _)| *id == node.0 && k == kind)
            .count()
    }

    /// First element (document order) with `attr="value"`.
    pub fn find(&self, attr: &str, value: &str) -> Option<FakeNode> {
        self.select(&FakeNode(0), &Query::attr_eq(attr, value)).into_iter().next()
    }

    /// First element (document order) with tag `tag`.
    pub fn find_tag(&self, tag: &str) -> Option<FakeNode> {
        self.select(&FakeNode(0), &Query::tag(tag)).into_iter().next()
    }

    pub fn inner_html(&self, node: FakeNode) -> String {
        let nodes = self.nodes.borrow();
        let mut out = String::new();
        if let NodeData::Element { children, .. } = &nodes[node.0] {
            for child in children {
                serialize(&nodes, *child, &mut out);
            }
        }
        out
    }

    pub fn text_content(&self, node: FakeNode) -> String {
        let nodes = self.nodes.borrow();
        let mut out = String::new();
        collect_text(&nodes, node.0, &mut out);
        out
    }

    /// Set an attribute the way page script would (recorded as a mutation).
    pub fn script_set_attribute(&self, node: FakeNode, name: &str, value: &str) {
        self.write_attribute(node.0, name, value);
    }

    /// Append parsed markup to `parent` the way page script would.
    pub fn script_append(&self, parent: FakeNode, html: &str) -> Vec<FakeNode> {
        let added = self.insert_children(parent.0, parse_html(html));
        let elements: Vec<FakeNode> = added.into_iter().filter(|id| self.is_element(*id)).map(FakeNode).collect();
        self.record(Mutation::ChildList { added: elements.clone(), removed: Vec::new() });
        elements
    }

    /// Remove `node` from its parent the way page script would.
    pub fn script_remove(&self, node: FakeNode) {
        let Some(parent) = self.parent_of(node.0) else {
            return;
        };
        if let NodeData::Element { children, .. } = &mut self.nodes.borrow_mut()[parent] {
            children.retain(|c| *c != node.0);
        }
        self.set_parent(node.0, None);
        self.record(Mutation::ChildList { added: Vec::new(), removed: vec![node] });
    }

    // --- Internals ---

    fn record(&self, mutation: Mutation<FakeNode>) {
        if self.observer.borrow().is_some() {
            self.pending.borrow_mut().push(mutation);
        }
    }

    fn is_element(&self, id: usize) -> bool {
        matches!(self.nodes.borrow()[id], NodeData::Element { .. })
    }

    fn parent_of(&self, id: usize) -> Option<usize> {
        match &self.nodes.borrow()[id] {
            NodeData::Element { parent, .. } | NodeData::Text { parent, .. } => *parent,
        }
    }

    fn set_parent(&self, id: usize, new_parent: Option<usize>) {
        match &mut self.nodes.borrow_mut()[id] {
            NodeData::Element { parent, .. } | NodeData::Text { parent, .. } => *parent = new_parent,
        }
    }

    fn children_of(&self, id: usize) -> Vec<usize> {
        match &self.nodes.borrow()[id] {
            NodeData::Element { children, .. } => children.clone(),
            NodeData::Text { .. } => Vec::new(),
        }
    }

    fn write_attribute(&self, id: usize, name: &str, value: &str) {
        if let NodeData::Element { attrs, .. } = &mut self.nodes.borrow_mut()[id] {
            match attrs.iter_mut().find(|(n, _)| n == name) {
                Some(slot) => slot.1 = value.to_owned(),
                None => attrs.push((name.to_owned(), value.to_owned())),
            }
        }
        self.record(Mutation::Attribute { target: FakeNode(id), name: name.to_owned() });
    }

    fn detach_children(&self, id: usize) -> Vec<usize> {
        let old = match &mut self.nodes.borrow_mut()[id] {
            NodeData::Element { children, .. } => std::mem::take(children),
            NodeData::Text { .. } => Vec::new(),
        };
        for child in &old {
            self.set_parent(*child, None);
        }
        old
    }

    fn insert_children(&self, parent: usize, parsed: Vec<Parsed>) -> Vec<usize> {
        let mut ids = Vec::new();
        for item in parsed {
            let id = self.alloc(item, parent);
            ids.push(id);
        }
        if let NodeData::Element { children, .. } = &mut self.nodes.borrow_mut()[parent] {
            children.extend(ids.iter().copied());
        }
        ids
    }

    fn alloc(&self, parsed: Parsed, parent: usize) -> usize {
        match parsed {
            Parsed::Text(text) => {
                let mut nodes = self.nodes.borrow_mut();
                nodes.push(NodeData::Text { text, parent: Some(parent) });
                nodes.len() - 1
            }
            Parsed::Element { tag, attrs, children } => {
                let id = {
                    let mut nodes = self.nodes.borrow_mut();
                    nodes.push(NodeData::Element { tag, attrs, children: Vec::new(), parent: Some(parent) });
                    nodes.len() - 1
                };
                self.insert_children(id, children);
                id
            }
        }
    }

    fn deep_copy(&self, id: usize) -> Parsed {
        let nodes = self.nodes.borrow();
        to_parsed(&nodes, id)
    }

    fn element_matches(&self, id: usize, query: &Query<'_>) -> bool {
        let nodes = self.nodes.borrow();
        let NodeData::Element { tag, attrs, .. } = &nodes[id] else {
            return false;
        };
        if query.tag.is_some_and(|t| !t.eq_ignore_ascii_case(tag)) {
            return false;
        }
        match (query.attr, query.value) {
            (Some(attr), Some(value)) => attrs.iter().any(|(n, v)| n == attr && v == value),
            (Some(attr), None) => attrs.iter().any(|(n, _)| n == attr),
            (None, _) => true,
        }
    }

    fn descendants(&self, id: usize, out: &mut Vec<usize>) {
        for child in self.children_of(id) {
            out.push(child);
            self.descendants(child, out);
        }
    }
}

impl Host for FakeHost {
    type Node = FakeNode;
    type Event = FakeEvent;

    fn document_root(&self) -> Option<FakeNode> {
        Some(FakeNode(0))
    }

    fn body(&self) -> Option<FakeNode> {
        Some(FakeNode(2))
    }

    fn element_by_id(&self, id: &str) -> Option<FakeNode> {
        self.find("id", id)
    }

    fn select(&self, root: &FakeNode, query: &Query<'_>) -> Vec<FakeNode> {
        let mut all = Vec::new();
        self.descendants(root.0, &mut all);
        all.into_iter()
            .filter(|id| self.element_matches(*id, query))
            .map(FakeNode)
            .collect()
    }

    fn matches(&self, node: &FakeNode, query: &Query<'_>) -> bool {
        self.element_matches(node.0, query)
    }

    fn closest(&self, node: &FakeNode, attr: &str) -> Option<FakeNode> {
        let query = Query::attr(attr);
        let mut current = Some(node.0);
        while let Some(id) = current {
            if self.element_matches(id, &query) {
                return Some(FakeNode(id));
            }
            current = self.parent_of(id);
        }
        None
    }

    fn tag_name(&self, node: &FakeNode) -> String {
        match &self.nodes.borrow()[node.0] {
            NodeData::Element { tag, .. } => tag.to_ascii_lowercase(),
            NodeData::Text { .. } => "#text".to_owned(),
        }
    }

    fn attribute(&self, node: &FakeNode, name: &str) -> Option<String> {
        match &self.nodes.borrow()[node.0] {
            NodeData::Element { attrs, .. } => attrs.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone()),
            NodeData::Text { .. } => None,
        }
    }

    fn is_connected(&self, node: &FakeNode) -> bool {
        let mut current = node.0;
        while let Some(parent) = self.parent_of(current) {
            current = parent;
        }
        current == 0
    }

    fn set_attribute(&self, node: &FakeNode, name: &str, value: &str) -> Result<(), RuntimeError> {
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(RuntimeError::Host(format!("invalid attribute name {name:?}")));
        }
        self.write_attribute(node.0, name, value);
        Ok(())
    }

    fn set_inner_html(&self, node: &FakeNode, html: &str) {
        let removed: Vec<FakeNode> = self
            .detach_children(node.0)
            .into_iter()
            .filter(|id| self.is_element(*id))
            .map(FakeNode)
            .collect();
        let added: Vec<FakeNode> = self
            .insert_children(node.0, parse_html(html))
            .into_iter()
            .filter(|id| self.is_element(*id))
            .map(FakeNode)
            .collect();
        self.record(Mutation::ChildList { added, removed });
    }

    fn clone_node(&self, node: &FakeNode) -> Result<FakeNode, RuntimeError> {
        let copy = self.deep_copy(node.0);
        let id = self.alloc(copy, 0);
        // Detached until inserted.
        self.set_parent(id, None);
        Ok(FakeNode(id))
    }

    fn replace_node(&self, old: &FakeNode, new: &FakeNode) -> Result<(), RuntimeError> {
        let parent = self
            .parent_of(old.0)
            .ok_or_else(|| RuntimeError::Host("node has no parent".to_owned()))?;
        if let NodeData::Element { children, .. } = &mut self.nodes.borrow_mut()[parent] {
            for child in children.iter_mut() {
                if *child == old.0 {
                    *child = new.0;
                }
            }
        }
        self.set_parent(old.0, None);
        self.set_parent(new.0, Some(parent));
        self.record(Mutation::ChildList { added: vec![*new], removed: vec![*old] });
        Ok(())
    }

    fn listen(&self, node: &FakeNode, kind: &str, listener: Listener<FakeEvent>) -> Result<(), RuntimeError> {
        if self.refuse_listeners.get() {
            return Err(RuntimeError::Host(format!("{kind} listener refused")));
        }
        self.listeners.borrow_mut().push((node.0, kind.to_owned(), Rc::from(listener)));
        Ok(())
    }

    fn listen_window(&self, kind: &str, listener: Listener<FakeEvent>) -> Result<(), RuntimeError> {
        self.window_listeners.borrow_mut().push((kind.to_owned(), Rc::from(listener)));
        Ok(())
    }

    fn is_bound(&self, node: &FakeNode, kind: EventKind) -> bool {
        self.bound.borrow().contains(&(node.0, kind))
    }

    fn mark_bound(&self, node: &FakeNode, kind: EventKind) -> Result<(), RuntimeError> {
        self.bound.borrow_mut().insert((node.0, kind));
        Ok(())
    }

    fn event_target(&self, event: &FakeEvent) -> Option<FakeNode> {
        event.target
    }

    fn prevent_default(&self, event: &FakeEvent) {
        event.prevented.set(true);
    }

    fn describe_event(&self, event: &FakeEvent) -> serde_json::Value {
        let mut summary = serde_json::json!({ "type": event.kind });
        if let Some(value) = event.target.and_then(|t| self.attribute(&t, "value")) {
            summary["value"] = serde_json::Value::String(value);
        }
        summary
    }

    fn observe(&self, _root: &FakeNode, callback: MutationCallback<FakeNode>) -> Result<(), RuntimeError> {
        *self.observer.borrow_mut() = Some(Rc::from(callback));
        Ok(())
    }

    fn fetch_text(&self, request: HttpRequest) -> HostFuture<Result<String, RuntimeError>> {
        let reply = self.responses.borrow().get(&(request.method, request.url.clone())).cloned();
        let url = request.url.clone();
        self.requests.borrow_mut().push(request);
        let result = match reply {
            Some(Ok(body)) => Ok(body),
            Some(Err(status)) => Err(RuntimeError::Status { url, status }),
            None => Err(RuntimeError::Status { url, status: 404 }),
        };
        future::ready(result).boxed_local()
    }

    fn spawn(&self, task: HostFuture<()>) {
        self.spawner.spawn_local(task).unwrap_or_default();
    }

    fn sleep(&self, ms: u32) -> HostFuture<()> {
        self.sleeps.borrow_mut().push(ms);
        future::ready(()).boxed_local()
    }

    fn open_socket(&self, url: &str) -> Result<LocalBoxStream<'static, String>, RuntimeError> {
        let (tx, rx) = mpsc::unbounded();
        self.sockets.borrow_mut().push((url.to_owned(), tx));
        Ok(rx.boxed_local())
    }

    fn location(&self) -> Location {
        self.location.borrow().clone()
    }

    fn push_history(&self, url: &str) -> Result<(), RuntimeError> {
        self.history.borrow_mut().push(url.to_owned());
        self.location.borrow_mut().pathname = url.to_owned();
        Ok(())
    }

    fn reload_page(&self) {
        self.reloads.set(self.reloads.get() + 1);
    }

    fn now_ms(&self) -> u64 {
        self.now.get()
    }

    fn view_transition(&self, update: Box<dyn FnOnce()>) {
        if self.supports_transitions.get() {
            self.transitions.set(self.transitions.get() + 1);
        }
        update();
    }
}

// =============================================================
// Markup
// =============================================================

fn to_parsed(nodes: &[NodeData], id: usize) -> Parsed {
    match &nodes[id] {
        NodeData::Text { text, .. } => Parsed::Text(text.clone()),
        NodeData::Element { tag, attrs, children, .. } => Parsed::Element {
            tag: tag.clone(),
            attrs: attrs.clone(),
            children: children.iter().map(|c| to_parsed(nodes, *c)).collect(),
        },
    }
}

fn serialize(nodes: &[NodeData], id: usize, out: &mut String) {
    match &nodes[id] {
        NodeData::Text { text, .. } => out.push_str(text),
        NodeData::Element { tag, attrs, children, .. } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attrs {
                out.push_str(&format!(" {name}=\"{}\"", value.replace('"', "&quot;")));
            }
            out.push('>');
            if VOID_TAGS.contains(&tag.as_str()) {
                return;
            }
            for child in children {
                serialize(nodes, *child, out);
            }
            out.push_str(&format!("</{tag}>"));
        }
    }
}

fn collect_text(nodes: &[NodeData], id: usize, out: &mut String) {
    match &nodes[id] {
        NodeData::Text { text, .. } => out.push_str(text),
        NodeData::Element { children, .. } => {
            for child in children {
                collect_text(nodes, *child, out);
            }
        }
    }
}

/// Parse a fragment of well-formed test markup.
fn parse_html(html: &str) -> Vec<Parsed> {
    // Open elements: (tag, attrs, children). Index 0 collects top-level nodes.
    let mut stack: Vec<(String, Vec<(String, String)>, Vec<Parsed>)> = vec![(String::new(), Vec::new(), Vec::new())];
    let mut rest = html;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("<!--") {
            rest = after.find("-->").map_or("", |end| &after[end + 3..]);
        } else if let Some(after) = rest.strip_prefix("</") {
            let end = after.find('>').unwrap_or(after.len());
            let tag = after[..end].trim().to_ascii_lowercase();
            rest = after.get(end + 1..).unwrap_or("");
            if stack.iter().skip(1).any(|(t, _, _)| *t == tag) {
                loop {
                    let Some((open_tag, attrs, children)) = stack.pop() else {
                        break;
                    };
                    let done = open_tag == tag;
                    if let Some(parent) = stack.last_mut() {
                        parent.2.push(Parsed::Element { tag: open_tag, attrs, children });
                    }
                    if done {
                        break;
                    }
                }
            }
        } else if rest.starts_with('<') && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            let (tag, attrs, self_closing, after) = parse_start_tag(&rest[1..]);
            rest = after;
            if self_closing || VOID_TAGS.contains(&tag.as_str()) {
                if let Some(parent) = stack.last_mut() {
                    parent.2.push(Parsed::Element { tag, attrs, children: Vec::new() });
                }
            } else {
                stack.push((tag, attrs, Vec::new()));
            }
        } else {
            let end = rest
                .char_indices()
                .skip(1)
                .find(|(_, c)| *c == '<')
                .map_or(rest.len(), |(i, _)| i);
            if let Some(parent) = stack.last_mut() {
                parent.2.push(Parsed::Text(rest[..end].to_owned()));
            }
            rest = &rest[end..];
        }
    }

    while stack.len() > 1 {
        let Some((tag, attrs, children)) = stack.pop() else {
            break;
        };
        if let Some(parent) = stack.last_mut() {
            parent.2.push(Parsed::Element { tag, attrs, children });
        }
    }
    stack.pop().map(|(_, _, children)| children).unwrap_or_default()
}

/// Parse `tag attr="v" ...>` (the leading `<` already consumed).
fn parse_start_tag(input: &str) -> (String, Vec<(String, String)>, bool, &str) {
    let name_end = input
        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .unwrap_or(input.len());
    let tag = input[..name_end].to_ascii_lowercase();
    let mut rest = &input[name_end..];
    let mut attrs = Vec::new();

    loop {
        rest = rest.trim_start();
        if let Some(after) = rest.strip_prefix("/>") {
            return (tag, attrs, true, after);
        }
        if let Some(after) = rest.strip_prefix('>') {
            return (tag, attrs, false, after);
        }
        if rest.is_empty() {
            return (tag, attrs, false, rest);
        }
        let name_end = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '>' || c == '/')
            .unwrap_or(rest.len());
        if name_end == 0 {
            // Stray character such as a lone `/`.
            rest = &rest[1..];
            continue;
        }
        let name = rest[..name_end].to_owned();
        rest = rest[name_end..].trim_start();
        let mut value = String::new();
        if let Some(after) = rest.strip_prefix('=') {
            let after = after.trim_start();
            if let Some(quote) = after.chars().next().filter(|c| *c == '"' || *c == '\'') {
                let body = &after[1..];
                let end = body.find(quote).unwrap_or(body.len());
                value = body[..end].replace("&quot;", "\"");
                rest = body.get(end + 1..).unwrap_or("");
            } else {
                let end = after
                    .find(|c: char| c.is_whitespace() || c == '>')
                    .unwrap_or(after.len());
                value = after[..end].to_owned();
                rest = &after[end..];
            }
        }
        attrs.push((name, value));
    }
}
