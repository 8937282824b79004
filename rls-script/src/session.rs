//! Session
//!
//! Namespaces, libraries and programs of one build, kept in an arena of
//! nodes rooted at `rls`. Every node has a dotted address made from the
//! names on its path; libraries use it as the prefix of their symbols.

use std::collections::BTreeMap;

use rls_common::{Result, ScriptError};

use crate::library::Library;
use crate::program::Program;

/// Index of a node in a `Session`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

#[derive(Debug)]
enum NodeKind {
    Namespace,
    Library(Box<Library>),
    Program(Box<Program>),
}

impl NodeKind {
    fn describe(&self) -> &'static str {
        match self {
            NodeKind::Namespace => "namespace",
            NodeKind::Library(_) => "library",
            NodeKind::Program(_) => "program",
        }
    }
}

#[derive(Debug)]
struct Node {
    name: String,
    address: String,
    parent: Option<NodeId>,
    children: BTreeMap<String, NodeId>,
    /// Most recently created child
    last: Option<NodeId>,
    kind: NodeKind,
}

/// Tree of namespaces, libraries and programs
#[derive(Debug)]
pub struct Session {
    nodes: Vec<Node>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                name: "rls".to_string(),
                address: "rls".to_string(),
                parent: None,
                children: BTreeMap::new(),
                last: None,
                kind: NodeKind::Namespace,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| ScriptError::argument(format!("unknown session node {}", id.0)))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.0)
            .ok_or_else(|| ScriptError::argument(format!("unknown session node {}", id.0)))
    }

    /// Get the child `name` of `parent` if it has the kind `make` creates,
    /// or create it
    fn child(
        &mut self,
        parent: NodeId,
        name: &str,
        wanted: &'static str,
        make: impl FnOnce(&str, &str) -> NodeKind,
    ) -> Result<NodeId> {
        let parent_node = self.node(parent)?;
        if let Some(&existing) = parent_node.children.get(name) {
            let found = self.node(existing)?.kind.describe();
            if found != wanted {
                return Err(ScriptError::argument(format!(
                    "{name} is already defined as a {found}"
                )));
            }
            return Ok(existing);
        }

        let address = format!("{}.{}", parent_node.address, name).replace(' ', "");
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.to_string(),
            kind: make(name, &address),
            address,
            parent: Some(parent),
            children: BTreeMap::new(),
            last: None,
        });
        let parent_node = self.node_mut(parent)?;
        parent_node.children.insert(name.to_string(), id);
        parent_node.last = Some(id);
        log::debug!("session: created {wanted} {name}");
        Ok(id)
    }

    pub fn namespace(&mut self, parent: NodeId, name: &str) -> Result<NodeId> {
        self.child(parent, name, "namespace", |_, _| NodeKind::Namespace)
    }

    pub fn library(&mut self, parent: NodeId, name: &str) -> Result<NodeId> {
        self.child(parent, name, "library", |name, address| {
            NodeKind::Library(Box::new(Library::with_address(name, address)))
        })
    }

    pub fn program(&mut self, parent: NodeId, name: &str) -> Result<NodeId> {
        self.child(parent, name, "program", |name, address| {
            NodeKind::Program(Box::new(Program::with_address(name, address)))
        })
    }

    /// Find `name` among the children of `from` or of any of its
    /// ancestors. An empty name means the most recently created child.
    pub fn lookup(&self, from: NodeId, name: &str) -> Option<NodeId> {
        let mut current = Some(from);
        while let Some(id) = current {
            let node = self.nodes.get(id.0)?;
            let found = if name.is_empty() {
                node.last
            } else {
                node.children.get(name).copied()
            };
            if found.is_some() {
                return found;
            }
            current = node.parent;
        }
        None
    }

    /// Whether `name` is a direct child of `parent`
    pub fn contains(&self, parent: NodeId, name: &str) -> bool {
        self.nodes
            .get(parent.0)
            .is_some_and(|node| node.children.contains_key(name))
    }

    pub fn last(&self, parent: NodeId) -> Option<NodeId> {
        self.nodes.get(parent.0).and_then(|node| node.last)
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.0).map(|node| node.name.as_str())
    }

    pub fn address(&self, id: NodeId) -> Option<&str> {
        self.nodes.get(id.0).map(|node| node.address.as_str())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    pub fn get_library(&self, id: NodeId) -> Option<&Library> {
        match &self.nodes.get(id.0)?.kind {
            NodeKind::Library(library) => Some(library.as_ref()),
            NodeKind::Program(program) => Some(program.library()),
            NodeKind::Namespace => None,
        }
    }

    pub fn library_mut(&mut self, id: NodeId) -> Option<&mut Library> {
        match &mut self.nodes.get_mut(id.0)?.kind {
            NodeKind::Library(library) => Some(library.as_mut()),
            NodeKind::Program(program) => Some(program.library_mut()),
            NodeKind::Namespace => None,
        }
    }

    pub fn get_program(&self, id: NodeId) -> Option<&Program> {
        match &self.nodes.get(id.0)?.kind {
            NodeKind::Program(program) => Some(program.as_ref()),
            _ => None,
        }
    }

    pub fn program_mut(&mut self, id: NodeId) -> Option<&mut Program> {
        match &mut self.nodes.get_mut(id.0)?.kind {
            NodeKind::Program(program) => Some(program.as_mut()),
            _ => None,
        }
    }

    /// Import the library `name`, looked up from `into`, into the library
    /// or program at `into`
    pub fn import(&mut self, into: NodeId, name: &str) -> Result<()> {
        let source = self
            .lookup(into, name)
            .ok_or_else(|| ScriptError::argument(format!("Unknown library {name}")))?;
        if !matches!(self.node(source)?.kind, NodeKind::Library(_)) {
            return Err(ScriptError::argument(format!("{name} is not a library")));
        }
        if source == into {
            return Err(ScriptError::argument(format!("{name} cannot import itself")));
        }

        let (low, high) = (source.0.min(into.0), source.0.max(into.0));
        let (head, tail) = self.nodes.split_at_mut(high);
        let (source_node, target_node) = if source.0 < into.0 {
            (&head[low], &mut tail[0])
        } else {
            (&tail[0], &mut head[low])
        };
        let NodeKind::Library(other) = &source_node.kind else {
            return Err(ScriptError::argument(format!("{name} is not a library")));
        };
        let target = match &mut target_node.kind {
            NodeKind::Library(library) => library.as_mut(),
            NodeKind::Program(program) => program.library_mut(),
            NodeKind::Namespace => {
                return Err(ScriptError::argument(format!(
                    "cannot import {name} into namespace {}",
                    target_node.name
                )))
            }
        };
        target.import(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_addresses() {
        let mut session = Session::new();
        let root = session.root();
        let math = session.namespace(root, "math").unwrap();
        let lib = session.library(math, "big ints").unwrap();
        assert_eq!(session.address(lib), Some("rls.math.bigints"));
        assert_eq!(session.get_library(lib).unwrap().address(), "rls.math.bigints");
        assert_eq!(session.parent(lib), Some(math));
    }

    #[test]
    fn test_get_or_create() {
        let mut session = Session::new();
        let root = session.root();
        let first = session.library(root, "util").unwrap();
        let second = session.library(root, "util").unwrap();
        assert_eq!(first, second);
        assert!(matches!(
            session.program(root, "util"),
            Err(ScriptError::ArgumentError { .. })
        ));
    }

    #[test]
    fn test_lookup_walks_up() {
        let mut session = Session::new();
        let root = session.root();
        let util = session.library(root, "util").unwrap();
        let app = session.namespace(root, "app").unwrap();
        let main = session.program(app, "main").unwrap();

        assert_eq!(session.lookup(main, "util"), Some(util));
        assert_eq!(session.lookup(app, ""), Some(main));
        assert_eq!(session.last(root), Some(app));
        assert!(session.contains(root, "util"));
        assert!(!session.contains(app, "util"));
        assert_eq!(session.lookup(app, "missing"), None);
    }

    #[test]
    fn test_import_errors() {
        let mut session = Session::new();
        let root = session.root();
        let app = session.namespace(root, "app").unwrap();
        let main = session.program(app, "main").unwrap();

        assert!(matches!(
            session.import(main, "nothing"),
            Err(ScriptError::ArgumentError { .. })
        ));
        assert!(matches!(
            session.import(main, "app"),
            Err(ScriptError::ArgumentError { .. })
        ));
    }
}
