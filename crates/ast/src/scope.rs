use indexmap::IndexMap;

use matc_span::Symbol;

use crate::node::NodeId;

/// An index into the scope table, kept separate from the node arena because
/// a scope is bookkeeping data built by the scope-builder pass, not an AST
/// node in its own right (spec.md §4.3).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ScopeId(pub u32);

/// One lexical scope: the file-level script scope, or a single function
/// body. Declared-name order is preserved with `IndexMap` rather than
/// modeled as an arena-addressed sibling chain, since scopes are never
/// themselves AST nodes that shape/type inference walks.
#[derive(Clone, Debug)]
pub struct Scope {
    pub id: ScopeId,
    pub parent: Option<ScopeId>,
    /// The `Program` or `FunctionDef` node that owns this scope.
    pub owner: NodeId,
    /// Every variable declared in this scope, in first-seen order, mapped
    /// to the node at which it was first assigned or bound as a parameter.
    pub variables: IndexMap<Symbol, NodeId>,
    /// Input parameter names, in declaration order (function scopes only).
    pub inputs: Vec<Symbol>,
    /// Output parameter names, in declaration order (function scopes only).
    pub outputs: Vec<Symbol>,
    /// Functions declared directly in this scope, keyed by name.
    pub functions: IndexMap<Symbol, NodeId>,
}

impl Scope {
    fn new(id: ScopeId, parent: Option<ScopeId>, owner: NodeId) -> Self {
        Self {
            id,
            parent,
            owner,
            variables: IndexMap::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            functions: IndexMap::new(),
        }
    }
}

/// The table of every scope in a translation unit, indexed by `ScopeId`.
#[derive(Default)]
pub struct ScopeTable {
    scopes: Vec<Scope>,
}

impl ScopeTable {
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    pub fn alloc(&mut self, parent: Option<ScopeId>, owner: NodeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(id, parent, owner));
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }

    /// Looks up `name` starting at `from`, climbing to enclosing scopes.
    /// Function scopes in this language do not see their caller's locals,
    /// but they do see sibling function definitions and the script scope's
    /// function table, so the climb only ever stops at a variable hit and
    /// keeps climbing through variable misses for functions.
    pub fn lookup_variable(&self, from: ScopeId, name: Symbol) -> Option<NodeId> {
        let scope = self.get(from);
        if let Some(&node) = scope.variables.get(&name) {
            return Some(node);
        }
        None
    }

    pub fn lookup_function(&self, from: ScopeId, name: Symbol) -> Option<NodeId> {
        let mut current = Some(from);
        while let Some(id) = current {
            let scope = self.get(id);
            if let Some(&node) = scope.functions.get(&name) {
                return Some(node);
            }
            current = scope.parent;
        }
        None
    }
}
