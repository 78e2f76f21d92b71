//! Scoped symbol table used while lowering a program (spec §4.E
//! variable shadowing disambiguation).
//!
//! Bindings live in one flat map keyed by source name; entering a `{}`
//! scope pushes an undo log recording which names it shadowed (to be
//! restored) and which it introduced fresh (to be dropped) once the
//! scope closes. This lets an `Assign` inside a nested scope mutate an
//! outer variable's binding in place without needing frame-indexed
//! lookups.

use probsl_ir::{IrVariable, VarId};
use std::collections::HashMap;

#[derive(Default)]
struct ScopeFrame {
    shadowed: Vec<(String, (IrVariable, String))>,
    introduced: Vec<String>,
    declared_here: std::collections::HashSet<String>,
}

/// The variable environment live during lowering: current bindings
/// plus, per bound name, the disambiguated display key IRGen assigned
/// to it at declaration time (`name`, or `name#k` for the k-th
/// declaration of that name anywhere in the program).
pub struct Env {
    bindings: HashMap<String, (IrVariable, String)>,
    scopes: Vec<ScopeFrame>,
    decl_counts: HashMap<String, u32>,
}

impl Env {
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
            scopes: vec![ScopeFrame::default()],
            decl_counts: HashMap::new(),
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(ScopeFrame::default());
    }

    pub fn pop_scope(&mut self) {
        let frame = self.scopes.pop().expect("scope stack underflow");
        for name in frame.introduced {
            self.bindings.remove(&name);
        }
        for (name, old) in frame.shadowed {
            self.bindings.insert(name, old);
        }
    }

    /// Binds a freshly declared variable. Returns the display key to
    /// use for it in debug info, or `Err(())` if `name` was already
    /// declared in this exact scope (spec's `DuplicateDeclaration`).
    pub fn declare(&mut self, name: &str, var: IrVariable) -> Result<String, ()> {
        {
            let top = self.scopes.last().expect("nonempty scope stack");
            if top.declared_here.contains(name) {
                return Err(());
            }
        }

        let count = self.decl_counts.entry(name.to_string()).or_insert(0);
        *count += 1;
        let display_key = if *count == 1 {
            name.to_string()
        } else {
            format!("{name}#{count}")
        };

        let top = self.scopes.last_mut().expect("nonempty scope stack");
        top.declared_here.insert(name.to_string());
        if let Some(old) = self.bindings.get(name) {
            top.shadowed.push((name.to_string(), old.clone()));
        } else {
            top.introduced.push(name.to_string());
        }

        self.bindings.insert(name.to_string(), (var, display_key.clone()));
        Ok(display_key)
    }

    pub fn get(&self, name: &str) -> Option<IrVariable> {
        self.bindings.get(name).map(|(v, _)| *v)
    }

    /// Rebinds an already-declared name to a new SSA variable (an
    /// `Assign`, not a new declaration); keeps its display key.
    pub fn assign(&mut self, name: &str, var: IrVariable) -> bool {
        match self.bindings.get_mut(name) {
            Some(entry) => {
                entry.0 = var;
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> HashMap<String, (IrVariable, String)> {
        self.bindings.clone()
    }

    pub fn restore(&mut self, snapshot: HashMap<String, (IrVariable, String)>) {
        self.bindings = snapshot;
    }

    /// The debug-info `variables` map for the current position:
    /// display key -> variable id, for every name currently in scope.
    pub fn debug_variables(&self) -> HashMap<String, VarId> {
        self.bindings.values().map(|(v, key)| (key.clone(), v.id)).collect()
    }
}
