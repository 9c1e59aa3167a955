use crate::value::Value;

/// The stack of scopes a template renders against. The most recently pushed
/// scope is consulted first.
pub struct Context<'a> {
    stack: Vec<&'a Value>,
}

impl<'a> Context<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self { stack: vec![root] }
    }

    /// Builds a stack from scopes ordered outermost first.
    pub fn from_stack(scopes: &[&'a Value]) -> Self {
        Self {
            stack: scopes.to_vec(),
        }
    }

    pub fn push(&mut self, value: &'a Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) {
        self.stack.pop();
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn lookup(&self, name: &str) -> Option<&'a Value> {
        Self::resolve(&self.stack, name)
    }

    fn resolve(stack: &[&'a Value], name: &str) -> Option<&'a Value> {
        // 1. "." is the innermost scope itself
        if name == "." {
            return stack.last().copied();
        }

        // 2. dotted names resolve the head, then the rest inside it only
        if let Some((head, rest)) = name.split_once('.') {
            let scope = Self::resolve(stack, head)?;
            return Self::resolve(&[scope], rest);
        }

        // 3. first scope offering the name wins
        stack.iter().rev().copied().find_map(|scope| scope.get(name))
    }
}
