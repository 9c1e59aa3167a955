use std::fmt;

/// A node of a parsed template. Trees are built once by the parser and only
/// read afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Variable {
        name: String,
        escape: bool,
    },
    Section {
        name: String,
        inverted: bool,
        children: Vec<Node>,
    },
    Comment(String),
    Partial {
        name: String,
    },
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Text(text) => write!(f, "text_node: {:?}", text),
            Node::Variable { name, escape: true } => write!(f, "var_node: {{{{{}}}}}", name),
            Node::Variable { name, escape: false } => write!(f, "var_node: {{{{{{{}}}}}}}", name),
            Node::Section {
                name,
                inverted,
                children,
            } => {
                let sigil = if *inverted { '^' } else { '#' };
                write!(f, "section_node: {{{{{}{}}}}}", sigil, name)?;
                for child in children {
                    write!(f, "{}", child)?;
                }
                write!(f, "{{{{/{}}}}}", name)
            }
            Node::Comment(text) => write!(f, "comment_node: {:?}", text),
            Node::Partial { name } => write!(f, "partial_node: {{{{>{}}}}}", name),
        }
    }
}
