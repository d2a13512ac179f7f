//! Tree-sitter grammar table and syntax helpers shared by the scanner,
//! the relationship extractor and the metric annotator.

use crate::core::{Language, NodeKind};
use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use tree_sitter::{Node as SyntaxNode, Parser, Tree};

/// Node kinds that matter for one grammar
#[derive(Debug)]
pub struct SyntaxProfile {
    pub function_kinds: &'static [&'static str],
    pub class_kinds: &'static [&'static str],
    pub call_kinds: &'static [&'static str],
    pub branch_kinds: &'static [&'static str],
    pub comprehension_kinds: &'static [&'static str],
    /// Children of a class definition that list its bases
    pub heritage_kinds: &'static [&'static str],
    pub import_query: &'static str,
    /// Class kinds that only define a type when they carry a body
    pub class_needs_body: bool,
}

static PYTHON: SyntaxProfile = SyntaxProfile {
    function_kinds: &["function_definition"],
    class_kinds: &["class_definition"],
    call_kinds: &["call"],
    branch_kinds: &[
        "if_statement",
        "elif_clause",
        "for_statement",
        "while_statement",
        "except_clause",
        "conditional_expression",
        "case_clause",
    ],
    comprehension_kinds: &[
        "list_comprehension",
        "dictionary_comprehension",
        "set_comprehension",
        "generator_expression",
    ],
    heritage_kinds: &["argument_list"],
    import_query: r#"
        (import_statement name: (_) @import)
        (import_from_statement module_name: (_) @import)
    "#,
    class_needs_body: false,
};

static JAVASCRIPT: SyntaxProfile = SyntaxProfile {
    function_kinds: &[
        "function_declaration",
        "generator_function_declaration",
        "method_definition",
        "variable_declarator",
    ],
    class_kinds: &["class_declaration"],
    call_kinds: &["call_expression", "new_expression"],
    branch_kinds: &[
        "if_statement",
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
        "catch_clause",
        "switch_case",
        "ternary_expression",
    ],
    comprehension_kinds: &[],
    heritage_kinds: &["class_heritage"],
    import_query: r#"
        (import_statement source: (string) @import)
        (call_expression function: (identifier) @func arguments: (arguments (string) @import) (#eq? @func "require"))
    "#,
    class_needs_body: false,
};

static TYPESCRIPT: SyntaxProfile = SyntaxProfile {
    function_kinds: &[
        "function_declaration",
        "generator_function_declaration",
        "method_definition",
        "variable_declarator",
    ],
    class_kinds: &[
        "class_declaration",
        "abstract_class_declaration",
        "interface_declaration",
    ],
    call_kinds: &["call_expression", "new_expression"],
    branch_kinds: &[
        "if_statement",
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
        "catch_clause",
        "switch_case",
        "ternary_expression",
    ],
    comprehension_kinds: &[],
    heritage_kinds: &["class_heritage", "extends_type_clause"],
    import_query: r#"
        (import_statement source: (string) @import)
        (call_expression function: (identifier) @func arguments: (arguments (string) @import) (#eq? @func "require"))
    "#,
    class_needs_body: false,
};

static RUST: SyntaxProfile = SyntaxProfile {
    function_kinds: &["function_item"],
    class_kinds: &["struct_item", "enum_item", "trait_item", "union_item"],
    call_kinds: &["call_expression"],
    branch_kinds: &[
        "if_expression",
        "while_expression",
        "loop_expression",
        "for_expression",
        "match_arm",
    ],
    comprehension_kinds: &[],
    heritage_kinds: &[],
    import_query: r#"
        (use_declaration argument: (_) @import)
        (mod_item name: (_) @import)
    "#,
    class_needs_body: false,
};

static GO: SyntaxProfile = SyntaxProfile {
    function_kinds: &["function_declaration", "method_declaration"],
    class_kinds: &["type_spec"],
    call_kinds: &["call_expression"],
    branch_kinds: &[
        "if_statement",
        "for_statement",
        "expression_case",
        "type_case",
        "communication_case",
    ],
    comprehension_kinds: &[],
    heritage_kinds: &[],
    import_query: r#"
        (import_spec path: (_) @import)
    "#,
    class_needs_body: false,
};

static C: SyntaxProfile = SyntaxProfile {
    function_kinds: &["function_definition"],
    class_kinds: &["struct_specifier", "union_specifier"],
    call_kinds: &["call_expression"],
    branch_kinds: &[
        "if_statement",
        "for_statement",
        "while_statement",
        "do_statement",
        "case_statement",
        "conditional_expression",
    ],
    comprehension_kinds: &[],
    heritage_kinds: &[],
    import_query: r#"
        (preproc_include path: (_) @import)
    "#,
    class_needs_body: true,
};

static CPP: SyntaxProfile = SyntaxProfile {
    function_kinds: &["function_definition"],
    class_kinds: &["class_specifier", "struct_specifier", "union_specifier"],
    call_kinds: &["call_expression"],
    branch_kinds: &[
        "if_statement",
        "for_statement",
        "for_range_loop",
        "while_statement",
        "do_statement",
        "case_statement",
        "catch_clause",
        "conditional_expression",
    ],
    comprehension_kinds: &[],
    heritage_kinds: &["base_class_clause"],
    import_query: r#"
        (preproc_include path: (_) @import)
    "#,
    class_needs_body: true,
};

impl Language {
    /// Compiled tree-sitter grammar, when one is bundled.
    pub fn grammar(&self) -> Option<tree_sitter::Language> {
        let grammar = match self {
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Language::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            Language::Rust => tree_sitter_rust::LANGUAGE.into(),
            Language::Go => tree_sitter_go::LANGUAGE.into(),
            Language::C => tree_sitter_c::LANGUAGE.into(),
            Language::Cpp => tree_sitter_cpp::LANGUAGE.into(),
            _ => return None,
        };
        Some(grammar)
    }

    pub fn has_grammar(&self) -> bool {
        self.profile().is_some()
    }

    pub fn profile(&self) -> Option<&'static SyntaxProfile> {
        match self {
            Language::Python => Some(&PYTHON),
            Language::JavaScript => Some(&JAVASCRIPT),
            Language::TypeScript | Language::Tsx => Some(&TYPESCRIPT),
            Language::Rust => Some(&RUST),
            Language::Go => Some(&GO),
            Language::C => Some(&C),
            Language::Cpp => Some(&CPP),
            _ => None,
        }
    }
}

thread_local! {
    static PARSERS: RefCell<HashMap<Language, Parser>> = RefCell::new(HashMap::new());
}

/// Parses `source` with this thread's pooled parser for `language`.
///
/// Returns `None` when no grammar is bundled or the grammar cannot be loaded.
pub fn parse(language: Language, source: &str) -> Option<Tree> {
    let grammar = language.grammar()?;
    PARSERS.with(|cell| {
        let mut parsers = cell.borrow_mut();
        let parser = match parsers.entry(language) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let mut parser = Parser::new();
                if let Err(e) = parser.set_language(&grammar) {
                    log::warn!("{} grammar failed to load: {}", language, e);
                    return None;
                }
                entry.insert(parser)
            }
        };
        parser.parse(source, None)
    })
}

/// Pre-order list of all nodes below and including `root`.
pub fn descendants<'t>(root: SyntaxNode<'t>) -> Vec<SyntaxNode<'t>> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        out.push(node);
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    out
}

/// 1-based line of the first error or missing node, if the tree has any.
pub fn first_error_line(tree: &Tree) -> Option<usize> {
    let root = tree.root_node();
    if !root.has_error() {
        return None;
    }
    descendants(root)
        .into_iter()
        .find(|n| n.is_error() || n.is_missing())
        .map(|n| n.start_position().row + 1)
        .or(Some(root.start_position().row + 1))
}

pub fn text<'s>(node: SyntaxNode, source: &'s [u8]) -> Option<&'s str> {
    node.utf8_text(source).ok()
}

/// Inclusive 1-based line span of a syntax node.
pub fn line_span(node: SyntaxNode) -> (usize, usize) {
    let start = node.start_position().row + 1;
    let end_pos = node.end_position();
    // a span ending at column 0 belongs to the previous line
    let end = if end_pos.column == 0 && end_pos.row > node.start_position().row {
        end_pos.row
    } else {
        end_pos.row + 1
    };
    (start, end)
}

/// Classifies a syntax node as a definition and returns its kind and name.
pub fn classify_definition(
    node: SyntaxNode,
    source: &[u8],
    profile: &SyntaxProfile,
) -> Option<(NodeKind, String)> {
    let kind = node.kind();
    if profile.function_kinds.contains(&kind) {
        if kind == "variable_declarator" {
            let value = node.child_by_field_name("value")?;
            if !matches!(
                value.kind(),
                "arrow_function" | "function_expression" | "function" | "generator_function"
            ) {
                return None;
            }
        }
        return definition_name(node, source).map(|name| (NodeKind::Function, name));
    }
    if profile.class_kinds.contains(&kind) {
        if profile.class_needs_body && node.child_by_field_name("body").is_none() {
            return None;
        }
        return definition_name(node, source).map(|name| (NodeKind::Class, name));
    }
    None
}

fn definition_name(node: SyntaxNode, source: &[u8]) -> Option<String> {
    if let Some(name) = node.child_by_field_name("name") {
        return terminal_name(name, source);
    }
    declarator_name(node.child_by_field_name("declarator")?, source)
}

fn declarator_name(node: SyntaxNode, source: &[u8]) -> Option<String> {
    let mut current = node;
    loop {
        match current.kind() {
            "identifier" | "field_identifier" | "type_identifier" | "destructor_name"
            | "operator_name" => return text(current, source).map(str::to_string),
            "qualified_identifier" => current = current.child_by_field_name("name")?,
            _ => {
                current = match current.child_by_field_name("declarator") {
                    Some(inner) => inner,
                    None => current.named_child(current.named_child_count().checked_sub(1)?)?,
                }
            }
        }
    }
}

/// Rightmost simple name of an expression such as `a.b.c`, `ns::f` or `obj->m`.
pub fn terminal_name(node: SyntaxNode, source: &[u8]) -> Option<String> {
    let mut current = node;
    loop {
        let next = match current.kind() {
            "identifier" | "field_identifier" | "property_identifier" | "type_identifier"
            | "private_property_identifier" | "shorthand_property_identifier" => {
                return text(current, source).map(str::to_string);
            }
            "attribute" => current.child_by_field_name("attribute"),
            "member_expression" => current.child_by_field_name("property"),
            "field_expression" | "selector_expression" => current.child_by_field_name("field"),
            "scoped_identifier" | "qualified_identifier" | "template_function" => {
                current.child_by_field_name("name")
            }
            "generic_function" | "generic_type" => current
                .child_by_field_name("function")
                .or_else(|| current.child_by_field_name("type")),
            "parenthesized_expression" => current.named_child(0),
            _ => None,
        };
        current = next?;
    }
}

/// Name of the callee of a call-like syntax node.
pub fn callee_name(node: SyntaxNode, source: &[u8]) -> Option<String> {
    let target = match node.kind() {
        "new_expression" => node.child_by_field_name("constructor")?,
        _ => node.child_by_field_name("function")?,
    };
    terminal_name(target, source)
}

/// True for a short-circuit boolean operator node (`and`, `or`, `&&`, `||`, `??`).
pub fn is_short_circuit(node: SyntaxNode, source: &[u8]) -> bool {
    match node.kind() {
        "boolean_operator" => true,
        "binary_expression" => node
            .child_by_field_name("operator")
            .and_then(|op| text(op, source))
            .is_some_and(|op| matches!(op, "&&" | "||" | "??")),
        _ => false,
    }
}

/// Names listed as bases of a class definition.
pub fn base_class_names(node: SyntaxNode, source: &[u8], profile: &SyntaxProfile) -> Vec<String> {
    let mut bases = Vec::new();
    let mut holders = Vec::new();
    if let Some(superclasses) = node.child_by_field_name("superclasses") {
        holders.push(superclasses);
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if profile.heritage_kinds.contains(&child.kind()) && !holders.contains(&child) {
            holders.push(child);
        }
    }
    for holder in holders {
        for n in descendants(holder) {
            if matches!(n.kind(), "identifier" | "type_identifier")
                && let Some(name) = text(n, source)
                && !bases.iter().any(|b| b == name)
            {
                bases.push(name.to_string());
            }
        }
    }
    bases
}
