//! Cyclomatic complexity from tree-sitter syntax trees.
//!
//! Every function-like node is a unit starting at complexity 1. Each decision
//! node inside it (branches, loops, case arms, handlers, conditional
//! expressions, short-circuit operators) adds one. Nested functions are
//! separate units and do not add to their parent.

use crate::analysis::complexity::{FileComplexity, FunctionComplexity};
use crate::analysis::language::Language;
use tree_sitter::{Node, Parser};

struct GrammarRules {
    functions: &'static [&'static str],
    decisions: &'static [&'static str],
    /// Nodes counted once regardless of operator (Python `and`/`or`)
    logical_nodes: &'static [&'static str],
    /// Binary operators counted as decisions
    logical_operators: &'static [&'static str],
}

static PYTHON: GrammarRules = GrammarRules {
    functions: &["function_definition"],
    decisions: &[
        "if_statement",
        "elif_clause",
        "for_statement",
        "while_statement",
        "except_clause",
        "conditional_expression",
        "for_in_clause",
        "if_clause",
        "case_clause",
    ],
    logical_nodes: &["boolean_operator"],
    logical_operators: &[],
};

static JAVASCRIPT: GrammarRules = GrammarRules {
    functions: &[
        "function_declaration",
        "function_expression",
        "function",
        "generator_function_declaration",
        "arrow_function",
        "method_definition",
    ],
    decisions: &[
        "if_statement",
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
        "switch_case",
        "catch_clause",
        "ternary_expression",
    ],
    logical_nodes: &[],
    logical_operators: &["&&", "||", "??"],
};

static JAVA: GrammarRules = GrammarRules {
    functions: &["method_declaration", "constructor_declaration", "lambda_expression"],
    decisions: &[
        "if_statement",
        "for_statement",
        "enhanced_for_statement",
        "while_statement",
        "do_statement",
        "catch_clause",
        "ternary_expression",
        "switch_label",
    ],
    logical_nodes: &[],
    logical_operators: &["&&", "||"],
};

static GO: GrammarRules = GrammarRules {
    functions: &["function_declaration", "method_declaration", "func_literal"],
    decisions: &[
        "if_statement",
        "for_statement",
        "expression_case",
        "type_case",
        "communication_case",
    ],
    logical_nodes: &[],
    logical_operators: &["&&", "||"],
};

static RUST: GrammarRules = GrammarRules {
    functions: &["function_item", "closure_expression"],
    decisions: &[
        "if_expression",
        "while_expression",
        "for_expression",
        "match_arm",
    ],
    logical_nodes: &[],
    logical_operators: &["&&", "||"],
};

fn grammar_for(language: Language) -> Option<(tree_sitter::Language, &'static GrammarRules)> {
    let grammar: (tree_sitter::Language, &'static GrammarRules) = match language {
        Language::Python => (tree_sitter_python::LANGUAGE.into(), &PYTHON),
        Language::JavaScript => (tree_sitter_javascript::LANGUAGE.into(), &JAVASCRIPT),
        Language::TypeScript => (tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(), &JAVASCRIPT),
        Language::Tsx => (tree_sitter_typescript::LANGUAGE_TSX.into(), &JAVASCRIPT),
        Language::Java => (tree_sitter_java::LANGUAGE.into(), &JAVA),
        Language::Go => (tree_sitter_go::LANGUAGE.into(), &GO),
        Language::Rust => (tree_sitter_rust::LANGUAGE.into(), &RUST),
        _ => return None,
    };
    Some(grammar)
}

/// Complexity per function from the syntax tree, or `None` when the language
/// has no grammar or the source does not parse cleanly.
pub fn analyze_syntax(source: &str, language: Language) -> Option<FileComplexity> {
    let (grammar, rules) = grammar_for(language)?;
    let mut parser = Parser::new();
    parser.set_language(&grammar).ok()?;
    let tree = parser.parse(source, None)?;
    let root = tree.root_node();
    if root.has_error() {
        log::debug!("{} source has syntax errors; using line heuristics", language.name());
        return None;
    }

    let mut functions = Vec::new();
    collect_units(root, source.as_bytes(), rules, &mut functions);
    Some(FileComplexity::from_functions(functions))
}

fn collect_units(node: Node, src: &[u8], rules: &GrammarRules, out: &mut Vec<FunctionComplexity>) {
    if rules.functions.contains(&node.kind()) {
        let mut complexity = 1;
        count_decisions(node, src, rules, &mut complexity, out);
        out.push(FunctionComplexity {
            name: unit_name(node, src),
            complexity,
        });
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_units(child, src, rules, out);
    }
}

fn count_decisions(
    node: Node,
    src: &[u8],
    rules: &GrammarRules,
    complexity: &mut usize,
    out: &mut Vec<FunctionComplexity>,
) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        let kind = child.kind();
        if rules.functions.contains(&kind) {
            collect_units(child, src, rules, out);
            continue;
        }
        if rules.decisions.contains(&kind) || rules.logical_nodes.contains(&kind) {
            *complexity += 1;
        } else if kind == "binary_expression" && is_logical(child, rules) {
            *complexity += 1;
        }
        count_decisions(child, src, rules, complexity, out);
    }
}

fn is_logical(node: Node, rules: &GrammarRules) -> bool {
    node.child_by_field_name("operator")
        .is_some_and(|op| rules.logical_operators.contains(&op.kind()))
}

fn unit_name(node: Node, src: &[u8]) -> String {
    node.child_by_field_name("name")
        .and_then(|name| name.utf8_text(src).ok())
        .map(str::to_string)
        .unwrap_or_else(|| "<anonymous>".to_string())
}
