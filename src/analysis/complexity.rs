use crate::analysis::language::Language;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionComplexity {
    pub name: String,
    pub complexity: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileComplexity {
    pub functions: Vec<FunctionComplexity>,
    pub average: f64,
    pub max: f64,
}

impl FileComplexity {
    pub fn from_functions(functions: Vec<FunctionComplexity>) -> Self {
        if functions.is_empty() {
            return Self::default();
        }
        let total: usize = functions.iter().map(|f| f.complexity).sum();
        let max = functions.iter().map(|f| f.complexity).max().unwrap_or(0);
        let average = total as f64 / functions.len() as f64;
        Self {
            functions,
            average,
            max: max as f64,
        }
    }

    pub fn total(&self) -> usize {
        self.functions.iter().map(|f| f.complexity).sum()
    }
}

/// Analyze cyclomatic complexity, preferring the syntax tree and falling back
/// to line heuristics for languages without a grammar or sources that fail to parse.
pub fn analyze(source: &str, language: Language) -> FileComplexity {
    crate::analysis::syntax::analyze_syntax(source, language)
        .unwrap_or_else(|| analyze_complexity(source, language))
}

/// Analyze cyclomatic complexity using line-based heuristics
pub fn analyze_complexity(source: &str, language: Language) -> FileComplexity {
    let mut functions: Vec<FunctionComplexity> = Vec::new();
    let mut current_func_name = String::new();
    let mut current_complexity = 1usize; // Base complexity
    let mut in_function = false;
    let mut brace_depth = 0i32;
    let mut func_start_depth = 0i32;
    let indented = matches!(language, Language::Python | Language::Ruby);

    let branching_keywords: &[&str] = match language {
        Language::Python => &["if ", "elif ", "for ", "while ", "except", " and ", " or "],
        Language::Ruby => &[
            "if ", "elsif ", "unless ", "while ", "until ", "for ", "when ", "rescue", " and ",
            " or ", "&& ", "|| ",
        ],
        Language::Go | Language::Rust => &["if ", "for ", "while ", "match ", "case ", "|| ", "&& "],
        _ => &["if ", "for ", "while ", "switch ", "case ", "catch ", "|| ", "&& "],
    };

    for line in source.lines() {
        let trimmed = line.trim();

        if is_function_declaration(trimmed, language) {
            // Indentation languages: a new declaration closes the previous one
            if in_function && indented {
                functions.push(FunctionComplexity {
                    name: std::mem::take(&mut current_func_name),
                    complexity: current_complexity,
                });
                in_function = false;
            }
            if !in_function {
                current_func_name = extract_function_name(trimmed, language);
                current_complexity = 1;
                in_function = true;
                func_start_depth = brace_depth;
            }
        }

        let opens = line.matches('{').count() as i32;
        let closes = line.matches('}').count() as i32;
        brace_depth += opens - closes;

        if in_function {
            for keyword in branching_keywords {
                if trimmed.contains(keyword) {
                    current_complexity += 1;
                }
            }

            // Ternary operators
            if trimmed.contains(" ? ") && trimmed.contains(" : ") {
                current_complexity += 1;
            }

            if !indented && brace_depth <= func_start_depth && closes > 0 {
                functions.push(FunctionComplexity {
                    name: current_func_name.clone(),
                    complexity: current_complexity,
                });
                in_function = false;
            }
        }
    }

    // Still inside a function at EOF (always the case for indentation languages)
    if in_function && !current_func_name.is_empty() {
        functions.push(FunctionComplexity {
            name: current_func_name,
            complexity: current_complexity,
        });
    }

    FileComplexity::from_functions(functions)
}

const CONTROL_WORDS: [&str; 9] = [
    "if", "for", "while", "switch", "else", "do", "catch", "return", "foreach",
];

fn is_function_declaration(line: &str, language: Language) -> bool {
    match language {
        Language::TypeScript | Language::Tsx | Language::JavaScript => {
            line.contains("function ")
                || (line.contains('(')
                    && line.contains(')')
                    && line.contains('{')
                    && !starts_with_control_word(line))
        }
        Language::Python => line.starts_with("def ") || line.starts_with("async def "),
        Language::Ruby => line.starts_with("def "),
        Language::Go => line.starts_with("func "),
        Language::Rust => strip_rust_qualifiers(line).starts_with("fn "),
        Language::Php => line.contains("function "),
        Language::Java | Language::CSharp => {
            (line.contains("public ")
                || line.contains("private ")
                || line.contains("protected ")
                || line.contains("internal ")
                || line.contains("static "))
                && line.contains('(')
                && !line.ends_with(';')
                && !line.contains(" class ")
        }
        Language::C | Language::Cpp => {
            line.contains('(')
                && line.contains(')')
                && !line.ends_with(';')
                && !line.starts_with('#')
                && !line.contains('=')
                && !starts_with_control_word(line)
                && line.split('(').next().is_some_and(|head| head.split_whitespace().count() >= 2)
        }
        Language::Unknown => false,
    }
}

fn starts_with_control_word(line: &str) -> bool {
    let first = line
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .next()
        .unwrap_or("");
    CONTROL_WORDS.contains(&first)
}

fn strip_rust_qualifiers(line: &str) -> &str {
    let mut rest = line;
    loop {
        let next = ["pub(crate) ", "pub(super) ", "pub ", "async ", "unsafe ", "const ", "extern \"C\" "]
            .iter()
            .find_map(|prefix| rest.strip_prefix(prefix));
        match next {
            Some(stripped) => rest = stripped,
            None => return rest,
        }
    }
}

fn extract_function_name(line: &str, language: Language) -> String {
    let before_paren = |s: &str| s.split('(').next().unwrap_or("unknown").trim().to_string();
    match language {
        Language::Python => before_paren(
            line.strip_prefix("async def ")
                .or_else(|| line.strip_prefix("def "))
                .unwrap_or(""),
        ),
        Language::Ruby => line
            .strip_prefix("def ")
            .unwrap_or("")
            .split(|c: char| c == '(' || c.is_whitespace())
            .next()
            .unwrap_or("unknown")
            .to_string(),
        Language::Go => before_paren(line.strip_prefix("func ").unwrap_or("")),
        Language::Rust => {
            before_paren(strip_rust_qualifiers(line).strip_prefix("fn ").unwrap_or(""))
        }
        _ => {
            // Name is the last word before the opening parenthesis
            let head = line.split('(').next().unwrap_or("");
            head.split_whitespace()
                .last()
                .unwrap_or("unknown")
                .trim_start_matches('*')
                .to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_function_has_complexity_one() {
        let source = "fn simple() {\n  println!(\"hello\");\n}\n";
        let result = analyze_complexity(source, Language::Rust);
        assert_eq!(result.functions.len(), 1);
        assert_eq!(result.functions[0].complexity, 1);
    }

    #[test]
    fn if_statement_adds_complexity() {
        let source = "function foo() {\n  if (x > 0) {\n    return x;\n  }\n}\n";
        let result = analyze_complexity(source, Language::TypeScript);
        assert_eq!(result.functions.len(), 1);
        assert_eq!(result.functions[0].complexity, 2);
    }

    #[test]
    fn c_functions_are_detected() {
        let source = "static int clamp(int v) {\n  if (v < 0) {\n    return 0;\n  }\n  return v;\n}\n\nint main(void) {\n  return clamp(-1);\n}\n";
        let result = analyze_complexity(source, Language::C);
        let names: Vec<&str> = result.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["clamp", "main"]);
        assert_eq!(result.max, 2.0);
        assert_eq!(result.average, 1.5);
    }

    #[test]
    fn python_functions_close_at_next_declaration() {
        let source = "def a():\n    if x:\n        pass\n\ndef b():\n    return 1\n";
        let result = analyze_complexity(source, Language::Python);
        assert_eq!(result.functions.len(), 2);
        assert_eq!(result.functions[0].complexity, 2);
        assert_eq!(result.functions[1].complexity, 1);
    }

    #[test]
    fn ruby_methods_count_branches() {
        let source = "def check(x)\n  return 1 if x\n  2 unless y\nend\n";
        let result = analyze_complexity(source, Language::Ruby);
        assert_eq!(result.functions.len(), 1);
        assert_eq!(result.functions[0].name, "check");
        assert_eq!(result.functions[0].complexity, 3);
    }

    #[test]
    fn empty_source_has_no_functions() {
        let result = analyze_complexity("", Language::Rust);
        assert!(result.functions.is_empty());
        assert_eq!(result.average, 0.0);
        assert_eq!(result.max, 0.0);
    }
}
