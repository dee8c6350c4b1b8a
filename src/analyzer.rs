use log::debug;
use regex::Regex;

/// Line classification for a source file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineCounts {
    pub total: usize,
    pub blank: usize,
    pub comment: usize,
    pub code: usize,
}

/// A function signature found in source text.
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    pub name: String,
    pub line: usize,
    pub signature: String,
}

/// Lightweight source analysis: line classification and per-language
/// function-signature extraction. No parsing beyond that.
pub struct CodeAnalyzer;

impl CodeAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Classify the lines of a source file.
    pub fn count_lines(&self, code: &str) -> LineCounts {
        let mut counts = LineCounts::default();
        for line in code.lines() {
            counts.total += 1;
            let stripped = line.trim();
            if stripped.is_empty() {
                counts.blank += 1;
            } else if stripped.starts_with('#') || stripped.starts_with("//") {
                counts.comment += 1;
            } else {
                counts.code += 1;
            }
        }
        counts
    }

    /// Extract function signatures using per-language patterns.
    pub fn extract_functions(&self, code: &str, language: &str) -> Vec<FunctionInfo> {
        let pattern = match language {
            "python" => r"^\s*(?:async\s+)?def\s+(\w+)\s*\(",
            "javascript" | "typescript" => r"function\s+(\w+)\s*\(",
            "java" | "csharp" => {
                r"(?:public|private|protected)\s+(?:static\s+)?\w+\s+(\w+)\s*\([^)]*\)"
            }
            "go" => r"func\s+(\w+)\s*\(",
            "rust" => r"fn\s+(\w+)\s*[(<]",
            "cpp" => r"(?:\w+\s+)+(\w+)\s*\([^)]*\)\s*\{",
            _ => {
                debug!("No function pattern for language: {}", language);
                return Vec::new();
            }
        };

        let re = match Regex::new(pattern) {
            Ok(re) => re,
            Err(_) => return Vec::new(),
        };

        let mut functions = Vec::new();
        for (i, line) in code.lines().enumerate() {
            if let Some(caps) = re.captures(line) {
                if let Some(name) = caps.get(1) {
                    functions.push(FunctionInfo {
                        name: name.as_str().to_string(),
                        line: i + 1,
                        signature: line.trim().to_string(),
                    });
                }
            }
        }
        functions
    }
}

impl Default for CodeAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Guess the language of a source file from its extension.
pub fn language_from_extension(path: &str) -> &'static str {
    let extension = path.rsplit('.').next().unwrap_or("");
    match extension {
        "py" => "python",
        "js" => "javascript",
        "ts" => "typescript",
        "java" => "java",
        "cpp" | "cc" | "cxx" => "cpp",
        "cs" => "csharp",
        "go" => "go",
        "rs" => "rust",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_lines() {
        let code = "# header\n\ndef foo():\n    return 1\n\n// trailing comment\n";
        let counts = CodeAnalyzer::new().count_lines(code);
        assert_eq!(counts.total, 6);
        assert_eq!(counts.blank, 2);
        assert_eq!(counts.comment, 2);
        assert_eq!(counts.code, 2);
    }

    #[test]
    fn test_extract_python_functions() {
        let code = "def alpha(a, b):\n    pass\n\nasync def beta():\n    pass\n";
        let functions = CodeAnalyzer::new().extract_functions(code, "python");
        assert_eq!(functions.len(), 2);
        assert_eq!(functions[0].name, "alpha");
        assert_eq!(functions[0].line, 1);
        assert_eq!(functions[1].name, "beta");
        assert_eq!(functions[1].line, 4);
    }

    #[test]
    fn test_extract_rust_functions() {
        let code = "fn main() {}\npub fn helper<T>(value: T) {}\n";
        let functions = CodeAnalyzer::new().extract_functions(code, "rust");
        assert_eq!(functions.len(), 2);
        assert_eq!(functions[1].name, "helper");
    }

    #[test]
    fn test_unknown_language_has_no_functions() {
        let functions = CodeAnalyzer::new().extract_functions("whatever", "cobol77");
        assert!(functions.is_empty());
    }

    #[test]
    fn test_language_from_extension() {
        assert_eq!(language_from_extension("src/app.py"), "python");
        assert_eq!(language_from_extension("main.rs"), "rust");
        assert_eq!(language_from_extension("notes.txt"), "unknown");
        assert_eq!(language_from_extension("Makefile"), "unknown");
    }
}
