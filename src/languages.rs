use serde::Serialize;

/// A language offered in the source and target selectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Language {
    pub name: &'static str,
    /// Snippet inserted into the editor on reset or language switch
    #[serde(skip)]
    pub example: &'static str,
}

pub const LANGUAGES: &[Language] = &[
    Language {
        name: "Python",
        example: "def greet(name):\n    # Say hello\n    return f\"Hello, {name}!\"\n\nprint(greet(\"World\"))\n",
    },
    Language {
        name: "JavaScript",
        example: "function greet(name) {\n  // Say hello\n  return `Hello, ${name}!`;\n}\n\nconsole.log(greet(\"World\"));\n",
    },
    Language {
        name: "TypeScript",
        example: "function greet(name: string): string {\n  // Say hello\n  return `Hello, ${name}!`;\n}\n\nconsole.log(greet(\"World\"));\n",
    },
    Language {
        name: "Java",
        example: "public class Main {\n    // Say hello\n    static String greet(String name) {\n        return \"Hello, \" + name + \"!\";\n    }\n\n    public static void main(String[] args) {\n        System.out.println(greet(\"World\"));\n    }\n}\n",
    },
    Language {
        name: "C",
        example: "#include <stdio.h>\n\n/* Say hello */\nvoid greet(const char *name) {\n    printf(\"Hello, %s!\\n\", name);\n}\n\nint main(void) {\n    greet(\"World\");\n    return 0;\n}\n",
    },
    Language {
        name: "C++",
        example: "#include <iostream>\n#include <string>\n\n// Say hello\nstd::string greet(const std::string& name) {\n    return \"Hello, \" + name + \"!\";\n}\n\nint main() {\n    std::cout << greet(\"World\") << std::endl;\n}\n",
    },
    Language {
        name: "C#",
        example: "using System;\n\nclass Program {\n    // Say hello\n    static string Greet(string name) => $\"Hello, {name}!\";\n\n    static void Main() {\n        Console.WriteLine(Greet(\"World\"));\n    }\n}\n",
    },
    Language {
        name: "Go",
        example: "package main\n\nimport \"fmt\"\n\n// greet says hello\nfunc greet(name string) string {\n\treturn fmt.Sprintf(\"Hello, %s!\", name)\n}\n\nfunc main() {\n\tfmt.Println(greet(\"World\"))\n}\n",
    },
    Language {
        name: "Rust",
        example: "// Say hello\nfn greet(name: &str) -> String {\n    format!(\"Hello, {}!\", name)\n}\n\nfn main() {\n    println!(\"{}\", greet(\"World\"));\n}\n",
    },
    Language {
        name: "Ruby",
        example: "# Say hello\ndef greet(name)\n  \"Hello, #{name}!\"\nend\n\nputs greet(\"World\")\n",
    },
    Language {
        name: "PHP",
        example: "<?php\n// Say hello\nfunction greet($name) {\n    return \"Hello, $name!\";\n}\n\necho greet(\"World\");\n",
    },
    Language {
        name: "Swift",
        example: "// Say hello\nfunc greet(_ name: String) -> String {\n    return \"Hello, \\(name)!\"\n}\n\nprint(greet(\"World\"))\n",
    },
    Language {
        name: "Kotlin",
        example: "// Say hello\nfun greet(name: String): String = \"Hello, $name!\"\n\nfun main() {\n    println(greet(\"World\"))\n}\n",
    },
];

pub const DEFAULT_SOURCE: &str = "Python";
pub const DEFAULT_TARGET: &str = "JavaScript";

/// Case-insensitive lookup by display name
pub fn find_language(name: &str) -> Option<&'static Language> {
    let name = name.trim();
    LANGUAGES.iter().find(|l| l.name.eq_ignore_ascii_case(name))
}

pub fn language_names() -> Vec<&'static str> {
    LANGUAGES.iter().map(|l| l.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case_and_whitespace() {
        assert_eq!(find_language("python").map(|l| l.name), Some("Python"));
        assert_eq!(find_language("  c++ ").map(|l| l.name), Some("C++"));
        assert!(find_language("COBOL").is_none());
    }

    #[test]
    fn every_language_has_an_example() {
        for language in LANGUAGES {
            assert!(!language.example.trim().is_empty(), "{} has no example", language.name);
        }
        assert!(find_language(DEFAULT_SOURCE).is_some());
        assert!(find_language(DEFAULT_TARGET).is_some());
    }

    #[test]
    fn names_are_unique() {
        let names = language_names();
        for (i, a) in names.iter().enumerate() {
            assert!(!names[i + 1..].iter().any(|b| b.eq_ignore_ascii_case(a)));
        }
    }
}
