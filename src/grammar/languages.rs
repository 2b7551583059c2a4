//! Comment syntax table and extension-based language resolution.
//!
//! Every language the scanner knows is described by its line-comment marker
//! and, where it has one, the delimiters of its block comments. Unknown
//! extensions resolve to a generic C-like descriptor so a single odd file
//! never aborts a scan.

use phf::phf_map;

/// Opening and closing delimiters of a block comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockComment {
    pub start: &'static str,
    pub end: &'static str,
}

/// Comment syntax of a single language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    /// Stable identifier (e.g., "python", "c++")
    pub id: &'static str,
    /// Marker that starts a comment running to the end of the line
    pub line_comment: &'static str,
    /// Block comment delimiters, if the language has them
    pub block_comment: Option<BlockComment>,
}

const C_BLOCK: Option<BlockComment> = Some(BlockComment {
    start: "/*",
    end: "*/",
});

const fn c_like(id: &'static str) -> Language {
    Language {
        id,
        line_comment: "//",
        block_comment: C_BLOCK,
    }
}

/// Descriptor used for any extension missing from the table.
pub static GENERIC: Language = c_like("generic");

/// All languages with a dedicated descriptor.
pub static LANGUAGES: &[Language] = &[
    Language {
        id: "python",
        line_comment: "#",
        block_comment: Some(BlockComment {
            start: "'''",
            end: "'''",
        }),
    },
    c_like("java"),
    c_like("javascript"),
    c_like("c"),
    c_like("c++"),
    c_like("php"),
    c_like("swift"),
    Language {
        id: "ruby",
        line_comment: "#",
        block_comment: Some(BlockComment {
            start: "=begin",
            end: "=end",
        }),
    },
    c_like("go"),
    c_like("rust"),
    c_like("kotlin"),
    c_like("csharp"),
    c_like("typescript"),
    c_like("scala"),
    Language {
        id: "shell",
        line_comment: "#",
        block_comment: Some(BlockComment {
            start: ": '",
            end: "'",
        }),
    },
    Language {
        id: "pascal",
        line_comment: "//",
        block_comment: Some(BlockComment {
            start: "{",
            end: "}",
        }),
    },
    Language {
        id: "sql",
        line_comment: "--",
        block_comment: C_BLOCK,
    },
    // Config formats that only have hash comments
    Language {
        id: "hash",
        line_comment: "#",
        block_comment: None,
    },
];

/// File extension (without the dot) to language id.
static EXTENSIONS: phf::Map<&'static str, &'static str> = phf_map! {
    "py" => "python",
    "pyi" => "python",
    "java" => "java",
    "js" => "javascript",
    "jsx" => "javascript",
    "mjs" => "javascript",
    "cjs" => "javascript",
    "c" => "c",
    "h" => "c",
    "cpp" => "c++",
    "hpp" => "c++",
    "cc" => "c++",
    "cxx" => "c++",
    "php" => "php",
    "swift" => "swift",
    "rb" => "ruby",
    "go" => "go",
    "rs" => "rust",
    "kt" => "kotlin",
    "kts" => "kotlin",
    "cs" => "csharp",
    "ts" => "typescript",
    "tsx" => "typescript",
    "scala" => "scala",
    "sc" => "scala",
    "sh" => "shell",
    "bash" => "shell",
    "zsh" => "shell",
    "pas" => "pascal",
    "pp" => "pascal",
    "sql" => "sql",
    "yaml" => "hash",
    "yml" => "hash",
    "toml" => "hash",
};

/// Look up a language by its identifier.
pub fn language_by_id(id: &str) -> Option<&'static Language> {
    if id == GENERIC.id {
        return Some(&GENERIC);
    }
    LANGUAGES.iter().find(|l| l.id == id)
}

/// Resolve the language for a file extension.
///
/// Accepts the extension with or without a leading dot, in any case.
/// Unknown extensions resolve to [`GENERIC`].
pub fn resolve_language(extension: &str) -> &'static Language {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();
    EXTENSIONS
        .get(ext.as_str())
        .and_then(|id| language_by_id(id))
        .unwrap_or(&GENERIC)
}

/// Return all file extensions with a dedicated descriptor.
pub fn known_extensions() -> Vec<&'static str> {
    let mut exts: Vec<&'static str> = EXTENSIONS.keys().copied().collect();
    exts.sort_unstable();
    exts
}
