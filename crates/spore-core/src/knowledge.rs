//! Static knowledge corpus loaded once at startup.

use std::path::Path;
use tracing::{info, warn};

/// Corpus used when the knowledge directory is missing or has no documents.
pub const EMPTY_KNOWLEDGE: &str =
    "No knowledge files yet. Add .md files under the knowledge/ folder.";

const DOCUMENT_SEPARATOR: &str = "\n\n---\n\n";

/// Read every `.md` file in `dir` and concatenate them into one corpus.
///
/// Files are taken in file-name order, each prefixed with a `# From <name>`
/// header. Unreadable files are skipped.
pub fn load_knowledge(dir: &Path) -> String {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!("knowledge: cannot read {}: {e}", dir.display());
            return EMPTY_KNOWLEDGE.to_string();
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.to_lowercase().ends_with(".md"))
        .collect();
    names.sort();

    let mut parts = Vec::with_capacity(names.len());
    for name in &names {
        let path = dir.join(name);
        match std::fs::read_to_string(&path) {
            Ok(content) => parts.push(format!("# From {name}\n\n{content}")),
            Err(e) => warn!("knowledge: could not read {}: {e}", path.display()),
        }
    }

    if parts.is_empty() {
        return EMPTY_KNOWLEDGE.to_string();
    }

    info!(
        "knowledge: loaded {} document(s) from {}",
        parts.len(),
        dir.display()
    );
    parts.join(DOCUMENT_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "__spore_knowledge_{tag}_{}__",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_missing_dir_yields_placeholder() {
        let dir = std::env::temp_dir().join("__spore_knowledge_does_not_exist__");
        assert_eq!(load_knowledge(&dir), EMPTY_KNOWLEDGE);
    }

    #[test]
    fn test_empty_dir_yields_placeholder() {
        let dir = temp_dir("empty");
        std::fs::write(dir.join("notes.txt"), "not markdown").unwrap();
        assert_eq!(load_knowledge(&dir), EMPTY_KNOWLEDGE);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_documents_sorted_with_headers() {
        let dir = temp_dir("sorted");
        std::fs::write(dir.join("links.md"), "site: spore.example").unwrap();
        std::fs::write(dir.join("history.md"), "born on Base").unwrap();
        std::fs::write(dir.join("README.MD"), "upper").unwrap();

        let corpus = load_knowledge(&dir);
        assert_eq!(
            corpus,
            "# From README.MD\n\nupper\n\n---\n\n\
             # From history.md\n\nborn on Base\n\n---\n\n\
             # From links.md\n\nsite: spore.example"
        );
        let _ = std::fs::remove_dir_all(&dir);
    }
}
