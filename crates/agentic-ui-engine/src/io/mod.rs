use crate::models::{Bubble, Conversation, Role};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid transcripts directory: {0}")]
    InvalidTranscriptDir(String),
}

/// Read a markdown file and return its content
pub fn read_file(path: &Path) -> Result<String, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(IoError::Io)
}

/// Markdown files directly inside `dir`, sorted by name
pub fn scan_transcript_files(dir: &Path) -> Result<Vec<PathBuf>, IoError> {
    validate_transcripts_dir(dir)?;

    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file()
            && let Some(ext) = path.extension()
            && ext == "md"
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Role from a file stem such as `001-user`; the last `-` separated word.
pub fn role_from_path(path: &Path) -> Option<Role> {
    let stem = path.file_stem()?.to_str()?;
    let suffix = stem.rsplit('-').next()?;
    suffix.parse().ok()
}

/// Load a conversation from `NNN-role.md` files. Files without a known role
/// suffix are skipped.
pub fn load_conversation(dir: &Path) -> Result<Conversation, IoError> {
    let mut conversation = Conversation::new();
    for path in scan_transcript_files(dir)? {
        let Some(role) = role_from_path(&path) else {
            log::warn!("skipping {}: no role suffix", path.display());
            continue;
        };
        conversation.push(Bubble::new(role, read_file(&path)?));
    }
    log::debug!(
        "loaded {} bubbles from {}",
        conversation.len(),
        dir.display()
    );
    Ok(conversation)
}

/// Write each bubble as `NNN-role.md`, creating `dir` if needed
pub fn save_conversation(conversation: &Conversation, dir: &Path) -> Result<(), IoError> {
    fs::create_dir_all(dir)?;
    for (i, bubble) in conversation.bubbles().iter().enumerate() {
        let name = format!("{:03}-{}.md", i + 1, bubble.role);
        fs::write(dir.join(name), &bubble.content)?;
    }
    Ok(())
}

pub fn validate_transcripts_dir(path: &Path) -> Result<(), IoError> {
    if !path.exists() || !path.is_dir() {
        return Err(IoError::InvalidTranscriptDir(format!(
            "{} does not exist",
            path.display()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{create_test_file, create_test_transcripts_dir};

    #[test]
    fn test_load_conversation_in_name_order() {
        // Given transcript files written out of order
        let dir = create_test_transcripts_dir();
        create_test_file(&dir, "002-assistant.md", "# Hello\n\nHow can I help?");
        create_test_file(&dir, "001-user.md", "hi");
        create_test_file(&dir, "003-user.md", "thanks");

        // When loading
        let conversation = load_conversation(dir.path()).unwrap();

        // Then bubbles follow file name order
        let roles: Vec<Role> = conversation.bubbles().iter().map(|b| b.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
        assert_eq!(conversation.bubbles()[1].content, "# Hello\n\nHow can I help?");
    }

    #[test]
    fn test_ignore_non_markdown_and_unknown_roles() {
        let dir = create_test_transcripts_dir();
        create_test_file(&dir, "001-user.md", "hi");
        create_test_file(&dir, "notes.md", "not a bubble");
        create_test_file(&dir, "002-assistant.txt", "wrong extension");

        let conversation = load_conversation(dir.path()).unwrap();
        assert_eq!(conversation.len(), 1);
    }

    #[test]
    fn test_missing_directory() {
        let result = load_conversation(Path::new("/this/path/does/not/exist"));
        assert!(matches!(result, Err(IoError::InvalidTranscriptDir(_))));
    }

    #[test]
    fn test_read_file_not_found() {
        let dir = create_test_transcripts_dir();
        let result = read_file(&dir.path().join("missing.md"));
        assert!(matches!(result, Err(IoError::NotFound(_))));
    }

    #[test]
    fn test_save_then_load() {
        let dir = create_test_transcripts_dir();
        let target = dir.path().join("nested");
        let conversation: Conversation = [
            Bubble::new(Role::User, "question"),
            Bubble::new(Role::Assistant, "**answer**"),
        ]
        .into_iter()
        .collect();

        save_conversation(&conversation, &target).unwrap();

        assert!(target.join("002-assistant.md").exists());
        assert_eq!(load_conversation(&target).unwrap(), conversation);
    }

    #[test]
    fn test_role_from_path() {
        assert_eq!(role_from_path(Path::new("010-system.md")), Some(Role::System));
        assert_eq!(role_from_path(Path::new("user.md")), Some(Role::User));
        assert_eq!(role_from_path(Path::new("readme.md")), None);
    }
}
