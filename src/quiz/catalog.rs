use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("character \"{name}\": {reason}")]
    InvalidCharacter { name: String, reason: String },
    #[error("no character files found in {0:?}")]
    Empty(PathBuf),
}

/// One quest track: the character's questions plus everything shown on the
/// completion screen. Loaded once from a JSON file and never mutated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub unlocked: bool,
    #[serde(default)]
    pub display_order: u32,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub donation_links: Vec<DonationLink>,
    #[serde(default)]
    pub phone_donation: Option<PhoneDonation>,
    #[serde(default)]
    pub bonus: Option<Bonus>,
    #[serde(default)]
    pub bonus_pool: Vec<Bonus>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub answer: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DonationLink {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhoneDonation {
    pub phone: String,
    pub banks: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bonus {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    characters: Vec<Character>,
}

impl Catalog {
    /// Reads every `*.json` file in `dir` as one character record and
    /// returns the catalog ordered by each record's `display_order`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|source| CatalogError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut paths = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().map_or(false, |ext| ext == "json"))
            .collect::<Vec<_>>();
        // Deterministic parse order, so a broken file is always reported
        // against the same path
        paths.sort();

        let mut characters = Vec::new();
        for path in paths {
            let file = File::open(&path).map_err(|source| CatalogError::Io {
                path: path.clone(),
                source,
            })?;
            let character: Character = serde_json::from_reader(BufReader::new(file))
                .map_err(|source| CatalogError::Parse {
                    path: path.clone(),
                    source,
                })?;
            validate(&character)?;
            characters.push(character);
        }

        if characters.is_empty() {
            return Err(CatalogError::Empty(dir.to_path_buf()));
        }

        characters.sort_by_key(|character| character.display_order);
        Ok(Self { characters })
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    pub fn unlocked(&self) -> impl Iterator<Item = &Character> {
        self.characters.iter().filter(|character| character.unlocked)
    }

    /// Locked characters are not offered anywhere in the bot, so lookups go
    /// through this and never see them.
    pub fn find_unlocked(&self, name: &str) -> Option<&Character> {
        self.unlocked().find(|character| character.name == name)
    }
}

fn validate(character: &Character) -> Result<(), CatalogError> {
    let invalid = |reason: String| CatalogError::InvalidCharacter {
        name: character.name.clone(),
        reason,
    };

    if character.name.trim().is_empty() {
        return Err(invalid("character name is empty".to_string()));
    }

    for (i, question) in character.questions.iter().enumerate() {
        if question.options.len() < 2 {
            return Err(invalid(format!(
                "question {} has fewer than 2 options",
                i + 1
            )));
        }
        for (j, option) in question.options.iter().enumerate() {
            if question.options[..j].contains(option) {
                return Err(invalid(format!(
                    "question {} has a duplicate option \"{}\"",
                    i + 1,
                    option
                )));
            }
        }
        if !question.options.contains(&question.answer) {
            return Err(invalid(format!(
                "question {} answer \"{}\" is not one of its options",
                i + 1,
                question.answer
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_file(dir: &Path, name: &str, contents: &str) {
        fs::write(dir.join(name), contents).unwrap();
    }

    #[test]
    fn loads_characters_ordered_by_display_order() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "a.json",
            r#"{ "name": "Таня", "display_order": 5 }"#,
        );
        write_file(
            dir.path(),
            "b.json",
            r#"{ "name": "Босс", "display_order": 0, "unlocked": true }"#,
        );
        write_file(
            dir.path(),
            "c.json",
            r#"{ "name": "Алина", "display_order": 1 }"#,
        );

        let catalog = Catalog::load(dir.path()).unwrap();
        let names = catalog
            .characters()
            .iter()
            .map(|character| character.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Босс", "Алина", "Таня"]);
    }

    #[test]
    fn ignores_files_that_are_not_json() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "boss.json", r#"{ "name": "Босс" }"#);
        write_file(dir.path(), "notes.txt", "not a character");

        let catalog = Catalog::load(dir.path()).unwrap();
        assert_eq!(catalog.characters().len(), 1);
    }

    #[test]
    fn only_unlocked_characters_are_findable() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "boss.json",
            r#"{ "name": "Босс", "unlocked": true }"#,
        );
        write_file(dir.path(), "alina.json", r#"{ "name": "Алина" }"#);

        let catalog = Catalog::load(dir.path()).unwrap();
        assert_eq!(catalog.unlocked().count(), 1);
        assert!(catalog.find_unlocked("Босс").is_some());
        assert!(catalog.find_unlocked("Алина").is_none());
        assert!(catalog.find_unlocked("Никита").is_none());
    }

    #[test]
    fn rejects_a_question_with_a_single_option() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "boss.json",
            r#"{
                "name": "Босс",
                "questions": [
                    { "question": "Вопрос?", "options": ["Да"], "answer": "Да" }
                ]
            }"#,
        );

        let err = Catalog::load(dir.path()).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidCharacter { .. }));
    }

    #[test]
    fn rejects_duplicate_options() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "boss.json",
            r#"{
                "name": "Босс",
                "questions": [
                    { "question": "Вопрос?", "options": ["Да", "Да"], "answer": "Да" }
                ]
            }"#,
        );

        let err = Catalog::load(dir.path()).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidCharacter { .. }));
    }

    #[test]
    fn rejects_an_answer_that_is_not_an_option() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "boss.json",
            r#"{
                "name": "Босс",
                "questions": [
                    { "question": "Вопрос?", "options": ["Да", "Нет"], "answer": "Возможно" }
                ]
            }"#,
        );

        let err = Catalog::load(dir.path()).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidCharacter { .. }));
    }

    #[test]
    fn rejects_a_character_without_a_name() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "anon.json", r#"{ "name": "  " }"#);

        let err = Catalog::load(dir.path()).unwrap_err();
        assert!(matches!(err, CatalogError::InvalidCharacter { .. }));
    }

    #[test]
    fn reports_malformed_json_with_the_file_path() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "boss.json", "{ not json");

        let err = Catalog::load(dir.path()).unwrap_err();
        match err {
            CatalogError::Parse { path, .. } => {
                assert!(path.ends_with("boss.json"))
            }
            other => panic!("expected a parse error, got {other}"),
        }
    }

    #[test]
    fn an_empty_directory_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();

        let err = Catalog::load(dir.path()).unwrap_err();
        assert!(matches!(err, CatalogError::Empty(_)));
    }

    #[test]
    fn missing_optional_fields_default() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "boss.json", r#"{ "name": "Босс" }"#);

        let catalog = Catalog::load(dir.path()).unwrap();
        let character = &catalog.characters()[0];
        assert!(!character.unlocked);
        assert!(character.questions.is_empty());
        assert!(character.donation_links.is_empty());
        assert!(character.phone_donation.is_none());
        assert!(character.bonus.is_none());
        assert!(character.bonus_pool.is_empty());
    }
}
