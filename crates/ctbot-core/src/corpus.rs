//! Read-only lookup corpora: documentation search terms and symbol mappings.
//!
//! Both corpora are loaded once at startup, wrapped in `Arc`, and shared by
//! every command-handling task without locking.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::fuzzy::{self, Owned};

/// Errors from loading a corpus snapshot.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    #[error("failed to read corpus file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse corpus file {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// A documentation entry: the `name` is matched, `descriptor` and `url` are shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTerm {
    pub name: String,
    pub descriptor: String,
    pub url: String,
}

impl SearchTerm {
    pub fn new(name: &str, descriptor: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            descriptor: descriptor.to_string(),
            url: url.to_string(),
        }
    }
}

/// The documentation corpus searched by `javadocs`.
#[derive(Debug, Clone, Default)]
pub struct DocCorpus {
    terms: Vec<SearchTerm>,
}

impl DocCorpus {
    pub fn new(terms: Vec<SearchTerm>) -> Self {
        Self { terms }
    }

    /// Load a JSON array of [`SearchTerm`]s.
    pub async fn load(path: &Path) -> Result<Self, CorpusError> {
        let terms: Vec<SearchTerm> = read_json(path).await?;
        info!(path = %path.display(), terms = terms.len(), "Documentation corpus loaded");
        Ok(Self::new(terms))
    }

    /// The `limit` terms whose name best matches `query`, best first.
    pub fn search(&self, query: &str, limit: usize) -> Vec<&SearchTerm> {
        fuzzy::extract_top(query, &self.terms, |term| term.name.as_str(), limit)
            .into_iter()
            .map(|m| m.item)
            .collect()
    }

    pub fn terms(&self) -> &[SearchTerm] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

// ── Mappings ────────────────────────────────────────────────────────────

/// A field mapping between a readable and an obfuscated name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldMapping {
    pub name: String,
    pub obfuscated_name: String,
    /// Class path that declares the field.
    pub owner: String,
}

/// A method mapping; `signature` is the JVM descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodMapping {
    pub name: String,
    pub obfuscated_name: String,
    pub owner: String,
    pub signature: String,
}

/// A class, identified by its full path (`net/minecraft/client/Minecraft`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMapping {
    pub path: String,
}

impl ClassMapping {
    /// Last path segment, accepting either `/` or `.` as the separator.
    pub fn simple_name(&self) -> &str {
        self.path.rsplit(['/', '.']).next().unwrap_or(&self.path)
    }
}

impl Owned for FieldMapping {
    fn owner(&self) -> &str {
        &self.owner
    }
}

impl Owned for MethodMapping {
    fn owner(&self) -> &str {
        &self.owner
    }
}

/// Any entry returned by a mapping lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingEntry {
    Field(FieldMapping),
    Method(MethodMapping),
    Class(ClassMapping),
}

/// Exact lookups against the mapping tables.
///
/// `is_obfuscated` says which name the caller typed; implementations check
/// that name column first and the other one second, so a lookup never misses
/// because the caller guessed the convention wrong.
pub trait MappingService: Send + Sync {
    fn fields_by_name(&self, name: &str, is_obfuscated: bool) -> Vec<FieldMapping>;

    fn methods_by_name(&self, name: &str, is_obfuscated: bool) -> Vec<MethodMapping>;

    fn classes_by_name(&self, name: &str) -> Vec<ClassMapping>;

    /// Total entries across all tables, when the service knows it.
    fn entry_count(&self) -> Option<usize> {
        None
    }
}

/// On-disk shape of a mapping snapshot.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MappingTables {
    #[serde(default)]
    pub fields: Vec<FieldMapping>,
    #[serde(default)]
    pub methods: Vec<MethodMapping>,
    #[serde(default)]
    pub classes: Vec<ClassMapping>,
}

type Index = HashMap<String, Vec<usize>>;

/// In-memory [`MappingService`] with case-insensitive exact-match indexes.
#[derive(Debug, Default)]
pub struct MappingIndex {
    tables: MappingTables,
    fields_by_name: Index,
    fields_by_obf: Index,
    methods_by_name: Index,
    methods_by_obf: Index,
    classes_by_simple: Index,
    classes_by_path: Index,
}

impl MappingIndex {
    pub fn new(tables: MappingTables) -> Self {
        Self {
            fields_by_name: index_by(&tables.fields, |f| f.name.as_str()),
            fields_by_obf: index_by(&tables.fields, |f| f.obfuscated_name.as_str()),
            methods_by_name: index_by(&tables.methods, |m| m.name.as_str()),
            methods_by_obf: index_by(&tables.methods, |m| m.obfuscated_name.as_str()),
            classes_by_simple: index_by(&tables.classes, ClassMapping::simple_name),
            classes_by_path: index_by(&tables.classes, |c| c.path.as_str()),
            tables,
        }
    }

    /// Load a JSON [`MappingTables`] snapshot and index it.
    pub async fn load(path: &Path) -> Result<Self, CorpusError> {
        let tables: MappingTables = read_json(path).await?;
        info!(
            path = %path.display(),
            fields = tables.fields.len(),
            methods = tables.methods.len(),
            classes = tables.classes.len(),
            "Mapping tables loaded"
        );
        Ok(Self::new(tables))
    }

    pub fn tables(&self) -> &MappingTables {
        &self.tables
    }
}

impl MappingService for MappingIndex {
    fn fields_by_name(&self, name: &str, is_obfuscated: bool) -> Vec<FieldMapping> {
        let (first, second) = if is_obfuscated {
            (&self.fields_by_obf, &self.fields_by_name)
        } else {
            (&self.fields_by_name, &self.fields_by_obf)
        };
        hits(name, first, second)
            .map(|i| self.tables.fields[i].clone())
            .collect()
    }

    fn methods_by_name(&self, name: &str, is_obfuscated: bool) -> Vec<MethodMapping> {
        let (first, second) = if is_obfuscated {
            (&self.methods_by_obf, &self.methods_by_name)
        } else {
            (&self.methods_by_name, &self.methods_by_obf)
        };
        hits(name, first, second)
            .map(|i| self.tables.methods[i].clone())
            .collect()
    }

    fn classes_by_name(&self, name: &str) -> Vec<ClassMapping> {
        hits(name, &self.classes_by_simple, &self.classes_by_path)
            .map(|i| self.tables.classes[i].clone())
            .collect()
    }

    fn entry_count(&self) -> Option<usize> {
        let t = &self.tables;
        Some(t.fields.len() + t.methods.len() + t.classes.len())
    }
}

fn index_by<T>(items: &[T], key: impl Fn(&T) -> &str) -> Index {
    let mut index = Index::new();
    for (i, item) in items.iter().enumerate() {
        index.entry(key(item).to_lowercase()).or_default().push(i);
    }
    index
}

/// Positions from `first` then `second`, without duplicates, in table order per index.
fn hits<'a>(name: &str, first: &'a Index, second: &'a Index) -> impl Iterator<Item = usize> + 'a {
    let key = name.to_lowercase();
    let primary = first.get(&key).map(Vec::as_slice).unwrap_or_default();
    let secondary = second.get(&key).map(Vec::as_slice).unwrap_or_default();
    primary
        .iter()
        .copied()
        .chain(secondary.iter().copied().filter(move |i| !primary.contains(i)))
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CorpusError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CorpusError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_str(&content).map_err(|source| CorpusError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn field(name: &str, obf: &str, owner: &str) -> FieldMapping {
        FieldMapping {
            name: name.to_string(),
            obfuscated_name: obf.to_string(),
            owner: owner.to_string(),
        }
    }

    fn sample_index() -> MappingIndex {
        MappingIndex::new(MappingTables {
            fields: vec![
                field("posX", "field_70165_t", "net/minecraft/entity/Entity"),
                field("posX", "field_145851_c", "net/minecraft/tileentity/TileEntity"),
                field("field_70165_t", "field_1", "odd/NamedLikeObf"),
            ],
            methods: vec![MethodMapping {
                name: "onUpdate".to_string(),
                obfuscated_name: "func_70071_h_".to_string(),
                owner: "net/minecraft/entity/Entity".to_string(),
                signature: "()V".to_string(),
            }],
            classes: vec![
                ClassMapping {
                    path: "net/minecraft/client/Minecraft".to_string(),
                },
                ClassMapping {
                    path: "net/minecraft/entity/Entity".to_string(),
                },
            ],
        })
    }

    #[test]
    fn test_doc_search_ranks_exact_name_first() {
        let corpus = DocCorpus::new(vec![
            SearchTerm::new("EntityPlayer", "d2", "u2"),
            SearchTerm::new("Entity", "d1", "u1"),
        ]);
        let top = corpus.search("Entity", 5);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].name, "Entity");
    }

    #[test]
    fn test_doc_search_empty_corpus() {
        let corpus = DocCorpus::default();
        assert!(corpus.is_empty());
        assert!(corpus.search("anything", 5).is_empty());
    }

    #[test]
    fn test_fields_by_readable_name() {
        let index = sample_index();
        let hits = index.fields_by_name("posX", false);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].obfuscated_name, "field_70165_t");
    }

    #[test]
    fn test_fields_lookup_is_case_insensitive() {
        let index = sample_index();
        assert_eq!(index.fields_by_name("POSX", false).len(), 2);
    }

    #[test]
    fn test_obfuscated_column_is_checked_first() {
        let index = sample_index();
        let hits = index.fields_by_name("field_70165_t", true);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].name, "posX");
        assert_eq!(hits[1].owner, "odd/NamedLikeObf");

        let hits = index.fields_by_name("field_70165_t", false);
        assert_eq!(hits[0].owner, "odd/NamedLikeObf");
    }

    #[test]
    fn test_lookup_falls_back_to_other_column() {
        let index = sample_index();
        // Obfuscated flag is wrong but the readable column still matches.
        let hits = index.methods_by_name("onUpdate", true);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].obfuscated_name, "func_70071_h_");
    }

    #[test]
    fn test_classes_by_simple_name_and_path() {
        let index = sample_index();
        assert_eq!(index.classes_by_name("Minecraft").len(), 1);
        assert_eq!(
            index.classes_by_name("net/minecraft/entity/Entity")[0].simple_name(),
            "Entity"
        );
        assert!(index.classes_by_name("Nothing").is_empty());
    }

    #[test]
    fn test_simple_name_with_dots() {
        let class = ClassMapping {
            path: "com.chattriggers.ctjs.Reference".to_string(),
        };
        assert_eq!(class.simple_name(), "Reference");
    }

    #[tokio::test]
    async fn test_load_corpora_from_files() {
        let tmp = TempDir::new().unwrap();
        let docs = tmp.path().join("terms.json");
        let maps = tmp.path().join("mappings.json");
        tokio::fs::write(
            &docs,
            r#"[{"name":"ChatLib","descriptor":"object ChatLib","url":"https://example.invalid/chatlib"}]"#,
        )
        .await
        .unwrap();
        tokio::fs::write(
            &maps,
            r#"{"fields":[{"name":"posY","obfuscatedName":"field_70163_u","owner":"Entity"}]}"#,
        )
        .await
        .unwrap();

        let corpus = DocCorpus::load(&docs).await.unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.terms()[0].descriptor, "object ChatLib");

        let index = MappingIndex::load(&maps).await.unwrap();
        assert_eq!(index.tables().fields.len(), 1);
        assert!(index.tables().methods.is_empty());
        assert_eq!(index.fields_by_name("field_70163_u", true)[0].name, "posY");
    }

    #[tokio::test]
    async fn test_load_reports_path_on_bad_json() {
        let tmp = TempDir::new().unwrap();
        let docs = tmp.path().join("terms.json");
        tokio::fs::write(&docs, "{not json").await.unwrap();

        let err = DocCorpus::load(&docs).await.unwrap_err();
        assert!(matches!(err, CorpusError::Json { .. }));
        assert!(err.to_string().contains("terms.json"));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = MappingIndex::load(Path::new("/nonexistent/mappings.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, CorpusError::Io { .. }));
    }
}
