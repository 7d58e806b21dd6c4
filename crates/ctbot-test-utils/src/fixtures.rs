//! Sample corpora and stream frames.

use std::path::{Path, PathBuf};

use ctbot_core::corpus::{ClassMapping, FieldMapping, MappingTables, MethodMapping};
use ctbot_core::{DocCorpus, MappingIndex, SearchTerm};

/// The two-entry documentation corpus used by the ranking scenario.
pub fn sample_docs() -> DocCorpus {
    DocCorpus::new(vec![
        SearchTerm::new("Entity", "d1", "u1"),
        SearchTerm::new("EntityPlayer", "d2", "u2"),
    ])
}

fn method(owner: &str, obf: &str) -> MethodMapping {
    MethodMapping {
        name: "render".to_string(),
        obfuscated_name: obf.to_string(),
        owner: owner.to_string(),
        signature: "(F)V".to_string(),
    }
}

/// Three `render` methods on different owners, one field, two classes.
pub fn sample_tables() -> MappingTables {
    MappingTables {
        fields: vec![FieldMapping {
            name: "posX".to_string(),
            obfuscated_name: "field_70165_t".to_string(),
            owner: "net/minecraft/entity/Entity".to_string(),
        }],
        methods: vec![
            method("net/minecraft/client/gui/GuiScreen", "func_73863_a"),
            method("net/minecraft/client/renderer/EntityRenderer", "func_78480_b"),
            method("net/minecraft/client/Minecraft", "func_71411_J"),
        ],
        classes: vec![
            ClassMapping {
                path: "net/minecraft/client/Minecraft".to_string(),
            },
            ClassMapping {
                path: "net/minecraft/entity/Entity".to_string(),
            },
        ],
    }
}

pub fn sample_mappings() -> MappingIndex {
    MappingIndex::new(sample_tables())
}

/// Write the sample corpora as JSON files under `dir`; returns (docs, mappings).
pub fn write_corpora(dir: &Path) -> (PathBuf, PathBuf) {
    let docs_path = dir.join("search_terms.json");
    let mappings_path = dir.join("mappings.json");

    let docs = serde_json::to_string(sample_docs().terms()).expect("serialize docs");
    std::fs::write(&docs_path, docs).expect("write docs corpus");
    let tables = serde_json::to_string(&sample_tables()).expect("serialize mappings");
    std::fs::write(&mappings_path, tables).expect("write mapping tables");

    (docs_path, mappings_path)
}

pub fn module_json(name: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "owner": { "name": "tester" },
        "tags": ["utility"],
        "description": format!("{name} description"),
        "image": "",
    })
}

pub fn module_created_frame(name: &str) -> String {
    serde_json::json!({ "type": "module_created", "module": module_json(name) }).to_string()
}

pub fn module_deleted_frame(name: &str) -> String {
    serde_json::json!({ "type": "module_deleted", "module": module_json(name) }).to_string()
}

pub fn release_created_frame(name: &str, version: &str) -> String {
    serde_json::json!({
        "type": "release_created",
        "module": module_json(name),
        "release": {
            "releaseVersion": version,
            "modVersion": "2.0.0",
            "changelog": "changes",
        },
    })
    .to_string()
}

/// An untagged frame classified only by its marker substring.
pub fn marker_only_frame(marker: &str, name: &str) -> String {
    serde_json::json!({ "kind": marker, "module": module_json(name) }).to_string()
}
