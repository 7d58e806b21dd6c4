//! Notification builders for stream events and command replies.

use crate::command::{MappingKind, McpQuery};
use crate::corpus::{ClassMapping, FieldMapping, MappingEntry, MethodMapping, SearchTerm};
use crate::event::{Module, Release};

use super::Notification;

/// Field name used when a notification has a single unlabelled block.
pub const BLANK_FIELD_NAME: &str = "\u{200B}";

pub const NO_RESULTS: &str = "No results";

const INDENT: &str = "\u{2002}\u{2002}";

const LINKS: [(&str, &str); 5] = [
    ("CT Website", "https://www.chattriggers.com/"),
    ("CT Modules", "https://www.chattriggers.com/modules"),
    ("Learn JavaScript", "https://www.w3schools.com/js/"),
    ("CT GitHub Repo", "https://github.com/ChatTriggers/ChatTriggers"),
    ("CT GitHub Organization", "https://github.com/ChatTriggers"),
];

fn module_url(base: &str, module: &Module) -> String {
    format!("{base}{}", module.name)
}

fn query_by(author: &str) -> String {
    format!("Query by {author}")
}

pub fn module_created(module: &Module, url_base: &str) -> Notification {
    let mut n = Notification::new(format!("Module created: {}", module.name))
        .with_url(module_url(url_base, module))
        .with_field("Author", &module.owner.name, true);

    if !module.tags.is_empty() {
        let tags: Vec<&str> = module.tags.iter().map(String::as_str).collect();
        n = n.with_field("Tags", tags.join(", "), true);
    }
    n = n.with_field("Description", &module.description, false);

    if let Some(image) = module.image_url() {
        n = n.with_image(image);
    }
    n
}

pub fn release_created(module: &Module, release: &Release, url_base: &str) -> Notification {
    Notification::new(format!("Release created for module: {}", module.name))
        .with_url(module_url(url_base, module))
        .with_field("Author", &module.owner.name, true)
        .with_field("Release Version", &release.release_version, true)
        .with_field("Mod Version", &release.mod_version, true)
        .with_field("Changelog", &release.changelog, false)
}

pub fn module_deleted(module: &Module) -> Notification {
    Notification::new(format!("Module deleted: {}", module.name))
}

pub fn javadocs_results(query: &str, results: &[&SearchTerm], author: &str) -> Notification {
    let description = if results.is_empty() {
        NO_RESULTS.to_string()
    } else {
        results
            .iter()
            .map(|term| format!("[{}]({})", term.descriptor, term.url))
            .collect::<Vec<_>>()
            .join("\n")
    };
    Notification::new(format!("Search results for \"{query}\""))
        .with_description(description)
        .with_footer(query_by(author))
}

/// Render an `mcp` lookup. `entries` are already in display order.
pub fn mcp_results(query: &McpQuery, entries: &[MappingEntry], author: &str) -> Notification {
    let body = if entries.is_empty() {
        NO_RESULTS.to_string()
    } else {
        let separator = match query.kind {
            MappingKind::Class => "\n",
            MappingKind::Field | MappingKind::Method => "\n\n",
        };
        entries
            .iter()
            .map(|entry| match entry {
                MappingEntry::Field(f) => field_line(f, query.is_obfuscated),
                MappingEntry::Method(m) => method_line(m, query.is_obfuscated),
                MappingEntry::Class(c) => class_line(c),
            })
            .collect::<Vec<_>>()
            .join(separator)
    };

    Notification::new(format!(
        "MCP {} search results for \"{}\"",
        query.kind, query.symbol
    ))
    .with_field(BLANK_FIELD_NAME, body, false)
    .with_footer(query_by(author))
}

/// The typed name goes first, its counterpart second.
fn name_pair<'a>(name: &'a str, obfuscated: &'a str, is_obfuscated: bool) -> (&'a str, &'a str) {
    if is_obfuscated {
        (obfuscated, name)
    } else {
        (name, obfuscated)
    }
}

fn field_line(field: &FieldMapping, is_obfuscated: bool) -> String {
    let (first, second) = name_pair(&field.name, &field.obfuscated_name, is_obfuscated);
    format!(
        "**•** `{first}` → `{second}`\n{INDENT} Owner: `{}`",
        field.owner
    )
}

fn method_line(method: &MethodMapping, is_obfuscated: bool) -> String {
    let (first, second) = name_pair(&method.name, &method.obfuscated_name, is_obfuscated);
    format!(
        "**•** `{first}` → `{second}`\n{INDENT} Owner: {INDENT}`{}`\n{INDENT} Signature: `{}`",
        method.owner, method.signature
    )
}

fn class_line(class: &ClassMapping) -> String {
    format!("**•** `{}`", class.path)
}

/// The help card. `error` is shown above it when a command was malformed.
pub fn help(prefix: &str, author: &str, error: Option<&str>) -> Notification {
    let mcp = format!(
        "`{prefix}mcp <type> <name> [owner]`\n\n\
         `<type>` can be `class`, `method`, or `field`.\n\
         `<name>` can be any word. It does not have to be an exact match, and can optionally be obfuscated.\n\
         `[owner]` optionally ranks results by how well their owning class matches."
    );
    let docs = format!(
        "`{prefix}javadocs <search>`\n\n\
         `<search>` can be the name of any public class, object, field, or method."
    );

    Notification::new("CTBot Help")
        .with_content(error.unwrap_or_default())
        .with_description(
            "CTBot is the friendly ChatTriggers bot designed to help you with all of your CT needs!",
        )
        .with_field(
            "Links",
            format!("Run `{prefix}links` for a list of useful links"),
            false,
        )
        .with_field("MCP Mapping Lookup", mcp, false)
        .with_field("ChatTriggers Doc Lookup", docs, false)
        .with_footer(query_by(author))
}

pub fn links(author: &str) -> Notification {
    let description = LINKS
        .iter()
        .map(|(label, url)| format!("[{label}]({url})"))
        .collect::<Vec<_>>()
        .join("\n");
    Notification::new("Links")
        .with_description(description)
        .with_footer(query_by(author))
}
