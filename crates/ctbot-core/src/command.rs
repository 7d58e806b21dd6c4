//! Chat command parsing.
//!
//! A command line is `<prefix><name> <arg> <arg> ...`, split on whitespace
//! with no quoting. Parsing yields a typed [`CommandRequest`] or a
//! [`UsageError`] that is shown to the caller.

use std::fmt;
use std::str::FromStr;

/// Symbols starting with one of these are treated as obfuscated names.
pub const OBFUSCATED_PREFIXES: [&str; 2] = ["func_", "field_"];

/// Whether `symbol` follows the obfuscated naming convention (`func_1234`).
pub fn is_obfuscated(symbol: &str) -> bool {
    OBFUSCATED_PREFIXES
        .iter()
        .any(|prefix| symbol.starts_with(prefix))
}

/// Which mapping table an `mcp` query targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingKind {
    Field,
    Method,
    Class,
}

impl MappingKind {
    pub const ALL: [MappingKind; 3] = [MappingKind::Field, MappingKind::Method, MappingKind::Class];

    pub fn as_str(self) -> &'static str {
        match self {
            MappingKind::Field => "field",
            MappingKind::Method => "method",
            MappingKind::Class => "class",
        }
    }

    /// Whether entries of this kind carry an owner to re-rank by.
    pub fn has_owner(self) -> bool {
        !matches!(self, MappingKind::Class)
    }
}

impl fmt::Display for MappingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MappingKind {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MappingKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UsageError::UnknownKind {
                given: s.to_string(),
            })
    }
}

/// A validated `mcp` lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct McpQuery {
    pub kind: MappingKind,
    pub symbol: String,
    /// Decides which name is shown as the query side when rendering.
    pub is_obfuscated: bool,
    /// Only kept for kinds that have an owner.
    pub owner_hint: Option<String>,
}

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandRequest {
    /// `javadocs <query...>`
    Javadocs { query: String },
    /// `mcp <kind> <symbol> [ownerHint]`
    Mcp(McpQuery),
    /// `help`
    Help,
    /// `links`
    Links,
}

impl CommandRequest {
    pub fn name(&self) -> &'static str {
        match self {
            CommandRequest::Javadocs { .. } => "javadocs",
            CommandRequest::Mcp(_) => "mcp",
            CommandRequest::Help => "help",
            CommandRequest::Links => "links",
        }
    }
}

/// Malformed command input. The display text is what the caller sees.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UsageError {
    #[error("Too few arguments provided to `{prefix}{command}` command")]
    TooFewArguments {
        prefix: String,
        command: &'static str,
    },

    #[error("Unrecognized type `{given}`. Valid types are: `field`, `method`, `class`")]
    UnknownKind { given: String },

    #[error("Unknown command `{name}`")]
    UnknownCommand { name: String },
}

/// Parses prefixed command lines.
#[derive(Debug, Clone)]
pub struct CommandParser {
    prefix: String,
}

impl CommandParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Parse one chat line.
    ///
    /// Returns `None` when the line is not a command at all (no prefix, or
    /// whitespace between the prefix and the name).
    pub fn parse(&self, line: &str) -> Option<Result<CommandRequest, UsageError>> {
        let rest = line.trim_start().strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            return None;
        }

        let mut words = rest.split_whitespace();
        let name = words.next()?;
        let args: Vec<&str> = words.collect();

        Some(self.parse_args(name, &args))
    }

    fn parse_args(&self, name: &str, args: &[&str]) -> Result<CommandRequest, UsageError> {
        match name {
            "javadocs" => {
                if args.is_empty() {
                    return Err(self.too_few("javadocs"));
                }
                Ok(CommandRequest::Javadocs {
                    query: args.join(" "),
                })
            }
            "mcp" => {
                let [kind, symbol, rest @ ..] = args else {
                    return Err(self.too_few("mcp"));
                };
                let kind: MappingKind = kind.parse()?;
                let owner_hint = rest
                    .first()
                    .filter(|_| kind.has_owner())
                    .map(|hint| hint.to_string());
                Ok(CommandRequest::Mcp(McpQuery {
                    kind,
                    symbol: symbol.to_string(),
                    is_obfuscated: is_obfuscated(symbol),
                    owner_hint,
                }))
            }
            "help" => Ok(CommandRequest::Help),
            "links" => Ok(CommandRequest::Links),
            other => Err(UsageError::UnknownCommand {
                name: other.to_string(),
            }),
        }
    }

    fn too_few(&self, command: &'static str) -> UsageError {
        UsageError::TooFewArguments {
            prefix: self.prefix.clone(),
            command,
        }
    }
}
