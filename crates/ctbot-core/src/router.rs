//! Turns chat lines into lookups and reply notifications.
//!
//! The router holds only shared read-only state, so any number of command
//! tasks can call [`CommandRouter::handle`] at once.

use std::sync::Arc;

use tracing::debug;

use crate::command::{CommandParser, CommandRequest, MappingKind, McpQuery, UsageError};
use crate::corpus::{DocCorpus, MappingEntry, MappingService};
use crate::fuzzy::rerank_by_owner;
use crate::notify::{Notification, content};

/// Result of handling one chat line.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// The line was not addressed to the bot.
    NotACommand,
    /// Prefixed, but not a command the bot knows. Nothing is sent.
    Unknown(String),
    /// Malformed command; the notification is the help card with the error.
    Usage(UsageError, Notification),
    /// A successful command and its reply.
    Reply(CommandRequest, Notification),
}

impl RouteOutcome {
    /// The notification to send, if any.
    pub fn notification(&self) -> Option<&Notification> {
        match self {
            RouteOutcome::Usage(_, n) | RouteOutcome::Reply(_, n) => Some(n),
            RouteOutcome::NotACommand | RouteOutcome::Unknown(_) => None,
        }
    }
}

pub struct CommandRouter {
    parser: CommandParser,
    javadocs_limit: usize,
    docs: Arc<DocCorpus>,
    mappings: Arc<dyn MappingService>,
}

impl CommandRouter {
    pub fn new(
        parser: CommandParser,
        javadocs_limit: usize,
        docs: Arc<DocCorpus>,
        mappings: Arc<dyn MappingService>,
    ) -> Self {
        Self {
            parser,
            javadocs_limit,
            docs,
            mappings,
        }
    }

    pub fn prefix(&self) -> &str {
        self.parser.prefix()
    }

    /// Parse and answer one chat line from `author`.
    pub fn handle(&self, line: &str, author: &str) -> RouteOutcome {
        let Some(parsed) = self.parser.parse(line) else {
            return RouteOutcome::NotACommand;
        };

        match parsed {
            Ok(request) => {
                let reply = self.answer(&request, author);
                RouteOutcome::Reply(request, reply)
            }
            Err(UsageError::UnknownCommand { name }) => {
                debug!(command = %name, author = %author, "Ignoring unknown command");
                RouteOutcome::Unknown(name)
            }
            Err(err) => {
                debug!(author = %author, error = %err, "Command usage error");
                let help = content::help(self.prefix(), author, Some(&err.to_string()));
                RouteOutcome::Usage(err, help)
            }
        }
    }

    fn answer(&self, request: &CommandRequest, author: &str) -> Notification {
        match request {
            CommandRequest::Javadocs { query } => {
                let results = self.docs.search(query, self.javadocs_limit);
                debug!(query = %query, results = results.len(), "javadocs lookup");
                content::javadocs_results(query, &results, author)
            }
            CommandRequest::Mcp(query) => {
                let entries = self.lookup(query);
                debug!(
                    kind = %query.kind,
                    symbol = %query.symbol,
                    obfuscated = query.is_obfuscated,
                    results = entries.len(),
                    "mcp lookup"
                );
                content::mcp_results(query, &entries, author)
            }
            CommandRequest::Help => content::help(self.prefix(), author, None),
            CommandRequest::Links => content::links(author),
        }
    }

    /// Exact lookup, then the optional owner re-rank.
    fn lookup(&self, query: &McpQuery) -> Vec<MappingEntry> {
        let hint = query.owner_hint.as_deref();
        match query.kind {
            MappingKind::Field => {
                let mut found = self.mappings.fields_by_name(&query.symbol, query.is_obfuscated);
                if let Some(hint) = hint {
                    found = rerank_by_owner(found, hint);
                }
                found.into_iter().map(MappingEntry::Field).collect()
            }
            MappingKind::Method => {
                let mut found = self.mappings.methods_by_name(&query.symbol, query.is_obfuscated);
                if let Some(hint) = hint {
                    found = rerank_by_owner(found, hint);
                }
                found.into_iter().map(MappingEntry::Method).collect()
            }
            MappingKind::Class => self
                .mappings
                .classes_by_name(&query.symbol)
                .into_iter()
                .map(MappingEntry::Class)
                .collect(),
        }
    }
}
