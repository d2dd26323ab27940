//! The record store trait.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use crate::error::StoreResult;

/// Boxed future returned by [`RecordStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// A single filter clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `field` equals the value.
    Eq(String, Value),
    /// `field` (a string or a list) contains the value.
    Contains(String, String),
}

/// A conjunction of filter clauses. An empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    /// Creates an empty filter.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Adds an equality clause.
    #[must_use]
    pub fn equals(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition::Eq(field.into(), value.into()));
        self
    }

    /// Adds a containment clause.
    #[must_use]
    pub fn contains(mut self, field: impl Into<String>, needle: impl Into<String>) -> Self {
        self.conditions
            .push(Condition::Contains(field.into(), needle.into()));
        self
    }

    /// Returns the clauses of this filter.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Returns true if the filter has no clauses.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Checks whether a raw record satisfies every clause.
    #[must_use]
    pub fn matches(&self, record: &Value) -> bool {
        self.conditions.iter().all(|condition| match condition {
            Condition::Eq(field, expected) => record.get(field) == Some(expected),
            Condition::Contains(field, needle) => match record.get(field) {
                Some(Value::String(s)) => s.contains(needle.as_str()),
                Some(Value::Array(items)) => items
                    .iter()
                    .any(|item| item.as_str() == Some(needle.as_str())),
                _ => false,
            },
        })
    }

    /// Renders the filter in the backend's filter syntax.
    #[must_use]
    pub fn to_expression(&self) -> String {
        self.conditions
            .iter()
            .map(|condition| match condition {
                Condition::Eq(field, value) => format!("{field} = {}", literal(value)),
                Condition::Contains(field, needle) => {
                    format!("{field} ~ {}", quote(needle))
                }
            })
            .collect::<Vec<_>>()
            .join(" && ")
    }
}

fn literal(value: &Value) -> String {
    match value {
        Value::String(s) => quote(s),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// A backend exposing record CRUD over named collections.
///
/// Records travel as JSON objects; use [`crate::records`] to get typed
/// views. Dropping a returned future abandons the request.
pub trait RecordStore: Send + Sync + fmt::Debug {
    /// Creates a record and returns it as stored.
    fn create<'a>(&'a self, collection: &'a str, fields: Value) -> StoreFuture<'a, Value>;

    /// Merges `fields` into an existing record and returns the result.
    fn update<'a>(
        &'a self,
        collection: &'a str,
        id: &'a str,
        fields: Value,
    ) -> StoreFuture<'a, Value>;

    /// Deletes a record.
    fn delete<'a>(&'a self, collection: &'a str, id: &'a str) -> StoreFuture<'a, ()>;

    /// Lists every record matching the filter.
    fn list<'a>(&'a self, collection: &'a str, filter: &'a Filter) -> StoreFuture<'a, Vec<Value>>;

    /// Returns the first record matching the filter, if any.
    fn first<'a>(
        &'a self,
        collection: &'a str,
        filter: &'a Filter,
    ) -> StoreFuture<'a, Option<Value>> {
        Box::pin(async move { Ok(self.list(collection, filter).await?.into_iter().next()) })
    }

    /// Id of the authenticated user, if any.
    fn user_id(&self) -> Option<String>;
}
