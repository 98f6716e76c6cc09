//! Routing information supplied by the host view layer.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A parsed query parameter value.
///
/// Route layers hand repeated keys over as a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Single(String),
    Many(Vec<String>),
}

impl QueryValue {
    /// The scalar value, taking the first element of a list.
    pub fn first(&self) -> Option<&str> {
        match self {
            QueryValue::Single(value) => Some(value.as_str()),
            QueryValue::Many(values) => values.first().map(String::as_str),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            QueryValue::Single(existing) => {
                let first = std::mem::take(existing);
                *self = QueryValue::Many(vec![first, value]);
            }
            QueryValue::Many(values) => values.push(value),
        }
    }
}

/// Routing state at a navigation event.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RouteState {
    /// Whether the router has finished parsing the current location.
    pub ready: bool,
    /// Parsed query parameters.
    #[serde(default)]
    pub query: HashMap<String, QueryValue>,
}

impl RouteState {
    /// Routing information not available yet.
    pub fn not_ready() -> Self {
        Self::default()
    }

    /// Ready route with no query parameters.
    pub fn ready() -> Self {
        Self {
            ready: true,
            query: HashMap::new(),
        }
    }

    /// Build a ready route from decoded `(key, value)` pairs, in order.
    ///
    /// Repeated keys collect into [`QueryValue::Many`].
    pub fn from_query_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut query: HashMap<String, QueryValue> = HashMap::new();
        for (key, value) in pairs {
            let value = value.into();
            match query.entry(key.into()) {
                Entry::Occupied(mut entry) => entry.get_mut().push(value),
                Entry::Vacant(entry) => {
                    entry.insert(QueryValue::Single(value));
                }
            }
        }
        Self { ready: true, query }
    }

    /// Set a single-valued query parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query
            .insert(key.into(), QueryValue::Single(value.into()));
        self
    }

    /// Set a multi-valued query parameter.
    pub fn with_params<V: Into<String>>(
        mut self,
        key: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.query.insert(
            key.into(),
            QueryValue::Many(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    /// Scalar value of a query parameter (first element for lists).
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.get(key).and_then(QueryValue::first)
    }
}
