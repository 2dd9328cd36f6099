//! The `{"data": [...], "page": {...}}` wrapper around API results.

use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: Vec<T>,
    /// Paging metadata. Carried through untouched; the client never pages.
    #[serde(default)]
    pub page: Option<serde_json::Value>,
}

impl<T> Envelope<T> {
    /// First element of `data`, for endpoints that return one resource.
    pub fn into_first(self) -> Result<T, Error> {
        self.data.into_iter().next().ok_or(Error::EmptyResult)
    }

    pub fn into_data(self) -> Vec<T> {
        self.data
    }
}
