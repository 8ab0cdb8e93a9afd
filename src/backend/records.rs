//! PostgREST-style record queries.

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{Backend, BackendError, check};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn as_str(self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }
}

/// A query against one table. Filters are equality-only, which is all the
/// facade needs.
pub struct Query<'a> {
    backend: &'a Backend,
    table: &'a str,
    filters: Vec<(String, String)>,
    order: Option<(String, Order)>,
    limit: Option<usize>,
}

impl Backend {
    pub fn table<'a>(&'a self, table: &'a str) -> Query<'a> {
        Query {
            backend: self,
            table,
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }
}

impl<'a> Query<'a> {
    pub fn eq(mut self, column: &str, value: impl std::fmt::Display) -> Self {
        self.filters.push((column.to_string(), format!("eq.{value}")));
        self
    }

    pub fn order(mut self, column: &str, order: Order) -> Self {
        self.order = Some((column.to_string(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn url(&self, extra: &[(&str, &str)]) -> Result<reqwest::Url, BackendError> {
        let mut url = self.backend.endpoint(["rest", "v1", self.table])?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("select", "*");
            for (column, filter) in &self.filters {
                pairs.append_pair(column, filter);
            }
            if let Some((column, order)) = &self.order {
                pairs.append_pair("order", &format!("{column}.{}", order.as_str()));
            }
            if let Some(limit) = self.limit {
                pairs.append_pair("limit", &limit.to_string());
            }
            for (k, v) in extra {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    pub async fn select<T: DeserializeOwned>(self) -> Result<Vec<T>, BackendError> {
        let url = self.url(&[])?;
        let resp = self.backend.request(Method::GET, url).send().await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn select_one<T: DeserializeOwned>(self) -> Result<Option<T>, BackendError> {
        let rows: Vec<T> = self.limit(1).select().await?;
        Ok(rows.into_iter().next())
    }

    pub async fn insert<B, T>(self, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(&[])?;
        let req = self
            .backend
            .request(Method::POST, url)
            .header("Prefer", "return=representation")
            .json(body);
        let table = self.table;
        first_row(req.send().await?, table).await
    }

    /// Insert, or merge into the existing row that matches on the
    /// `on_conflict` columns.
    pub async fn upsert<B, T>(self, body: &B, on_conflict: &str) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(&[("on_conflict", on_conflict)])?;
        let req = self
            .backend
            .request(Method::POST, url)
            .header("Prefer", "return=representation,resolution=merge-duplicates")
            .json(body);
        let table = self.table;
        first_row(req.send().await?, table).await
    }

    /// PATCH the matching rows and return the first one. No match is `NotFound`.
    pub async fn update<B, T>(self, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(&[])?;
        let req = self
            .backend
            .request(Method::PATCH, url)
            .header("Prefer", "return=representation")
            .json(body);
        let rows: Vec<T> = check(req.send().await?).await?.json().await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("no matching row in {}", self.table)))
    }

    pub async fn delete(self) -> Result<(), BackendError> {
        let url = self.url(&[])?;
        let resp = self.backend.request(Method::DELETE, url).send().await?;
        check(resp).await?;
        Ok(())
    }
}

async fn first_row<T: DeserializeOwned>(
    resp: reqwest::Response,
    table: &str,
) -> Result<T, BackendError> {
    let rows: Vec<T> = check(resp).await?.json().await?;
    rows.into_iter()
        .next()
        .ok_or_else(|| BackendError::Decode(format!("{table}: empty representation")))
}
