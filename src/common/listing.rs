// src/common/listing.rs

use std::borrow::Cow;
use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Busca, ordenação e paginação das grades do painel.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Texto buscado em todas as colunas de texto exibidas (sem diferenciar maiúsculas)
    pub q: Option<String>,
    /// Nome da coluna usada na ordenação
    pub sort: Option<String>,
    pub order: Option<SortOrder>,
    /// Página começando em 1
    pub page: Option<u32>,
    #[serde(alias = "perPage")]
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: u32,
    pub per_page: u32,
}

/// Valor comparável de uma coluna.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    Missing,
    Bool(bool),
    Number(i64),
    Time(DateTime<Utc>),
    Text(String),
}

impl SortKey {
    pub fn text(value: &str) -> Self {
        SortKey::Text(value.to_lowercase())
    }

    pub fn opt_text(value: Option<&str>) -> Self {
        value.map(Self::text).unwrap_or(SortKey::Missing)
    }

    pub fn opt_time(value: Option<DateTime<Utc>>) -> Self {
        value.map(SortKey::Time).unwrap_or(SortKey::Missing)
    }
}

/// Uma linha que pode aparecer numa grade.
pub trait Listable {
    /// As colunas de texto exibidas na grade.
    fn search_columns(&self) -> Vec<Cow<'_, str>>;

    /// Chave de ordenação para a coluna pedida, `None` se a coluna não existe.
    fn sort_key(&self, column: &str) -> Option<SortKey>;
}

impl ListQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u32 {
        self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
    }

    pub fn matches<T: Listable>(&self, row: &T) -> bool {
        let needle = match self.q.as_deref().map(str::trim) {
            Some(q) if !q.is_empty() => q.to_lowercase(),
            _ => return true,
        };

        row.search_columns()
            .iter()
            .any(|column| column.to_lowercase().contains(&needle))
    }

    pub fn apply<T: Listable>(&self, rows: Vec<T>) -> Page<T> {
        let mut rows: Vec<T> = rows.into_iter().filter(|row| self.matches(row)).collect();

        if let Some(column) = self.sort.as_deref() {
            let descending = self.order == Some(SortOrder::Desc);
            // sort_by é estável: empates mantêm a ordem do store
            rows.sort_by(|a, b| {
                let ordering = match (a.sort_key(column), b.sort_key(column)) {
                    (Some(ka), Some(kb)) => ka.cmp(&kb),
                    _ => Ordering::Equal,
                };
                if descending { ordering.reverse() } else { ordering }
            });
        }

        let total = rows.len();
        let page = self.page();
        let per_page = self.per_page();
        let skip = (page as usize - 1).saturating_mul(per_page as usize);

        let items = rows.into_iter().skip(skip).take(per_page as usize).collect();

        Page { items, total, page, per_page }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone)]
    struct Row {
        name: &'static str,
        phone: &'static str,
        points: i64,
    }

    impl Listable for Row {
        fn search_columns(&self) -> Vec<Cow<'_, str>> {
            vec![Cow::Borrowed(self.name), Cow::Borrowed(self.phone)]
        }

        fn sort_key(&self, column: &str) -> Option<SortKey> {
            match column {
                "name" => Some(SortKey::text(self.name)),
                "points" => Some(SortKey::Number(self.points)),
                _ => None,
            }
        }
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { name: "Somchai Jaidee", phone: "0812345678", points: 30 },
            Row { name: "anna Smith", phone: "0899999999", points: 120 },
            Row { name: "สมหญิง ใจดี", phone: "0861112222", points: 5 },
        ]
    }

    #[test]
    fn search_is_case_insensitive() {
        let query = ListQuery { q: Some("SOMCHAI".into()), ..Default::default() };
        let page = query.apply(rows());
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "Somchai Jaidee");
    }

    #[test]
    fn search_matches_any_displayed_column() {
        let query = ListQuery { q: Some("0899".into()), ..Default::default() };
        let page = query.apply(rows());
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "anna Smith");

        let query = ListQuery { q: Some("ใจดี".into()), ..Default::default() };
        assert_eq!(query.apply(rows()).total, 1);
    }

    #[test]
    fn blank_search_keeps_everything() {
        let query = ListQuery { q: Some("   ".into()), ..Default::default() };
        assert_eq!(query.apply(rows()).total, 3);
    }

    #[test]
    fn sorts_by_column_in_both_directions() {
        let query = ListQuery {
            sort: Some("points".into()),
            order: Some(SortOrder::Desc),
            ..Default::default()
        };
        let names: Vec<_> = query.apply(rows()).items.iter().map(|r| r.points).collect();
        assert_eq!(names, vec![120, 30, 5]);

        let query = ListQuery { sort: Some("name".into()), ..Default::default() };
        let names: Vec<_> = query.apply(rows()).items.iter().map(|r| r.name).collect();
        assert_eq!(names[0], "anna Smith");
    }

    #[test]
    fn unknown_sort_column_keeps_store_order() {
        let query = ListQuery { sort: Some("nope".into()), ..Default::default() };
        let names: Vec<_> = query.apply(rows()).items.iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["Somchai Jaidee", "anna Smith", "สมหญิง ใจดี"]);
    }

    #[test]
    fn paginates_with_clamped_page_size() {
        let query = ListQuery { page: Some(2), per_page: Some(2), ..Default::default() };
        let page = query.apply(rows());
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.page, 2);

        let query = ListQuery { page: Some(0), per_page: Some(10_000), ..Default::default() };
        assert_eq!(query.page(), 1);
        assert_eq!(query.per_page(), MAX_PER_PAGE);
    }
}
