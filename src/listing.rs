//! Sorting and pagination shared by every list route and panel table.
//!
//! Filtering happens in the store; ordering and slicing happen here, on the
//! rows the store returned, so both stores page identically.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ListParams {
    pub orden: Option<String>,
    pub dir: Option<SortDirection>,
    pub pagina: Option<u32>,
    pub por_pagina: Option<u32>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PageMeta {
    pub total: usize,
    pub pagina: u32,
    pub por_pagina: u32,
    pub paginas: u32,
}

/// A comparable projection of one column. Text compares case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Missing,
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Time(DateTime<Utc>),
    Text(String),
}

impl SortValue {
    pub fn text(value: &str) -> Self {
        SortValue::Text(value.to_lowercase())
    }

    pub fn opt_text(value: Option<&str>) -> Self {
        value.map(Self::text).unwrap_or(SortValue::Missing)
    }
}

pub trait Sortable {
    /// Wire names accepted in `orden`.
    const SORT_FIELDS: &'static [&'static str];
    /// Ordering used when the request names no field.
    const DEFAULT_SORT: (&'static str, SortDirection);

    fn sort_value(&self, field: &str) -> SortValue;
}

/// Orders `items` and cuts the requested page out of them.
///
/// Without `pagina` and `por_pagina` the whole, ordered list comes back as a
/// single page.
pub fn paginate<T: Sortable>(mut items: Vec<T>, params: &ListParams) -> AppResult<(Vec<T>, PageMeta)> {
    let (field, default_dir) = match params.orden.as_deref() {
        Some(field) => (field, SortDirection::Asc),
        None => T::DEFAULT_SORT,
    };
    if !T::SORT_FIELDS.contains(&field) {
        return Err(AppError::validation(format!(
            "No se puede ordenar por '{}'",
            field
        )));
    }
    let dir = params.dir.unwrap_or(default_dir);

    items.sort_by(|a, b| {
        let ord = a.sort_value(field).cmp(&b.sort_value(field));
        match dir {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });

    let total = items.len();
    if params.pagina.is_none() && params.por_pagina.is_none() {
        let meta = PageMeta {
            total,
            pagina: 1,
            por_pagina: total as u32,
            paginas: 1,
        };
        return Ok((items, meta));
    }

    let pagina = params.pagina.unwrap_or(1);
    let por_pagina = params.por_pagina.unwrap_or(DEFAULT_PAGE_SIZE);
    if pagina == 0 {
        return Err(AppError::validation("La página debe ser mayor o igual a 1"));
    }
    if por_pagina == 0 || por_pagina > MAX_PAGE_SIZE {
        return Err(AppError::validation(format!(
            "por_pagina debe estar entre 1 y {}",
            MAX_PAGE_SIZE
        )));
    }

    let paginas = (total as u32).div_ceil(por_pagina).max(1);
    let offset = (u64::from(pagina) - 1) * u64::from(por_pagina);
    let page = match usize::try_from(offset) {
        Ok(start) if start < total => items
            .into_iter()
            .skip(start)
            .take(por_pagina as usize)
            .collect(),
        _ => Vec::new(),
    };

    Ok((
        page,
        PageMeta {
            total,
            pagina,
            por_pagina,
            paginas,
        },
    ))
}
