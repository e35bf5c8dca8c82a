//! PostgREST query builder.
//!
//! Covers the subset the storefront needs: a column list (which may embed
//! related tables), equality filters, ordering, and a row limit.

use std::fmt::Display;

/// Sort direction for [`Query::order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// A request against one PostgREST table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    table: &'static str,
    select: Option<String>,
    filters: Vec<(String, String)>,
    order: Vec<String>,
    limit: Option<usize>,
}

impl Query {
    /// Start a query on `table`.
    #[must_use]
    pub const fn table(table: &'static str) -> Self {
        Self {
            table,
            select: None,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
        }
    }

    /// Columns to return, e.g. `"id,cantidad,productos(nombre,precio)"`.
    #[must_use]
    pub fn select(mut self, columns: &str) -> Self {
        self.select = Some(columns.split_whitespace().collect());
        self
    }

    /// Keep rows where `column` equals `value`.
    #[must_use]
    pub fn eq(mut self, column: &str, value: impl Display) -> Self {
        self.filters.push((column.to_string(), format!("eq.{value}")));
        self
    }

    /// Sort by `column`. Later calls break ties of earlier ones.
    #[must_use]
    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.order.push(format!("{column}.{}", direction.as_str()));
        self
    }

    /// Shorthand for ascending order.
    #[must_use]
    pub fn order_asc(self, column: &str) -> Self {
        self.order(column, Direction::Asc)
    }

    /// Return at most `n` rows.
    #[must_use]
    pub const fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Target table name.
    #[must_use]
    pub const fn table_name(&self) -> &'static str {
        self.table
    }

    /// Whether the query filters anything. Unfiltered updates and deletes
    /// are refused by the client.
    #[must_use]
    pub fn has_filters(&self) -> bool {
        !self.filters.is_empty()
    }

    /// URL query parameters in PostgREST syntax.
    #[must_use]
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::with_capacity(self.filters.len() + 3);
        if let Some(select) = &self.select {
            params.push(("select".to_string(), select.clone()));
        }
        params.extend(self.filters.iter().cloned());
        if !self.order.is_empty() {
            params.push(("order".to_string(), self.order.join(",")));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(query: &Query) -> Vec<(String, String)> {
        query.to_params()
    }

    #[test]
    fn test_bare_table_has_no_params() {
        let query = Query::table("categorias");
        assert_eq!(query.table_name(), "categorias");
        assert!(pairs(&query).is_empty());
        assert!(!query.has_filters());
    }

    #[test]
    fn test_filters_and_order() {
        let query = Query::table("productos")
            .select("*")
            .eq("esta_activo", true)
            .order_asc("nombre");

        assert_eq!(
            pairs(&query),
            vec![
                ("select".to_string(), "*".to_string()),
                ("esta_activo".to_string(), "eq.true".to_string()),
                ("order".to_string(), "nombre.asc".to_string()),
            ]
        );
    }

    #[test]
    fn test_embedded_select_strips_whitespace() {
        let query = Query::table("items_carrito").select(
            "id, cantidad,
             productos ( id, nombre, precio )",
        );
        assert_eq!(
            pairs(&query)[0].1,
            "id,cantidad,productos(id,nombre,precio)"
        );
    }

    #[test]
    fn test_multiple_orders_join() {
        let query = Query::table("direcciones_envio")
            .eq("usuario_id", "u1")
            .order("es_predeterminada", Direction::Desc)
            .order("id", Direction::Asc)
            .limit(10);

        let params = pairs(&query);
        assert!(params.contains(&("order".to_string(), "es_predeterminada.desc,id.asc".to_string())));
        assert!(params.contains(&("limit".to_string(), "10".to_string())));
        assert!(query.has_filters());
    }
}
