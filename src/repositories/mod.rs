use sea_orm::{
    sea_query::{Expr, Func, SimpleExpr},
    Condition, IntoSimpleExpr,
};

pub mod asset_repository;
pub mod maintenance_repository;

pub use asset_repository::{AssetFilter, AssetRepository};
pub use maintenance_repository::{
    DueFilter, MaintenanceFilter, MaintenanceOrder, MaintenanceRepository,
};

/// One page of rows plus the total row count across all pages
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

impl<T> Page<T> {
    pub fn total_pages(&self) -> u64 {
        if self.per_page == 0 {
            0
        } else {
            self.total.div_ceil(self.per_page)
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }
}

/// Case-insensitive substring match over any of `columns`.
///
/// Returns `None` for blank input so callers can skip the filter.
pub fn search_condition<C>(columns: &[C], term: &str) -> Option<Condition>
where
    C: IntoSimpleExpr + Copy,
{
    let term = term.trim();
    if term.is_empty() {
        return None;
    }
    let pattern = format!("%{}%", term.to_lowercase());
    let condition = columns.iter().fold(Condition::any(), |cond, col| {
        let lowered: SimpleExpr = Func::lower(col.into_simple_expr()).into();
        cond.add(Expr::expr(lowered).like(pattern.clone()))
    });
    Some(condition)
}
