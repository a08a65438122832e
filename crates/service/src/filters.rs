//! Query construction for the user listing filters.
//!
//! All supplied filters combine with AND; substring matching is
//! case-insensitive on both sides (ILIKE), and the date filter selects one
//! calendar day in server-local time.

use chrono::{DateTime, Days, FixedOffset, Local, NaiveDate, NaiveTime, TimeZone};
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{ColumnTrait, Condition};

use models::usuario;

#[derive(Clone, Debug, Default)]
pub struct UserFilter {
    pub nome: Option<String>,
    pub email: Option<String>,
    pub data: Option<NaiveDate>,
}

impl UserFilter {
    /// AND of every supplied filter; an empty filter matches everything.
    pub fn condition(&self) -> Condition {
        let mut cond = Condition::all();
        if let Some(nome) = self.nome.as_deref() {
            cond = cond.add(contains_ci(usuario::Column::Nome, nome));
        }
        if let Some(email) = self.email.as_deref() {
            cond = cond.add(contains_ci(usuario::Column::Email, email));
        }
        if let Some(date) = self.data {
            let (start, end) = local_day_range(date);
            cond = cond
                .add(usuario::Column::CriadoEm.gte(start))
                .add(usuario::Column::CriadoEm.lt(end));
        }
        cond
    }
}

/// Case-insensitive substring match with LIKE wildcards escaped.
fn contains_ci(col: usuario::Column, needle: &str) -> SimpleExpr {
    Expr::col(col).ilike(format!("%{}%", escape_like(needle)))
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// `[00:00 local, next-day 00:00 local)` for a calendar date.
pub fn local_day_range(date: NaiveDate) -> (DateTime<FixedOffset>, DateTime<FixedOffset>) {
    (local_midnight(date), local_midnight(date + Days::new(1)))
}

fn local_midnight(date: NaiveDate) -> DateTime<FixedOffset> {
    let naive = date.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&naive).earliest() {
        Some(dt) => dt.fixed_offset(),
        // midnight does not exist on this day (DST jump); pin to UTC
        None => naive.and_utc().fixed_offset(),
    }
}
