//! Plain-text rendering of a user's shopping list.

use std::fmt::Write as _;

use crate::db::{self, DbPool, IngredientTotal};
use crate::Result;

/// Download name sent in `Content-Disposition`.
pub const FILENAME: &str = "shopping-list.txt";

const HEADER: &str = "Foodgram shopping list:";

/// Build the shopping list for everything in the user's cart.
pub async fn build(pool: &DbPool, user_id: i64) -> Result<String> {
    let totals = db::shopping_cart_totals(pool, user_id).await?;
    Ok(render(&totals))
}

/// Render aggregated totals as numbered lines under a header.
///
/// An empty cart renders the header alone.
pub fn render(totals: &[IngredientTotal]) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    if totals.is_empty() {
        return out;
    }

    out.push('\n');
    for (n, item) in totals.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}) {} ({}) - {}",
            n + 1,
            item.name,
            item.measurement_unit,
            item.total
        );
    }
    out
}
