use crate::api::OrderWithUser;

/// In-game whisper the user sends to the seller, ready to paste.
pub fn format_whisper(order: &OrderWithUser, item_name: &str) -> String {
    let rank_fmt = order
        .rank
        .map(|rank| format!(" (rank {})", rank))
        .unwrap_or_default();

    format!(
        "/w {} Hi! I want to buy: \"{}{}\" for {} platinum. (warframe.market)",
        order.user.ingame_name, item_name, rank_fmt, order.platinum
    )
}
