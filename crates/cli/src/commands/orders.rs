//! Order history.

use clap::Subcommand;

use verger_core::OrderId;
use verger_storefront::api::Order;
use verger_storefront::navigation::ORDER_HISTORY_PATH;
use verger_storefront::state::AppState;

use super::{CommandError, app_error, money, require_access};
use crate::console;

#[derive(Subcommand)]
pub enum OrdersAction {
    /// List past orders, newest first
    List,
    /// Show one order
    Show {
        /// Order ID
        id: String,
    },
}

pub async fn run(state: &AppState, action: OrdersAction) -> Result<(), CommandError> {
    require_access(state, ORDER_HISTORY_PATH).await?;
    let orders = &state.backends().orders;

    match action {
        OrdersAction::List => {
            let mut history = orders.my_orders().await.map_err(app_error)?;
            history.sort_by(|a, b| b.created_at.cmp(&a.created_at));

            if history.is_empty() {
                console::line("No orders yet");
            }
            for order in &history {
                console::line(&format!(
                    "{}  {}  {:<9}  {}",
                    order.id,
                    order.created_at.format("%Y-%m-%d %H:%M"),
                    order.status.as_str(),
                    money(order.draft.total, order.draft.currency)
                ));
            }
        }
        OrdersAction::Show { id } => {
            let order = orders.order(&OrderId::new(id)).await.map_err(app_error)?;
            print_order(&order);
        }
    }
    Ok(())
}

pub fn print_order(order: &Order) {
    let draft = &order.draft;
    let currency = draft.currency;

    console::line(&format!(
        "Order {} ({}, {})",
        order.id, order.status, draft.payment_method
    ));
    console::line(&draft.fulfillment.to_string());
    for item in &draft.items {
        console::line(&format!(
            "{:>3} × {} ({})  {}",
            item.quantity,
            item.title,
            item.variant,
            money(item.line_total, currency)
        ));
    }
    console::line(&format!("Subtotal  {}", money(draft.subtotal, currency)));
    console::line(&format!("Delivery  {}", money(draft.delivery_fee, currency)));
    console::line(&format!("Total     {}", money(draft.total, currency)));
}
