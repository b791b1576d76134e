//! The signed-in user's order history.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};

use delivery_core::Order;

use super::{StatusBadge, format_timestamp};
use crate::error::{order_status, report_order_error};
use crate::filters;
use crate::middleware::RequireIdentity;
use crate::state::AppState;

/// One row of the order list.
#[derive(Debug, Clone)]
pub struct OrderSummary {
    pub id: String,
    pub status: StatusBadge,
    pub created_at: String,
    pub region: &'static str,
    pub from: String,
    pub to: String,
    pub package_size: &'static str,
    pub delivery_type: &'static str,
}

impl From<&Order> for OrderSummary {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            status: StatusBadge::of(order),
            created_at: format_timestamp(order.created_at.as_ref()),
            region: order.region.label(),
            from: order.pickup_address.address.clone(),
            to: order.delivery_address.address.clone(),
            package_size: order.package_details.size.as_str(),
            delivery_type: order.delivery_type.as_str(),
        }
    }
}

/// Order list page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/list.html")]
pub struct OrderListTemplate {
    pub orders: Vec<OrderSummary>,
    pub error: Option<String>,
}

/// Display every order the user placed, newest first.
pub async fn index(State(state): State<AppState>, guard: RequireIdentity) -> Response {
    match state.orders().list_for(&guard.caller()).await {
        Ok(orders) => OrderListTemplate {
            orders: orders.iter().map(OrderSummary::from).collect(),
            error: None,
        }
        .into_response(),
        Err(e) => {
            report_order_error(&e);
            (
                order_status(&e),
                OrderListTemplate {
                    orders: Vec::new(),
                    error: Some(e.list_message()),
                },
            )
                .into_response()
        }
    }
}
