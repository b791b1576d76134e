//! A single order in full.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};

use delivery_core::{Order, OrderId};

use super::{ContactView, StatusBadge, format_timestamp};
use crate::error::{order_status, report_order_error};
use crate::filters;
use crate::middleware::RequireIdentity;
use crate::state::AppState;

/// Everything the detail page shows.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: String,
    pub status: StatusBadge,
    pub created_at: String,
    pub updated_at: String,
    pub region: &'static str,
    pub pickup: ContactView,
    pub delivery: ContactView,
    pub package_size: &'static str,
    pub package_category: &'static str,
    pub package_description: String,
    pub package_value: String,
    pub delivery_type: &'static str,
    pub preferred_date: String,
    pub payment_method: &'static str,
}

impl From<&Order> for OrderView {
    fn from(order: &Order) -> Self {
        let package = &order.package_details;
        Self {
            id: order.id.to_string(),
            status: StatusBadge::of(order),
            created_at: format_timestamp(order.created_at.as_ref()),
            updated_at: format_timestamp(order.updated_at.as_ref()),
            region: order.region.label(),
            pickup: ContactView::from(&order.pickup_address),
            delivery: ContactView::from(&order.delivery_address),
            package_size: package.size.label(),
            package_category: package.category.label(),
            package_description: package.description.clone(),
            package_value: package
                .value
                .map_or_else(String::new, |v| format!("{v} FCFA")),
            delivery_type: order.delivery_type.label(),
            preferred_date: order
                .preferred_delivery_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            payment_method: order.payment_method.label(),
        }
    }
}

/// Order detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "orders/detail.html")]
pub struct OrderDetailTemplate {
    pub order: Option<OrderView>,
    pub error: Option<String>,
}

/// Display one order, after checking the user owns it.
pub async fn show(
    State(state): State<AppState>,
    guard: RequireIdentity,
    Path(order_id): Path<String>,
) -> Response {
    let id = OrderId::new(order_id);
    match state.orders().get_for(&guard.caller(), &id).await {
        Ok(order) => OrderDetailTemplate {
            order: Some(OrderView::from(&order)),
            error: None,
        }
        .into_response(),
        Err(e) => {
            report_order_error(&e);
            (
                order_status(&e),
                OrderDetailTemplate {
                    order: None,
                    error: Some(e.detail_message()),
                },
            )
                .into_response()
        }
    }
}
