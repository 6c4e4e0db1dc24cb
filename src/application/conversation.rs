//! # Conversation Table
//!
//! Maps `(current status, inbound event)` to the handler that should run.
//! Button payloads have the form `tag:id` (`product:7`) or a bare tag (`showcart`).
//! Events without an entry for the current status are ignored.

use crate::domain::types::{Inbound, Status};

/// Decoded button payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    ShowProduct(u64),
    AddToCart(u64),
    /// Carries the cart line id.
    RemoveFromCart(u64),
    ShowCart,
    ShowMenu,
    Checkout,
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        match data.split_once(':') {
            Some((tag, id)) => {
                if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                let id = id.parse().ok()?;
                match tag {
                    "product" => Some(Self::ShowProduct(id)),
                    "cart" => Some(Self::AddToCart(id)),
                    "remove" => Some(Self::RemoveFromCart(id)),
                    _ => None,
                }
            }
            None => match data {
                "showcart" => Some(Self::ShowCart),
                "productlist" => Some(Self::ShowMenu),
                "payment" => Some(Self::Checkout),
                _ => None,
            },
        }
    }

    /// The payload a button must carry to trigger this action.
    pub fn payload(&self) -> String {
        match self {
            Self::ShowProduct(id) => format!("product:{id}"),
            Self::AddToCart(id) => format!("cart:{id}"),
            Self::RemoveFromCart(id) => format!("remove:{id}"),
            Self::ShowCart => "showcart".to_string(),
            Self::ShowMenu => "productlist".to_string(),
            Self::Checkout => "payment".to_string(),
        }
    }
}

/// Handler selected for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Start,
    ShowProduct(u64),
    AddToCart(u64),
    RemoveFromCart(u64),
    ShowCart,
    AskEmail,
    CheckEmail,
}

/// `/start` is accepted in every status and restarts the flow.
pub const START_COMMAND: &str = "start";

pub fn resolve(status: Option<Status>, event: &Inbound) -> Option<Route> {
    match event {
        Inbound::Command { name, .. } if name == START_COMMAND => Some(Route::Start),
        Inbound::Command { .. } => None,
        Inbound::Callback { data, .. } => {
            let action = CallbackAction::parse(data)?;
            resolve_callback(status?, action)
        }
        Inbound::Text(_) => match status? {
            Status::WaitingEmail => Some(Route::CheckEmail),
            _ => None,
        },
    }
}

fn resolve_callback(status: Status, action: CallbackAction) -> Option<Route> {
    use CallbackAction as A;

    match (status, action) {
        (Status::HandleMenu, A::ShowProduct(id)) => Some(Route::ShowProduct(id)),
        (Status::HandleMenu, A::ShowCart) => Some(Route::ShowCart),

        (Status::HandleDescription, A::AddToCart(id)) => Some(Route::AddToCart(id)),
        (Status::HandleDescription, A::ShowCart) => Some(Route::ShowCart),
        (Status::HandleDescription, A::ShowMenu) => Some(Route::Start),

        (Status::HandleCart, A::RemoveFromCart(id)) => Some(Route::RemoveFromCart(id)),
        (Status::HandleCart, A::Checkout) => Some(Route::AskEmail),
        (Status::HandleCart, A::ShowMenu) => Some(Route::Start),

        _ => None,
    }
}
