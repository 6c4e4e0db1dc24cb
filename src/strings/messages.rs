//! # Messages
//!
//! Constant strings and format functions for user-facing messages and buttons.

pub const MENU_PROMPT: &str = "Please choose:";
pub const MENU_EMPTY: &str = "Товары временно закончились. Загляните позже.";

pub const MY_CART_BUTTON: &str = "🛒 Моя корзина";
pub const ADD_TO_CART_BUTTON: &str = "➕ Добавить в корзину";
pub const BACK_TO_MENU_BUTTON: &str = "В меню";
pub const PAY_BUTTON: &str = "Оплатить";

pub fn remove_button(title: &str) -> String {
    format!("Убрать из корзины {title}")
}

pub const ADDED_TO_CART: &str = "Добавлено в корзину";
pub const CART_EMPTY: &str = "Ваша корзина пуста.";
pub const CART_MORE_ITEMS: &str = "…и ещё товаров:";

pub const ASK_EMAIL: &str = "Пришлите, пожалуйста, Ваш е-майл";
pub const EMAIL_SAVED: &str = "Email сохранен. Менеджер свяжется с Вами в ближайшее время.";
pub const EMAIL_INVALID: &str = "Такой email недопустим. Попробуйте ввести еще раз.";
