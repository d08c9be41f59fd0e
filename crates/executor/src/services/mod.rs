pub mod analysis;
pub mod broadcaster;
pub mod conversation;
pub mod dispatcher;
pub mod listener;
pub mod outbox;
pub mod platform;
pub mod telegram_service;

#[cfg(test)]
pub(crate) mod test_support;
