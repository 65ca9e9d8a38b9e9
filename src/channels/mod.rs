//! Channel abstraction for outbound message delivery.

pub mod channel;
pub mod whatsapp;

pub use channel::*;
pub use whatsapp::WhatsAppChannel;
