//! WhatsApp Relay — Twilio webhook in, OpenAI reply out.

pub mod channels;
pub mod config;
pub mod error;
pub mod llm;
pub mod relay;
pub mod routes;
