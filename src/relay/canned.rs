//! Fixed replies that never touch the LLM.

/// Where visitors buy tickets and check hours.
pub const TICKETING_URL: &str = "https://tickets.museodelrelay.es";

/// Sent when the message asks about hours, prices or tickets.
pub const CANNED_REPLY: &str = "¡Hola! 👋\n\
Toda la información sobre horarios, precios y entradas está disponible en:\n\
https://tickets.museodelrelay.es\n\
Allí puedes comprar tus entradas y consultar cualquier novedad.";

/// Sent when the generator failed.
pub const FALLBACK_REPLY: &str = "Lo siento, ha ocurrido un error al procesar tu mensaje.";

/// Sent when the generator has no credentials.
pub const UNCONFIGURED_REPLY: &str = "Lo siento, no puedo procesar tu mensaje porque las credenciales de OpenAI no están configuradas.";

/// The canned reply for informational queries.
pub fn canned_reply() -> &'static str {
    CANNED_REPLY
}
