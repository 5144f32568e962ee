//! Project-wide constants.

pub const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");
pub const REPO: &str = env!("CARGO_PKG_REPOSITORY");

/// Route the chatbot endpoint is mounted on.
pub const CHATBOT_ROUTE: &str = "/api/v1/chatbot";

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";

/// Engine invoked when `SCRIPT_PATH` is not set.
pub const DEFAULT_SCRIPT_PATH: &str = "retrivalai.py";

pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_CONCURRENT_INVOCATIONS: usize = 4;

/// Zero means "reject immediately when every slot is taken".
pub const DEFAULT_QUEUE_TIMEOUT_MS: u64 = 0;

pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

/// Cap on engine output copied into log lines. The answer itself is never cut.
pub const MAX_LOG_OUTPUT_BYTES: usize = 50_000;

// Client-facing messages. These never carry engine output.
pub const MSG_NO_QUESTION: &str = "No se envió ninguna pregunta.";
pub const MSG_INVALID_BODY: &str = "Cuerpo de la petición inválido.";
pub const MSG_NUL_IN_QUESTION: &str = "La pregunta contiene caracteres no permitidos.";
pub const MSG_TIMEOUT: &str = "El motor de respuestas tardó demasiado en responder.";
pub const MSG_EXECUTION_FAILED: &str = "El motor de respuestas falló al procesar la pregunta.";
pub const MSG_TOO_MANY_REQUESTS: &str = "Demasiadas preguntas en curso, inténtalo más tarde.";
pub const MSG_INTERNAL: &str = "Error procesando la respuesta.";

/// Truncate `output` to at most `max_bytes`, on a char boundary, with a marker.
pub fn truncate_output(output: &str, max_bytes: usize) -> String {
    if output.len() <= max_bytes {
        return output.to_string();
    }
    let mut end = max_bytes;
    while !output.is_char_boundary(end) {
        end -= 1;
    }
    format!(
        "{}\n\n[truncated: showing {}/{} bytes]",
        &output[..end],
        end,
        output.len()
    )
}
