mod buffering;
mod sse_parser;

pub use buffering::SseFrameBuffer;
pub use sse_parser::parse_event_stream;
