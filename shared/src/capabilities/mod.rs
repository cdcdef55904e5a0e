mod http;
mod kv;

pub use self::http::{error_message, into_raw_response, HttpError, HttpResponse};
pub use self::kv::{
    decode, encode, read_result, write_result, KeyNamespace, PersistedSlot, StorageError,
};

pub use crux_core::render::Render;
pub use crux_http::Http;
pub use crux_kv::KeyValue;

use crate::event::Event;
use crate::App;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub kv: KeyValue<Event>,
    pub render: Render<Event>,
}
