//! Message-bus topic grammar: `{base}/zone{N}/{field}`.

mod core;

pub use core::{
    TopicRejection, TopicRouter, ZoneChange, ZoneField, ZoneUpdate, command_payload,
};
