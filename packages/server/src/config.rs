//! Command line and environment configuration.

use std::time::Duration;

use clap::Parser;

use crate::{
    domain::{TenantKey, WidgetKey},
    hub::{ConnectionSettings, HubSettings},
};

/// Chatelly real-time connection hub
#[derive(Parser, Clone, Debug)]
#[command(name = "chatelly-server", version, about = "Chatelly real-time connection hub")]
pub struct Config {
    /// Bind address
    #[arg(long, env = "CHATELLY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "CHATELLY_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Outbound messages buffered per connection before it is evicted
    #[arg(long, env = "CHATELLY_SEND_BUFFER_CAPACITY", default_value_t = 256)]
    pub send_buffer_capacity: usize,

    /// Commands buffered by the hub loop
    #[arg(long, env = "CHATELLY_HUB_INTAKE_CAPACITY", default_value_t = 1024)]
    pub hub_intake_capacity: usize,

    /// Time allowed to write a single frame
    #[arg(
        long,
        env = "CHATELLY_WRITE_WAIT_SECS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub write_wait_secs: u64,

    /// Time allowed between pongs. Pings go out at 9/10 of this.
    #[arg(
        long,
        env = "CHATELLY_PONG_WAIT_SECS",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub pong_wait_secs: u64,

    /// Largest inbound frame in bytes
    #[arg(
        long,
        env = "CHATELLY_MAX_MESSAGE_SIZE",
        default_value_t = 512,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub max_message_size: u64,

    /// Messages sent back on `join_chat`
    #[arg(long, env = "CHATELLY_HISTORY_LIMIT", default_value_t = 50)]
    pub history_limit: usize,

    /// Upper bound on chat store calls made from the hub loop
    #[arg(long, env = "CHATELLY_STORE_TIMEOUT_MS", default_value_t = 2000)]
    pub store_timeout_ms: u64,

    /// Greeting sent as `bot_message` on `join_chat`
    #[arg(
        long,
        env = "CHATELLY_WELCOME_MESSAGE",
        default_value = "Hello! How can I help you today?"
    )]
    pub welcome_message: String,

    /// Widget binding `KEY=TENANT`; a trailing `!` on the tenant disables it
    #[arg(
        long = "widget",
        env = "CHATELLY_WIDGETS",
        value_delimiter = ',',
        value_parser = parse_widget_binding
    )]
    pub widgets: Vec<WidgetBinding>,
}

/// A widget key registered for a tenant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetBinding {
    pub widget_key: WidgetKey,
    pub tenant: TenantKey,
    pub enabled: bool,
}

fn parse_widget_binding(raw: &str) -> Result<WidgetBinding, String> {
    let (key, tenant) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=TENANT, got '{raw}'"))?;

    let (tenant, enabled) = match tenant.strip_suffix('!') {
        Some(tenant) => (tenant, false),
        None => (tenant, true),
    };

    Ok(WidgetBinding {
        widget_key: WidgetKey::new(key.trim().to_string()).map_err(|e| e.to_string())?,
        tenant: TenantKey::new(tenant.trim().to_string()).map_err(|e| e.to_string())?,
        enabled,
    })
}

impl Config {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn hub_settings(&self) -> HubSettings {
        HubSettings {
            intake_capacity: self.hub_intake_capacity,
            history_limit: self.history_limit,
            welcome_message: self.welcome_message.clone(),
            store_timeout: Duration::from_millis(self.store_timeout_ms),
        }
    }

    pub fn connection_settings(&self) -> ConnectionSettings {
        let pong_wait = Duration::from_secs(self.pong_wait_secs);
        ConnectionSettings {
            send_buffer_capacity: self.send_buffer_capacity.max(1),
            write_wait: Duration::from_secs(self.write_wait_secs),
            pong_wait,
            ping_period: pong_wait * 9 / 10,
            max_message_size: usize::try_from(self.max_message_size).unwrap_or(usize::MAX),
        }
    }
}
