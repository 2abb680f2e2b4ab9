/*!
 # MiLight Bridge Daemon Library

 A Rust library for driving MiLight / LimitlessLED lighting groups through a
 wifi bridge. Raw, human-friendly parameters (group selectors, RGB triples,
 brightness percentages, named colors, disco speeds) are validated by the
 [`codec`] module and fanned out to one group or to every group by the
 [`CommandDispatcher`].

 ## Features

 * Power on/off control
 * RGB color control
 * Named palette colors
 * Brightness adjustment
 * White and night modes
 * Disco mode with speed control
 * Paced broadcasts to all groups

 ## Example

 ```no_run
 use std::sync::Arc;
 use milight_daemon::*;

 #[tokio::main]
 async fn main() -> Result<()> {
     let registry = Arc::new(GroupRegistry::new(4)?);
     let bridge = Arc::new(LimitlessBridge::connect("192.168.1.50:8899").await?);
     let dispatcher = CommandDispatcher::new(registry, bridge);

     // Turn group 2 on, then set every group to red
     let on = RawParams { group: Some("2".into()), ..Default::default() };
     dispatcher.execute(CommandKind::On, &on).await?;

     let red = RawParams { color: Some("red".into()), ..Default::default() };
     dispatcher.execute(CommandKind::Color, &red).await?;

     Ok(())
 }
 ```
*/

use thiserror::Error;

/// Top-level error type for the MiLight daemon library
#[derive(Error, Debug)]
pub enum Error {
    /// Caller supplied a malformed or out-of-domain parameter
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The bridge rejected a command for one of the targeted groups
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Invalid or unreadable configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Bridge transport error outside of a dispatch
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// IO error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod bridge;
pub mod codec;
pub mod config;
pub mod dispatch;
pub mod group;
pub mod palette;
pub mod server;

pub use bridge::{BridgeCommand, BridgeDriver, BridgeError, LimitlessBridge};
pub use codec::{
    BrightnessLevel, DiscoSpeed, HueByte, RawParams, RgbColor, TargetSelector, ValidationError,
};
pub use config::{Config, ConfigError};
pub use dispatch::{CommandDispatcher, CommandKind, DispatchError, Dispatched, Operation};
pub use group::{Group, GroupRegistry};
pub use palette::PALETTE;
