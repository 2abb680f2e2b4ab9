/*!
 # Command dispatch

 Resolves a command's target and sends it through a [`BridgeDriver`], one
 group at a time. Broadcasts visit groups in registry order, pause between
 groups so the bridge is not flooded, and stop at the first failing group.
*/

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time;
use tracing::{debug, error, info, instrument};

use crate::bridge::{BridgeCommand, BridgeDriver, BridgeError};
use crate::codec::{
    self, BrightnessLevel, DiscoSpeed, HueByte, RawParams, RgbColor, TargetSelector,
    ValidationError,
};
use crate::group::{Group, GroupRegistry};
use crate::Result;

/// Default delay between groups during a broadcast
pub const DEFAULT_PACING: Duration = Duration::from_millis(200);

/// A bridge send failed for one of the targeted groups
#[derive(Error, Debug)]
#[error("failed to send {operation} to group {group}")]
pub struct DispatchError {
    /// Name of the operation being dispatched
    pub operation: &'static str,
    /// Id of the group whose send failed
    pub group: u8,
    #[source]
    pub source: BridgeError,
}

/// Kinds of commands callers can request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    On,
    Off,
    Rgb,
    Brightness,
    Color,
    White,
    Night,
    Disco,
}

impl CommandKind {
    /// Validates the parameters this kind of command needs
    pub fn parse_operation(
        self,
        params: &RawParams,
    ) -> std::result::Result<Operation, ValidationError> {
        let operation = match self {
            CommandKind::On => Operation::On,
            CommandKind::Off => Operation::Off,
            CommandKind::Rgb => Operation::SetRgb(codec::parse_rgb(
                params.r.as_deref(),
                params.g.as_deref(),
                params.b.as_deref(),
            )?),
            CommandKind::Brightness => {
                Operation::SetBrightness(codec::parse_brightness(params.level.as_deref())?)
            }
            CommandKind::Color => {
                Operation::SetHue(codec::parse_named_color(params.color.as_deref())?)
            }
            CommandKind::White => Operation::White,
            CommandKind::Night => Operation::Night,
            CommandKind::Disco => {
                Operation::Disco(codec::parse_disco_speed(params.speed.as_deref()))
            }
        };
        Ok(operation)
    }
}

/// A validated operation ready to be dispatched
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation {
    On,
    Off,
    SetRgb(RgbColor),
    SetBrightness(BrightnessLevel),
    SetHue(HueByte),
    White,
    Night,
    Disco(DiscoSpeed),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::On => "on",
            Operation::Off => "off",
            Operation::SetRgb(_) => "rgb",
            Operation::SetBrightness(_) => "brightness",
            Operation::SetHue(_) => "color",
            Operation::White => "white",
            Operation::Night => "night",
            Operation::Disco(_) => "disco",
        }
    }

    /// The single bridge call this operation makes per group
    pub fn bridge_command(&self) -> BridgeCommand {
        match *self {
            Operation::On => BridgeCommand::On,
            Operation::Off => BridgeCommand::Off,
            Operation::SetRgb(color) => BridgeCommand::SendColor(color),
            Operation::SetBrightness(level) => BridgeCommand::SetBrightness(level.value()),
            Operation::SetHue(HueByte(hue)) => BridgeCommand::SetHue(hue),
            Operation::White => BridgeCommand::White,
            Operation::Night => BridgeCommand::Night,
            Operation::Disco(DiscoSpeed::Up) => BridgeCommand::DiscoFaster,
            Operation::Disco(DiscoSpeed::Down) => BridgeCommand::DiscoSlower,
            Operation::Disco(DiscoSpeed::Hold) => BridgeCommand::Disco,
        }
    }
}

/// Groups a successful dispatch addressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    Group(u8),
    All,
}

impl Dispatched {
    /// Group id, or 0 when every group was addressed
    pub fn group_id(self) -> u8 {
        match self {
            Dispatched::Group(id) => id,
            Dispatched::All => 0,
        }
    }
}

/// Sends validated operations to one group or every group
pub struct CommandDispatcher<B> {
    registry: Arc<GroupRegistry>,
    bridge: Arc<B>,
    pacing: Duration,
}

impl<B: BridgeDriver> CommandDispatcher<B> {
    pub fn new(registry: Arc<GroupRegistry>, bridge: Arc<B>) -> Self {
        Self {
            registry,
            bridge,
            pacing: DEFAULT_PACING,
        }
    }

    /// Sets the delay between groups during a broadcast
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn registry(&self) -> &GroupRegistry {
        &self.registry
    }

    /// Validates raw parameters and dispatches the resulting operation.
    ///
    /// Validation happens before any bridge call, so a rejected parameter
    /// has no side effects.
    #[instrument(skip(self, params))]
    pub async fn execute(
        &self,
        kind: CommandKind,
        params: &RawParams,
    ) -> Result<(Operation, Dispatched)> {
        let target = codec::parse_target(params.group.as_deref(), self.registry.len())?;
        let operation = kind.parse_operation(params)?;
        let dispatched = self.dispatch(target, operation).await?;
        Ok((operation, dispatched))
    }

    /// Sends `operation` to the groups `target` selects.
    ///
    /// A broadcast stops at the first failing group; groups after it are not
    /// attempted and groups before it keep their new state.
    #[instrument(skip(self), fields(operation = operation.name()))]
    pub async fn dispatch(
        &self,
        target: TargetSelector,
        operation: Operation,
    ) -> std::result::Result<Dispatched, DispatchError> {
        let command = operation.bridge_command();
        match target {
            TargetSelector::Single(index) => {
                let group = self.registry.get(index);
                self.send(group, operation, command).await?;
                info!("Sent {} to group {}", operation.name(), group.id());
                Ok(Dispatched::Group(group.id()))
            }
            TargetSelector::All => {
                let groups = self.registry.all();
                for (i, group) in groups.iter().enumerate() {
                    self.send(group, operation, command).await?;
                    if i + 1 < groups.len() && !self.pacing.is_zero() {
                        time::sleep(self.pacing).await;
                    }
                }
                info!("Sent {} to all {} groups", operation.name(), groups.len());
                Ok(Dispatched::All)
            }
        }
    }

    async fn send(
        &self,
        group: &Group,
        operation: Operation,
        command: BridgeCommand,
    ) -> std::result::Result<(), DispatchError> {
        debug!("Sending {} to group {}", command.name(), group.id());
        self.bridge.send(group, command).await.map_err(|source| {
            error!(
                "Failed to send {} to group {}: {}",
                operation.name(),
                group.id(),
                source
            );
            DispatchError {
                operation: operation.name(),
                group: group.id(),
                source,
            }
        })
    }
}
