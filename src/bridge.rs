/*!
 # Bridge driver

 The [`BridgeDriver`] trait is the seam between the dispatcher and the
 hardware. [`LimitlessBridge`] implements it for LimitlessLED / MiLight v4
 wifi bridges, which take three-byte UDP frames and apply most commands to
 the group most recently switched on.
*/

use std::future::Future;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio::time;
use tracing::{debug, error, info, instrument, trace};

use crate::codec::RgbColor;
use crate::group::Group;

/// Default UDP port of v4 bridges
pub const DEFAULT_BRIDGE_PORT: u16 = 8899;

/// Number of groups a v4 bridge can address
pub const MAX_GROUPS: u8 = 4;

/// Minimum gap the bridge needs between two frames
pub const DEFAULT_FRAME_GAP: Duration = Duration::from_millis(100);

/// Errors reported by a bridge driver
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Socket error while talking to the bridge
    #[error("bridge IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Datagram was only partially sent
    #[error("short write to bridge: sent {sent} of {expected} bytes")]
    ShortWrite { sent: usize, expected: usize },

    /// Any other transport failure
    #[error("bridge transport error: {0}")]
    Transport(String),
}

/// Operations a bridge driver performs on a single group
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BridgeCommand {
    On,
    Off,
    /// Device brightness step (2-27)
    SetBrightness(u8),
    /// Palette hue byte
    SetHue(u8),
    /// Normalized RGB color
    SendColor(RgbColor),
    White,
    Night,
    Disco,
    DiscoFaster,
    DiscoSlower,
}

impl BridgeCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BridgeCommand::On => "on",
            BridgeCommand::Off => "off",
            BridgeCommand::SetBrightness(_) => "set_brightness",
            BridgeCommand::SetHue(_) => "set_hue",
            BridgeCommand::SendColor(_) => "send_color",
            BridgeCommand::White => "white",
            BridgeCommand::Night => "night",
            BridgeCommand::Disco => "disco",
            BridgeCommand::DiscoFaster => "disco_faster",
            BridgeCommand::DiscoSlower => "disco_slower",
        }
    }
}

/// Sends commands to one group at a time.
///
/// Implementations own their transport and must serialize access to it
/// themselves; the dispatcher calls `send` from concurrent requests.
pub trait BridgeDriver: Send + Sync + 'static {
    fn send(
        &self,
        group: &Group,
        command: BridgeCommand,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send;
}

/// Command queue to manage bridge frames with rate limiting
struct CommandQueue {
    /// Minimum delay between frames
    min_delay: Duration,
    /// Last frame timestamp, locked for the whole of one command
    last_frame: Mutex<Instant>,
}

impl CommandQueue {
    fn new(min_delay: Duration) -> Self {
        let last_frame = Instant::now()
            .checked_sub(min_delay)
            .unwrap_or_else(Instant::now);
        Self {
            min_delay,
            last_frame: Mutex::new(last_frame),
        }
    }

    /// Sends every frame of one command while holding the queue, so frames
    /// of concurrent commands never interleave
    async fn execute(&self, socket: &UdpSocket, frames: &[Frame]) -> Result<(), BridgeError> {
        let mut last_frame = self.last_frame.lock().await;
        for frame in frames {
            let elapsed = last_frame.elapsed();
            if elapsed < self.min_delay {
                let wait_time = self.min_delay - elapsed;
                trace!("Rate limiting: waiting {:?} before next frame", wait_time);
                time::sleep(wait_time).await;
            }

            let sent = socket.send(frame).await?;
            *last_frame = Instant::now();
            if sent != frame.len() {
                error!("Short write to bridge: {} of {} bytes", sent, frame.len());
                return Err(BridgeError::ShortWrite {
                    sent,
                    expected: frame.len(),
                });
            }
            trace!("Sent frame {:02x?}", frame);
        }
        Ok(())
    }
}

type Frame = [u8; 3];

const FRAME_SUFFIX: u8 = 0x55;

const GROUP_ON: [u8; MAX_GROUPS as usize] = [0x45, 0x47, 0x49, 0x4B];
const GROUP_OFF: [u8; MAX_GROUPS as usize] = [0x46, 0x48, 0x4A, 0x4C];
const GROUP_WHITE: [u8; MAX_GROUPS as usize] = [0xC5, 0xC7, 0xC9, 0xCB];
const GROUP_NIGHT: [u8; MAX_GROUPS as usize] = [0xC6, 0xC8, 0xCA, 0xCC];

const SET_HUE: u8 = 0x40;
const DISCO_SLOWER: u8 = 0x43;
const DISCO_FASTER: u8 = 0x44;
const DISCO: u8 = 0x4D;
const SET_BRIGHTNESS: u8 = 0x4E;

/// Hue byte of pure red; the bridge's color wheel runs backwards from here
const HUE_RED: f64 = 176.0;

/// Below this saturation a color is sent as white light
const WHITE_SATURATION: f64 = 0.1;

fn frame(code: u8, value: u8) -> Frame {
    [code, value, FRAME_SUFFIX]
}

/// Driver for LimitlessLED / MiLight v4 wifi bridges over UDP
pub struct LimitlessBridge {
    socket: UdpSocket,
    command_queue: CommandQueue,
}

impl LimitlessBridge {
    /// Opens a UDP socket connected to the bridge at `addr` (`host:port`)
    #[instrument]
    pub async fn connect(addr: &str) -> Result<LimitlessBridge, BridgeError> {
        Self::connect_with_gap(addr, DEFAULT_FRAME_GAP).await
    }

    /// Like [`LimitlessBridge::connect`], with a custom minimum gap between frames
    #[instrument]
    pub async fn connect_with_gap(
        addr: &str,
        frame_gap: Duration,
    ) -> Result<LimitlessBridge, BridgeError> {
        debug!("Binding local UDP socket");
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(addr).await?;
        info!("Bridge socket connected to {}", addr);

        Ok(LimitlessBridge {
            socket,
            command_queue: CommandQueue::new(frame_gap),
        })
    }

    /// Builds the frame sequence for one group command.
    ///
    /// Group ids are `1..=MAX_GROUPS`; the registry refuses larger counts.
    fn frames(group: &Group, command: BridgeCommand) -> Vec<Frame> {
        let index = usize::from(group.id() - 1);
        // Most commands apply to the last group switched on
        let select = frame(GROUP_ON[index], 0x00);

        match command {
            BridgeCommand::On => vec![select],
            BridgeCommand::Off => vec![frame(GROUP_OFF[index], 0x00)],
            BridgeCommand::SetBrightness(level) => vec![select, frame(SET_BRIGHTNESS, level)],
            BridgeCommand::SetHue(hue) => vec![select, frame(SET_HUE, hue)],
            BridgeCommand::SendColor(color) => {
                let (hue, saturation, value) = rgb_to_hsv(color);
                let brightness = frame(SET_BRIGHTNESS, value_to_brightness(value));
                if saturation < WHITE_SATURATION {
                    vec![select, frame(GROUP_WHITE[index], 0x00), brightness]
                } else {
                    vec![select, frame(SET_HUE, hue_to_byte(hue)), brightness]
                }
            }
            BridgeCommand::White => vec![select, frame(GROUP_WHITE[index], 0x00)],
            BridgeCommand::Night => vec![
                frame(GROUP_OFF[index], 0x00),
                frame(GROUP_NIGHT[index], 0x00),
            ],
            BridgeCommand::Disco => vec![select, frame(DISCO, 0x00)],
            BridgeCommand::DiscoFaster => vec![select, frame(DISCO_FASTER, 0x00)],
            BridgeCommand::DiscoSlower => vec![select, frame(DISCO_SLOWER, 0x00)],
        }
    }
}

impl BridgeDriver for LimitlessBridge {
    #[instrument(skip(self), fields(group = group.id(), command = command.name()))]
    async fn send(&self, group: &Group, command: BridgeCommand) -> Result<(), BridgeError> {
        let frames = Self::frames(group, command);
        debug!("Sending {} frame(s)", frames.len());
        self.command_queue.execute(&self.socket, &frames).await?;
        debug!("Command sent");
        Ok(())
    }
}

/// Converts a normalized RGB color to (hue degrees, saturation, value)
fn rgb_to_hsv(color: RgbColor) -> (f64, f64, f64) {
    let max = color.r.max(color.g).max(color.b);
    let min = color.r.min(color.g).min(color.b);
    let delta = max - min;

    let hue = if delta == 0.0 {
        0.0
    } else if max == color.r {
        60.0 * ((color.g - color.b) / delta).rem_euclid(6.0)
    } else if max == color.g {
        60.0 * ((color.b - color.r) / delta + 2.0)
    } else {
        60.0 * ((color.r - color.g) / delta + 4.0)
    };
    let saturation = if max == 0.0 { 0.0 } else { delta / max };
    (hue, saturation, max)
}

fn hue_to_byte(hue: f64) -> u8 {
    (HUE_RED - hue / 360.0 * 256.0).round().rem_euclid(256.0) as u8
}

fn value_to_brightness(value: f64) -> u8 {
    2 + (value.clamp(0.0, 1.0) * 25.0).round() as u8
}
